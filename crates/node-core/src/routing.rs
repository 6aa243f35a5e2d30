//! Declarative request routing.
//!
//! A [`ResourceCatalog`] maps `resource → operation →` [`RequestTemplate`].
//! [`DeclarativeNode::resolve`] picks a template, evaluates the node's
//! [`FieldSchema`] against the current values, and projects visible,
//! non-default field values into query parameters.
//!
//! ## Query parameter order
//!
//! Parameters are emitted in schema declaration order of their source fields
//! (nested options ordered by their position inside the collection), not in
//! template order. The remote API does not care; the order is fixed so that
//! identical inputs always produce identical descriptors.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::schema::{OPERATION_FIELD, RESOURCE_FIELD};
use crate::types::{parse_date_time, utc_calendar_date};
use crate::{
    ExecutionId, FieldDefinition, FieldName, FieldPath, FieldSchema, FieldValue, FieldValues,
    HttpMethod, NodeError, NodeTypeDescription, OperationKey, RequestDefaults, RequestDescriptor,
    ResourceKey, Template,
};

/// Characters escaped when a field value is substituted into a path segment.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// ---------------------------------------------------------------------------
// Value transforms
// ---------------------------------------------------------------------------

/// How a field value becomes a query-parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueTransform {
    /// The text as stored.
    Verbatim,
    /// The UTC calendar date of a date-time value, as `YYYY-MM-DD`.
    ///
    /// Time of day is discarded after normalising to UTC, so the projection
    /// is idempotent: feeding its output back in yields the same string.
    UtcDate,
}

impl ValueTransform {
    pub fn apply(self, field: &FieldName, value: &FieldValue) -> Result<String, NodeError> {
        let invalid = |message: String| NodeError::InvalidValue {
            field: field.clone(),
            message,
        };
        let text = value
            .as_text()
            .ok_or_else(|| invalid("expected a scalar value, found a collection".to_owned()))?;

        match self {
            Self::Verbatim => Ok(text.to_owned()),
            Self::UtcDate => parse_date_time(text)
                .map(utc_calendar_date)
                .ok_or_else(|| invalid(format!("'{text}' is not a recognised date-time"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Projects one field's value into one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryProjection {
    pub param: String,
    pub source: FieldPath,
    pub transform: ValueTransform,
}

/// The HTTP request shape of one resource/operation pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTemplate {
    pub method: HttpMethod,
    /// Short action label shown by the host (e.g. "Get the APOD").
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path below the base URL; may contain `{field}` placeholders.
    pub path: Template,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<QueryProjection>,
}

impl RequestTemplate {
    /// A `GET` of `path`.
    pub fn get(path: &str, action: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            action: action.to_owned(),
            description: None,
            path: Template::new(path),
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Adds a query projection from `source` into `param`.
    #[must_use]
    pub fn with_query(mut self, param: &str, source: FieldPath, transform: ValueTransform) -> Self {
        self.query.push(QueryProjection {
            param: param.to_owned(),
            source,
            transform,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Ordered mapping `resource → operation → template`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCatalog {
    resources: IndexMap<ResourceKey, IndexMap<OperationKey, RequestTemplate>>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `template` under `resource`/`operation`, replacing any previous one.
    #[must_use]
    pub fn with_operation(mut self, resource: &str, operation: &str, template: RequestTemplate) -> Self {
        self.resources
            .entry(ResourceKey::trusted(resource))
            .or_default()
            .insert(OperationKey::trusted(operation), template);
        self
    }

    pub fn template(&self, resource: &str, operation: &str) -> Option<&RequestTemplate> {
        self.resources.get(resource)?.get(operation)
    }

    pub fn resource_keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.resources.keys()
    }

    pub fn operation_keys(&self, resource: &str) -> impl Iterator<Item = &OperationKey> {
        self.resources.get(resource).into_iter().flat_map(IndexMap::keys)
    }

    /// Iterates over every `(resource, operation, template)` triple in order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &OperationKey, &RequestTemplate)> {
        self.resources.iter().flat_map(|(resource, operations)| {
            operations
                .iter()
                .map(move |(operation, template)| (resource, operation, template))
        })
    }

    /// Checks that `schema` and this catalog agree.
    ///
    /// - every resource/operation key named by a visibility predicate exists;
    /// - the `resource` field's options match the catalog's resources;
    /// - every projection source and path placeholder names a schema field
    ///   whose predicate admits the template's resource and operation.
    pub fn validate(&self, schema: &FieldSchema) -> Result<(), NodeError> {
        schema.validate()?;

        for (resource, operation, _) in self.iter() {
            if resource.as_str().is_empty() || operation.as_str().is_empty() {
                return config_error("catalog contains an empty resource or operation key".to_owned());
            }
        }

        for field in schema.fields() {
            self.check_predicate(field)?;
        }

        if let Some(resource_field) = schema.definition(&FieldPath::top(RESOURCE_FIELD)) {
            for option in &resource_field.options {
                if !self.resources.contains_key(option.value.as_str()) {
                    return config_error(format!(
                        "resource option '{}' has no catalog entry",
                        option.value
                    ));
                }
            }
            for resource in self.resource_keys() {
                if !resource_field.options.iter().any(|o| o.value == resource.as_str()) {
                    return config_error(format!(
                        "catalog resource '{resource}' is not offered by the '{RESOURCE_FIELD}' field"
                    ));
                }
            }
        }

        for (resource, operation, template) in self.iter() {
            let placeholders = template.path.placeholders().into_iter().map(FieldPath::top);
            let sources = template.query.iter().map(|p| p.source.clone());
            for path in placeholders.chain(sources) {
                let top = schema
                    .definition(&FieldPath::top(path.field.as_str()))
                    .filter(|_| schema.definition(&path).is_some());
                let Some(top) = top else {
                    return config_error(format!(
                        "{resource}/{operation} references unknown field '{path}'"
                    ));
                };
                if !admits(top, resource.as_str(), operation.as_str()) {
                    return config_error(format!(
                        "{resource}/{operation} references field '{path}', which is never shown for it"
                    ));
                }
            }
        }

        Ok(())
    }

    fn check_predicate(&self, field: &FieldDefinition) -> Result<(), NodeError> {
        let Some(predicate) = &field.display_options else {
            return Ok(());
        };

        let resources: Vec<&str> = match predicate.allowed_values(RESOURCE_FIELD) {
            Some(allowed) => {
                for resource in allowed {
                    if !self.resources.contains_key(resource.as_str()) {
                        return config_error(format!(
                            "field '{}' is shown for unknown resource '{resource}'",
                            field.name
                        ));
                    }
                }
                allowed.iter().map(String::as_str).collect()
            }
            None => self.resource_keys().map(ResourceKey::as_str).collect(),
        };

        if let Some(allowed) = predicate.allowed_values(OPERATION_FIELD) {
            for operation in allowed {
                let known = resources
                    .iter()
                    .any(|resource| self.template(resource, operation).is_some());
                if !known {
                    return config_error(format!(
                        "field '{}' is shown for unknown operation '{operation}'",
                        field.name
                    ));
                }
            }
        }
        Ok(())
    }
}

fn config_error<T>(message: String) -> Result<T, NodeError> {
    Err(NodeError::ConfigurationError { message })
}

/// Whether `field`'s predicate can hold while `resource`/`operation` are selected.
fn admits(field: &FieldDefinition, resource: &str, operation: &str) -> bool {
    let Some(predicate) = &field.display_options else {
        return true;
    };
    let allows = |sibling: &str, value: &str| {
        predicate
            .allowed_values(sibling)
            .is_none_or(|allowed| allowed.iter().any(|a| a == value))
    };
    allows(RESOURCE_FIELD, resource) && allows(OPERATION_FIELD, operation)
}

// ---------------------------------------------------------------------------
// Declarative node
// ---------------------------------------------------------------------------

/// A node whose behaviour is entirely described by its schema and catalog.
#[derive(Debug, Clone)]
pub struct DeclarativeNode {
    description: NodeTypeDescription,
    catalog: ResourceCatalog,
    defaults: RequestDefaults,
}

impl DeclarativeNode {
    /// Validates and wraps a description and catalog.
    ///
    /// Fails with [`NodeError::ConfigurationError`] if the description has no
    /// request defaults or the catalog disagrees with the schema.
    pub fn new(description: NodeTypeDescription, catalog: ResourceCatalog) -> Result<Self, NodeError> {
        let defaults = description
            .request_defaults
            .clone()
            .ok_or_else(|| NodeError::ConfigurationError {
                message: format!("declarative node '{}' has no request defaults", description.name),
            })?;
        catalog.validate(&description.properties)?;
        Ok(Self {
            description,
            catalog,
            defaults,
        })
    }

    pub fn description(&self) -> &NodeTypeDescription {
        &self.description
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Builds the request for `resource`/`operation` from `values`.
    ///
    /// `resource` and `operation` override whatever `values` holds for the
    /// `resource` and `operation` fields.
    #[instrument(
        level = "debug",
        skip(self, values),
        fields(node = %self.description.name, execution_id = %ExecutionId::new_random())
    )]
    pub fn resolve(
        &self,
        resource: &str,
        operation: &str,
        values: &FieldValues,
    ) -> Result<RequestDescriptor, NodeError> {
        let template = self
            .catalog
            .template(resource, operation)
            .ok_or_else(|| NodeError::unknown_operation(resource, operation))?;

        let selection = values
            .clone()
            .with(RESOURCE_FIELD, resource)
            .with(OPERATION_FIELD, operation);
        let schema = &self.description.properties;
        let snapshot = schema.evaluate(&selection);

        if let Some(field) = snapshot.first_missing_required() {
            return Err(NodeError::MissingValue {
                field: field.clone(),
            });
        }

        if let Some((field, value)) = snapshot.first_invalid_option() {
            return Err(NodeError::InvalidValue {
                field: field.clone(),
                message: format!("'{value}' is not one of the allowed options"),
            });
        }

        let mut segments = BTreeMap::new();
        for name in template.path.placeholders() {
            if let Some(text) = snapshot.effective_value(name).and_then(FieldValue::as_text) {
                segments.insert(name, path_segment(name, text)?);
            }
        }
        let path = template
            .path
            .render(|name| segments.get(name).cloned())
            .map_err(|field| NodeError::MissingValue { field })?;

        let mut projections: Vec<&QueryProjection> = template.query.iter().collect();
        projections.sort_by_key(|p| declaration_rank(schema, &p.source));

        let mut query = IndexMap::new();
        for projection in projections {
            let Some((definition, value)) = snapshot.lookup(&projection.source) else {
                continue;
            };
            if value.is_empty() || definition.is_default(value) {
                continue;
            }
            let projected = projection.transform.apply(projection.source.leaf(), value)?;
            query.insert(projection.param.clone(), projected);
        }

        let url = format!("{}{}", self.defaults.base_url.trim_end_matches('/'), path);
        debug!(
            method = %template.method,
            %url,
            params = ?query.keys().collect::<Vec<_>>(),
            "resolved request"
        );

        Ok(RequestDescriptor::new(
            template.method,
            url,
            query,
            self.defaults.headers.clone(),
        ))
    }
}

/// Escapes `value` so it occupies exactly one path segment.
fn path_segment(name: &str, value: &str) -> Result<String, NodeError> {
    if value == "." || value == ".." {
        return Err(NodeError::InvalidValue {
            field: FieldName::trusted(name),
            message: format!("'{value}' is not a valid path segment"),
        });
    }
    Ok(utf8_percent_encode(value, PATH_SEGMENT_ENCODE_SET).to_string())
}

/// Position of `path`'s field in declaration order: `(top index, nested index)`.
fn declaration_rank(schema: &FieldSchema, path: &FieldPath) -> (usize, usize) {
    let fields = schema.fields();
    let Some(top) = fields.iter().position(|f| f.name == path.field) else {
        return (usize::MAX, usize::MAX);
    };
    let nested = path
        .nested
        .as_ref()
        .and_then(|n| fields[top].nested.iter().position(|f| f.name == *n))
        .map_or(0, |i| i + 1);
    (top, nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{inject, CredentialRecord, FieldOption};

    fn description() -> NodeTypeDescription {
        let mut d = NodeTypeDescription::transform(
            "demo",
            "Demo",
            "Demo API",
            FieldSchema::new(vec![
                FieldDefinition::options(
                    RESOURCE_FIELD,
                    "Resource",
                    vec![FieldOption::new("Things", "things"), FieldOption::new("Items", "items")],
                    "things",
                ),
                FieldDefinition::options(OPERATION_FIELD, "Operation", vec![FieldOption::new("Get", "get")], "get"),
                FieldDefinition::options(
                    "kind",
                    "Kind",
                    vec![FieldOption::new("Red", "red"), FieldOption::new("Blue", "blue")],
                    "red",
                )
                .shown_when(RESOURCE_FIELD, &["items"]),
                FieldDefinition::string("label", "Label").shown_when(RESOURCE_FIELD, &["items"]),
                FieldDefinition::collection(
                    "extra",
                    "Extra",
                    vec![
                        FieldDefinition::date_time("since", "Since"),
                        FieldDefinition::string("tag", "Tag"),
                    ],
                )
                .shown_when(RESOURCE_FIELD, &["things"])
                .shown_when(OPERATION_FIELD, &["get"]),
            ]),
        );
        d.request_defaults = Some(RequestDefaults::json_api("https://example.test/"));
        d
    }

    fn catalog() -> ResourceCatalog {
        ResourceCatalog::new()
            .with_operation(
                "things",
                "get",
                RequestTemplate::get("/things", "Get things")
                    // Declared out of schema order on purpose.
                    .with_query("tag", FieldPath::nested("extra", "tag"), ValueTransform::Verbatim)
                    .with_query("since", FieldPath::nested("extra", "since"), ValueTransform::UtcDate),
            )
            .with_operation(
                "items",
                "get",
                RequestTemplate::get("/items/{kind}", "Get items")
                    .with_query("label", FieldPath::top("label"), ValueTransform::Verbatim),
            )
    }

    fn node() -> DeclarativeNode {
        DeclarativeNode::new(description(), catalog()).unwrap()
    }

    #[test]
    fn test_unknown_pair_is_configuration_error() {
        let err = node().resolve("things", "delete", &FieldValues::new()).unwrap_err();
        assert!(matches!(err, NodeError::ConfigurationError { .. }));
    }

    #[test]
    fn test_untouched_collection_adds_no_params() {
        let request = node().resolve("things", "get", &FieldValues::new()).unwrap();
        assert_eq!(request.url(), "https://example.test/things");
        assert!(request.query().is_empty());
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_params_follow_schema_order() {
        let values = FieldValues::new().with(
            "extra",
            FieldValues::new()
                .with("tag", "x")
                .with("since", "2024-03-05T23:00:00Z"),
        );
        let request = node().resolve("things", "get", &values).unwrap();
        let keys: Vec<&str> = request.query().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["since", "tag"]);
        assert_eq!(request.query_param("since"), Some("2024-03-05"));
    }

    #[test]
    fn test_path_placeholder_uses_default_when_unset() {
        let request = node().resolve("items", "get", &FieldValues::new()).unwrap();
        assert_eq!(request.path(), "/items/red");

        let values = FieldValues::new().with("kind", "blue").with("label", "hello");
        let request = node().resolve("items", "get", &values).unwrap();
        assert_eq!(request.path(), "/items/blue");
        assert_eq!(request.query_param("label"), Some("hello"));
    }

    #[test]
    fn test_empty_path_value_is_missing() {
        let values = FieldValues::new().with("kind", "");
        let err = node().resolve("items", "get", &values).unwrap_err();
        assert_eq!(
            err,
            NodeError::MissingValue {
                field: FieldName::new("kind").unwrap()
            }
        );
    }

    #[test]
    fn test_value_outside_options_is_invalid() {
        let values = FieldValues::new().with("kind", "green");
        let err = node().resolve("items", "get", &values).unwrap_err();
        assert!(matches!(err, NodeError::InvalidValue { ref field, .. } if field.as_str() == "kind"));
    }

    #[test]
    fn test_path_values_are_escaped_into_one_segment() {
        let catalog = catalog().with_operation(
            "items",
            "get",
            RequestTemplate::get("/labels/{label}/items", "Get labelled items"),
        );
        let node = DeclarativeNode::new(description(), catalog).unwrap();

        let values = FieldValues::new().with("label", "a/b?api_key=x&c=#d %");
        let request = node.resolve("items", "get", &values).unwrap();
        assert_eq!(request.path(), "/labels/a%2Fb%3Fapi_key=x&c=%23d%20%25/items");
        assert!(request.query().is_empty());
        assert!(request.to_url().unwrap().query().is_none());

        for dots in [".", ".."] {
            let values = FieldValues::new().with("label", dots);
            let err = node.resolve("items", "get", &values).unwrap_err();
            assert!(matches!(err, NodeError::InvalidValue { .. }), "{dots}");
        }
    }

    #[test]
    fn test_hidden_field_values_are_ignored() {
        // "label" is only shown for "items".
        let values = FieldValues::new().with("label", "ignored");
        let request = node().resolve("things", "get", &values).unwrap();
        assert!(request.query_param("label").is_none());
    }

    #[test]
    fn test_unparseable_date_is_invalid_value() {
        let values = FieldValues::new().with("extra", FieldValues::new().with("since", "soon"));
        let err = node().resolve("things", "get", &values).unwrap_err();
        assert!(matches!(err, NodeError::InvalidValue { ref field, .. } if field.as_str() == "since"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let values = FieldValues::new().with(
            "extra",
            FieldValues::new().with("since", "2024-03-05").with("tag", "t"),
        );
        let node = node();
        let a = node.resolve("things", "get", &values).unwrap();
        let b = node.resolve("things", "get", &values).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_url().unwrap(), b.to_url().unwrap());
    }

    #[test]
    fn test_inject_overrides_resolved_api_key() {
        let catalog = ResourceCatalog::new()
            .with_operation(
                "things",
                "get",
                RequestTemplate::get("/things", "Get things")
                    .with_query("api_key", FieldPath::nested("extra", "tag"), ValueTransform::Verbatim),
            )
            .with_operation("items", "get", RequestTemplate::get("/items/{kind}", "Get items"));
        let node = DeclarativeNode::new(description(), catalog).unwrap();
        let values = FieldValues::new().with("extra", FieldValues::new().with("tag", "shadow"));

        let request = node.resolve("things", "get", &values).unwrap();
        assert_eq!(request.query_param("api_key"), Some("shadow"));

        let injected = inject(&request, &CredentialRecord::new("real"));
        assert_eq!(injected.query_param("api_key"), Some("real"));
        assert_eq!(injected.query().len(), 1);
    }

    #[test]
    fn test_validate_rejects_predicate_on_unknown_operation() {
        let mut d = description();
        let fields = vec![
            d.properties.fields()[0].clone(),
            d.properties.fields()[1].clone(),
            FieldDefinition::string("x", "X").shown_when(OPERATION_FIELD, &["archive"]),
        ];
        d.properties = FieldSchema::new(fields);
        let catalog = ResourceCatalog::new()
            .with_operation("things", "get", RequestTemplate::get("/things", "Get"))
            .with_operation("items", "get", RequestTemplate::get("/items", "Get"));
        let err = DeclarativeNode::new(d, catalog).unwrap_err();
        assert!(err.to_string().contains("unknown operation 'archive'"));
    }

    #[test]
    fn test_validate_rejects_projection_from_hidden_field() {
        // "label" is never shown for "things".
        let catalog = catalog().with_operation(
            "things",
            "get",
            RequestTemplate::get("/things", "Get").with_query("label", FieldPath::top("label"), ValueTransform::Verbatim),
        );
        let err = DeclarativeNode::new(description(), catalog).unwrap_err();
        assert!(err.to_string().contains("never shown"));
    }

    #[test]
    fn test_validate_rejects_unknown_projection_field() {
        let catalog = catalog().with_operation(
            "things",
            "get",
            RequestTemplate::get("/things", "Get").with_query(
                "q",
                FieldPath::nested("extra", "nope"),
                ValueTransform::Verbatim,
            ),
        );
        let err = DeclarativeNode::new(description(), catalog).unwrap_err();
        assert!(err.to_string().contains("unknown field 'extra.nope'"));
    }

    #[test]
    fn test_missing_request_defaults_is_configuration_error() {
        let mut d = description();
        d.request_defaults = None;
        assert!(matches!(
            DeclarativeNode::new(d, catalog()),
            Err(NodeError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_utc_date_is_idempotent() {
        let field = FieldName::new("d").unwrap();
        let once = ValueTransform::UtcDate
            .apply(&field, &FieldValue::text("2024-03-05T23:00:00-05:00"))
            .unwrap();
        assert_eq!(once, "2024-03-06");
        let twice = ValueTransform::UtcDate
            .apply(&field, &FieldValue::text(once.clone()))
            .unwrap();
        assert_eq!(once, twice);
    }
}
