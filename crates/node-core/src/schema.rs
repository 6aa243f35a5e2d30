//! Field schema: the static description of a node's user-configurable fields.
//!
//! The host renders a form from a [`FieldSchema`]. At run time the same schema
//! is evaluated against a snapshot of current [`FieldValues`] to decide which
//! fields are active. Evaluation is a pure function from `(schema, values)` to
//! a [`SchemaSnapshot`]; nothing here holds UI state.
//!
//! ## Visibility
//!
//! Fields are evaluated in declaration order. A field's
//! [`VisibilityPredicate`] sees only the *effective* values (current value, or
//! declared default when unset) of visible fields declared before it. A field
//! without a predicate is always visible.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{FieldName, FieldValue, FieldValues, NodeError};

/// Field holding the selected resource key.
pub const RESOURCE_FIELD: &str = "resource";

/// Field holding the selected operation key.
pub const OPERATION_FIELD: &str = "operation";

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// How the host renders a field and how its value is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayType {
    /// Free text.
    String,
    /// Drop-down over a fixed [`FieldOption`] list.
    Options,
    /// Date-time picker; values are date-time strings.
    DateTime,
    /// Group of optional nested fields ("Additional Fields").
    Collection,
}

/// One choice of an `options` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    /// Label shown to the user.
    pub name: String,
    /// Value stored in the field.
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: None,
        }
    }
}

/// Condition over sibling field values controlling whether a field is shown.
///
/// The field is shown iff, for every entry, the sibling's effective value is
/// one of the allowed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityPredicate {
    show: BTreeMap<FieldName, Vec<String>>,
}

impl VisibilityPredicate {
    /// Returns the sibling → allowed-values table.
    pub fn show(&self) -> &BTreeMap<FieldName, Vec<String>> {
        &self.show
    }

    /// Returns the allowed values for `sibling`, if the predicate mentions it.
    pub fn allowed_values(&self, sibling: &str) -> Option<&[String]> {
        self.show.get(sibling).map(Vec::as_slice)
    }

    fn matches(&self, effective: &FieldValues) -> bool {
        self.show.iter().all(|(sibling, allowed)| {
            effective
                .get(sibling.as_str())
                .and_then(FieldValue::as_text)
                .is_some_and(|current| allowed.iter().any(|a| a == current))
        })
    }
}

/// Schema entry describing one user-configurable input and when it is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: FieldName,
    pub display_name: String,
    #[serde(rename = "type")]
    pub display_type: DisplayType,
    pub default: FieldValue,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Choices for `options` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Child fields of a `collection`; each child is optional.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_options: Option<VisibilityPredicate>,
}

impl FieldDefinition {
    fn base(name: &str, display_name: &str, display_type: DisplayType, default: FieldValue) -> Self {
        Self {
            name: FieldName::trusted(name),
            display_name: display_name.to_owned(),
            display_type,
            default,
            required: false,
            description: None,
            placeholder: None,
            options: Vec::new(),
            nested: Vec::new(),
            display_options: None,
        }
    }

    /// A free-text field defaulting to `""`.
    pub fn string(name: &str, display_name: &str) -> Self {
        Self::base(name, display_name, DisplayType::String, FieldValue::text(""))
    }

    /// A drop-down field over `options`, defaulting to `default`.
    pub fn options(
        name: &str,
        display_name: &str,
        options: Vec<FieldOption>,
        default: &str,
    ) -> Self {
        Self {
            options,
            ..Self::base(name, display_name, DisplayType::Options, FieldValue::text(default))
        }
    }

    /// A date-time field defaulting to `""` (unset).
    pub fn date_time(name: &str, display_name: &str) -> Self {
        Self::base(name, display_name, DisplayType::DateTime, FieldValue::text(""))
    }

    /// A collection of optional nested fields, defaulting to `{}`.
    pub fn collection(name: &str, display_name: &str, nested: Vec<FieldDefinition>) -> Self {
        Self {
            nested,
            ..Self::base(
                name,
                display_name,
                DisplayType::Collection,
                FieldValue::empty_collection(),
            )
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_owned());
        self
    }

    /// Adds a visibility condition: shown only while `sibling` is one of `allowed`.
    #[must_use]
    pub fn shown_when(mut self, sibling: &str, allowed: &[&str]) -> Self {
        self.display_options
            .get_or_insert_with(VisibilityPredicate::default)
            .show
            .insert(
                FieldName::trusted(sibling),
                allowed.iter().map(|v| (*v).to_owned()).collect(),
            );
        self
    }

    /// Returns `true` if `value` equals the declared default.
    pub fn is_default(&self, value: &FieldValue) -> bool {
        *value == self.default
    }

    /// Returns `true` if `value` may be stored in this field.
    ///
    /// Fields without options accept anything. Empty text is accepted here
    /// and handled by the required-field check.
    pub fn admits(&self, value: &str) -> bool {
        self.options.is_empty() || value.is_empty() || self.options.iter().any(|o| o.value == value)
    }

    /// Returns the nested definition named `name`.
    pub fn nested_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.nested.iter().find(|f| f.name.as_str() == name)
    }
}

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

/// Reference to a top-level field or to a nested option of a collection.
///
/// Displays (and parses) as `field` or `collection.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    pub field: FieldName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<FieldName>,
}

impl FieldPath {
    pub fn top(field: &str) -> Self {
        Self {
            field: FieldName::trusted(field),
            nested: None,
        }
    }

    pub fn nested(collection: &str, field: &str) -> Self {
        Self {
            field: FieldName::trusted(collection),
            nested: Some(FieldName::trusted(field)),
        }
    }

    /// The name of the field the value actually lives in.
    pub fn leaf(&self) -> &FieldName {
        self.nested.as_ref().unwrap_or(&self.field)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.nested {
            Some(nested) => write!(f, "{}.{}", self.field, nested),
            None => write!(f, "{}", self.field),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Ordered list of a node's field definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldDefinition>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    /// All declared fields, in declaration order, regardless of visibility.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Finds the definition a path points at (the nested child for nested paths).
    pub fn definition(&self, path: &FieldPath) -> Option<&FieldDefinition> {
        let top = self.fields.iter().find(|f| f.name == path.field)?;
        match &path.nested {
            Some(nested) => top.nested_field(nested.as_str()),
            None => Some(top),
        }
    }

    /// Evaluates visibility against `values`.
    pub fn evaluate(&self, values: &FieldValues) -> SchemaSnapshot<'_> {
        let mut visible = Vec::new();
        let mut effective = FieldValues::new();

        for field in &self.fields {
            let shown = field
                .display_options
                .as_ref()
                .is_none_or(|predicate| predicate.matches(&effective));
            if !shown {
                continue;
            }
            let value = values
                .get(field.name.as_str())
                .cloned()
                .unwrap_or_else(|| field.default.clone());
            effective.insert(field.name.as_str(), value);
            visible.push(field);
        }

        SchemaSnapshot { visible, effective }
    }

    /// Visible fields, in declaration order, for the given values.
    pub fn visible_fields(&self, values: &FieldValues) -> Vec<&FieldDefinition> {
        self.evaluate(values).visible
    }

    /// Checks the schema is well formed.
    ///
    /// Names must be non-empty and unique (nested options included), nested
    /// options may only appear on collections, and an `options` field's default
    /// must be one of its choices.
    pub fn validate(&self) -> Result<(), NodeError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            check_definition(field, &mut seen)?;
            for child in &field.nested {
                check_definition(child, &mut seen)?;
            }
        }
        Ok(())
    }
}

fn check_definition<'a>(
    field: &'a FieldDefinition,
    seen: &mut HashSet<&'a str>,
) -> Result<(), NodeError> {
    let fail = |message: String| Err(NodeError::ConfigurationError { message });

    if field.name.as_str().is_empty() {
        return fail("field with empty name".to_owned());
    }
    if !seen.insert(field.name.as_str()) {
        return fail(format!("duplicate field name '{}'", field.name));
    }
    if !field.nested.is_empty() && field.display_type != DisplayType::Collection {
        return fail(format!("field '{}' has nested options but is not a collection", field.name));
    }
    if field.display_type == DisplayType::Options {
        let default = field.default.as_text().unwrap_or_default();
        if !default.is_empty() && !field.options.iter().any(|o| o.value == default) {
            return fail(format!(
                "default '{default}' of field '{}' is not one of its options",
                field.name
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Result of evaluating a [`FieldSchema`] against one set of values.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot<'a> {
    visible: Vec<&'a FieldDefinition>,
    effective: FieldValues,
}

impl<'a> SchemaSnapshot<'a> {
    /// Visible top-level fields in declaration order.
    pub fn visible(&self) -> &[&'a FieldDefinition] {
        &self.visible
    }

    /// Returns `true` if the top-level field `name` is visible.
    pub fn is_visible(&self, name: &str) -> bool {
        self.visible.iter().any(|f| f.name.as_str() == name)
    }

    /// Effective value (current or default) of a visible top-level field.
    pub fn effective_value(&self, name: &str) -> Option<&FieldValue> {
        self.effective.get(name)
    }

    /// Resolves `path` to its definition and value.
    ///
    /// Returns `None` when the top-level field is hidden, or when a nested
    /// option has not been added to its collection. Top-level fields always
    /// resolve to their effective value.
    pub fn lookup(&self, path: &FieldPath) -> Option<(&'a FieldDefinition, &FieldValue)> {
        let top = *self.visible.iter().find(|f| f.name == path.field)?;
        let value = self.effective.get(path.field.as_str())?;
        match &path.nested {
            None => Some((top, value)),
            Some(nested) => {
                let child = top.nested_field(nested.as_str())?;
                let child_value = value.as_collection()?.get(nested.as_str())?;
                Some((child, child_value))
            }
        }
    }

    /// The first visible required field whose effective value is empty.
    ///
    /// Nested options are only checked once they have been added.
    pub fn first_missing_required(&self) -> Option<&'a FieldName> {
        for field in &self.visible {
            let value = self.effective.get(field.name.as_str());
            if field.required && value.is_none_or(FieldValue::is_empty) {
                return Some(&field.name);
            }
            let Some(collection) = value.and_then(FieldValue::as_collection) else {
                continue;
            };
            for child in field.nested.iter().filter(|c| c.required) {
                if collection
                    .get(child.name.as_str())
                    .is_some_and(FieldValue::is_empty)
                {
                    return Some(&child.name);
                }
            }
        }
        None
    }

    /// The first visible `options` field whose value is not one of its
    /// declared options, with the offending value.
    ///
    /// Empty values are left to [`Self::first_missing_required`]. Nested
    /// options are only checked once they have been added.
    pub fn first_invalid_option(&self) -> Option<(&'a FieldName, &str)> {
        for field in &self.visible {
            let Some(value) = self.effective.get(field.name.as_str()) else {
                continue;
            };
            if let Some(text) = value.as_text() {
                if !field.admits(text) {
                    return Some((&field.name, text));
                }
                continue;
            }
            let Some(collection) = value.as_collection() else {
                continue;
            };
            for child in &field.nested {
                let Some(text) = collection.get(child.name.as_str()).and_then(FieldValue::as_text) else {
                    continue;
                };
                if !child.admits(text) {
                    return Some((&child.name, text));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![
            FieldDefinition::options(
                RESOURCE_FIELD,
                "Resource",
                vec![FieldOption::new("A", "a"), FieldOption::new("B", "b")],
                "a",
            ),
            FieldDefinition::string("onlyB", "Only B").shown_when(RESOURCE_FIELD, &["b"]),
            FieldDefinition::string("afterOnlyB", "After").shown_when("onlyB", &["yes"]),
            FieldDefinition::collection(
                "extra",
                "Extra",
                vec![FieldDefinition::date_time("when", "When")],
            )
            .shown_when(RESOURCE_FIELD, &["a"]),
        ])
    }

    fn names(fields: &[&FieldDefinition]) -> Vec<String> {
        fields.iter().map(|f| f.name.to_string()).collect()
    }

    #[test]
    fn test_default_selection_drives_visibility() {
        let schema = schema();
        let visible = schema.visible_fields(&FieldValues::new());
        assert_eq!(names(&visible), vec!["resource", "extra"]);
    }

    #[test]
    fn test_predicates_chain_through_previous_fields() {
        let schema = schema();
        let values = FieldValues::new()
            .with(RESOURCE_FIELD, "b")
            .with("onlyB", "yes");
        let visible = schema.visible_fields(&values);
        assert_eq!(names(&visible), vec!["resource", "onlyB", "afterOnlyB"]);
    }

    #[test]
    fn test_hidden_field_does_not_satisfy_later_predicates() {
        let schema = schema();
        // onlyB holds a matching value but is hidden under resource "a".
        let values = FieldValues::new().with("onlyB", "yes");
        let snapshot = schema.evaluate(&values);
        assert!(!snapshot.is_visible("onlyB"));
        assert!(!snapshot.is_visible("afterOnlyB"));
    }

    #[test]
    fn test_lookup_absent_nested_option_is_none() {
        let schema = schema();
        let snapshot = schema.evaluate(&FieldValues::new());
        assert!(snapshot.lookup(&FieldPath::nested("extra", "when")).is_none());

        let values = FieldValues::new().with(
            "extra",
            FieldValues::new().with("when", "2024-01-01"),
        );
        let snapshot = schema.evaluate(&values);
        let (definition, value) = snapshot.lookup(&FieldPath::nested("extra", "when")).unwrap();
        assert_eq!(definition.display_type, DisplayType::DateTime);
        assert_eq!(value, &FieldValue::text("2024-01-01"));
    }

    #[test]
    fn test_first_missing_required() {
        let schema = FieldSchema::new(vec![
            FieldDefinition::date_time("date", "Date").required(),
        ]);
        let snapshot = schema.evaluate(&FieldValues::new());
        assert_eq!(snapshot.first_missing_required().map(FieldName::as_str), Some("date"));

        let values = FieldValues::new().with("date", "2024-01-01");
        assert!(schema.evaluate(&values).first_missing_required().is_none());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let schema = FieldSchema::new(vec![
            FieldDefinition::string("x", "X"),
            FieldDefinition::collection("c", "C", vec![FieldDefinition::string("x", "X")]),
        ]);
        assert!(matches!(
            schema.validate(),
            Err(NodeError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_default_outside_options() {
        let schema = FieldSchema::new(vec![FieldDefinition::options(
            "rover",
            "Rover",
            vec![FieldOption::new("Spirit", "spirit")],
            "sojourner",
        )]);
        assert!(schema.validate().is_err());
        assert!(self::schema().validate().is_ok());
    }

    #[test]
    fn test_first_invalid_option() {
        let schema = schema();
        let values = FieldValues::new().with(RESOURCE_FIELD, "c");
        assert_eq!(
            schema.evaluate(&values).first_invalid_option(),
            Some((&FieldName::trusted(RESOURCE_FIELD), "c"))
        );

        let values = FieldValues::new().with(RESOURCE_FIELD, "b").with("onlyB", "anything");
        assert!(schema.evaluate(&values).first_invalid_option().is_none());
        assert!(schema.evaluate(&FieldValues::new()).first_invalid_option().is_none());
    }

    #[test]
    fn test_field_path_display() {
        assert_eq!(FieldPath::top("roverName").to_string(), "roverName");
        assert_eq!(
            FieldPath::nested("additionalFields", "apodDate").to_string(),
            "additionalFields.apodDate"
        );
    }
}
