//! Static metadata the host uses to list and render node and credential types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    CredentialTypeName, FieldSchema, FieldValue, FieldValues, NodeTypeName, QueryStringAuth,
    Template,
};

/// Kind of connection a node exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionType {
    /// The default item stream between nodes.
    Main,
}

/// Values applied when the node is first dropped on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDefaults {
    pub name: String,
}

/// A credential type a node declares it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequirement {
    pub name: CredentialTypeName,
    pub required: bool,
}

/// Base URL and headers shared by every request a declarative node builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDefaults {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub headers: IndexMap<String, String>,
}

impl RequestDefaults {
    /// `base_url` with `Accept` and `Content-Type` both set to `application/json`.
    pub fn json_api(base_url: &str) -> Self {
        let mut headers = IndexMap::new();
        headers.insert("Accept".to_owned(), "application/json".to_owned());
        headers.insert("Content-Type".to_owned(), "application/json".to_owned());
        Self {
            base_url: base_url.to_owned(),
            headers,
        }
    }
}

/// Everything the host needs to know about a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDescription {
    pub display_name: String,
    pub name: NodeTypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub group: Vec<String>,
    pub version: u32,
    /// Rendered under the node name on the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Template>,
    pub description: String,
    pub defaults: NodeDefaults,
    pub inputs: Vec<ConnectionType>,
    pub outputs: Vec<ConnectionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialRequirement>,
    /// Present only on declarative nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_defaults: Option<RequestDefaults>,
    pub properties: FieldSchema,
}

impl NodeTypeDescription {
    /// A version-1 `transform` node with one main input and output.
    pub fn transform(name: &str, display_name: &str, description: &str, properties: FieldSchema) -> Self {
        Self {
            display_name: display_name.to_owned(),
            name: NodeTypeName::trusted(name),
            icon: None,
            group: vec!["transform".to_owned()],
            version: 1,
            subtitle: None,
            description: description.to_owned(),
            defaults: NodeDefaults {
                name: display_name.to_owned(),
            },
            inputs: vec![ConnectionType::Main],
            outputs: vec![ConnectionType::Main],
            credentials: Vec::new(),
            request_defaults: None,
            properties,
        }
    }

    /// Renders the subtitle against the effective values of `values`.
    ///
    /// Returns `None` when the node has no subtitle or a referenced field is
    /// hidden or empty.
    pub fn subtitle_for(&self, values: &FieldValues) -> Option<String> {
        let template = self.subtitle.as_ref()?;
        let snapshot = self.properties.evaluate(values);
        template
            .render(|name| {
                snapshot
                    .effective_value(name)
                    .and_then(FieldValue::as_text)
                    .map(str::to_owned)
            })
            .ok()
    }

    /// Returns `true` if the node declares `credential` as required.
    pub fn requires_credential(&self, credential: &str) -> bool {
        self.credentials
            .iter()
            .any(|c| c.required && c.name.as_str() == credential)
    }
}

/// Everything the host needs to know about a credential type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTypeDescription {
    pub name: CredentialTypeName,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    /// Fields the user fills in when creating the credential.
    pub properties: FieldSchema,
    /// How the credential is attached to outgoing requests.
    pub authenticate: QueryStringAuth,
}

impl CredentialTypeDescription {
    pub fn new(
        name: &str,
        display_name: &str,
        properties: FieldSchema,
        authenticate: QueryStringAuth,
    ) -> Self {
        Self {
            name: CredentialTypeName::trusted(name),
            display_name: display_name.to_owned(),
            documentation_url: None,
            properties,
            authenticate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDefinition, FieldOption};

    fn node() -> NodeTypeDescription {
        let mut node = NodeTypeDescription::transform(
            "demo",
            "Demo",
            "A demo node",
            FieldSchema::new(vec![
                FieldDefinition::options("resource", "Resource", vec![FieldOption::new("A", "a")], "a"),
                FieldDefinition::options("operation", "Operation", vec![FieldOption::new("Get", "get")], "get"),
            ]),
        );
        node.subtitle = Some(Template::new("{operation}: {resource}"));
        node
    }

    #[test]
    fn test_subtitle_uses_defaults() {
        assert_eq!(node().subtitle_for(&FieldValues::new()).as_deref(), Some("get: a"));
    }

    #[test]
    fn test_transform_defaults() {
        let node = node();
        assert_eq!(node.group, vec!["transform"]);
        assert_eq!(node.defaults.name, "Demo");
        assert!(!node.requires_credential("anything"));
    }

    #[test]
    fn test_request_defaults_serialise_with_host_key() {
        let json = serde_json::to_value(RequestDefaults::json_api("https://api.nasa.gov")).unwrap();
        assert_eq!(json["baseURL"], "https://api.nasa.gov");
        assert_eq!(json["headers"]["Accept"], "application/json");
    }
}
