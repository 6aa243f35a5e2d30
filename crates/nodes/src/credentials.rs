//! The `NasaPicsApi` credential type.

use node_core::{CredentialTypeDescription, FieldDefinition, FieldSchema, QueryStringAuth};

pub const NASA_PICS_API: &str = "NasaPicsApi";

/// Credential type description: one `apiKey` field, sent as `?api_key=`.
pub fn description() -> CredentialTypeDescription {
    let mut description = CredentialTypeDescription::new(
        NASA_PICS_API,
        "NASA Pics API",
        FieldSchema::new(vec![FieldDefinition::string("apiKey", "API Key")]),
        QueryStringAuth::api_key(),
    );
    description.documentation_url = Some(
        "https://docs.n8n.io/integrations/creating-nodes/build/declarative-style-node/".to_owned(),
    );
    description
}
