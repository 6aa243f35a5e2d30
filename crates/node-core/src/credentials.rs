//! Credential records, the read-only credential port, and query-string injection.
//!
//! The host owns credential storage. This crate only sees a [`CredentialRecord`]
//! handed out by a [`CredentialSource`] at request-build time, and never logs
//! or persists the value.

use serde::{Deserialize, Serialize};

use crate::{FieldName, NodeError, RequestDescriptor};

/// Query parameter the API key is sent in.
pub const API_KEY_PARAM: &str = "api_key";

/// The credential values a node receives from the host.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    api_key: String,
}

impl CredentialRecord {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// The raw key. Callers must not log it.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Read-only access to the credential a node was configured with.
///
/// Implemented by the host. Tests use [`StaticCredential`].
pub trait CredentialSource: Send + Sync {
    fn get_credential(&self) -> Result<CredentialRecord, NodeError>;
}

/// A [`CredentialSource`] that always returns the same record.
#[derive(Debug, Clone)]
pub struct StaticCredential(CredentialRecord);

impl StaticCredential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self(CredentialRecord::new(api_key))
    }
}

impl CredentialSource for StaticCredential {
    fn get_credential(&self) -> Result<CredentialRecord, NodeError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Injection
// ---------------------------------------------------------------------------

/// "Generic" authentication: copy one credential field into one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStringAuth {
    /// Query parameter to set.
    pub param: String,
    /// Credential field whose value is copied.
    pub credential_field: FieldName,
}

impl QueryStringAuth {
    /// `api_key=<apiKey>`.
    pub fn api_key() -> Self {
        Self {
            param: API_KEY_PARAM.to_owned(),
            credential_field: FieldName::trusted("apiKey"),
        }
    }

    /// Returns a copy of `descriptor` carrying the credential.
    ///
    /// Unconditionally overwrites any parameter of the same name.
    pub fn apply(&self, descriptor: &RequestDescriptor, credential: &CredentialRecord) -> RequestDescriptor {
        descriptor.with_query_param(&self.param, credential.api_key())
    }
}

/// Appends `api_key` to `descriptor`, replacing any value already present.
pub fn inject(descriptor: &RequestDescriptor, credential: &CredentialRecord) -> RequestDescriptor {
    QueryStringAuth::api_key().apply(descriptor, credential)
}
