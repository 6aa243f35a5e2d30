//! Typed names for the pieces of a node description.
//!
//! Field names, resource keys, and operation keys all travel as plain JSON
//! strings, but mixing them up is always a bug. Each gets its own newtype so
//! the compiler catches a [`ResourceKey`] passed where an [`OperationKey`]
//! belongs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a non-empty, string-backed name type that serialises as a bare
/// JSON string and can be looked up by `&str` in maps keyed by it.
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Returns `None` for an empty name.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Wraps a name from a static table. Emptiness is caught by
            /// schema and catalog validation rather than here.
            pub(crate) fn trusted(value: &str) -> Self {
                Self(value.to_owned())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Identifies one execution of a node step (one `resolve` or one `execute`).
///
/// Generated fresh per call and recorded on tracing spans so all events from a
/// single step can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Generates a new random execution identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

string_id! {
    /// Internal name of a user-configurable field (e.g. `"roverName"`).
    ///
    /// Unique within a node's schema, including nested collection options.
    FieldName
}

string_id! {
    /// Key of a top-level resource a node can fetch (e.g. `"marsRoverPhotos"`).
    ResourceKey
}

string_id! {
    /// Key of an operation available under a resource (e.g. `"get"`).
    OperationKey
}

string_id! {
    /// Internal name of a node type as registered with the host (e.g. `"NasaPics"`).
    NodeTypeName
}

string_id! {
    /// Internal name of a credential type (e.g. `"NasaPicsApi"`).
    CredentialTypeName
}
