//! Core domain for declarative workflow nodes.
//!
//! This crate contains every domain concept used by the node implementations:
//! newtype identifiers, the field schema and its visibility rules, the
//! resource catalog and routing resolver, credential injection, and the port
//! traits the host-side adapters implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Resolution, injection and schema evaluation are pure functions over their
//! arguments; HTTP dispatch is behind [`RequestDispatcher`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`FieldName`, `ResourceKey`, `ExecutionId`, etc.) |
//! | [`types`] | Field values, items, date-time parsing |
//! | [`schema`] | Field definitions, visibility predicates, schema evaluation |
//! | [`template`] | `{field}` placeholder templates |
//! | [`request`] | The immutable [`RequestDescriptor`] |
//! | [`routing`] | Resource catalog and [`DeclarativeNode::resolve`] |
//! | [`credentials`] | Credential record, credential port, [`inject`] |
//! | [`description`] | Node and credential type metadata |
//! | [`ports`] | Dispatch and programmatic-node traits |
//! | [`errors`] | Error and retry-policy types |

pub mod credentials;
pub mod description;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod request;
pub mod routing;
pub mod schema;
pub mod template;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use credentials::{
    inject, CredentialRecord, CredentialSource, QueryStringAuth, StaticCredential, API_KEY_PARAM,
};
pub use description::{
    ConnectionType, CredentialRequirement, CredentialTypeDescription, NodeDefaults,
    NodeTypeDescription, RequestDefaults,
};
pub use errors::{DispatchError, NodeError, RetryPolicy};
pub use identifiers::{
    CredentialTypeName, ExecutionId, FieldName, NodeTypeName, OperationKey, ResourceKey,
};
pub use ports::{ProgrammaticNode, RequestDispatcher};
pub use request::{HttpMethod, RequestDescriptor};
pub use routing::{
    DeclarativeNode, QueryProjection, RequestTemplate, ResourceCatalog, ValueTransform,
};
pub use schema::{
    DisplayType, FieldDefinition, FieldOption, FieldPath, FieldSchema, SchemaSnapshot,
    VisibilityPredicate, OPERATION_FIELD, RESOURCE_FIELD,
};
pub use template::Template;
pub use types::{parse_date_time, utc_calendar_date, FieldValue, FieldValues, Item};
