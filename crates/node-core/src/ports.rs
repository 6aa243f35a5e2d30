//! Port traits implemented outside this crate.
//!
//! The core defines *what* a host needs from a node and from an HTTP client;
//! the `nodes` and `dispatch` crates supply the *how*.

use async_trait::async_trait;
use serde_json::Value;

use crate::{DispatchError, Item, NodeTypeDescription, RequestDescriptor};

/// Sends a fully-resolved request and returns the decoded JSON body.
///
/// Implementations must not retry; they classify failures through
/// [`DispatchError::retry_policy`] and leave the decision to the host.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value, DispatchError>;
}

/// A node that transforms items directly instead of describing a request.
///
/// `execute` is total: every input item produces exactly one output item, in
/// input order.
pub trait ProgrammaticNode: Send + Sync {
    fn description(&self) -> &NodeTypeDescription;

    fn execute(&self, items: &[Item]) -> Vec<Item>;
}
