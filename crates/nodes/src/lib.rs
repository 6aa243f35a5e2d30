//! Node and credential type implementations.
//!
//! - [`nasa_pics`]: the declarative NASA Pics node (schema + resource catalog).
//! - [`credentials`]: the `NasaPicsApi` credential type it authenticates with.
//! - [`uppercase`]: the programmatic Uppercase Node.
//!
//! ## Architectural Layer
//!
//! **Node definitions.** Everything here is static data or a pure function
//! built on [`node_core`]. Nothing performs I/O.

pub mod credentials;
pub mod nasa_pics;
pub mod uppercase;

pub use nasa_pics::NasaPics;
pub use uppercase::UppercaseNode;
