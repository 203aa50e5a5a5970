//! Package resolution.
//!
//! # Modules
//!
//! - [`fetch`] - Shallow git fetch and the [`fetch::SourceFetcher`] seam
//! - [`remote`] - Remote resolver: identifier, directories, fetch-if-absent
//! - [`local`] - Local registrar: descriptor check, registration, subprojects

pub mod fetch;
pub mod local;
pub mod remote;

pub use fetch::{FetchError, GitFetcher, SourceFetcher};
pub use local::{LocalRegistrar, RegisterError, Subproject, Subprojects};
pub use remote::{RemoteResolver, ResolveError};
