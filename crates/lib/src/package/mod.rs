//! Package declarations and resolution results.
//!
//! - [`identifier`] - identifier validation and derivation from repository URLs
//! - [`types`] - declarations ([`PackageDecl`]) and results ([`ResolvedPackage`])

pub mod identifier;
mod types;

pub use identifier::{Identifier, IdentifierError, derive_identifier};
pub use types::*;
