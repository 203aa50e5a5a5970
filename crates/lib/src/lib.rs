//! srcdep-lib: package source resolution for builds.
//!
//! This crate acquires and registers the sources a build depends on:
//! - `RemoteResolver`: derives an identifier from a git URL and shallow-fetches
//!   the source into a deterministic directory when it is not present yet
//! - `LocalRegistrar`: validates that a local directory carries a build
//!   descriptor and registers (or incorporates) it as a package
//! - `Manifest`: a YAML list of package declarations driving both of the above
//! - `gather`: collects package metadata files into a cache folder

pub mod consts;
pub mod gather;
pub mod manifest;
pub mod package;
pub mod platform;
pub mod resolve;
pub mod roots;
pub mod sync;
