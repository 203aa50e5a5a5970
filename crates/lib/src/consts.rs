/// Application name, used for default directory names.
pub const APP_NAME: &str = "srcdep";

/// Environment variable overriding where remote sources are materialized.
pub const REMOTE_SOURCE_ROOT_ENV: &str = "SRCDEP_REMOTE_SOURCE_ROOT";

/// Environment variable overriding where build outputs are written.
pub const BUILD_ROOT_ENV: &str = "SRCDEP_BUILD_ROOT";

/// Environment variable overriding where install outputs are written.
pub const INSTALL_ROOT_ENV: &str = "SRCDEP_INSTALL_ROOT";

/// Environment variable overriding the build descriptor file name.
pub const BUILD_DESCRIPTOR_ENV: &str = "SRCDEP_BUILD_DESCRIPTOR";

/// File a local source directory must contain to be accepted as a package.
pub const DEFAULT_BUILD_DESCRIPTOR: &str = "CMakeLists.txt";

/// Default manifest file name, looked up in the current directory.
pub const MANIFEST_FILENAME: &str = "packages.manifest.yaml";

/// Per-package metadata file collected by `gather`.
pub const PACKAGE_METADATA_FILENAME: &str = "package.yaml";
