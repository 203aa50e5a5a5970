//! Variable expansion for manifest paths.
//!
//! `${CUR_MANIFEST_FILE_DIR}` expands to the manifest's directory first. Then
//! `$NAME` and `${NAME}` expand from the environment; unknown variables are
//! left as written.

/// Placeholder for the directory containing the manifest.
pub const MANIFEST_DIR_VAR: &str = "${CUR_MANIFEST_FILE_DIR}";

/// Expand the manifest-dir placeholder and environment variables.
pub fn expand_vars(input: &str, manifest_dir: &str) -> String {
  expand_with(&input.replace(MANIFEST_DIR_VAR, manifest_dir), |name| {
    std::env::var(name).ok()
  })
}

/// Expand `$NAME` and `${NAME}` using `lookup`.
pub fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
  let mut out = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(pos) = rest.find('$') {
    out.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];

    let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
      match braced.find('}') {
        Some(end) => (&braced[..end], end + 2),
        None => ("", 0),
      }
    } else {
      let end = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(after.len());
      (&after[..end], end)
    };

    match (!name.is_empty()).then(|| lookup(name)).flatten() {
      Some(value) => out.push_str(&value),
      None => out.push_str(&rest[pos..pos + 1 + consumed]),
    }
    rest = &after[consumed..];
  }

  out.push_str(rest);
  out
}
