//! Centralized key and path helpers.

use std::path::{Component, Path};

/// Separator between the resource type name and the api version in index keys
pub const KEY_SEPARATOR: char = '@';

/// Security-related limit for chunk paths read from an index
pub const MAX_RELATIVE_PATH_LENGTH: usize = 1024;

/// Build the display form of an index key, `"{resource_type}@{api_version}"`.
///
/// # Examples
///
/// ```
/// use bicep_types::utils::validation::type_key;
///
/// assert_eq!(type_key("Foo.Bar/baz", "2021-01-01"), "Foo.Bar/baz@2021-01-01");
/// ```
#[must_use]
pub fn type_key(resource_type: &str, api_version: &str) -> String {
    format!("{resource_type}{KEY_SEPARATOR}{api_version}")
}

/// Case-folded form of a key, used for every lookup
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// Express `path` relative to `base_dir` with forward slashes, lower-cased.
///
/// Returns `None` if `path` is not below `base_dir` or contains anything other
/// than plain components.
///
/// # Examples
///
/// ```
/// use bicep_types::utils::validation::normalize_relative_path;
/// use std::path::Path;
///
/// let relative = normalize_relative_path(
///     Path::new("/out"),
///     Path::new("/out/Microsoft.Storage/2021-01-01/types.json"),
/// );
/// assert_eq!(relative.as_deref(), Some("microsoft.storage/2021-01-01/types.json"));
/// ```
#[must_use]
pub fn normalize_relative_path(base_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base_dir).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?.to_lowercase()),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty chunk path provided")]
    EmptyPath,
    #[error("Chunk path too long: exceeds {MAX_RELATIVE_PATH_LENGTH} characters")]
    PathTooLong,
    #[error("Invalid chunk path `{0}`: contains path traversal or invalid characters")]
    InvalidPath(String),
}

/// Validate a relative chunk path taken from an index before it is joined
/// onto a base directory.
///
/// Rejects absolute paths, backslashes, `.`/`..` segments, empty segments,
/// and control characters.
///
/// # Errors
///
/// Returns `ValidationError::EmptyPath` if the path is empty,
/// `ValidationError::PathTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidPath` otherwise.
pub fn validate_relative_path(path: &str) -> Result<&str, ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    if path.len() > MAX_RELATIVE_PATH_LENGTH {
        return Err(ValidationError::PathTooLong);
    }

    let invalid = || ValidationError::InvalidPath(path.to_string());

    if path.contains('\\') || path.chars().any(char::is_control) {
        return Err(invalid());
    }

    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains(':') {
            return Err(invalid());
        }
    }

    Ok(path)
}
