use super::error::StorageError;

/// Reasons a blob name is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobNameError {
    /// Name is empty or whitespace-only.
    Empty,
    /// Name contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Name is `..`.
    PathTraversal,
    /// Name starts with a dot (hidden file).
    Hidden,
    /// Name contains control characters, including NUL, CR and LF.
    ControlCharacter,
    /// Name is longer than 1024 bytes.
    TooLong,
}

impl BlobNameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "File name cannot be empty",
            Self::ContainsPathSeparator => "Invalid file name: path separators are not allowed",
            Self::PathTraversal => "Invalid file name: '..' is not allowed",
            Self::Hidden => "Invalid file name: names starting with '.' are not allowed",
            Self::ControlCharacter => "Invalid file name: control characters are not allowed",
            Self::TooLong => "Invalid file name: longer than 1024 bytes",
        }
    }
}

impl From<BlobNameError> for StorageError {
    fn from(err: BlobNameError) -> Self {
        StorageError::InvalidName(err.message().to_string())
    }
}

/// Blob name for an uploaded file: the client file name with surrounding
/// quotes and whitespace removed.
pub fn blob_name_from_upload(file_name: &str) -> Result<&str, BlobNameError> {
    validate_blob_name(file_name.trim().trim_matches('"'))
}

/// Validates a flat blob name (no directory components allowed).
pub fn validate_blob_name(name: &str) -> Result<&str, BlobNameError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(BlobNameError::Empty);
    }

    if trimmed.len() > 1024 {
        return Err(BlobNameError::TooLong);
    }

    // Also keeps CRLF out of headers built from the name.
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(BlobNameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(BlobNameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(BlobNameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(BlobNameError::Hidden);
    }

    Ok(trimmed)
}

/// Validates a container name: 3-63 characters of lowercase letters, digits
/// and single hyphens, starting and ending with a letter or digit.
pub fn validate_container_name(name: &str) -> Result<&str, StorageError> {
    let invalid = |reason: &str| StorageError::InvalidName(format!("container '{name}': {reason}"));

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be 3-63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return Err(invalid("hyphens must separate letters or digits"));
    }
    Ok(name)
}
