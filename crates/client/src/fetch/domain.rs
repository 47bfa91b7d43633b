//! Domain normalization for consistent caching and coalescing.

/// Error type for domain normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("empty domain")]
    Empty,

    #[error("invalid domain: {0}")]
    Invalid(String),
}

/// Normalize a domain for use as a cache and coalescing key.
///
/// Steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase
/// 3. Strip a single trailing dot (FQDN form)
///
/// Normalization is total: validation is separate so that cache keys can
/// be derived from any input the parser let through.
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim().to_ascii_lowercase();
    trimmed.strip_suffix('.').unwrap_or(&trimmed).to_string()
}

/// Check that a normalized domain is plausibly fetchable.
///
/// Rejects empty strings, embedded schemes/paths/whitespace, and
/// single-label names. Not a full hostname validator; the HTTP client has
/// the final say.
pub fn validate_domain(domain: &str) -> Result<(), DomainError> {
    if domain.is_empty() {
        return Err(DomainError::Empty);
    }
    if domain.contains("://") || domain.contains('/') || domain.contains(char::is_whitespace) {
        return Err(DomainError::Invalid(domain.to_string()));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(DomainError::Invalid(domain.to_string()));
    }
    if !domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err(DomainError::Invalid(domain.to_string()));
    }
    Ok(())
}
