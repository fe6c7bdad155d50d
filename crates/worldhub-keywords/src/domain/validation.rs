//! Keyword field rules.

use worldhub_core::error::DomainError;

/// Longest accepted keyword text, in characters.
pub const MAX_CONTENT_LEN: usize = 200;

/// Longest accepted category label, in characters.
pub const MAX_CATEGORY_LEN: usize = 64;

/// Most entries accepted by one bulk delete, reorder, or import.
pub const MAX_BATCH_LEN: usize = 1000;

/// Trims keyword text and checks it is non-empty and within bounds.
///
/// # Errors
///
/// Returns `DomainError::Validation` for empty or overlong text.
pub fn normalize_content(content: &str) -> Result<String, DomainError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::Validation("keyword content is empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(DomainError::Validation(format!(
            "keyword content exceeds {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(content.to_owned())
}

/// Trims a category label and checks its length. Empty is allowed.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an overlong label.
pub fn normalize_category(category: &str) -> Result<String, DomainError> {
    let category = category.trim();
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(DomainError::Validation(format!(
            "keyword category exceeds {MAX_CATEGORY_LEN} characters"
        )));
    }
    Ok(category.to_owned())
}

/// Checks the size of a batch.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty batch (unless
/// `allow_empty`) or one over [`MAX_BATCH_LEN`].
pub fn check_batch(len: usize, allow_empty: bool) -> Result<(), DomainError> {
    if len == 0 && !allow_empty {
        return Err(DomainError::Validation("batch is empty".into()));
    }
    if len > MAX_BATCH_LEN {
        return Err(DomainError::Validation(format!(
            "batch exceeds {MAX_BATCH_LEN} entries"
        )));
    }
    Ok(())
}
