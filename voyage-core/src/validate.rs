use crate::{CoreError, CoreResult};

/// Non-blank text no longer than `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> CoreResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationFailed(format!("{} is required", field)));
    }
    optional_text(field, Some(value), max)
}

pub(crate) fn optional_text(field: &str, value: Option<&str>, max: usize) -> CoreResult<()> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(CoreError::ValidationFailed(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// Blank optional strings are stored as NULL.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
