use crate::config::TextLimits;
use crate::error::Error;

/// Checks the trimmed character count of `text` against `limits`.
pub fn validate_text_length(text: &str, limits: &TextLimits) -> Result<(), Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("Text cannot be empty".into()));
    }

    let len = text.chars().count();
    if len < limits.min_length {
        return Err(Error::Validation(format!(
            "Text must be at least {} characters",
            limits.min_length
        )));
    }
    if len > limits.max_length {
        return Err(Error::Validation(format!(
            "Text cannot exceed {} characters",
            limits.max_length
        )));
    }

    Ok(())
}
