//! Checks applied to free-text messages before they reach the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::InputError;

pub const MIN_MESSAGE_CHARS: usize = 10;
pub const MAX_MESSAGE_CHARS: usize = 5000;

static FORBIDDEN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<script.*?>.*?</script>",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const MEDICAL_KEYWORDS: &[&str] = &[
    "medicine", "medication", "doctor", "hospital", "clinic", "treatment", "diagnosis",
    "symptom", "patient", "health", "medical", "prescription", "dose", "therapy", "surgery",
    "illness", "disease", "recovery", "pain", "fever", "infection", "vaccine", "checkup",
];

/// Validate a message and return it trimmed.
pub fn validate_message(message: &str) -> Result<&str, InputError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(InputError::EmptyInput);
    }

    let chars = message.chars().count();
    if chars < MIN_MESSAGE_CHARS {
        return Err(InputError::InvalidMessage(format!(
            "message must be at least {MIN_MESSAGE_CHARS} characters long"
        )));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(InputError::InvalidMessage(format!(
            "message must not exceed {MAX_MESSAGE_CHARS} characters"
        )));
    }

    if FORBIDDEN.iter().any(|re| re.is_match(message)) {
        return Err(InputError::InvalidMessage(
            "message contains potentially harmful content".to_string(),
        ));
    }

    if !looks_medical(message) {
        debug!(chars, "message has no medical keywords");
    }

    Ok(message)
}

/// Advisory keyword check; never rejects.
pub fn looks_medical(message: &str) -> bool {
    let lower = message.to_lowercase();
    MEDICAL_KEYWORDS.iter().any(|k| lower.contains(k))
}
