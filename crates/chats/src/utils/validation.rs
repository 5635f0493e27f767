//! Validation utilities.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::errors::EMPTY_MESSAGE;
use crate::types::{ChatError, ChatResult, UserId};

const MAX_NAME_LENGTH: usize = 255;
const MAX_LABEL_LENGTH: usize = 50;
const MAX_SUBJECT_LENGTH: usize = 1000;

fn label_pattern() -> Result<&'static Regex, regex::Error> {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = LABEL.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(r"^[-a-zA-Z0-9_]+$")?;
    Ok(LABEL.get_or_init(|| pattern))
}

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Trimmed room name.
    pub fn room_name(name: &str) -> ChatResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::validation("Room name is required."));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ChatError::validation(format!(
                "Room name too long (max {MAX_NAME_LENGTH} characters)."
            )));
        }
        Ok(name.to_string())
    }

    /// Trimmed label; letters, digits, hyphens and underscores only.
    pub fn label(label: &str) -> ChatResult<String> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ChatError::validation("Room label is required."));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(ChatError::validation(format!(
                "Room label too long (max {MAX_LABEL_LENGTH} characters)."
            )));
        }

        let slug = label_pattern()
            .map_err(|e| ChatError::internal(format!("failed to compile label pattern: {e}")))?;
        if !slug.is_match(label) {
            return Err(ChatError::validation(
                "Enter a valid label consisting of letters, numbers, underscores or hyphens.",
            ));
        }
        Ok(label.to_string())
    }

    pub fn message_body(body: &str) -> ChatResult<()> {
        if body.trim().is_empty() {
            return Err(ChatError::validation(EMPTY_MESSAGE));
        }
        Ok(())
    }

    /// Blank subjects collapse to `None`.
    pub fn subject(subject: Option<String>) -> ChatResult<Option<String>> {
        let Some(subject) = subject else {
            return Ok(None);
        };
        let subject = subject.trim();
        if subject.is_empty() {
            return Ok(None);
        }
        if subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(ChatError::validation(format!(
                "Subject too long (max {MAX_SUBJECT_LENGTH} characters)."
            )));
        }
        Ok(Some(subject.to_string()))
    }

    pub fn user_list(user_ids: &[UserId]) -> ChatResult<()> {
        if user_ids.is_empty() {
            return Err(ChatError::validation("The users list must not be empty."));
        }
        Ok(())
    }
}

/// Drop repeated ids, keeping the first occurrence of each.
pub fn dedup_preserving_order(ids: &[UserId]) -> Vec<UserId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
