//! Display title for a normalized trace.
//!
//! Priority:
//! 1. `metadata.title` of any message (first one wins, used verbatim)
//! 2. First user message, cut to 64 characters
//! 3. "Trace"

use crate::text::{text_from_content, truncate_chars};
use crate::trace::{Role, UniformMessage};

pub const DEFAULT_TITLE: &str = "Trace";
const MAX_TITLE_CHARS: usize = 64;

pub fn guess_title(messages: &[UniformMessage]) -> String {
    if let Some(title) = messages.iter().find_map(UniformMessage::metadata_title) {
        return title.to_string();
    }

    let Some(first_user) = messages.iter().find(|m| m.has_role(&Role::User)) else {
        return DEFAULT_TITLE.to_string();
    };

    let text = text_from_content(&first_user.content);
    let title = truncate_chars(&text, MAX_TITLE_CHARS);
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}
