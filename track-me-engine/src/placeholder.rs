//! Placeholder expansion for labels
//!
//! Labels may contain `{{token}}` placeholders that are filled from the
//! engine's placeholder map at dispatch time. Substitution happens in a
//! single pass, so a substituted value is never scanned again.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("Invalid placeholder regex pattern"));

/// Replace every `{{token}}` with its mapped value, or with nothing if unmapped
pub fn expand(text: &str, placeholders: &HashMap<String, String>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(text, |caps: &Captures| {
            placeholders.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
