//! Assertion engines over a generated file tree.
//!
//! All checks are literal: presence by exact relative path, containment by
//! exact case-sensitive substring. Nothing is normalised.
mod content;
mod files;
mod templates;

pub use content::content_mismatches;
pub use files::missing_files;
pub use templates::check_templates;

/// Required substrings absent from `text`, in declaration order.
fn missing_substrings(text: &str, needles: &[String]) -> Vec<String> {
    needles
        .iter()
        .filter(|needle| !text.contains(needle.as_str()))
        .cloned()
        .collect()
}
