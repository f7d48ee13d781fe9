//! Raw template text cleaning that runs before tokenizing.

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\{\{(\{?)-").expect("valid regex"));
static TRAILING_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-(\}?)\}\}\s*").expect("valid regex"));

/// Apply `{{- x -}}` whitespace control.
///
/// A `-` just inside the opening delimiter strips all whitespace before
/// the marker; one just inside the closing delimiter strips all whitespace
/// after it. The dashes themselves are removed.
pub fn clean_whitespace_control(template: &str) -> String {
    let template = LEADING_CONTROL.replace_all(template, "{{$1");
    TRAILING_CONTROL
        .replace_all(&template, "$1}}")
        .into_owned()
}

/// Remove lines that hold nothing but a standalone control marker.
///
/// A line whose only content is a single section, inverse, close, comment,
/// inline-template or `else` marker is replaced by the bare marker, so its
/// indentation and line break never reach the output.
pub fn clean_line_endings(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    for line in template.split_inclusive('\n') {
        let trimmed = line.trim();
        if is_standalone_marker(trimmed) {
            out.push_str(trimmed);
        } else {
            out.push_str(line);
        }
    }
    out
}

fn is_standalone_marker(text: &str) -> bool {
    if text.len() < 4 || !text.starts_with("{{") || !text.ends_with("}}") {
        return false;
    }
    if text.starts_with("{{{") {
        return false;
    }
    let inner = &text[2..text.len() - 2];
    if inner.contains("{{") || inner.contains("}}") {
        return false;
    }
    let inner = inner.trim();
    inner == "else"
        || inner
            .chars()
            .next()
            .is_some_and(|c| matches!(c, '#' | '^' | '/' | '!' | '<'))
}
