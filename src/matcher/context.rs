//! Context extraction around raw hits
//!
//! Pure functions of (text, hit): the window is taken from the original-case
//! text and bounded to a fixed number of characters on each side, with
//! ellipsis markers when truncated.

use super::RawHit;
use crate::domain::violations::Violation;

const ELLIPSIS: &str = "...";

/// Expand a raw hit into a full violation with its review context
pub fn extract(text: &str, hit: &RawHit, window_chars: usize) -> Violation {
    let window_start = step_back(text, hit.start, window_chars);
    let window_end = step_forward(text, hit.end, window_chars);

    let mut context = String::new();
    if window_start > 0 {
        context.push_str(ELLIPSIS);
    }
    context.push_str(&text[window_start..window_end]);
    if window_end < text.len() {
        context.push_str(ELLIPSIS);
    }

    Violation {
        category: hit.category,
        rule_id: hit.rule_id.clone(),
        description: hit.description.clone(),
        matched_text: hit.matched_text.clone(),
        context,
        char_offset: text[..hit.start].chars().count(),
        severity: hit.severity,
    }
}

/// Byte index `n` characters before `from`, clamped to the text start
fn step_back(text: &str, from: usize, n: usize) -> usize {
    let mut idx = from;
    for _ in 0..n {
        match text[..idx].chars().next_back() {
            Some(c) => idx -= c.len_utf8(),
            None => break,
        }
    }
    idx
}

/// Byte index `n` characters after `from`, clamped to the text end
fn step_forward(text: &str, from: usize, n: usize) -> usize {
    let mut idx = from;
    for _ in 0..n {
        match text[idx..].chars().next() {
            Some(c) => idx += c.len_utf8(),
            None => break,
        }
    }
    idx
}
