//! Best-effort enrichment of raw schema errors.
//!
//! Validator messages are terse and point at XML lines. This module adds a
//! human hint for recurring violation patterns and guesses the element path
//! by scanning the submitted XML text up to the reported line. The path is
//! a text-level heuristic; structural validation paths are the exact ones.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

struct Pattern {
    matches: fn(&str) -> bool,
    hint: &'static str,
}

// Checked in order; the first match wins.
const PATTERNS: &[Pattern] = &[
    Pattern {
        matches: |m| m.contains("preferredname"),
        hint: "IEC 61360 content needs a preferred name in at least one language; add a preferredName entry.",
    },
    Pattern {
        matches: |m| m.contains("keys") || m.contains("'key'"),
        hint: "A reference has no keys; set the reference target or remove the reference.",
    },
    Pattern {
        matches: |m| {
            m.contains("conceptdescription")
                || m.contains("embeddeddataspecification")
                || m.contains("dataspecificationcontent")
        },
        hint: "A concept description is missing its IEC 61360 content; add names, unit or data type, or remove the semanticId.",
    },
    Pattern {
        matches: |m| m.contains("contenttype"),
        hint: "A file or blob is missing its content type; set a MIME type such as application/pdf.",
    },
    Pattern {
        matches: |m| {
            m.contains("value")
                && (m.contains("minlength") || m.contains("length of '0'") || m.contains("empty"))
        },
        hint: "A required value is empty; fill in the value or mark the element optional.",
    },
    Pattern {
        matches: |m| m.contains("not expected") || m.contains("expected is"),
        hint: "Elements appear out of order or in the wrong place for this element type.",
    },
];

/// Hint for a known violation pattern, if any.
#[must_use]
pub fn hint_for(message: &str) -> Option<&'static str> {
    let lowered = message.to_lowercase();
    PATTERNS
        .iter()
        .find(|p| (p.matches)(&lowered))
        .map(|p| p.hint)
}

/// Collapse runs of whitespace so near-identical messages compare equal.
#[must_use]
pub fn normalize_message(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop repeated messages, keeping the first occurrence of each.
pub fn dedup_by_message<T>(items: Vec<T>, message: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(normalize_message(message(item))))
        .collect()
}

/// Line number mentioned inside a message such as `"... at line 12"`.
#[must_use]
pub fn line_in_message(message: &str) -> Option<u32> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let re = LINE.get_or_init(|| Regex::new(r"(?i)\bline[:\s]+(\d+)").expect("valid line regex"));
    re.captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

struct Frame<'a> {
    tag: &'a str,
    id_short: Option<&'a str>,
}

/// Guess the idShort path of the element enclosing `line` (1-based).
///
/// Tags are tracked up to the end of that line; each open element that has
/// already shown its `idShort` contributes one segment.
#[must_use]
pub fn path_for_line(xml: &str, line: u32) -> Vec<String> {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let re = TAG.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z_][\w.:-]*)[^>]*?(/?)>").expect("valid tag regex")
    });

    let end = xml
        .match_indices('\n')
        .nth(line.saturating_sub(1) as usize)
        .map_or(xml.len(), |(i, _)| i);
    let prefix = &xml[..end];

    let mut stack: Vec<Frame<'_>> = Vec::new();
    for caps in re.captures_iter(prefix) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
        let tag = local_name(name.as_str());

        if tag == "idShort" {
            if !closing && !self_closing {
                let text = prefix[whole.end()..].split('<').next().unwrap_or("").trim();
                if let Some(top) = stack.last_mut() {
                    if top.id_short.is_none() && !text.is_empty() {
                        top.id_short = Some(text);
                    }
                }
            }
            continue;
        }

        if closing {
            if let Some(pos) = stack.iter().rposition(|f| f.tag == tag) {
                stack.truncate(pos);
            }
        } else if !self_closing {
            stack.push(Frame { tag, id_short: None });
        }
    }

    stack
        .iter()
        .filter_map(|f| f.id_short.map(str::to_string))
        .collect()
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
