use std::sync::OnceLock;

use regex::Regex;

/// Separators that usually precede volatile title content, in priority order.
const SEPARATORS: [&str; 5] = [" — ", " - ", " | ", " – ", " : "];

/// A first part shorter than this is treated as an app-name prefix.
const SHORT_PREFIX_CHARS: usize = 20;

static DIMENSION_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn dimension_suffix() -> &'static Regex {
    DIMENSION_SUFFIX.get_or_init(|| Regex::new(r"\s+\d+×\d+$").expect("valid dimension regex"))
}

/// Derive the stable part of a window title.
///
/// Strips terminal-style `194×53` dimension suffixes, then cuts the title at the
/// first separator that occurs in it. When the leading part is short (usually an
/// app name like "Mail"), the following part is kept too.
///
/// The result is a fixed point: `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn normalize_once(title: &str) -> String {
    let mut result = strip_dimension_suffix(title).to_string();

    for sep in SEPARATORS {
        if !result.contains(sep) {
            continue;
        }
        let parts: Vec<&str> = result.split(sep).collect();
        result = if parts[0].chars().count() < SHORT_PREFIX_CHARS {
            parts[..2].join(sep)
        } else {
            parts[0].to_string()
        };
        break;
    }

    result.trim().to_string()
}

fn strip_dimension_suffix(title: &str) -> &str {
    let Some(m) = dimension_suffix().find(title) else {
        return title;
    };

    // "Terminal — bash — 194×53" leaves "Terminal — bash —"; drop the dangling stem too.
    let mut head = title[..m.start()].trim_end();
    for sep in SEPARATORS {
        let stem = sep.trim_end();
        if let Some(stripped) = head.strip_suffix(stem) {
            head = stripped.trim_end();
            break;
        }
    }
    head
}
