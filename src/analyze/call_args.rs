//! Extracting the argument list of a method call from C# source text
//!
//! This is not a parser. It walks from an opening parenthesis to its match,
//! splitting on top-level commas while stepping over string literals,
//! character literals and comments, which is enough for the builder calls
//! that migrations consist of.

use std::sync::LazyLock;

use regex::Regex;

static NAMED_ARGUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^@?([A-Za-z_]\w*)\s*:([^:].*)$").expect("valid named argument regex")
});

static NAMEOF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^nameof\s*\(\s*([\w.]+)\s*\)$").expect("valid nameof regex")
});

/// One argument of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Parameter name for `name: value` arguments
    pub name: Option<String>,
    /// Argument expression text, comments removed and trimmed
    pub value: String,
}

/// Split the argument block that opens at byte `open` (which must be `(`).
///
/// Returns the arguments and the offset just past the closing parenthesis,
/// or `None` when the parenthesis never closes.
pub fn parse_arguments(text: &str, open: usize) -> Option<(Vec<Argument>, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut i = open + 1;
    let mut segment_start = i;

    // Copy `text[segment_start..i]` into `current`
    let flush = |current: &mut String, from: usize, to: usize| {
        current.push_str(&text[from..to]);
    };

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let verbatim = bytes[i] == b'"' && i > 0 && matches!(bytes[i - 1], b'@');
                let verbatim = verbatim
                    || (bytes[i] == b'"'
                        && i > 1
                        && matches!(&bytes[i - 2..i], b"$@" | b"@$"));
                i = skip_literal(bytes, i, verbatim);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                flush(&mut current, segment_start, i);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                segment_start = i;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                flush(&mut current, segment_start, i);
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                segment_start = i;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' if depth == 0 => {
                flush(&mut current, segment_start, i);
                push_argument(&mut args, &current);
                return Some((args, i + 1));
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                flush(&mut current, segment_start, i);
                push_argument(&mut args, &current);
                current.clear();
                segment_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Index just past the literal that opens at `start`
fn skip_literal(bytes: &[u8], start: usize, verbatim: bool) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if verbatim {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                return i + 1;
            }
        } else if b == b'\\' {
            i += 2;
            continue;
        } else if b == quote || b == b'\n' {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn push_argument(args: &mut Vec<Argument>, raw: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    match NAMED_ARGUMENT.captures(raw) {
        Some(caps) => args.push(Argument {
            name: Some(caps[1].to_string()),
            value: caps[2].trim().to_string(),
        }),
        None => args.push(Argument {
            name: None,
            value: raw.to_string(),
        }),
    }
}

/// Resolve arguments against a method's parameter order.
///
/// Positional arguments fill parameters in order; named ones go to their
/// parameter. Returns one slot per parameter.
pub fn bind<'a>(args: &'a [Argument], parameters: &[&str]) -> Vec<Option<&'a str>> {
    let mut slots: Vec<Option<&str>> = vec![None; parameters.len()];
    let mut next_positional = 0;
    for arg in args {
        match &arg.name {
            Some(name) => {
                if let Some(idx) = parameters.iter().position(|p| *p == name.as_str()) {
                    slots[idx] = Some(arg.value.as_str());
                }
            }
            None => {
                if next_positional < slots.len() {
                    slots[next_positional] = Some(arg.value.as_str());
                }
                next_positional += 1;
            }
        }
    }
    slots
}

/// The plain value of a name-like argument.
///
/// String literals are unquoted and unescaped, `nameof(X.Y)` yields `Y`,
/// `null` yields nothing, and any other expression is returned as written.
pub fn literal_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "null" {
        return None;
    }
    if let Some(inner) = value
        .strip_prefix("@\"")
        .and_then(|v| v.strip_suffix('"'))
    {
        return Some(inner.replace("\"\"", "\""));
    }
    if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        return Some(inner.replace("\\\"", "\"").replace("\\\\", "\\"));
    }
    if let Some(caps) = NAMEOF.captures(value) {
        let path = &caps[1];
        return Some(path.rsplit('.').next().unwrap_or(path).to_string());
    }
    Some(value.to_string())
}
