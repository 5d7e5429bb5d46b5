//! Locating, extracting and replacing procedure bodies
//!
//! A region is the body of the first method whose signature line matches a
//! pattern. Boundaries come from [`scan_line`]: the region opens at the first
//! structural `{` at or after the signature and closes where depth returns to
//! zero. Absence is never an error; extraction returns an empty region and
//! replacement returns the input unchanged.

use regex::Regex;

use super::context::{scan_line, BraceKind, ScanState};
use crate::util::{leading_whitespace, INDENT};

/// The body of a named procedure inside a source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    /// Line index of the signature
    pub start: usize,
    /// Line index of the closing brace
    pub end: usize,
    /// Body text between the braces, trimmed
    pub text: String,
    /// Source indentation of the first body line, when it has a line of its own
    pub indent: Option<usize>,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Brace positions of a located procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    signature: usize,
    open_line: usize,
    open_offset: usize,
    close_line: usize,
    close_offset: usize,
}

/// Find the first signature line that starts in code context.
///
/// Carry-over state is tracked from the top of the file so that a signature
/// inside a block comment or verbatim string is not mistaken for real code.
fn find_signature<S: AsRef<str>>(lines: &[S], signature: &Regex) -> Option<usize> {
    let mut state = ScanState::Code;
    for (idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if state == ScanState::Code && signature.is_match(line) {
            let trimmed = line.trim_start();
            if !trimmed.starts_with("//") && !trimmed.starts_with('*') {
                return Some(idx);
            }
        }
        state = scan_line(line, state).state;
    }
    None
}

fn locate<S: AsRef<str>>(lines: &[S], signature: &Regex) -> Option<Bounds> {
    let start = find_signature(lines, signature)?;

    let mut state = ScanState::Code;
    let mut depth = 0i32;
    let mut open: Option<(usize, usize)> = None;

    for (idx, line) in lines.iter().enumerate().skip(start) {
        let scan = scan_line(line.as_ref(), state);
        state = scan.state;
        for brace in &scan.braces {
            match brace.kind {
                BraceKind::Open => {
                    if open.is_none() {
                        open = Some((idx, brace.offset));
                    }
                    depth += 1;
                }
                BraceKind::Close => {
                    let Some((open_line, open_offset)) = open else {
                        continue;
                    };
                    depth -= 1;
                    if depth == 0 {
                        return Some(Bounds {
                            signature: start,
                            open_line,
                            open_offset,
                            close_line: idx,
                            close_offset: brace.offset,
                        });
                    }
                }
            }
        }
    }

    None
}

/// Extract the body of the procedure whose signature matches `signature`
pub fn extract_region<S: AsRef<str>>(lines: &[S], signature: &Regex) -> Region {
    let Some(bounds) = locate(lines, signature) else {
        return Region::default();
    };

    let text = if bounds.open_line == bounds.close_line {
        lines[bounds.open_line].as_ref()[bounds.open_offset + 1..bounds.close_offset].to_string()
    } else {
        let mut parts: Vec<&str> = Vec::new();
        parts.push(&lines[bounds.open_line].as_ref()[bounds.open_offset + 1..]);
        for line in &lines[bounds.open_line + 1..bounds.close_line] {
            parts.push(line.as_ref());
        }
        parts.push(&lines[bounds.close_line].as_ref()[..bounds.close_offset]);
        parts.join("\n")
    };

    Region {
        start: bounds.signature,
        end: bounds.close_line,
        text: text.trim().to_string(),
        indent: first_line_indent(lines, &bounds),
    }
}

fn first_line_indent<S: AsRef<str>>(lines: &[S], bounds: &Bounds) -> Option<usize> {
    let open = lines[bounds.open_line].as_ref();
    if bounds.open_line == bounds.close_line
        || !open[bounds.open_offset + 1..].trim().is_empty()
    {
        return None;
    }
    lines[bounds.open_line + 1..bounds.close_line]
        .iter()
        .map(|l| l.as_ref())
        .find(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l).len())
}

/// Replace the body of the procedure matching `signature` with `new_body`.
///
/// The new body is indented one level deeper than the signature line. Lines
/// that begin inside a verbatim string are copied untouched.
pub fn replace_region<S: AsRef<str>>(lines: &[S], signature: &Regex, new_body: &str) -> Vec<String> {
    let owned = || -> Vec<String> { lines.iter().map(|l| l.as_ref().to_string()).collect() };
    let Some(bounds) = locate(lines, signature) else {
        return owned();
    };

    let signature_line = lines[bounds.signature].as_ref();
    let indent = leading_whitespace(signature_line).to_string();

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    out.extend(lines[..bounds.signature].iter().map(|l| l.as_ref().to_string()));

    for line in &lines[bounds.signature..bounds.open_line] {
        out.push(line.as_ref().trim_end().to_string());
    }
    let before_brace = lines[bounds.open_line].as_ref()[..bounds.open_offset].trim_end();
    if before_brace.trim().is_empty() {
        out.push(format!("{}{{", indent));
    } else {
        out.push(format!("{} {{", before_brace));
    }

    let body_indent = format!("{}{}", indent, INDENT);
    out.extend(indent_block(new_body, &body_indent));

    let after_brace = lines[bounds.close_line].as_ref()[bounds.close_offset + 1..].trim_end();
    out.push(format!("{}}}{}", indent, after_brace));

    out.extend(lines[bounds.close_line + 1..].iter().map(|l| l.as_ref().to_string()));
    out
}

/// Prefix every line of `text` with `indent`.
///
/// Blank lines stay empty; lines that start inside a verbatim string keep
/// their exact content.
pub fn indent_block(text: &str, indent: &str) -> Vec<String> {
    let mut state = ScanState::Code;
    let mut out = Vec::new();
    for line in text.lines() {
        let starts_in_verbatim = state == ScanState::VerbatimString;
        state = scan_line(line, state).state;
        if starts_in_verbatim {
            out.push(line.to_string());
        } else if line.trim().is_empty() {
            out.push(String::new());
        } else {
            out.push(format!("{}{}", indent, line.trim_end()));
        }
    }
    out
}

/// Strip the indentation common to the body lines of a region.
///
/// Region text is trimmed as a whole, so its first line has already lost its
/// indentation; `first_indent` is what that line had in the source. Lines
/// that start inside a verbatim string are neither measured nor changed.
pub fn dedent_region(text: &str, first_indent: Option<usize>) -> Vec<String> {
    let mut state = ScanState::Code;
    let mut lines: Vec<(&str, bool)> = Vec::new();
    for line in text.lines() {
        let in_verbatim = state == ScanState::VerbatimString;
        state = scan_line(line, state).state;
        lines.push((line, in_verbatim));
    }

    let common = lines
        .iter()
        .skip(1)
        .filter(|(line, in_verbatim)| !in_verbatim && !line.trim().is_empty())
        .map(|(line, _)| leading_whitespace(line).len())
        .chain(first_indent)
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .enumerate()
        .map(|(idx, (line, in_verbatim))| {
            if *in_verbatim {
                line.to_string()
            } else if line.trim().is_empty() {
                String::new()
            } else if idx == 0 {
                line.trim_end().to_string()
            } else {
                let cut = common.min(leading_whitespace(line).len());
                line[cut..].trim_end().to_string()
            }
        })
        .collect()
}
