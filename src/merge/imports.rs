//! Collecting, merging and placing `using` directives
//!
//! The merged set is inserted directly after the namespace declaration of the
//! primary migration, replacing whatever directives already sit there. Only
//! that block is rewritten: directives elsewhere in the file (typically the
//! file-global ones above the namespace) are left as they are, so the same
//! directive can end up both above and inside the namespace.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::util::{leading_whitespace, INDENT};

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:global\s+)?using\s+(?:static\s+)?(?:@?[A-Za-z_]\w*\s*=\s*)?@?[A-Za-z_][\w.]*(?:<[^;]*>)?\s*;\s*$",
    )
    .expect("valid using regex")
});

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*namespace\s+@?[A-Za-z_][\w.]*\s*(;|\{)?\s*(//.*)?$").expect("valid namespace regex")
});

/// Unique import declarations, ordered lexicographically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet(BTreeSet<String>);

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration; identity is the trimmed text, case-sensitive
    pub fn insert(&mut self, declaration: &str) -> bool {
        self.0.insert(declaration.trim().to_string())
    }

    pub fn merge(&mut self, other: &ImportSet) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Union of any number of sets
    pub fn merged<'a>(sets: impl IntoIterator<Item = &'a ImportSet>) -> ImportSet {
        let mut out = ImportSet::new();
        for set in sets {
            out.merge(set);
        }
        out
    }

    pub fn contains(&self, declaration: &str) -> bool {
        self.0.contains(declaration.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for ImportSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = ImportSet::new();
        for declaration in iter {
            set.insert(declaration);
        }
        set
    }
}

pub fn is_import(line: &str) -> bool {
    IMPORT.is_match(line)
}

/// Every import declaration in a file
pub fn collect_imports<S: AsRef<str>>(lines: &[S]) -> ImportSet {
    lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| is_import(l))
        .collect()
}

/// Where the merged block goes and how it is indented
struct Placement {
    insert_at: usize,
    indent: String,
    blank_before: bool,
}

fn find_placement<S: AsRef<str>>(lines: &[S]) -> Placement {
    let Some(ns_idx) = lines.iter().position(|l| NAMESPACE.is_match(l.as_ref())) else {
        // No namespace: the block at the first directive, or the top of the file
        let insert_at = lines.iter().position(|l| is_import(l.as_ref())).unwrap_or(0);
        return Placement {
            insert_at,
            indent: String::new(),
            blank_before: false,
        };
    };

    let ns_line = lines[ns_idx].as_ref();
    let ns_indent = leading_whitespace(ns_line);
    let terminator = NAMESPACE
        .captures(ns_line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    match terminator {
        Some(";") => Placement {
            insert_at: ns_idx + 1,
            indent: ns_indent.to_string(),
            blank_before: true,
        },
        Some(_) => Placement {
            insert_at: ns_idx + 1,
            indent: format!("{}{}", ns_indent, INDENT),
            blank_before: false,
        },
        None => {
            let brace = lines[ns_idx + 1..]
                .iter()
                .position(|l| l.as_ref().trim_start().starts_with('{'))
                .map(|offset| ns_idx + 1 + offset);
            Placement {
                insert_at: brace.map_or(ns_idx + 1, |b| b + 1),
                indent: format!("{}{}", ns_indent, INDENT),
                blank_before: false,
            }
        }
    }
}

/// Replace the directives right after the namespace declaration with `imports`
pub fn place_imports<S: AsRef<str>>(lines: &[S], imports: &ImportSet) -> Vec<String> {
    let owned: Vec<String> = lines.iter().map(|l| l.as_ref().to_string()).collect();
    if imports.is_empty() {
        return owned;
    }

    let placement = find_placement(&owned);

    let mut end = placement.insert_at;
    while end < owned.len() && (owned[end].trim().is_empty() || is_import(&owned[end])) {
        end += 1;
    }

    let mut out = Vec::with_capacity(owned.len() + imports.len() + 2);
    out.extend_from_slice(&owned[..placement.insert_at]);
    if placement.blank_before {
        out.push(String::new());
    }
    for declaration in imports.iter() {
        out.push(format!("{}{}", placement.indent, declaration));
    }
    if end < owned.len() {
        out.push(String::new());
    }
    out.extend_from_slice(&owned[end..]);
    out
}
