//! Cleaning up scripts produced by `dotnet ef migrations script`
//!
//! The generated script wraps the migration's own statements in bookkeeping
//! that only makes sense when the script is run standalone: transactions,
//! the schema preamble, creation of the history table and the rows recording
//! each applied migration. Once the statements are embedded back into a
//! migration, EF Core does that bookkeeping itself, so it is removed here.

use std::sync::LazyLock;

use regex::{Match, Regex};

use crate::util::contains_ci;

/// Name of the history table EF Core maintains by default
pub const DEFAULT_HISTORY_TABLE: &str = "__EFMigrationsHistory";

static TRANSACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:BEGIN[ \t]+TRANSACTION|START[ \t]+TRANSACTION|COMMIT)[ \t]*;[ \t]*(?:\n|$)")
        .expect("valid transaction regex")
});

static EF_PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)DO\s+\$EF\$.*?END\s+\$EF\$\s*;").expect("valid preamble regex")
});

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").expect("valid blank line regex"));

/// Removes EF Core bookkeeping from a generated script
#[derive(Debug, Clone)]
pub struct SqlSanitizer {
    /// `IF OBJECT_ID(N'[history]') IS NULL BEGIN ... END;`
    guarded_create: Regex,
    /// `CREATE TABLE [IF NOT EXISTS] history (`; the rest is found by scanning
    create_table: Regex,
    /// `INSERT INTO history` / `DELETE FROM history`
    history_rows: Regex,
}

impl Default for SqlSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TABLE)
    }
}

impl SqlSanitizer {
    pub fn new(history_table: &str) -> Self {
        let table = regex::escape(history_table);
        // Optional schema, then the table, each bare or wrapped in [] or ""
        let qualified = format!(
            r#"(?:(?:\[[^\]]+\]|"[^"]+"|\w+)\s*\.\s*)?(?:\[{t}\]|"{t}"|\b{t}\b)"#,
            t = table
        );

        let guarded_create = Regex::new(&format!(
            r"(?is)IF\s+OBJECT_ID\s*\(\s*N?'[^']*{}[^']*'\s*\)\s+IS\s+NULL\s+BEGIN\b.*?\bEND\s*;",
            table
        ))
        .expect("valid guarded create regex");

        let create_table = Regex::new(&format!(
            r"(?is)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}\s*\(",
            qualified
        ))
        .expect("valid create table regex");

        let history_rows = Regex::new(&format!(
            r"(?is)(?:INSERT\s+INTO|DELETE\s+FROM)\s+{}",
            qualified
        ))
        .expect("valid history rows regex");

        Self {
            guarded_create,
            create_table,
            history_rows,
        }
    }

    /// Strip the bookkeeping from `raw` and tidy the blank lines left behind
    pub fn sanitize(&self, raw: &str) -> String {
        let mut sql = raw.replace("\r\n", "\n");

        sql = remove_preambles(&sql);
        sql = remove_matches(&sql, &self.guarded_create, |_| true);
        sql = remove_statements(&sql, &self.create_table);
        sql = remove_statements(&sql, &self.history_rows);
        sql = TRANSACTION.replace_all(&sql, "").into_owned();

        sql = drop_empty_batches(&sql);
        BLANK_RUN.replace_all(&sql, "\n\n\n").trim().to_string()
    }
}

/// Sanitize with the default history table name
pub fn sanitize_sql(raw: &str) -> String {
    SqlSanitizer::default().sanitize(raw)
}

/// Byte spans from each transaction start to its `COMMIT;`.
/// A transaction left open runs to the end of the text.
fn transaction_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for m in TRANSACTION.find_iter(text) {
        let is_commit = m
            .as_str()
            .trim_start()
            .get(..6)
            .is_some_and(|w| w.eq_ignore_ascii_case("COMMIT"));
        match (is_commit, open) {
            (true, Some(start)) => {
                spans.push((start, m.end()));
                open = None;
            }
            (false, None) => open = Some(m.start()),
            _ => {}
        }
    }
    if let Some(start) = open {
        spans.push((start, text.len()));
    }
    spans
}

/// Remove the schema preamble the tool emits ahead of each migration.
///
/// Only blocks outside every migration transaction are preamble. The same
/// block inside a transaction comes from the migration's own `EnsureSchema`
/// and stays.
fn remove_preambles(text: &str) -> String {
    let transactions = transaction_spans(text);
    remove_matches(text, &EF_PREAMBLE, |m| {
        contains_ci(m.as_str(), "pg_namespace")
            && !transactions
                .iter()
                .any(|&(start, end)| m.start() >= start && m.end() <= end)
    })
}

/// Remove every match of `pattern` that `accept` allows
fn remove_matches(text: &str, pattern: &Regex, accept: impl Fn(&Match) -> bool) -> String {
    let spans: Vec<(usize, usize)> = pattern
        .find_iter(text)
        .filter(|m| accept(m))
        .map(|m| (m.start(), m.end()))
        .collect();
    cut_spans(text, &spans)
}

/// Remove every statement starting at a match of `pattern`, up to its `;`
fn remove_statements(text: &str, pattern: &Regex) -> String {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(m) = pattern.find_at(text, from) {
        let end = statement_end(text, m.start());
        spans.push((m.start(), end));
        from = end.max(m.end());
        if from >= text.len() {
            break;
        }
    }
    cut_spans(text, &spans)
}

/// Offset just past the `;` ending the statement at `start`.
///
/// Parentheses must be balanced and quoted text is skipped. A statement that
/// never terminates runs to the end of the text.
fn statement_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b';' if depth == 0 => return i + 1,
                _ => {}
            },
        }
        i += 1;
    }
    bytes.len()
}

/// Delete the given byte spans, taking along the rest of each span's line
/// when nothing but whitespace remains on it.
fn cut_spans(text: &str, spans: &[(usize, usize)]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in spans {
        if start < cursor {
            continue;
        }
        let mut line_start = start;
        while line_start > cursor && matches!(bytes[line_start - 1], b' ' | b'\t') {
            line_start -= 1;
        }
        let mut line_end = end;
        while line_end < bytes.len() && matches!(bytes[line_end], b' ' | b'\t') {
            line_end += 1;
        }
        let whole_line = (line_start == 0 || bytes[line_start - 1] == b'\n')
            && (line_end == bytes.len() || bytes[line_end] == b'\n');

        if whole_line {
            out.push_str(&text[cursor..line_start]);
            cursor = (line_end + 1).min(bytes.len());
        } else {
            out.push_str(&text[cursor..start]);
            cursor = end;
        }
    }
    out.push_str(&text[cursor..]);
    out
}

/// Drop `GO` separators that close a batch with nothing left in it
fn drop_empty_batches(text: &str) -> String {
    let mut out = Vec::new();
    let mut batch_has_content = false;
    for line in text.split('\n') {
        if line.trim().eq_ignore_ascii_case("GO") {
            if batch_has_content {
                out.push(line);
            }
            batch_has_content = false;
            continue;
        }
        if !line.trim().is_empty() {
            batch_has_content = true;
        }
        out.push(line);
    }
    out.join("\n")
}
