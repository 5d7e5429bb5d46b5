//! Context-aware brace scanning for C# source lines
//!
//! Counts structural `{` and `}` one line at a time while tracking whether the
//! scanner is inside a character literal, a string literal, a verbatim string
//! literal, a line comment or a block comment. Braces inside any of those
//! contexts are data and never affect depth.
//!
//! Only block comments and verbatim strings can span lines, so [`ScanState`]
//! carries exactly those two contexts from one line to the next. The state is
//! an explicit value: callers thread it through successive [`scan_line`] calls
//! and nothing is shared between files.

/// Context carried over from the end of one line to the start of the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Ordinary code
    #[default]
    Code,
    /// Inside `/* ... */`
    BlockComment,
    /// Inside `@"..."` (or `$@"..."` / `@$"..."`)
    VerbatimString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceKind {
    Open,
    Close,
}

/// A structural brace found in code context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brace {
    /// Byte offset of the brace within the line
    pub offset: usize,
    pub kind: BraceKind,
}

/// Result of scanning a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineScan {
    /// Structural braces in left-to-right order
    pub braces: Vec<Brace>,
    /// State to feed into the next line
    pub state: ScanState,
}

impl LineScan {
    /// Net brace delta: structural `{` minus structural `}`
    pub fn delta(&self) -> i32 {
        self.braces
            .iter()
            .map(|b| match b.kind {
                BraceKind::Open => 1,
                BraceKind::Close => -1,
            })
            .sum()
    }
}

/// Per-character context. `Char` and `Str` never survive a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Code,
    Char,
    Str,
    Verbatim,
    BlockComment,
}

/// Scan one line starting in `state`.
///
/// All delimiters the scanner cares about are ASCII, so walking bytes is safe
/// for UTF-8 input: continuation bytes never collide with them.
pub fn scan_line(line: &str, state: ScanState) -> LineScan {
    let bytes = line.as_bytes();
    let at = |i: usize| bytes.get(i).copied();

    let mut context = match state {
        ScanState::Code => Context::Code,
        ScanState::BlockComment => Context::BlockComment,
        ScanState::VerbatimString => Context::Verbatim,
    };
    let mut braces = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match context {
            Context::Code => match b {
                b'/' if at(i + 1) == Some(b'/') => break,
                b'/' if at(i + 1) == Some(b'*') => {
                    context = Context::BlockComment;
                    i += 2;
                    continue;
                }
                b'@' if at(i + 1) == Some(b'"') => {
                    context = Context::Verbatim;
                    i += 2;
                    continue;
                }
                b'@' | b'$'
                    if matches!(at(i + 1), Some(b'$') | Some(b'@'))
                        && at(i + 1) != Some(b)
                        && at(i + 2) == Some(b'"') =>
                {
                    context = Context::Verbatim;
                    i += 3;
                    continue;
                }
                b'"' => context = Context::Str,
                b'\'' => context = Context::Char,
                b'{' => braces.push(Brace {
                    offset: i,
                    kind: BraceKind::Open,
                }),
                b'}' => braces.push(Brace {
                    offset: i,
                    kind: BraceKind::Close,
                }),
                _ => {}
            },
            Context::Str | Context::Char => {
                let terminator = if context == Context::Str { b'"' } else { b'\'' };
                if b == b'\\' {
                    // The escape consumes the next character, so `\\` is one unit
                    i += 2;
                    continue;
                }
                if b == terminator {
                    context = Context::Code;
                }
            }
            Context::Verbatim => {
                if b == b'"' {
                    if at(i + 1) == Some(b'"') {
                        i += 2;
                        continue;
                    }
                    context = Context::Code;
                }
            }
            Context::BlockComment => {
                if b == b'*' && at(i + 1) == Some(b'/') {
                    context = Context::Code;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    let state = match context {
        Context::BlockComment => ScanState::BlockComment,
        Context::Verbatim => ScanState::VerbatimString,
        Context::Code | Context::Char | Context::Str => ScanState::Code,
    };

    LineScan { braces, state }
}

/// Net structural brace delta across a sequence of lines
pub fn total_delta<S: AsRef<str>>(lines: &[S]) -> i32 {
    let mut state = ScanState::Code;
    let mut total = 0;
    for line in lines {
        let scan = scan_line(line.as_ref(), state);
        total += scan.delta();
        state = scan.state;
    }
    total
}
