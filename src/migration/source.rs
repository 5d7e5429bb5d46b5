//! Reading and writing migration source text
//!
//! Files are split into lines on load and joined back on write using the line
//! ending and byte-order mark the file originally had.

use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::error::SquashError;

const BOM: char = '\u{FEFF}';

/// Source file content as lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub lines: Vec<String>,
    /// `"\r\n"` or `"\n"`
    pub newline: &'static str,
    pub bom: bool,
}

impl SourceText {
    pub fn parse(content: &str) -> Self {
        let bom = content.starts_with(BOM);
        let content = content.strip_prefix(BOM).unwrap_or(content);
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = content.lines().map(str::to_string).collect();
        Self {
            lines,
            newline,
            bom,
        }
    }

    /// Same formatting as `self`, different lines
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            newline: self.newline,
            bom: self.bom,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        out.push_str(&self.lines.join(self.newline));
        out.push_str(self.newline);
        out
    }

    pub fn read(path: &Path) -> Result<Self, SquashError> {
        let content =
            read_file_with_encoding_fallback(path).map_err(|source| SquashError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&content))
    }

    pub fn write(&self, path: &Path) -> Result<(), SquashError> {
        std::fs::write(path, self.render()).map_err(|source| SquashError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Read a file as a string, trying UTF-8 first, then Windows-1252 as fallback
fn read_file_with_encoding_fallback(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(err) => {
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "File contains invalid characters",
                ))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}
