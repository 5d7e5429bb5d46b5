//! Migration identifiers and loaded migration units

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::source::SourceText;

/// Width of the timestamp prefix of a migration file name
pub const TIMESTAMP_WIDTH: usize = 14;

static UP_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvoid\s+Up\s*\(").expect("valid Up signature regex"));
static DOWN_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvoid\s+Down\s*\(").expect("valid Down signature regex"));

/// Identity of a migration: `<14-digit timestamp>_<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MigrationId {
    pub timestamp: String,
    pub name: String,
}

impl MigrationId {
    /// Parse a file stem such as `20240315093000_Add_User_Table`.
    ///
    /// The split happens at the fixed-width timestamp, so any further `_` stay
    /// in the name.
    pub fn parse(stem: &str) -> Option<Self> {
        let timestamp = stem.get(..TIMESTAMP_WIDTH)?;
        if !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDateTime::parse_from_str(timestamp, "%Y%m%d%H%M%S").ok()?;

        let name = stem[TIMESTAMP_WIDTH..].strip_prefix('_')?;
        if name.is_empty() {
            return None;
        }

        Some(Self {
            timestamp: timestamp.to_string(),
            name: name.to_string(),
        })
    }

    /// Leading four digits of the timestamp
    pub fn year(&self) -> &str {
        &self.timestamp[..4]
    }

    /// Declared class name for this migration
    pub fn class_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.timestamp, self.name)
    }
}

/// Position of a unit within a squash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// First in chronological order; receives the merged content
    Primary,
    /// Merged into the primary, then deleted
    Subsumed,
}

/// The two procedures every migration carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    Up,
    Down,
}

/// Order in which units contribute to a merged procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Chronological,
    ReverseChronological,
}

impl Procedure {
    pub fn signature(&self) -> &'static Regex {
        match self {
            Procedure::Up => &UP_SIGNATURE,
            Procedure::Down => &DOWN_SIGNATURE,
        }
    }

    /// Applying runs oldest first; reverting undoes newest first
    pub fn natural_order(&self) -> Order {
        match self {
            Procedure::Up => Order::Chronological,
            Procedure::Down => Order::ReverseChronological,
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Up => write!(f, "Up"),
            Procedure::Down => write!(f, "Down"),
        }
    }
}

/// A migration source file loaded into memory
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: MigrationId,
    pub path: PathBuf,
    pub source: SourceText,
    pub role: Role,
    /// Paired `.Designer.cs` file, if present
    pub descriptor: Option<PathBuf>,
}

impl Unit {
    pub fn lines(&self) -> &[String] {
        &self.source.lines
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }
}
