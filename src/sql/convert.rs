//! Replacing a migration's procedures with the SQL they generate

use std::path::Path;

use super::sanitizer::SqlSanitizer;
use super::script_generator::ScriptGenerator;
use crate::error::SquashError;
use crate::migration::{predecessor, MigrationFile, MigrationId, Procedure};
use crate::scanner::replace_region;

/// The migration range a script covers, in apply direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRange {
    /// Migration applied before the range, or `0` for the empty database
    pub from: String,
    pub to: String,
}

impl ScriptRange {
    /// Range from whatever precedes `first` in `all` up to `last`
    pub fn new(all: &[MigrationFile], first: &MigrationId, last: &MigrationId) -> Self {
        Self {
            from: predecessor(all, first)
                .map(|id| id.to_string())
                .unwrap_or_else(|| "0".to_string()),
            to: last.to_string(),
        }
    }

    /// Generator arguments for `procedure`; the revert runs the range backwards
    pub fn endpoints(&self, procedure: Procedure) -> (&str, &str) {
        match procedure {
            Procedure::Up => (&self.from, &self.to),
            Procedure::Down => (&self.to, &self.from),
        }
    }
}

/// A procedure body executing `sql` as one verbatim literal.
///
/// A script with no statements left gives an empty body, since
/// `migrationBuilder.Sql` rejects empty SQL.
pub fn to_sql_body(sql: &str) -> String {
    if sql.trim().is_empty() {
        return String::new();
    }
    format!("migrationBuilder.Sql(@\"{}\");", sql.replace('"', "\"\""))
}

/// Generate, sanitize and splice SQL into both procedures of `lines`.
///
/// Nothing is spliced unless both scripts were generated.
pub fn convert_procedures(
    lines: &[String],
    range: &ScriptRange,
    project: &Path,
    generator: &dyn ScriptGenerator,
    sanitizer: &SqlSanitizer,
) -> Result<Vec<String>, SquashError> {
    let mut scripts = Vec::with_capacity(2);
    for procedure in [Procedure::Up, Procedure::Down] {
        let (from, to) = range.endpoints(procedure);
        let raw = generator.generate(from, to, project)?;
        scripts.push((procedure, sanitizer.sanitize(&raw)));
    }

    let mut out = lines.to_vec();
    for (procedure, sql) in scripts {
        out = replace_region(&out, procedure.signature(), &to_sql_body(&sql));
    }
    Ok(out)
}
