//! Generating SQL scripts for a range of migrations

use std::path::Path;
use std::process::Command;

use crate::error::SquashError;

/// Produces the SQL script that moves a database from one migration to another
pub trait ScriptGenerator {
    /// Script from `from` to `to`; `"0"` stands for the empty database.
    ///
    /// When `to` is older than `from` the script reverts.
    fn generate(&self, from: &str, to: &str, project: &Path) -> Result<String, SquashError>;
}

/// Runs `dotnet ef migrations script` against the already-built project
#[derive(Debug, Clone)]
pub struct DotnetEf {
    pub program: String,
}

impl Default for DotnetEf {
    fn default() -> Self {
        Self {
            program: "dotnet".to_string(),
        }
    }
}

impl ScriptGenerator for DotnetEf {
    fn generate(&self, from: &str, to: &str, project: &Path) -> Result<String, SquashError> {
        let output = Command::new(&self.program)
            .args(["ef", "migrations", "script", from, to])
            .arg("--project")
            .arg(project)
            .arg("--no-build")
            .output()
            .map_err(|e| SquashError::ExternalTool {
                message: format!("Failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(SquashError::ExternalTool {
                message: format!(
                    "dotnet ef migrations script {} {} exited with {}: {}",
                    from,
                    to,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let script = String::from_utf8_lossy(&output.stdout).into_owned();
        if script.trim().is_empty() {
            return Err(SquashError::ExternalTool {
                message: format!("dotnet ef migrations script {} {} produced no output", from, to),
            });
        }
        Ok(script)
    }
}
