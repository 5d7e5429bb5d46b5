//! Converting migrations to raw SQL through the EF Core tooling

mod convert;
mod locator;
mod sanitizer;
mod script_generator;

pub use convert::{convert_procedures, to_sql_body, ScriptRange};
pub use locator::find_project;
pub use sanitizer::{sanitize_sql, SqlSanitizer, DEFAULT_HISTORY_TABLE};
pub use script_generator::{DotnetEf, ScriptGenerator};
