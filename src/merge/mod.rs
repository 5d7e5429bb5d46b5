//! Merging migrations: procedure bodies and `using` directives

mod aggregate;
mod imports;

pub use aggregate::{aggregate, provenance_comment, Aggregate, Block, MergedBody};
pub use imports::{collect_imports, is_import, place_imports, ImportSet};
