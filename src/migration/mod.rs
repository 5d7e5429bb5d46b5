//! Migration files: identities, discovery, source text and designer metadata

mod catalog;
mod descriptor;
mod source;
mod unit;

pub use catalog::{
    ensure_directory, find_migration, list_migrations, load_units, matches_target, predecessor,
    select,
    MigrationFile, Selection, DESCRIPTOR_SUFFIX, SNAPSHOT_SUFFIX,
};
pub use descriptor::{descriptor_path, relocate_descriptor, rewrite_descriptor};
pub use source::SourceText;
pub use unit::{MigrationId, Order, Procedure, Role, Unit, TIMESTAMP_WIDTH};
