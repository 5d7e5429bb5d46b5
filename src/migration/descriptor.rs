//! Retargeting designer files to the primary migration
//!
//! A designer file carries the migration's identity twice: the argument of
//! `[Migration("...")]` and the `partial class` name. Both are rewritten to
//! the primary migration. The designer of the newest squashed migration is
//! the one kept, because its `BuildTargetModel` describes the final model.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::catalog::DESCRIPTOR_SUFFIX;
use super::source::SourceText;
use super::unit::MigrationId;
use crate::error::SquashError;

static MIGRATION_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\[\s*Migration\s*\(\s*")([^"]*)("\s*\)\s*\])"#)
        .expect("valid migration attribute regex")
});

static PARTIAL_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\bpartial\s+class\s+)(@?[A-Za-z_][A-Za-z0-9_]*)").expect("valid class regex")
});

/// Rewrite the identity attribute and class name to match `primary`.
///
/// Either replacement is skipped silently when its target is absent.
pub fn rewrite_descriptor(text: &str, primary: &MigrationId) -> String {
    let id = primary.to_string();
    let text = MIGRATION_ATTRIBUTE.replacen(text, 1, |caps: &Captures| {
        format!("{}{}{}", &caps[1], id, &caps[3])
    });
    PARTIAL_CLASS
        .replacen(&text, 1, |caps: &Captures| {
            format!("{}{}", &caps[1], primary.class_name())
        })
        .into_owned()
}

/// Path the primary migration's designer file must live at
pub fn descriptor_path(dir: &Path, primary: &MigrationId) -> PathBuf {
    dir.join(format!("{}{}", primary, DESCRIPTOR_SUFFIX))
}

/// Move `source` to the primary's designer path and rewrite it there.
///
/// An existing file at the destination is replaced. Returns the final path.
pub fn relocate_descriptor(
    source: &Path,
    dir: &Path,
    primary: &MigrationId,
) -> Result<PathBuf, SquashError> {
    let target = descriptor_path(dir, primary);

    if source != target {
        if target.exists() {
            std::fs::remove_file(&target).map_err(|e| SquashError::FileRemove {
                path: target.clone(),
                source: e,
            })?;
        }
        std::fs::rename(source, &target).map_err(|e| SquashError::FileRename {
            from: source.to_path_buf(),
            to: target.clone(),
            source: e,
        })?;
    }

    let text = SourceText::read(&target)?;
    let rewritten = rewrite_descriptor(&text.lines.join("\n"), primary);
    text.with_lines(rewritten.lines().map(str::to_string).collect())
        .write(&target)?;

    Ok(target)
}
