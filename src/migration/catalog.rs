//! Discovering, ordering and selecting migration files in a directory

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::source::SourceText;
use super::unit::{MigrationId, Role, Unit};
use crate::error::SquashError;
use crate::util::contains_ci;

/// Suffix of the designer file paired with each migration
pub const DESCRIPTOR_SUFFIX: &str = ".Designer.cs";

/// Suffix of the model snapshot, which is never a migration
pub const SNAPSHOT_SUFFIX: &str = "ModelSnapshot.cs";

/// A migration found on disk, not yet loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub id: MigrationId,
    pub path: PathBuf,
    pub descriptor: Option<PathBuf>,
}

impl MigrationFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Optional filters narrowing the migrations to squash
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Keep only migrations whose timestamp starts with this year
    pub year: Option<String>,
    /// Stop before the first migration whose file name contains this text
    pub target: Option<String>,
}

/// Check that `dir` exists and is a directory
pub fn ensure_directory(dir: &Path) -> Result<(), SquashError> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return Err(SquashError::InvalidDirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// List every migration in `dir`, sorted by file name (and so chronologically)
pub fn list_migrations(dir: &Path) -> Result<Vec<MigrationFile>> {
    ensure_directory(dir)?;

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".cs") || name.ends_with(DESCRIPTOR_SUFFIX) || name.ends_with(SNAPSHOT_SUFFIX)
        {
            continue;
        }
        let stem = &name[..name.len() - ".cs".len()];
        let Some(id) = MigrationId::parse(stem) else {
            continue;
        };

        let descriptor = dir.join(format!("{}{}", id, DESCRIPTOR_SUFFIX));
        files.push(MigrationFile {
            id,
            path: entry.path().to_path_buf(),
            descriptor: descriptor.is_file().then_some(descriptor),
        });
    }

    Ok(files)
}

/// Apply the year filter, then stop before the target.
///
/// A target that matches no file selects nothing rather than everything.
pub fn select(files: &[MigrationFile], selection: &Selection) -> Vec<MigrationFile> {
    let by_year: Vec<&MigrationFile> = files
        .iter()
        .filter(|f| match &selection.year {
            Some(year) => f.id.year().eq_ignore_ascii_case(year.trim()),
            None => true,
        })
        .collect();

    match &selection.target {
        Some(target) => {
            let Some(stop) = by_year.iter().position(|f| matches_target(f, target))
            else {
                return Vec::new();
            };
            by_year[..stop].iter().map(|f| (*f).clone()).collect()
        }
        None => by_year.into_iter().cloned().collect(),
    }
}

/// Whether `file` is the one a `--target` of `target` names
pub fn matches_target(file: &MigrationFile, target: &str) -> bool {
    contains_ci(&file.file_name(), target.trim())
}

/// The migration immediately before `id` in the full listing
pub fn predecessor<'a>(files: &'a [MigrationFile], id: &MigrationId) -> Option<&'a MigrationId> {
    let idx = files.iter().position(|f| &f.id == id)?;
    idx.checked_sub(1).map(|prev| &files[prev].id)
}

/// Find a migration by name: exact id, exact class name, or substring match
pub fn find_migration<'a>(files: &'a [MigrationFile], name: &str) -> Option<&'a MigrationFile> {
    let name = name.trim().trim_end_matches(".cs");
    files
        .iter()
        .find(|f| f.id.to_string().eq_ignore_ascii_case(name))
        .or_else(|| files.iter().find(|f| f.id.name.eq_ignore_ascii_case(name)))
        .or_else(|| files.iter().find(|f| contains_ci(&f.file_name(), name)))
}

/// Load the selected files; the first becomes primary, the rest subsumed
pub fn load_units(files: &[MigrationFile]) -> Result<Vec<Unit>> {
    files
        .iter()
        .enumerate()
        .map(|(idx, file)| -> Result<Unit> {
            Ok(Unit {
                id: file.id.clone(),
                path: file.path.clone(),
                source: SourceText::read(&file.path)?,
                role: if idx == 0 { Role::Primary } else { Role::Subsumed },
                descriptor: file.descriptor.clone(),
            })
        })
        .collect()
}
