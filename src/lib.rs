//! rust-efsquash: squash Entity Framework Core migrations into one
//!
//! This library merges a run of chronologically ordered migration files into
//! the oldest of them, keeping every contributing body in its own scoped
//! block, and can replace a migration's procedures with the raw SQL that the
//! EF Core tooling generates for them.

pub mod analyze;
pub mod error;
pub mod merge;
pub mod migration;
pub mod scanner;
pub mod sql;
mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use analyze::{find_hazards, has_hazard, Hazard};
pub use error::SquashError;
pub use migration::{MigrationId, Procedure};
pub use sql::{DotnetEf, ScriptGenerator, SqlSanitizer};

use merge::{aggregate, place_imports, ImportSet};
use migration::{
    find_migration, list_migrations, load_units, matches_target, relocate_descriptor, select,
    MigrationFile, Selection, Unit,
};
use scanner::replace_region;
use sql::{convert_procedures, find_project, ScriptRange, DEFAULT_HISTORY_TABLE};

/// Options for squashing migrations
#[derive(Debug, Clone)]
pub struct SquashOptions {
    /// Directory holding the migration files
    pub migrations_dir: PathBuf,
    /// Only squash migrations from this year (e.g., "2024")
    pub year: Option<String>,
    /// Squash up to, but not including, the first migration matching this name
    pub target: Option<String>,
    /// Never convert to SQL, even when a rename-then-drop is detected
    pub skip_sql: bool,
    /// Project file for the EF tooling (searched for when absent)
    pub project_path: Option<PathBuf>,
    /// History table the EF tooling writes to
    pub history_table: String,
    /// Enable verbose output
    pub verbose: bool,
}

impl SquashOptions {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            year: None,
            target: None,
            skip_sql: false,
            project_path: None,
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            verbose: false,
        }
    }
}

/// Options for converting one migration to SQL
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub migrations_dir: PathBuf,
    /// Migration to convert (defaults to the newest)
    pub migration: Option<String>,
    pub project_path: Option<PathBuf>,
    pub history_table: String,
    pub verbose: bool,
}

impl ConvertOptions {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            migration: None,
            project_path: None,
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            verbose: false,
        }
    }
}

/// What happened to the SQL conversion step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlConversion {
    /// No rename-then-drop was found, so the merged code was kept
    NotNeeded,
    /// Both procedures now execute generated SQL
    Converted,
    /// Conversion was wanted but did not happen; the code is unchanged
    Skipped(String),
}

/// Summary of a completed squash
#[derive(Debug, Clone)]
pub struct SquashReport {
    /// The surviving migration file
    pub primary: PathBuf,
    /// Its designer file, when one was kept
    pub descriptor: Option<PathBuf>,
    /// Every migration folded into the primary, oldest first
    pub squashed: Vec<MigrationId>,
    /// Files deleted after the merge
    pub removed: Vec<PathBuf>,
    pub hazards: Vec<Hazard>,
    pub sql: SqlConversion,
}

#[derive(Debug, Clone)]
pub enum SquashOutcome {
    /// The filters left no migrations; nothing was touched
    NothingToProcess,
    Squashed(SquashReport),
}

#[derive(Debug, Clone)]
pub enum ConvertOutcome {
    /// No migration matched; nothing was touched
    NothingToProcess,
    Finished {
        migration: PathBuf,
        sql: SqlConversion,
    },
}

/// Squash the selected migrations into the oldest of them
pub fn squash_migrations(
    options: &SquashOptions,
    generator: &dyn ScriptGenerator,
) -> Result<SquashOutcome> {
    let dir = &options.migrations_dir;
    if options.verbose {
        println!("Squashing migrations in: {}", dir.display());
    }

    // Step 1: Find and select migrations
    let all = list_migrations(dir)?;
    let selected = select(
        &all,
        &Selection {
            year: options.year.clone(),
            target: options.target.clone(),
        },
    );

    if let Some(target) = &options.target {
        if !all.iter().any(|f| matches_target(f, target)) {
            eprintln!("Warning: Target migration '{}' not found; nothing selected", target.trim());
        }
    }

    if selected.is_empty() {
        if options.verbose {
            println!("No migrations matched; nothing to squash");
        }
        return Ok(SquashOutcome::NothingToProcess);
    }

    if options.verbose {
        println!(
            "Selected {} of {} migrations ({} .. {})",
            selected.len(),
            all.len(),
            selected[0].id,
            selected[selected.len() - 1].id
        );
    }

    // Step 2: Merge procedure bodies across all selected migrations
    let units = load_units(&selected)?;
    let (primary, newest) = match (units.first(), units.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(SquashOutcome::NothingToProcess),
    };

    let up = aggregate(&units, Procedure::Up, Procedure::Up.natural_order());
    let down = aggregate(&units, Procedure::Down, Procedure::Down.natural_order());

    if options.verbose {
        println!(
            "Merged {} Up and {} Down bodies",
            up.body.blocks.len(),
            down.body.blocks.len()
        );
    }

    // Step 3: Rewrite the primary migration
    let lines = replace_region(primary.lines(), Procedure::Up.signature(), &up.body.text());
    let lines = replace_region(&lines, Procedure::Down.signature(), &down.body.text());
    let lines = place_imports(&lines, &ImportSet::merged([&up.imports, &down.imports]));

    // Step 4: Keep the newest designer, retargeted at the primary.
    // The primary is only written once the designer is in place.
    let descriptor = match newest.descriptor.as_ref().or(primary.descriptor.as_ref()) {
        Some(source) => {
            let target = relocate_descriptor(source, dir, &primary.id)?;
            if options.verbose {
                println!("Descriptor: {}", target.display());
            }
            Some(target)
        }
        None => {
            eprintln!("Warning: No designer file found for {}", primary.id);
            None
        }
    };
    primary.source.with_lines(lines.clone()).write(&primary.path)?;

    // Step 5: Look for renames that a later migration drops
    let hazards = find_hazards(&lines.join("\n"));
    for hazard in &hazards {
        eprintln!("Warning: {}", hazard);
    }

    // Step 6: Fall back to raw SQL when the merged code is unsafe
    let sql = if hazards.is_empty() {
        SqlConversion::NotNeeded
    } else if options.skip_sql {
        eprintln!("Warning: Rename-then-drop detected; SQL conversion skipped as requested");
        SqlConversion::Skipped("skipped by request".to_string())
    } else {
        let range = ScriptRange::new(&all, &primary.id, &newest.id);
        convert_primary(
            primary,
            &lines,
            &range,
            options.project_path.as_deref(),
            &options.history_table,
            generator,
            options.verbose,
        )?
    };

    // Step 7: Remove the subsumed migrations
    let removed = remove_subsumed(&units, descriptor.as_deref(), options.verbose)?;

    if options.verbose {
        println!("Squashed {} migrations into {}", units.len(), primary.path.display());
    }

    Ok(SquashOutcome::Squashed(SquashReport {
        primary: primary.path.clone(),
        descriptor,
        squashed: units.iter().map(|u| u.id.clone()).collect(),
        removed,
        hazards,
        sql,
    }))
}

/// Replace one migration's procedures with the SQL the EF tooling generates
pub fn convert_to_sql(
    options: &ConvertOptions,
    generator: &dyn ScriptGenerator,
) -> Result<ConvertOutcome> {
    let dir = &options.migrations_dir;
    let all = list_migrations(dir)?;

    let chosen: Option<&MigrationFile> = match &options.migration {
        Some(name) => find_migration(&all, name),
        None => all.last(),
    };
    let Some(file) = chosen else {
        if let Some(name) = &options.migration {
            eprintln!("Warning: No migration matching '{}' in {}", name, dir.display());
        } else if options.verbose {
            println!("No migrations found in {}", dir.display());
        }
        return Ok(ConvertOutcome::NothingToProcess);
    };

    if options.verbose {
        println!("Converting {} to SQL", file.id);
    }

    let units = load_units(std::slice::from_ref(file))?;
    let Some(unit) = units.first() else {
        return Ok(ConvertOutcome::NothingToProcess);
    };

    let range = ScriptRange::new(&all, &unit.id, &unit.id);
    let sql = convert_primary(
        unit,
        unit.lines(),
        &range,
        options.project_path.as_deref(),
        &options.history_table,
        generator,
        options.verbose,
    )?;

    Ok(ConvertOutcome::Finished {
        migration: unit.path.clone(),
        sql,
    })
}

/// Splice generated SQL into `unit`, writing it only on success.
///
/// Tool and project-lookup failures are reported as warnings and leave the
/// file as it is.
fn convert_primary(
    unit: &Unit,
    lines: &[String],
    range: &ScriptRange,
    project: Option<&Path>,
    history_table: &str,
    generator: &dyn ScriptGenerator,
    verbose: bool,
) -> Result<SqlConversion> {
    let dir = unit.path.parent().unwrap_or(Path::new("."));
    let project = match project {
        Some(p) => p.to_path_buf(),
        None => match find_project(dir) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Warning: {}; leaving {} as C#", e, unit.id);
                return Ok(SqlConversion::Skipped(e.to_string()));
            }
        },
    };

    if verbose {
        println!(
            "Generating SQL {} -> {} with {}",
            range.from,
            range.to,
            project.display()
        );
    }

    let sanitizer = SqlSanitizer::new(history_table);
    match convert_procedures(lines, range, &project, generator, &sanitizer) {
        Ok(converted) => {
            unit.source.with_lines(converted).write(&unit.path)?;
            if verbose {
                println!("Converted {} to SQL", unit.id);
            }
            Ok(SqlConversion::Converted)
        }
        Err(e) => {
            eprintln!("Warning: {}; leaving {} as C#", e, unit.id);
            Ok(SqlConversion::Skipped(e.to_string()))
        }
    }
}

/// Delete every subsumed migration and any designer of theirs still on disk
fn remove_subsumed(units: &[Unit], kept: Option<&Path>, verbose: bool) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for unit in units.iter().filter(|u| !u.is_primary()) {
        let mut paths = vec![unit.path.clone()];
        if let Some(descriptor) = &unit.descriptor {
            if Some(descriptor.as_path()) != kept && descriptor.exists() {
                paths.push(descriptor.clone());
            }
        }
        for path in paths {
            std::fs::remove_file(&path).map_err(|source| SquashError::FileRemove {
                path: path.clone(),
                source,
            })?;
            if verbose {
                println!("Removed {}", path.display());
            }
            removed.push(path);
        }
    }
    Ok(removed)
}
