use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rust_efsquash::sql::DEFAULT_HISTORY_TABLE;
use rust_efsquash::{
    convert_to_sql, squash_migrations, ConvertOptions, ConvertOutcome, DotnetEf, SqlConversion,
    SquashOptions, SquashOutcome,
};

#[derive(Parser)]
#[command(name = "rust-efsquash")]
#[command(author, version, about = "Squash Entity Framework Core migrations into one")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a run of migrations into the oldest of them
    Squash {
        /// Directory containing the migration files
        dir: PathBuf,

        /// Only squash migrations from this year (YYYY)
        #[arg(short, long)]
        year: Option<String>,

        /// Stop before the first migration whose name contains this text
        #[arg(short, long)]
        target: Option<String>,

        /// Keep the merged C# even when a rename-then-drop is detected
        #[arg(long)]
        skip_sql: bool,

        /// Path to the .csproj (searched for upwards from the directory by default)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Name of the EF migrations history table
        #[arg(long, default_value = DEFAULT_HISTORY_TABLE)]
        history_table: String,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Replace a migration's Up and Down with the SQL they generate
    ConvertToSql {
        /// Directory containing the migration files
        dir: PathBuf,

        /// Path to the .csproj (searched for upwards from the directory by default)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Migration to convert (defaults to the newest)
        #[arg(short, long)]
        migration: Option<String>,

        /// Name of the EF migrations history table
        #[arg(long, default_value = DEFAULT_HISTORY_TABLE)]
        history_table: String,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn describe(sql: &SqlConversion) -> String {
    match sql {
        SqlConversion::NotNeeded => "kept as C#".to_string(),
        SqlConversion::Converted => "converted to SQL".to_string(),
        SqlConversion::Skipped(reason) => format!("kept as C# ({})", reason),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let generator = DotnetEf::default();

    match cli.command {
        Commands::Squash {
            dir,
            year,
            target,
            skip_sql,
            project,
            history_table,
            verbose,
        } => {
            let options = SquashOptions {
                migrations_dir: dir,
                year,
                target,
                skip_sql,
                project_path: project,
                history_table,
                verbose,
            };

            match squash_migrations(&options, &generator)? {
                SquashOutcome::NothingToProcess => println!("No migrations to squash."),
                SquashOutcome::Squashed(report) => println!(
                    "Squashed {} migrations into {}: {}",
                    report.squashed.len(),
                    report.primary.display(),
                    describe(&report.sql)
                ),
            }
        }
        Commands::ConvertToSql {
            dir,
            project,
            migration,
            history_table,
            verbose,
        } => {
            let options = ConvertOptions {
                migrations_dir: dir,
                migration,
                project_path: project,
                history_table,
                verbose,
            };

            match convert_to_sql(&options, &generator)? {
                ConvertOutcome::NothingToProcess => println!("No migration to convert."),
                ConvertOutcome::Finished { migration, sql } => {
                    println!("{}: {}", migration.display(), describe(&sql))
                }
            }
        }
    }

    Ok(())
}
