//! Integration tests for the squash workflow

use std::fs;

use pretty_assertions::assert_eq;
use rust_efsquash::migration::MigrationId;
use rust_efsquash::scanner::extract_region;
use rust_efsquash::{squash_migrations, Procedure, SqlConversion, SquashError, SquashOutcome};

use crate::common::{FailingGenerator, FakeGenerator, TestContext, APPLY_SCRIPT, REVERT_SCRIPT};

fn lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn positions(text: &str, needles: &[&str]) -> Vec<usize> {
    needles
        .iter()
        .map(|n| text.find(n).unwrap_or_else(|| panic!("missing {:?}", n)))
        .collect()
}

// ============================================================================
// Basic Squash Tests
// ============================================================================

#[test]
fn test_squash_three_migrations() {
    let ctx = TestContext::with_fixture("three_migrations");
    let generator = FakeGenerator::unused();

    let outcome = ctx.squash_with(&ctx.squash_options(), &generator);
    let SquashOutcome::Squashed(report) = outcome else {
        panic!("Expected a squash");
    };

    assert_eq!(report.squashed.len(), 3);
    assert_eq!(report.sql, SqlConversion::NotNeeded);
    assert!(report.hazards.is_empty());
    assert_eq!(generator.call_count(), 0);

    assert_eq!(
        ctx.migration_files(),
        vec![
            "20240101000000_Initial.Designer.cs",
            "20240101000000_Initial.cs",
            "AppDbContextModelSnapshot.cs",
        ]
    );
}

#[test]
fn test_up_is_chronological_and_down_reversed() {
    let ctx = TestContext::with_fixture("three_migrations");
    ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused());

    let primary = lines(&ctx.read("20240101000000_Initial.cs"));
    let up = extract_region(&primary, Procedure::Up.signature());
    let down = extract_region(&primary, Procedure::Down.signature());

    let comments = [
        "// Squashed from 20240101000000_Initial",
        "// Squashed from 20240215000000_AddOrders",
        "// Squashed from 20250301000000_AddIndexes",
    ];

    let up_positions = positions(&up.text, &comments);
    assert!(up_positions.windows(2).all(|w| w[0] < w[1]));

    let down_positions = positions(&down.text, &comments);
    assert!(down_positions.windows(2).all(|w| w[0] > w[1]));

    for comment in comments {
        assert_eq!(up.text.matches(comment).count(), 1);
        assert_eq!(down.text.matches(comment).count(), 1);
    }
}

#[test]
fn test_blocks_are_scoped_and_indented() {
    let ctx = TestContext::with_fixture("three_migrations");
    ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused());

    let primary = ctx.read("20240101000000_Initial.cs");
    let expected_down = "        protected override void Down(MigrationBuilder migrationBuilder)
        {
            {
                // Squashed from 20250301000000_AddIndexes
                migrationBuilder.DropIndex(
                    name: \"IX_Users_Email\",
                    table: \"Users\");
            }

            {
                // Squashed from 20240215000000_AddOrders
                var backfill = \"UPDATE Users SET Email = Email -- }\";
                migrationBuilder.Sql(backfill);
            }

            {
                // Squashed from 20240101000000_Initial
                migrationBuilder.DropTable(
                    name: \"Users\");
            }
        }
    }
}
";
    assert!(
        primary.ends_with(expected_down),
        "Unexpected Down procedure:\n{}",
        primary
    );
}

#[test]
fn test_verbatim_string_content_is_preserved() {
    let ctx = TestContext::with_fixture("three_migrations");
    ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused());

    let primary = ctx.read("20240101000000_Initial.cs");
    assert!(primary.contains(
        "                var backfill = @\"\nUPDATE Users\nSET Email = LOWER(Email) -- keep { braces } out of the count\n\";\n                migrationBuilder.Sql(backfill);"
    ));
}

#[test]
fn test_imports_are_merged_into_namespace() {
    let ctx = TestContext::with_fixture("three_migrations");
    ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused());

    let primary = ctx.read("20240101000000_Initial.cs");
    assert!(primary.contains(
        "namespace App.Migrations\n{\n    using Microsoft.EntityFrameworkCore.Migrations;\n    using System.Collections.Generic;\n    using System;\n\n    /// <inheritdoc />\n    public partial class Initial : Migration"
    ));
    // Directives above the namespace are left in place
    assert!(primary.starts_with("using System;\nusing Microsoft.EntityFrameworkCore.Migrations;\n"));
}

#[test]
fn test_newest_designer_is_kept_and_retargeted() {
    let ctx = TestContext::with_fixture("three_migrations");
    let SquashOutcome::Squashed(report) = ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused())
    else {
        panic!("Expected a squash");
    };

    let designer_path = ctx.migrations_dir().join("20240101000000_Initial.Designer.cs");
    assert_eq!(report.descriptor.as_deref(), Some(designer_path.as_path()));

    let designer = ctx.read("20240101000000_Initial.Designer.cs");
    assert!(designer.contains("[Migration(\"20240101000000_Initial\")]"));
    assert!(designer.contains("    partial class Initial\n"));
    assert!(designer.contains("// Target model: Users, Orders, IX_Users_Email"));
    assert!(!designer.contains("AddIndexes"));
}

#[test]
fn test_snapshot_is_untouched() {
    let ctx = TestContext::with_fixture("three_migrations");
    let before = ctx.read("AppDbContextModelSnapshot.cs");
    ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused());
    assert_eq!(ctx.read("AppDbContextModelSnapshot.cs"), before);
}

// ============================================================================
// Selection Tests
// ============================================================================

#[test]
fn test_year_filter() {
    let ctx = TestContext::with_fixture("three_migrations");
    let mut options = ctx.squash_options();
    options.year = Some("2024".to_string());

    let SquashOutcome::Squashed(report) = ctx.squash_with(&options, &FakeGenerator::unused()) else {
        panic!("Expected a squash");
    };
    assert_eq!(report.squashed.len(), 2);

    assert_eq!(
        ctx.migration_files(),
        vec![
            "20240101000000_Initial.Designer.cs",
            "20240101000000_Initial.cs",
            "20250301000000_AddIndexes.Designer.cs",
            "20250301000000_AddIndexes.cs",
            "AppDbContextModelSnapshot.cs",
        ]
    );
    let designer = ctx.read("20240101000000_Initial.Designer.cs");
    assert!(designer.contains("// Target model: Users, Orders\n"));
}

#[test]
fn test_target_filter_excludes_target() {
    let ctx = TestContext::with_fixture("three_migrations");
    let mut options = ctx.squash_options();
    options.target = Some("addindexes".to_string());

    let SquashOutcome::Squashed(report) = ctx.squash_with(&options, &FakeGenerator::unused()) else {
        panic!("Expected a squash");
    };
    let ids: Vec<String> = report.squashed.iter().map(MigrationId::to_string).collect();
    assert_eq!(ids, vec!["20240101000000_Initial", "20240215000000_AddOrders"]);
    assert!(ctx.migrations_dir().join("20250301000000_AddIndexes.cs").exists());
}

#[test]
fn test_unmatched_target_is_nothing_to_process() {
    let ctx = TestContext::with_fixture("three_migrations");
    let before = ctx.read("20240101000000_Initial.cs");
    let mut options = ctx.squash_options();
    options.target = Some("NoSuchMigration".to_string());

    let outcome = ctx.squash_with(&options, &FakeGenerator::unused());
    assert!(matches!(outcome, SquashOutcome::NothingToProcess));
    assert_eq!(ctx.migration_files().len(), 7);
    assert_eq!(ctx.read("20240101000000_Initial.cs"), before);
}

#[test]
fn test_year_without_matches_is_nothing_to_process() {
    let ctx = TestContext::with_fixture("three_migrations");
    let mut options = ctx.squash_options();
    options.year = Some("1999".to_string());

    let outcome = ctx.squash_with(&options, &FakeGenerator::unused());
    assert!(matches!(outcome, SquashOutcome::NothingToProcess));
}

#[test]
fn test_single_migration_keeps_file_count() {
    let ctx = TestContext::with_fixture("three_migrations");
    let before = lines(&ctx.read("20250301000000_AddIndexes.cs"));
    let original_up = extract_region(&before, Procedure::Up.signature());

    let mut options = ctx.squash_options();
    options.year = Some("2025".to_string());
    let SquashOutcome::Squashed(report) = ctx.squash_with(&options, &FakeGenerator::unused()) else {
        panic!("Expected a squash");
    };
    assert!(report.removed.is_empty());
    assert_eq!(ctx.migration_files().len(), 7);

    let after = lines(&ctx.read("20250301000000_AddIndexes.cs"));
    let up = extract_region(&after, Procedure::Up.signature());
    for line in original_up.text.lines() {
        assert!(up.text.contains(line.trim()), "missing {:?}", line);
    }
    assert!(up.text.contains("// Squashed from 20250301000000_AddIndexes"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_missing_directory_is_invalid_input() {
    let ctx = TestContext::with_fixture("three_migrations");
    let options = rust_efsquash::SquashOptions::new(ctx.project_dir.join("DoesNotExist"));

    let err = squash_migrations(&options, &FakeGenerator::unused()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SquashError>(),
        Some(SquashError::InvalidDirectory { .. })
    ));
}

#[test]
fn test_failed_designer_move_leaves_migrations_untouched() {
    let ctx = TestContext::with_fixture("three_migrations");
    let dir = ctx.migrations_dir();
    let before = ctx.read("20240101000000_Initial.cs");
    // A directory where the primary designer goes cannot be replaced
    let blocked = dir.join("20240101000000_Initial.Designer.cs");
    fs::remove_file(&blocked).unwrap();
    fs::create_dir(&blocked).unwrap();

    let err = squash_migrations(&ctx.squash_options(), &FakeGenerator::unused()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SquashError>(),
        Some(SquashError::FileRemove { .. })
    ));
    assert_eq!(ctx.read("20240101000000_Initial.cs"), before);
    assert!(dir.join("20240215000000_AddOrders.cs").exists());
    assert!(dir.join("20250301000000_AddIndexes.Designer.cs").exists());
}

#[test]
fn test_crlf_files_stay_crlf() {
    let ctx = TestContext::with_fixture("three_migrations");
    for name in ctx.migration_files() {
        let path = ctx.migrations_dir().join(&name);
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace('\n', "\r\n")).unwrap();
    }

    ctx.squash_with(&ctx.squash_options(), &FakeGenerator::unused());

    for name in ["20240101000000_Initial.cs", "20240101000000_Initial.Designer.cs"] {
        let text = ctx.read(name);
        assert!(text.contains("\r\n"));
        assert_eq!(text.matches('\n').count(), text.matches("\r\n").count(), "{}", name);
    }
}

// ============================================================================
// Rename-then-drop Tests
// ============================================================================

#[test]
fn test_rename_then_drop_converts_to_sql() {
    let ctx = TestContext::with_fixture("rename_then_drop");
    let generator = FakeGenerator::new(APPLY_SCRIPT, REVERT_SCRIPT);

    let SquashOutcome::Squashed(report) = ctx.squash_with(&ctx.squash_options(), &generator) else {
        panic!("Expected a squash");
    };
    assert!(!report.hazards.is_empty());
    assert_eq!(report.sql, SqlConversion::Converted);

    let calls = generator.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "0");
    assert_eq!(calls[0].1, "20240103000000_DropEmailAddress");
    assert_eq!(calls[1].0, "20240103000000_DropEmailAddress");
    assert_eq!(calls[1].1, "0");
    assert_eq!(calls[0].2.file_name().unwrap(), "App.csproj");

    let primary = ctx.read("20240101000000_Initial.cs");
    assert!(primary.contains(
        "            migrationBuilder.Sql(@\"ALTER TABLE \"\"Users\"\" ADD \"\"Email\"\" text;\n"
    ));
    assert!(primary.contains("ALTER TABLE \"\"Users\"\" DROP COLUMN \"\"Email\"\";\");"));
    assert!(!primary.contains("RenameColumn"));
    assert!(!primary.contains("__EFMigrationsHistory"));
    assert!(!primary.contains("pg_namespace"));
    assert!(!primary.contains("TRANSACTION"));

    assert_eq!(
        ctx.migration_files(),
        vec![
            "20240101000000_Initial.Designer.cs",
            "20240101000000_Initial.cs",
            "AppDbContextModelSnapshot.cs",
        ]
    );
}

#[test]
fn test_explicit_project_is_passed_to_generator() {
    let ctx = TestContext::with_fixture("rename_then_drop");
    let generator = FakeGenerator::new(APPLY_SCRIPT, REVERT_SCRIPT);
    let mut options = ctx.squash_options();
    options.project_path = Some(ctx.project_dir.join("Custom.csproj"));

    ctx.squash_with(&options, &generator);
    assert_eq!(generator.calls.borrow()[0].2, ctx.project_dir.join("Custom.csproj"));
}

#[test]
fn test_skip_sql_keeps_merged_code() {
    let ctx = TestContext::with_fixture("rename_then_drop");
    let generator = FakeGenerator::unused();
    let mut options = ctx.squash_options();
    options.skip_sql = true;

    let SquashOutcome::Squashed(report) = ctx.squash_with(&options, &generator) else {
        panic!("Expected a squash");
    };
    assert!(matches!(report.sql, SqlConversion::Skipped(_)));
    assert_eq!(generator.call_count(), 0);

    let primary = ctx.read("20240101000000_Initial.cs");
    assert!(primary.contains("migrationBuilder.RenameColumn("));
    assert_eq!(ctx.migration_files().len(), 3);
}

#[test]
fn test_tool_failure_falls_back_to_merged_code() {
    let ctx = TestContext::with_fixture("rename_then_drop");

    let SquashOutcome::Squashed(report) = ctx.squash_with(&ctx.squash_options(), &FailingGenerator)
    else {
        panic!("Expected a squash");
    };
    let SqlConversion::Skipped(reason) = &report.sql else {
        panic!("Expected conversion to be skipped, got {:?}", report.sql);
    };
    assert!(reason.contains("command not found"));

    let primary = ctx.read("20240101000000_Initial.cs");
    assert!(primary.contains("// Squashed from 20240102000000_RenameEmail"));
    assert!(primary.contains("migrationBuilder.DropColumn("));
    assert_eq!(ctx.migration_files().len(), 3);
}

#[test]
fn test_missing_project_falls_back_to_merged_code() {
    let ctx = TestContext::with_fixture("rename_then_drop");
    fs::remove_file(ctx.csproj_path()).unwrap();

    let SquashOutcome::Squashed(report) = ctx.squash_with(&ctx.squash_options(), &FailingGenerator)
    else {
        panic!("Expected a squash");
    };
    assert!(matches!(report.sql, SqlConversion::Skipped(_)));
    assert!(ctx
        .read("20240101000000_Initial.cs")
        .contains("migrationBuilder.RenameColumn("));
}
