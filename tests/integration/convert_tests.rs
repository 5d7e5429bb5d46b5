//! Integration tests for the convert-to-sql workflow

use rust_efsquash::{ConvertOptions, ConvertOutcome, SqlConversion};

use crate::common::{FailingGenerator, FakeGenerator, TestContext};

const APPLY: &str = "START TRANSACTION;\n\nCREATE INDEX \"IX_Users_Email\" ON \"Users\" (\"Email\");\n\nINSERT INTO \"__EFMigrationsHistory\" (\"MigrationId\", \"ProductVersion\")\nVALUES ('20250301000000_AddIndexes', '8.0.0');\n\nCOMMIT;\n";
const REVERT: &str = "START TRANSACTION;\n\nDROP INDEX \"IX_Users_Email\";\n\nDELETE FROM \"__EFMigrationsHistory\"\nWHERE \"MigrationId\" = '20250301000000_AddIndexes';\n\nCOMMIT;\n";

#[test]
fn test_convert_newest_by_default() {
    let ctx = TestContext::with_fixture("three_migrations");
    let designer_before = ctx.read("20250301000000_AddIndexes.Designer.cs");
    let generator = FakeGenerator::new(APPLY, REVERT);

    let outcome = ctx.convert_with(&ConvertOptions::new(ctx.migrations_dir()), &generator);
    let ConvertOutcome::Finished { migration, sql } = outcome else {
        panic!("Expected a conversion");
    };
    assert_eq!(sql, SqlConversion::Converted);
    assert_eq!(migration.file_name().unwrap(), "20250301000000_AddIndexes.cs");

    let calls = generator.calls.borrow();
    assert_eq!(calls[0].0, "20240215000000_AddOrders");
    assert_eq!(calls[0].1, "20250301000000_AddIndexes");
    assert_eq!(calls[1].0, "20250301000000_AddIndexes");
    assert_eq!(calls[1].1, "20240215000000_AddOrders");

    let converted = ctx.read("20250301000000_AddIndexes.cs");
    assert!(converted.contains(
        "        protected override void Up(MigrationBuilder migrationBuilder)\n        {\n            migrationBuilder.Sql(@\"CREATE INDEX \"\"IX_Users_Email\"\" ON \"\"Users\"\" (\"\"Email\"\");\");\n        }"
    ));
    assert!(converted.contains(
        "        protected override void Down(MigrationBuilder migrationBuilder)\n        {\n            migrationBuilder.Sql(@\"DROP INDEX \"\"IX_Users_Email\"\";\");\n        }"
    ));

    // Designer files are never touched
    assert_eq!(ctx.read("20250301000000_AddIndexes.Designer.cs"), designer_before);
    assert_eq!(ctx.migration_files().len(), 7);
}

#[test]
fn test_convert_named_migration() {
    let ctx = TestContext::with_fixture("three_migrations");
    let generator = FakeGenerator::new(APPLY, REVERT);
    let mut options = ConvertOptions::new(ctx.migrations_dir());
    options.migration = Some("Initial".to_string());

    let outcome = ctx.convert_with(&options, &generator);
    let ConvertOutcome::Finished { migration, .. } = outcome else {
        panic!("Expected a conversion");
    };
    assert_eq!(migration.file_name().unwrap(), "20240101000000_Initial.cs");
    assert_eq!(generator.calls.borrow()[0].0, "0");
    assert!(ctx.read("20240101000000_Initial.cs").contains("migrationBuilder.Sql(@\""));
    assert!(!ctx.read("20240215000000_AddOrders.cs").contains("migrationBuilder.Sql(@\"CREATE"));
}

#[test]
fn test_convert_unknown_migration_is_nothing_to_process() {
    let ctx = TestContext::with_fixture("three_migrations");
    let mut options = ConvertOptions::new(ctx.migrations_dir());
    options.migration = Some("NoSuchMigration".to_string());

    let outcome = ctx.convert_with(&options, &FakeGenerator::unused());
    assert!(matches!(outcome, ConvertOutcome::NothingToProcess));
}

#[test]
fn test_convert_failure_leaves_file_untouched() {
    let ctx = TestContext::with_fixture("three_migrations");
    let before = ctx.read("20250301000000_AddIndexes.cs");

    let outcome = ctx.convert_with(&ConvertOptions::new(ctx.migrations_dir()), &FailingGenerator);
    let ConvertOutcome::Finished { sql, .. } = outcome else {
        panic!("Expected a finished conversion");
    };
    assert!(matches!(sql, SqlConversion::Skipped(_)));
    assert_eq!(ctx.read("20250301000000_AddIndexes.cs"), before);
}
