mod common;

use anyhow::Result;
use common::{FakeSession, FakeTable, RecordingStatus};
use pgdatadiff::core::sequence_diff::SequenceDiffer;
use pgdatadiff::core::table_diff::TableDiffer;
use pgdatadiff::core::{DiffReport, ItemKind, Outcome};
use pgdatadiff::domain::model::KeyColumn;
use pgdatadiff::utils::retry::RetryPolicy;
use pgdatadiff::{DiffEngine, DiffOptions, LocalStorage, ReportWriter};
use std::time::Duration;
use tempfile::TempDir;

fn options(chunk_size: usize) -> DiffOptions {
    DiffOptions {
        chunk_size,
        retry: RetryPolicy::new(3, Duration::ZERO),
        ..Default::default()
    }
}

fn source() -> FakeSession {
    FakeSession::new()
        .table("users", FakeTable::with_id_rows(5))
        .table("orders", FakeTable::with_id_rows(3))
        .sequence("users_id_seq", 5)
        .sequence("orders_id_seq", 3)
}

async fn run(first: FakeSession, second: FakeSession, options: DiffOptions) -> Result<(DiffReport, Vec<String>)> {
    let status = RecordingStatus::default();
    let engine = DiffEngine::new(first, second, options, Box::new(status.clone()));
    let report = engine.run().await?;
    Ok((report, status.lines()))
}

fn item<'a>(report: &'a DiffReport, name: &str) -> &'a pgdatadiff::core::ItemReport {
    report
        .items
        .iter()
        .find(|i| i.name == name)
        .unwrap_or_else(|| panic!("no report item named {}", name))
}

#[tokio::test]
async fn test_identical_databases() -> Result<()> {
    let (report, lines) = run(source(), source(), options(2)).await?;

    assert_eq!(report.failures, 0);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.items.len(), 4);
    assert!(report.items.iter().all(|i| i.outcome == Outcome::Identical));
    assert_eq!(item(&report, "users").message, "data is identical.");
    assert_eq!(item(&report, "users_id_seq").message, "sequences are identical- (5).");
    assert!(!report.sequences_skipped);

    assert_eq!(
        lines,
        vec![
            "Starting table analysis.",
            "Analysing table orders. [1/2]",
            "Identical: orders - data is identical.",
            "Analysing table users. [2/2]",
            "Identical: users - data is identical.",
            "Table analysis complete.",
            "Starting sequence analysis.",
            "Analysing sequence orders_id_seq. [1/2]",
            "Identical: orders_id_seq - sequences are identical- (3).",
            "Analysing sequence users_id_seq. [2/2]",
            "Identical: users_id_seq - sequences are identical- (5).",
            "Sequence analysis complete.",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_changed_row_reports_chunk_position() -> Result<()> {
    let mut users = FakeTable::with_id_rows(5);
    users.rows[2].1 = "tampered".to_string();
    let second = source().table("users", users);

    let (report, _) = run(source(), second, options(2)).await?;

    let users = item(&report, "users");
    assert_eq!(users.outcome, Outcome::Different);
    assert_eq!(users.message, "data hash are different at row 2; offsets: {id: 2}");
    assert_eq!(item(&report, "orders").outcome, Outcome::Identical);
    assert_eq!(report.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_first_chunk_mismatch_has_no_offset() -> Result<()> {
    let mut orders = FakeTable::with_id_rows(3);
    orders.rows.pop();
    let second = source().table("orders", orders);

    let (report, _) = run(source(), second, options(10)).await?;

    let orders = item(&report, "orders");
    assert_eq!(orders.outcome, Outcome::Different);
    assert_eq!(orders.message, "row count mismatch at row 0; offsets: None");
    Ok(())
}

#[tokio::test]
async fn test_table_failures_skip_sequences() -> Result<()> {
    let mut second = source();
    second.tables.remove("orders");
    second.sequences.insert("users_id_seq".to_string(), 1);

    let (report, lines) = run(source(), second, options(100)).await?;

    assert_eq!(item(&report, "orders").message, "table is missing");
    assert!(report.sequences_skipped);
    assert!(report.items.iter().all(|i| i.kind == ItemKind::Table));
    assert!(!lines.iter().any(|l| l.contains("sequence")));
    assert_eq!(report.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_table_without_primary_key_is_inconclusive() -> Result<()> {
    let first = source().table("logs", FakeTable::without_key(4));
    let second = source().table("logs", FakeTable::without_key(4));

    let (report, _) = run(first, second, options(2)).await?;

    let logs = item(&report, "logs");
    assert_eq!(logs.outcome, Outcome::Inconclusive);
    assert_eq!(logs.message, "no primary key(s) on this table. Comparison is not possible.");
    assert_eq!(report.exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn test_count_only_mode() -> Result<()> {
    let first = source().table("empty", FakeTable::with_id_rows(0));
    let second = source()
        .table("empty", FakeTable::with_id_rows(0))
        .table("users", FakeTable::with_id_rows(7));

    let opts = DiffOptions {
        count_only: true,
        ..options(2)
    };
    let (report, _) = run(first, second, opts).await?;

    assert_eq!(item(&report, "users").message, "counts are different 5 != 7");
    assert_eq!(item(&report, "users").outcome, Outcome::Different);
    assert_eq!(item(&report, "orders").message, "Counts are the same");
    assert_eq!(item(&report, "empty").outcome, Outcome::Inconclusive);
    assert_eq!(item(&report, "empty").message, "tables are empty");
    // users differs, so sequences are never reached
    assert_eq!(report.items.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_sequence_outcomes() -> Result<()> {
    let first = source().sequence("audit_seq", 10);
    let second = source()
        .sequence("users_id_seq", 9)
        .sequence("orders_id_seq", 1);

    let opts = DiffOptions {
        only_sequences: true,
        ..options(100)
    };
    let (report, _) = run(first, second, opts).await?;

    assert!(report.items.iter().all(|i| i.kind == ItemKind::Sequence));

    let users = item(&report, "users_id_seq");
    assert_eq!(users.outcome, Outcome::Inconclusive);
    assert_eq!(users.message, "first sequence is less than the second(5 vs 9).");

    let orders = item(&report, "orders_id_seq");
    assert_eq!(orders.outcome, Outcome::Different);
    assert_eq!(orders.message, "first sequence is greater than the second(3 vs 1).");

    let audit = item(&report, "audit_seq");
    assert_eq!(audit.outcome, Outcome::Different);
    assert_eq!(audit.message, "sequence doesnt exist in second database.");

    assert_eq!(report.failures, 2);
    Ok(())
}

#[tokio::test]
async fn test_only_data_skips_sequences() -> Result<()> {
    let opts = DiffOptions {
        only_data: true,
        ..options(100)
    };
    let (report, lines) = run(source(), source(), opts).await?;

    assert_eq!(report.items.len(), 2);
    assert!(!report.sequences_skipped);
    assert!(!lines.contains(&"Starting sequence analysis.".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_excluded_tables_are_not_compared() -> Result<()> {
    let mut second = source();
    second.tables.remove("orders");

    let opts = DiffOptions {
        exclude_tables: vec!["orders".to_string()],
        ..options(100)
    };
    let (report, _) = run(source(), second, opts).await?;

    assert!(report.items.iter().all(|i| i.name != "orders"));
    assert_eq!(report.exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn test_transient_errors_are_retried() -> Result<()> {
    let (report, _) = run(source().failing(2), source().failing(3), options(2)).await?;
    assert_eq!(report.failures, 0);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_retries_abort_the_run() {
    let opts = DiffOptions {
        retry: RetryPolicy::new(1, Duration::ZERO),
        ..options(2)
    };
    let status = RecordingStatus::default();
    let engine = DiffEngine::new(source().failing(5), source(), opts, Box::new(status));

    let err = engine.run().await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_chunks_walk_until_empty_page() -> Result<()> {
    let first = FakeSession::new().table("users", FakeTable::with_id_rows(4));
    let second = FakeSession::new().table("users", FakeTable::with_id_rows(4));
    let opts = options(2);

    let differ = TableDiffer::new(&first, &second, &opts);
    let result = differ.diff_table("users").await?;

    assert_eq!(result.outcome, Outcome::Identical);
    // two full pages, then an empty one
    assert_eq!(first.chunk_calls(), 3);
    assert_eq!(second.chunk_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_short_page_ends_the_walk() -> Result<()> {
    let first = FakeSession::new().table("users", FakeTable::with_id_rows(5));
    let second = FakeSession::new().table("users", FakeTable::with_id_rows(5));
    let opts = options(2);

    let differ = TableDiffer::new(&first, &second, &opts);
    differ.diff_table("users").await?;

    assert_eq!(first.chunk_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_extra_rows_in_second_database() -> Result<()> {
    let first = FakeSession::new().table("users", FakeTable::with_id_rows(4));
    let second = FakeSession::new().table("users", FakeTable::with_id_rows(5));
    let opts = options(2);

    let differ = TableDiffer::new(&first, &second, &opts);
    let result = differ.diff_table("users").await?;

    assert_eq!(result.outcome, Outcome::Different);
    assert_eq!(result.message, "row count mismatch at row 4; offsets: {id: 4}");
    Ok(())
}

fn grid_table() -> FakeTable {
    let mut rows = Vec::new();
    for x in 1..=4 {
        for y in 1..=3 {
            rows.push((vec![x, y], format!("cell-{}-{}", x, y)));
        }
    }
    FakeTable {
        keys: vec![KeyColumn::new("x", "integer"), KeyColumn::new("y", "integer")],
        rows,
    }
}

#[tokio::test]
async fn test_composite_key_pages_on_both_columns() -> Result<()> {
    let first = FakeSession::new().table("grid", grid_table());
    let mut tampered = grid_table();
    // (2, 3) follows the (2, 2) page boundary and shares its x
    tampered.rows[5].1 = "tampered".to_string();
    let second = FakeSession::new().table("grid", tampered);
    let opts = options(5);

    let differ = TableDiffer::new(&first, &second, &opts);
    let result = differ.diff_table("grid").await?;

    assert_eq!(result.outcome, Outcome::Different);
    assert_eq!(result.message, "data hash are different at row 5; offsets: {x: 2, y: 2}");
    Ok(())
}

#[tokio::test]
async fn test_composite_key_identical_walk() -> Result<()> {
    let first = FakeSession::new().table("grid", grid_table());
    let second = FakeSession::new().table("grid", grid_table());
    let opts = options(5);

    let differ = TableDiffer::new(&first, &second, &opts);
    let result = differ.diff_table("grid").await?;

    assert_eq!(result.outcome, Outcome::Identical);
    // 5 + 5 + 2 rows
    assert_eq!(first.chunk_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_permanent_table_error_does_not_stop_the_run() -> Result<()> {
    let (report, lines) = run(source(), source().broken("orders"), options(2)).await?;

    let orders = item(&report, "orders");
    assert_eq!(orders.outcome, Outcome::Different);
    assert_eq!(
        orders.message,
        "comparison failed: Configuration error: permission denied for orders"
    );
    assert_eq!(item(&report, "users").outcome, Outcome::Identical);
    assert!(lines.contains(&"Analysing table users. [2/2]".to_string()));
    assert!(report.sequences_skipped);
    assert_eq!(report.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_permanent_sequence_error_does_not_stop_the_run() -> Result<()> {
    let opts = DiffOptions {
        only_sequences: true,
        ..options(100)
    };
    let (report, lines) = run(source(), source().broken("orders_id_seq"), opts).await?;

    let orders = item(&report, "orders_id_seq");
    assert_eq!(orders.outcome, Outcome::Different);
    assert_eq!(
        orders.message,
        "comparison failed: Configuration error: permission denied for orders_id_seq"
    );
    assert_eq!(item(&report, "users_id_seq").outcome, Outcome::Identical);
    assert!(lines.contains(&"Sequence analysis complete.".to_string()));
    assert_eq!(report.failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_sequence_missing_in_first_database() -> Result<()> {
    let first = FakeSession::new();
    let second = FakeSession::new().sequence("invoices_id_seq", 12);
    let opts = options(100);

    let differ = SequenceDiffer::new(&first, &second, &opts);
    let result = differ.diff_sequence("invoices_id_seq").await?;

    assert_eq!(result.outcome, Outcome::Different);
    assert_eq!(result.message, "sequence doesnt exist in first database.");
    Ok(())
}

#[tokio::test]
async fn test_report_round_trips_through_storage() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut second = source();
    second.sequences.insert("orders_id_seq".to_string(), 99);

    let (report, _) = run(source(), second, options(100)).await?;

    let writer = ReportWriter::new(LocalStorage::new(temp_dir.path()));
    writer.write("out/report.json", &report).await?;

    let raw = std::fs::read_to_string(temp_dir.path().join("out/report.json"))?;
    assert!(raw.contains("\"outcome\": \"inconclusive\""));

    let loaded = writer.read("out/report.json").await?;
    assert_eq!(loaded.items, report.items);
    assert_eq!(loaded.failures_of(ItemKind::Sequence), 0);
    assert_eq!(loaded.failures_of(ItemKind::Table), 0);
    Ok(())
}
