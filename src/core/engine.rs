use crate::core::sequence_diff::SequenceDiffer;
use crate::core::table_diff::TableDiffer;
use crate::core::{DatabaseSession, DiffOptions, DiffReport, ItemKind, StatusSink};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::Utc;

pub struct DiffEngine<F: DatabaseSession, S: DatabaseSession> {
    first: F,
    second: S,
    options: DiffOptions,
    status: Box<dyn StatusSink>,
    monitor: SystemMonitor,
    first_label: String,
    second_label: String,
}

impl<F: DatabaseSession, S: DatabaseSession> DiffEngine<F, S> {
    pub fn new(first: F, second: S, options: DiffOptions, status: Box<dyn StatusSink>) -> Self {
        Self::new_with_monitoring(first, second, options, status, false)
    }

    pub fn new_with_monitoring(
        first: F,
        second: S,
        options: DiffOptions,
        status: Box<dyn StatusSink>,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            first,
            second,
            options,
            status,
            monitor: SystemMonitor::new(monitor_enabled),
            first_label: "first".to_string(),
            second_label: "second".to_string(),
        }
    }

    /// Names recorded in the report for each side. Pass redacted strings.
    pub fn with_labels(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.first_label = first.into();
        self.second_label = second.into();
        self
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Runs the table phase, then the sequence phase.
    ///
    /// Sequences are skipped when any table differs.
    pub async fn run(&self) -> Result<DiffReport> {
        let started_at = Utc::now();
        let mut items = Vec::new();
        let mut sequences_skipped = false;

        tracing::info!(
            schema = %self.options.schema,
            chunk_size = self.options.chunk_size,
            count_only = self.options.count_only,
            "Starting comparison"
        );
        self.monitor.log_stats("Start");

        if self.options.compares_tables() {
            let differ = TableDiffer::new(&self.first, &self.second, &self.options);
            let tables = differ.diff_all_tables(self.status.as_ref()).await?;
            let failed = tables.iter().filter(|t| t.outcome.is_failure()).count();
            tracing::info!("Compared {} tables, {} differ", tables.len(), failed);
            items.extend(tables);
            self.monitor.log_stats("Tables");

            if failed > 0 && self.options.compares_sequences() {
                tracing::warn!("Skipping sequence analysis because table data differs");
                sequences_skipped = true;
            }
        }

        if self.options.compares_sequences() && !sequences_skipped {
            let differ = SequenceDiffer::new(&self.first, &self.second, &self.options);
            let sequences = differ.diff_all_sequences(self.status.as_ref()).await?;
            let failed = sequences.iter().filter(|s| s.outcome.is_failure()).count();
            tracing::info!("Compared {} sequences, {} differ", sequences.len(), failed);
            items.extend(sequences);
            self.monitor.log_stats("Sequences");
        }

        self.monitor.log_final_stats();

        let failures = items.iter().filter(|i| i.outcome.is_failure()).count();
        let report = DiffReport {
            started_at,
            finished_at: Utc::now(),
            first: self.first_label.clone(),
            second: self.second_label.clone(),
            items,
            failures,
            sequences_skipped,
        };

        tracing::info!(
            tables = report.items.iter().filter(|i| i.kind == ItemKind::Table).count(),
            sequences = report.items.iter().filter(|i| i.kind == ItemKind::Sequence).count(),
            failures = report.failures,
            "Comparison finished"
        );

        Ok(report)
    }
}
