use crate::core::DiffOptions;
use crate::domain::model::{DiffResult, ItemKind, ItemReport, Outcome};
use crate::domain::ports::{DatabaseSession, StatusSink, Tone};
use crate::utils::error::Result;
use crate::utils::retry::retry;
use std::cmp::Ordering;

pub const MSG_MISSING_IN_SECOND: &str = "sequence doesnt exist in second database.";
pub const MSG_MISSING_IN_FIRST: &str = "sequence doesnt exist in first database.";

pub struct SequenceDiffer<'a, F: DatabaseSession, S: DatabaseSession> {
    first: &'a F,
    second: &'a S,
    options: &'a DiffOptions,
}

impl<'a, F: DatabaseSession, S: DatabaseSession> SequenceDiffer<'a, F, S> {
    pub fn new(first: &'a F, second: &'a S, options: &'a DiffOptions) -> Self {
        Self {
            first,
            second,
            options,
        }
    }

    pub async fn diff_sequence(&self, sequence: &str) -> Result<DiffResult> {
        let schema = self.options.schema.as_str();
        let policy = &self.options.retry;

        let first = retry(policy, "sequence value", || self.first.sequence_last_value(schema, sequence)).await?;
        let second = retry(policy, "sequence value", || self.second.sequence_last_value(schema, sequence)).await?;

        let (first, second) = match (first, second) {
            (Some(a), Some(b)) => (a, b),
            (_, None) => return Ok(DiffResult::different(MSG_MISSING_IN_SECOND)),
            (None, Some(_)) => return Ok(DiffResult::different(MSG_MISSING_IN_FIRST)),
        };

        Ok(compare_values(first, second))
    }

    pub async fn diff_all_sequences(&self, status: &dyn StatusSink) -> Result<Vec<ItemReport>> {
        status.heading("Starting sequence analysis.", Tone::Start);

        let schema = self.options.schema.as_str();
        let mut sequences =
            retry(&self.options.retry, "sequence listing", || self.first.list_sequences(schema)).await?;
        sequences.sort();

        let total = sequences.len();
        let mut reports = Vec::with_capacity(total);
        for (index, sequence) in sequences.iter().enumerate() {
            let handle = status.begin(&format!(
                "Analysing sequence {}. [{}/{}]",
                sequence,
                index + 1,
                total
            ));
            let result = match self.diff_sequence(sequence).await {
                Ok(result) => result,
                Err(e) if !e.is_transient() => {
                    tracing::error!("sequence {} could not be compared: {}", sequence, e);
                    DiffResult::different(format!("comparison failed: {}", e))
                }
                Err(e) => {
                    handle.complete(Outcome::Different, &format!("{} - {}", sequence, e));
                    return Err(e);
                }
            };
            handle.complete(result.outcome, &format!("{} - {}", sequence, result.message));
            reports.push(ItemReport::new(ItemKind::Sequence, sequence.clone(), result));
        }

        status.heading("Sequence analysis complete.", Tone::Complete);
        Ok(reports)
    }
}

/// A second sequence that is ahead only warns: the target may have consumed more values.
fn compare_values(first: i64, second: i64) -> DiffResult {
    match first.cmp(&second) {
        Ordering::Less => DiffResult::inconclusive(format!(
            "first sequence is less than the second({} vs {}).",
            first, second
        )),
        Ordering::Greater => DiffResult::different(format!(
            "first sequence is greater than the second({} vs {}).",
            first, second
        )),
        Ordering::Equal => DiffResult::identical(format!("sequences are identical- ({}).", first)),
    }
}
