use crate::domain::model::DiffReport;
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Writes the comparison report as pretty-printed JSON.
pub struct ReportWriter<S: Storage> {
    storage: S,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn write(&self, path: &str, report: &DiffReport) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)?;
        self.storage.write_file(path, &json).await?;
        tracing::info!("📁 Report saved to: {}", path);
        Ok(())
    }

    pub async fn read(&self, path: &str) -> Result<DiffReport> {
        let data = self.storage.read_file(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}
