use crate::domain::model::{ContinuationSignal, HarvestTables};
use crate::domain::ports::{Storage, TableSink};
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const HOSPITALS_FILE: &str = "hospitals.csv";
pub const ADDRESSES_FILE: &str = "addresses.csv";
pub const DOCTORS_FILE: &str = "doctors.csv";

/// Writes one run's tables under a timestamped name, so runs never
/// overwrite each other but snapshots within a run do.
pub struct RunOutputWriter<S: Storage> {
    storage: S,
    display_root: String,
    run_name: String,
    compression: bool,
    continuation_file: String,
}

impl<S: Storage> RunOutputWriter<S> {
    pub fn new(
        storage: S,
        display_root: impl Into<String>,
        file_prefix: &str,
        compression: bool,
        continuation_file: impl Into<String>,
    ) -> Self {
        let run_name = format!(
            "{}_{}",
            file_prefix,
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        Self {
            storage,
            display_root: display_root.into(),
            run_name,
            compression,
            continuation_file: continuation_file.into(),
        }
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    fn display(&self, relative: &str) -> String {
        format!("{}/{}", self.display_root.trim_end_matches('/'), relative)
    }

    async fn write_zip(&self, tables: &HarvestTables) -> Result<String> {
        let file_name = format!("{}.zip", self.run_name);

        // 三張表打包成一個 ZIP
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>(HOSPITALS_FILE, FileOptions::default())?;
            zip.write_all(&to_csv(&tables.hospitals)?)?;

            zip.start_file::<_, ()>(ADDRESSES_FILE, FileOptions::default())?;
            zip.write_all(&to_csv(&tables.addresses)?)?;

            zip.start_file::<_, ()>(DOCTORS_FILE, FileOptions::default())?;
            zip.write_all(&to_csv(&tables.doctors)?)?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&file_name, &zip_data).await?;
        Ok(self.display(&file_name))
    }

    async fn write_csv_files(&self, tables: &HarvestTables) -> Result<String> {
        let files = [
            (HOSPITALS_FILE, to_csv(&tables.hospitals)?),
            (ADDRESSES_FILE, to_csv(&tables.addresses)?),
            (DOCTORS_FILE, to_csv(&tables.doctors)?),
        ];
        for (name, data) in files {
            let path = format!("{}/{}", self.run_name, name);
            self.storage.write_file(&path, &data).await?;
        }
        Ok(self.display(&self.run_name))
    }
}

#[async_trait]
impl<S: Storage> TableSink for RunOutputWriter<S> {
    async fn flush(&self, tables: &HarvestTables) -> Result<String> {
        let output_path = if self.compression {
            self.write_zip(tables).await?
        } else {
            self.write_csv_files(tables).await?
        };
        tracing::info!(
            "💾 Saved {} hospital / {} address / {} doctor rows to {}",
            tables.hospitals.len(),
            tables.addresses.len(),
            tables.doctors.len(),
            output_path
        );
        Ok(output_path)
    }

    async fn signal_continuation(&self, signal: &ContinuationSignal) -> Result<()> {
        let json_data = serde_json::to_string_pretty(signal)?;
        self.storage
            .write_file(&self.continuation_file, json_data.as_bytes())
            .await?;
        tracing::info!("🔁 Continuation signal written to {}", self.display(&self.continuation_file));
        Ok(())
    }

    async fn clear_continuation(&self) -> Result<()> {
        self.storage.remove_file(&self.continuation_file).await
    }
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| HarvestError::OutputError {
        message: format!("Failed to finish CSV buffer: {}", e),
    })
}
