//! JSON file output handler
//!
//! Files are written to one directory and share a timestamp suffix per run:
//! `<platform>_movies_<stamp>.json`, `crawl_summary_<stamp>.json` and
//! `merged_movies_<stamp>.json`.

use crate::output::summary::RunSummary;
use crate::output::traits::{OutputError, OutputHandler, OutputResult};
use crate::platform::Platform;
use crate::record::MovieRecord;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes pretty-printed JSON files into an output directory
#[derive(Debug, Clone)]
pub struct JsonOutputHandler {
    directory: PathBuf,
    stamp: String,
}

impl JsonOutputHandler {
    /// Creates the handler, creating `directory` if needed
    pub fn new(directory: impl Into<PathBuf>) -> OutputResult<Self> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        Self::with_stamp(directory, stamp)
    }

    pub fn with_stamp(directory: impl Into<PathBuf>, stamp: impl Into<String>) -> OutputResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        if !directory.is_dir() {
            return Err(OutputError::Write(format!(
                "{} is not a directory",
                directory.display()
            )));
        }
        Ok(Self {
            directory,
            stamp: stamp.into(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> OutputResult<PathBuf> {
        let path = self.directory.join(format!("{}_{}.json", name, self.stamp));
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), "Wrote output file");
        Ok(path)
    }
}

impl OutputHandler for JsonOutputHandler {
    fn write_records(&self, platform: Platform, records: &[MovieRecord]) -> OutputResult<PathBuf> {
        self.write_json(&format!("{}_movies", platform), records)
    }

    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        self.write_json("crawl_summary", summary)
    }

    fn write_merged(&self, records: &[MovieRecord]) -> OutputResult<PathBuf> {
        self.write_json("merged_movies", records)
    }
}

/// Reads a JSON array of records written by `write_records` or `write_merged`
///
/// # Arguments
///
/// * `path` - Path to a records file
///
/// # Returns
///
/// * `Ok(Vec<MovieRecord>)` - The records in file order
/// * `Err(OutputError)` - Failed to read the file or decode its records
pub fn load_records(path: &Path) -> OutputResult<Vec<MovieRecord>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
