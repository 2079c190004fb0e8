//! Run report artifacts.
//!
//! Each run leaves two files in the log directory: a JSON document for tools
//! and a plain-text log for people.

use anyhow::Context;
use chrono::{DateTime, Utc};
use search_replace::LogEntry;
use serde::Serialize;
use std::fmt::{Display, Write as _};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_DIR: &str = ".wp-dbtool-logs";

/// Everything recorded about one run.
#[derive(Debug, Serialize)]
pub struct RunReport<J, S> {
    /// Short operation name, also used in the file names.
    pub operation: &'static str,
    pub job: J,
    pub stats: S,
    pub entries: Vec<LogEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Where [`RunReport::write_to`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub log: PathBuf,
}

impl<J: Serialize, S: Serialize + Display> RunReport<J, S> {
    /// Plain-text rendering: one line per log entry, then the statistics.
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{} started {} finished {}",
            self.operation,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.finished_at.format("%Y-%m-%d %H:%M:%S")
        );
        text.push('\n');
        for entry in &self.entries {
            let _ = writeln!(text, "{entry}");
        }
        text.push('\n');
        let _ = writeln!(text, "{}", self.stats);
        text
    }

    /// Write `<operation>_<timestamp>.json` and `.log` into `dir`, creating it
    /// if needed.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<ReportPaths> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let stem = format!(
            "{}_{}",
            self.operation,
            self.started_at.format("%Y%m%d_%H%M%S")
        );
        let paths = ReportPaths {
            json: dir.join(format!("{stem}.json")),
            log: dir.join(format!("{stem}.log")),
        };

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(&paths.json, json)
            .with_context(|| format!("Failed to write {}", paths.json.display()))?;
        std::fs::write(&paths.log, self.render_text())
            .with_context(|| format!("Failed to write {}", paths.log.display()))?;

        tracing::info!("Report written to {}", paths.json.display());
        Ok(paths)
    }
}
