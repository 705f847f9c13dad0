//! Session history: what was projected and when

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::constants::{config, projector::HISTORY_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Card,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub path: String,
    /// Unix milliseconds
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    entries: VecDeque<HistoryEntry>,
}

impl SessionHistory {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::HISTORY_FILENAME);
        path
    }

    /// Missing or unreadable history starts empty
    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            debug!(path = %path.display(), "No session history yet");
            return Self::default();
        };
        match serde_json::from_str::<SessionHistory>(&contents) {
            Ok(mut history) => {
                history.truncate();
                info!(path = %path.display(), entries = history.len(), "Loaded session history");
                history
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to parse session history, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create history directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize session history")?;
        fs::write(path, json).context(format!("Failed to write session history to {}", path.display()))?;
        Ok(())
    }

    pub fn record(&mut self, path: &str, kind: HistoryKind, timestamp: i64) {
        self.entries.push_back(HistoryEntry {
            path: path.to_string(),
            timestamp,
            kind,
        });
        self.truncate();
    }

    fn truncate(&mut self) {
        while self.entries.len() > HISTORY_LIMIT {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Markdown grouped by local date
    pub fn to_markdown(&self) -> String {
        self.to_markdown_in(&Local)
    }

    /// Entries keep their recorded order; a new heading starts whenever the
    /// date changes
    pub fn to_markdown_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut md = String::from("# Session History\n\n");
        let mut current_date: Option<String> = None;

        for entry in &self.entries {
            let Some(when) = DateTime::from_timestamp_millis(entry.timestamp) else {
                continue;
            };
            let when = when.with_timezone(tz);
            let date = when.format("%Y-%m-%d").to_string();
            if current_date.as_deref() != Some(date.as_str()) {
                if current_date.is_some() {
                    md.push('\n');
                }
                md.push_str(&format!("## {date}\n\n"));
                current_date = Some(date);
            }

            let name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
            let name = match name.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => name,
            };
            let icon = match entry.kind {
                HistoryKind::Card => "🎴",
                HistoryKind::Map => "🗺️",
            };
            md.push_str(&format!("- {} {icon} [[{}|{name}]]\n", when.format("%H:%M:%S"), entry.path));
        }
        md
    }

    /// File name for an export made now
    pub fn export_filename() -> String {
        format!("Session History {}.md", Local::now().format("%Y-%m-%d"))
    }
}
