//! CSV files of logged topic values.
//!
//! Each log item owns a header file and a data file in its folder, named
//! after the main topic with `/` replaced by `_`. The first three columns are
//! `timestamp, date, time`; every topic gets a column the first time it is
//! seen, which rewrites the header file. Each received value appends a row
//! holding the latest value of every column.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::schema::{HEADER_EXT, LOG_EXT};

/// Columns present in every log.
pub const FIXED_COLUMNS: [&str; 3] = ["timestamp", "date", "time"];

const SEPARATOR: &str = ", ";

/// Header and data file of one log item.
#[derive(Debug, Clone)]
pub struct CsvLog {
    header_path: PathBuf,
    log_path: PathBuf,
    columns: Vec<String>,
    values: HashMap<String, String>,
}

impl CsvLog {
    pub fn new(folder: &Path, main_topic: &str) -> Self {
        let stem = file_stem(main_topic);
        Self {
            header_path: folder.join(format!("{}{}", stem, HEADER_EXT)),
            log_path: folder.join(format!("{}{}", stem, LOG_EXT)),
            columns: FIXED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            values: HashMap::new(),
        }
    }

    pub fn header_path(&self) -> &Path {
        &self.header_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Record a value received now.
    pub fn record(&mut self, topic: &str, value: &str) {
        self.record_at(topic, value, Local::now());
    }

    /// Record a value received at `at`.
    pub fn record_at(&mut self, topic: &str, value: &str, at: DateTime<Local>) {
        if !self.columns.iter().any(|c| c == topic) {
            self.columns.push(topic.to_string());
            self.write_header();
        }
        self.values.insert(topic.to_string(), value.to_string());

        let line = self.row(at);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = written {
            warn!("Cannot write {}: {}", self.log_path.display(), e);
            info!("{}", line.trim_end());
        }
    }

    /// Header line, newline terminated.
    pub fn header(&self) -> String {
        format!("{}\n", self.columns.join(SEPARATOR))
    }

    /// Data line for time `at`, newline terminated.
    pub fn row(&self, at: DateTime<Local>) -> String {
        let cells: Vec<String> = self
            .columns
            .iter()
            .map(|column| match column.as_str() {
                "timestamp" => at.timestamp().to_string(),
                "date" => at.format("%d-%m-%Y").to_string(),
                "time" => at.format("%H:%M:%S").to_string(),
                topic => self.values.get(topic).cloned().unwrap_or_default(),
            })
            .collect();
        format!("{}\n", cells.join(SEPARATOR))
    }

    fn write_header(&self) {
        let header = self.header();
        if let Err(e) = fs::write(&self.header_path, &header) {
            warn!("Cannot write {}: {}", self.header_path.display(), e);
            info!("{}", header.trim_end());
        }
    }
}

/// File name stem for a main topic: trailing `/` dropped, `/` becomes `_`.
pub fn file_stem(main_topic: &str) -> String {
    main_topic
        .strip_suffix('/')
        .unwrap_or(main_topic)
        .replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_file_names() {
        let log = CsvLog::new(Path::new("/var/log/mqtt"), "home/garden/");
        assert_eq!(
            log.header_path(),
            Path::new("/var/log/mqtt/home_garden_header.csv")
        );
        assert_eq!(log.log_path(), Path::new("/var/log/mqtt/home_garden_log.csv"));
    }

    #[test]
    fn test_new_topic_rewrites_header() {
        let dir = TempDir::new().unwrap();
        let mut log = CsvLog::new(dir.path(), "home/garden");

        log.record_at("home/garden/temp", "21.5", at());
        assert_eq!(
            fs::read_to_string(log.header_path()).unwrap(),
            "timestamp, date, time, home/garden/temp\n"
        );

        log.record_at("home/garden/hum", "40", at());
        log.record_at("home/garden/temp", "22", at());
        assert_eq!(
            fs::read_to_string(log.header_path()).unwrap(),
            "timestamp, date, time, home/garden/temp, home/garden/hum\n"
        );

        let epoch = at().timestamp();
        let expected = format!(
            "{e}, 04-03-2022, 05:06:07, 21.5\n\
             {e}, 04-03-2022, 05:06:07, 21.5, 40\n\
             {e}, 04-03-2022, 05:06:07, 22, 40\n",
            e = epoch
        );
        assert_eq!(fs::read_to_string(log.log_path()).unwrap(), expected);
    }

    #[test]
    fn test_unwritable_folder_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut log = CsvLog::new(&dir.path().join("missing"), "home");
        log.record_at("home/x", "1", at());
        assert_eq!(log.columns().len(), 4);
        assert!(!log.log_path().exists());
    }
}
