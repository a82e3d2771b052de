//! MQTT topic logger.
//!
//! Subscribes to the topics of every configured log item and writes the
//! received values to per-item CSV files. Files of the previous run are kept
//! as numbered backups.
//!
//! ## Architecture
//!
//! - **LogItem**: main topic, folder and sub-topics read from the configuration
//! - **CsvLog**: header and data file of one item
//! - **LogRotator**: numbered backups of the files of earlier runs
//! - **TopicLogger**: routes received messages to the log of their item

pub mod csv_log;
pub mod error;
pub mod items;
pub mod rotation;
pub mod runner;
pub mod schema;

pub use csv_log::CsvLog;
pub use error::{LoggerError, LoggerResult};
pub use items::{log_items, LogItem};
pub use rotation::{LogRotator, RotationReport, MAX_FILES};
pub use runner::{run_logger, TopicLogger};
pub use schema::{CONFIG_FILE, LOGGER_SCHEMA};
