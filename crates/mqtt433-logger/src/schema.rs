//! Shape of the logger configuration document.

use mqtt433_core::DocumentSchema;

/// File name of the logger configuration under `/etc`.
pub const CONFIG_FILE: &str = "mqttlogger.xml";

/// Root element and inline documentation of the logger configuration.
pub const LOGGER_SCHEMA: DocumentSchema = DocumentSchema {
    root: "logger",
    default_annotation: "This XML file describes the topics to log.
            Add an item to add a log file.
            <logger> Main element, do not change name
                <broker> Address of MQTT broker
                <port> MQTT port
                <username> MQTT username
                <password> MQTT password
                <item> Item to log, enter name of item here, e.g. mydevice
                    <folder> Path to store logfiles
                    <maintopic> Main topic to log
                    <topic1> First topic to log (may contain wildcards)
                    <topic2> Second topic to log
                    ...
                    <topicn> nth topic to log",
};

/// Item keys.
pub mod keys {
    pub const MAIN_TOPIC: &str = "maintopic";
    pub const FOLDER: &str = "folder";
    /// Prefix of the keys naming logged sub-topics.
    pub const TOPIC_PREFIX: &str = "topic";
}

/// Suffix of the CSV header file.
pub const HEADER_EXT: &str = "_header.csv";
/// Suffix of the CSV data file.
pub const LOG_EXT: &str = "_log.csv";
