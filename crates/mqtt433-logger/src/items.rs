//! Log items read from the logger configuration.
//!
//! Every top-level record with a non-empty `maintopic` is a log item. Its
//! `topic*` keys name the sub-topics to subscribe to, relative to the main
//! topic.

use std::path::PathBuf;

use mqtt433_core::{ConfigTree, TypedValue};
use tracing::warn;

use crate::error::{LoggerError, LoggerResult};
use crate::schema::keys;

/// One logged main topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogItem {
    pub name: String,
    pub main_topic: String,
    pub folder: PathBuf,
    /// Full subscription topics, possibly with wildcards.
    pub topics: Vec<String>,
}

impl LogItem {
    /// Read an item from its record. Records without a main topic are not
    /// items and yield `Ok(None)`.
    pub fn from_record(name: &str, record: &ConfigTree) -> LoggerResult<Option<Self>> {
        let Some(main_topic) = non_empty(record, keys::MAIN_TOPIC) else {
            return Ok(None);
        };
        let folder = non_empty(record, keys::FOLDER).ok_or_else(|| LoggerError::MissingField {
            item: name.to_string(),
            field: keys::FOLDER.to_string(),
        })?;

        let prefix = if main_topic.ends_with('/') {
            main_topic.clone()
        } else {
            format!("{}/", main_topic)
        };
        let topics = record
            .scalars()
            .filter(|(key, value)| key.starts_with(keys::TOPIC_PREFIX) && !value.is_empty())
            .map(|(_, value)| format!("{}{}", prefix, value.format()))
            .collect();

        Ok(Some(Self {
            name: name.to_string(),
            main_topic,
            folder: PathBuf::from(folder),
            topics,
        }))
    }

    /// Main topic without a trailing `/`.
    pub fn base_topic(&self) -> &str {
        self.main_topic
            .strip_suffix('/')
            .unwrap_or(&self.main_topic)
    }

    /// Whether a message on `topic` belongs to this item: its parent topic
    /// equals the main topic.
    pub fn matches(&self, topic: &str) -> bool {
        parent_topic(topic) == self.base_topic()
    }
}

/// All log items in document order. Items that cannot be used are logged
/// and left out.
pub fn log_items(tree: &ConfigTree) -> Vec<LogItem> {
    tree.records()
        .filter_map(|(name, record)| match LogItem::from_record(name, record) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping log item: {}", e);
                None
            }
        })
        .collect()
}

/// Topic up to its last `/`, empty when there is none.
pub fn parent_topic(topic: &str) -> &str {
    topic.rfind('/').map(|i| &topic[..i]).unwrap_or("")
}

fn non_empty(record: &ConfigTree, key: &str) -> Option<String> {
    record
        .scalar(key)
        .filter(|v| !v.is_empty())
        .map(TypedValue::format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entries: &[(&str, &str)]) -> ConfigTree {
        let mut tree = ConfigTree::new();
        for (k, v) in entries {
            tree.insert(*k, TypedValue::parse(v));
        }
        tree
    }

    #[test]
    fn test_item_topics() {
        let garden = record(&[
            ("folder", "/var/log/mqtt"),
            ("maintopic", "home/garden"),
            ("topic1", "temp"),
            ("topic2", "+"),
            ("other", "ignored"),
            ("topic3", ""),
        ]);
        let item = LogItem::from_record("garden", &garden).unwrap().unwrap();
        assert_eq!(item.topics, vec!["home/garden/temp", "home/garden/+"]);
        assert_eq!(item.folder, PathBuf::from("/var/log/mqtt"));
    }

    #[test]
    fn test_trailing_slash() {
        let item = LogItem::from_record(
            "x",
            &record(&[("folder", "/tmp"), ("maintopic", "home/x/"), ("topic1", "a")]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(item.topics, vec!["home/x/a"]);
        assert_eq!(item.base_topic(), "home/x");
        assert!(item.matches("home/x/a"));
        assert!(!item.matches("home/x/a/b"));
        assert!(!item.matches("home/y/a"));
    }

    #[test]
    fn test_non_items() {
        assert_eq!(
            LogItem::from_record("x", &record(&[("folder", "/tmp")])).unwrap(),
            None
        );
        assert_eq!(
            LogItem::from_record("x", &record(&[("maintopic", ""), ("folder", "/tmp")])).unwrap(),
            None
        );
        assert!(matches!(
            LogItem::from_record("x", &record(&[("maintopic", "a")])),
            Err(LoggerError::MissingField { .. })
        ));
    }

    #[test]
    fn test_log_items_skips_broken() {
        let mut tree = ConfigTree::new();
        tree.insert("broker", "localhost");
        tree.insert("a", record(&[("maintopic", "a"), ("folder", "/tmp")]));
        tree.insert("b", record(&[("maintopic", "b")]));
        tree.insert("c", record(&[("maintopic", "c"), ("folder", "/tmp")]));

        let names: Vec<_> = log_items(&tree).into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_parent_topic() {
        assert_eq!(parent_topic("home/garden/temp"), "home/garden");
        assert_eq!(parent_topic("temp"), "");
    }
}
