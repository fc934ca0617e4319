use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::Topic;

const TOPICS_DIR: &str = "topics";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse topic JSON: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode topic JSON: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub fn topic_path(data_dir: &Path, topic_id: Uuid) -> PathBuf {
    data_dir.join(TOPICS_DIR).join(format!("{topic_id}.json"))
}

/// Loads the topic stored under `topic_id`. A missing or empty file is a
/// normal first run and yields a fresh empty topic.
pub fn load_topic(data_dir: &Path, topic_id: Uuid) -> Result<Topic, StorageError> {
    let path = topic_path(data_dir, topic_id);
    let raw = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Topic::new(topic_id)),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Topic::new(topic_id));
    }

    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

pub fn save_topic(data_dir: &Path, topic: &Topic) -> Result<(), StorageError> {
    let path = topic_path(data_dir, topic.id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    let json = serde_json::to_string_pretty(topic).map_err(StorageError::JsonEncode)?;
    fs::write(&path, json).map_err(StorageError::Io)
}

pub fn remove_topic(data_dir: &Path, topic_id: Uuid) -> Result<(), StorageError> {
    match fs::remove_file(topic_path(data_dir, topic_id)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StorageError::Io(err)),
    }
}
