//! Tests for the file-backed key-value store

use tempfile::TempDir;

use syllabus::infrastructure::traits::{FileKeyValueStore, KeyValueStore};

#[test]
fn given_missing_key_when_get_then_none() {
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path());
    assert_eq!(store.get("mptt_template").unwrap(), None);
}

#[test]
fn given_value_when_set_then_get_returns_it_and_overwrites() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path().join("nested"));

    // Act
    store.set("syllabus_editor_data", "{\"2\":{}}").unwrap();
    store.set("syllabus_editor_data", "{}").unwrap();

    // Assert
    assert_eq!(store.get("syllabus_editor_data").unwrap().as_deref(), Some("{}"));
    assert!(temp.path().join("nested/syllabus_editor_data.json").is_file());
    let leftovers = std::fs::read_dir(temp.path().join("nested")).unwrap().count();
    assert_eq!(leftovers, 1, "temp files must be renamed into place");
}

#[test]
fn given_path_traversal_key_when_set_then_rejected() {
    let temp = TempDir::new().unwrap();
    let store = FileKeyValueStore::new(temp.path());
    assert!(store.set("../escape", "x").is_err());
}

#[cfg(unix)]
#[test]
fn given_unwritable_dir_when_set_then_error() {
    // A regular file where the directory should be
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let store = FileKeyValueStore::new(&blocker);
    assert!(store.set("mptt_template", "[]").is_err());
}
