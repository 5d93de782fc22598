use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;
use roleplay_characters::{Character, CharacterSource, JsonlDataset, SHUFFLE_BUFFER_SIZE};
use tempfile::TempDir;

/// Helper: write a JSONL dataset mixing valid, blank and malformed records.
fn create_dataset(dir: &TempDir) -> std::path::PathBuf {
    let records = r#"{"name": "Ava", "description": "A curious robot.", "creator": "lab"}
{"name": "", "description": "Nameless wanderer."}
{"name": "Bram", "description": "\n\n"}
not json at all

{"name": "Cora", "description": "A retired sea captain.", "scenario": null}
{"name": "  ", "description": "  "}
"#;
    let path = dir.path().join("characters.jsonl");
    fs::write(&path, records).unwrap();
    path
}

#[test]
fn test_jsonl_source_only_returns_valid_characters() {
    let dir = TempDir::new().unwrap();
    let path = create_dataset(&dir);
    let mut source = CharacterSource::with_rng(
        JsonlDataset::new(&path, SHUFFLE_BUFFER_SIZE),
        StdRng::seed_from_u64(11),
    )
    .unwrap();

    for _ in 0..25 {
        let character = source.next_character().unwrap();
        assert!(character.is_valid());
        assert!(character.name == "Ava" || character.name == "Cora");
    }
    assert!(source.reloads() > 0);
}

#[test]
fn test_jsonl_source_covers_every_valid_character_per_pass() {
    let dir = TempDir::new().unwrap();
    let path = create_dataset(&dir);
    let mut source = CharacterSource::with_rng(
        JsonlDataset::new(&path, SHUFFLE_BUFFER_SIZE),
        StdRng::seed_from_u64(5),
    )
    .unwrap();

    let mut names: Vec<String> = (0..2)
        .map(|_| source.next_character().unwrap().name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Ava", "Cora"]);
}

#[test]
fn test_jsonl_source_fills_missing_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("one.jsonl");
    fs::write(&path, r#"{"name": "Ava", "description": "A curious robot."}"#).unwrap();

    let mut source = CharacterSource::new(JsonlDataset::new(&path, 16)).unwrap();
    let character = source.next_character().unwrap();
    assert_eq!(character, Character::new("Ava", "A curious robot."));
}

#[test]
fn test_missing_dataset_fails_construction() {
    let dir = TempDir::new().unwrap();
    let result = CharacterSource::new(JsonlDataset::new(dir.path().join("missing.jsonl"), 16));
    assert!(result.is_err());
}
