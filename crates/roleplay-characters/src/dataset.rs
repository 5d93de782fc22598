use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::Character;

/// Errors raised while opening or reading a character dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read dataset: {0}")]
    Read(#[from] std::io::Error),

    #[error("Malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A lazy stream of raw records from one pass over a dataset.
pub type RecordStream = Box<dyn Iterator<Item = Result<Character, DatasetError>> + Send>;

/// A dataset that can be reopened any number of times.
///
/// Each call to [`CharacterDataset::open`] starts a fresh pass; the seed
/// controls the shuffle order of that pass.
pub trait CharacterDataset: Send {
    /// Human-readable dataset name, used in logs
    fn name(&self) -> &str;

    /// Open a new pass over the dataset
    fn open(&self, seed: u64) -> Result<RecordStream, DatasetError>;
}

/// Character records stored one JSON object per line.
pub struct JsonlDataset {
    path: PathBuf,
    name: String,
    buffer_size: usize,
}

impl JsonlDataset {
    pub fn new(path: impl Into<PathBuf>, buffer_size: usize) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            buffer_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CharacterDataset for JsonlDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, seed: u64) -> Result<RecordStream, DatasetError> {
        let file = File::open(&self.path).map_err(|source| DatasetError::Open {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), seed, "Opening character dataset");

        let records = BufReader::new(file)
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(
                    serde_json::from_str::<Character>(&line).map_err(|source| {
                        DatasetError::Malformed {
                            line: idx + 1,
                            source,
                        }
                    }),
                ),
                Err(e) => Some(Err(DatasetError::Read(e))),
            });

        Ok(Box::new(Shuffled::new(records, self.buffer_size, seed)))
    }
}

/// In-memory dataset. Every pass yields the records in their stored order.
#[derive(Debug, Clone, Default)]
pub struct VecDataset {
    records: Vec<Character>,
}

impl VecDataset {
    pub fn new(records: Vec<Character>) -> Self {
        Self { records }
    }

    /// A dataset with no records at all
    pub fn empty() -> Self {
        Self::default()
    }
}

impl CharacterDataset for VecDataset {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn open(&self, _seed: u64) -> Result<RecordStream, DatasetError> {
        Ok(Box::new(self.records.clone().into_iter().map(Ok)))
    }
}

/// Buffered shuffle over a stream too large to hold in memory.
///
/// Up to `capacity` items are held; each step yields a uniformly chosen
/// buffered item and refills from the inner stream.
pub struct Shuffled<I: Iterator> {
    inner: I,
    buffer: Vec<I::Item>,
    capacity: usize,
    rng: StdRng,
}

impl<I: Iterator> Shuffled<I> {
    pub fn new(inner: I, capacity: usize, seed: u64) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<I: Iterator> Iterator for Shuffled<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.len() < self.capacity {
            match self.inner.next() {
                Some(item) => self.buffer.push(item),
                None => break,
            }
        }

        if self.buffer.is_empty() {
            return None;
        }

        let idx = self.rng.gen_range(0..self.buffer.len());
        Some(self.buffer.swap_remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffle_yields_every_item_once() {
        let mut items: Vec<u32> = Shuffled::new(0..100u32, 16, 7).collect();
        items.sort_unstable();
        assert_eq!(items, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_is_deterministic_per_seed() {
        let a: Vec<u32> = Shuffled::new(0..50u32, 10, 42).collect();
        let b: Vec<u32> = Shuffled::new(0..50u32, 10, 42).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffle_buffer_of_one_preserves_order() {
        let items: Vec<u32> = Shuffled::new(0..5u32, 1, 3).collect();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_vec_dataset_reopens_from_start() {
        let dataset = VecDataset::new(vec![Character::new("A", "a"), Character::new("B", "b")]);
        let first: Vec<_> = dataset.open(1).unwrap().map(|c| c.unwrap().name).collect();
        let second: Vec<_> = dataset.open(2).unwrap().map(|c| c.unwrap().name).collect();
        assert_eq!(first, vec!["A", "B"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_jsonl_file_fails_to_open() {
        let dataset = JsonlDataset::new("/definitely/not/here.jsonl", 10);
        assert!(matches!(dataset.open(0), Err(DatasetError::Open { .. })));
    }
}
