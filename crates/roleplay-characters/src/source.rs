use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{Character, CharacterDataset, DatasetError, RecordStream, VecDataset};

/// Shuffle buffer size used for streamed datasets
pub const SHUFFLE_BUFFER_SIZE: usize = 10_000;

/// Range the per-pass shuffle seed is drawn from
pub const SEED_RANGE: Range<u64> = 0..1000;

/// Consecutive reloads that may come back without a usable record before
/// the source gives up.
const MAX_EMPTY_RELOADS: usize = 3;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Character dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Character dataset produced no valid record after {reloads} reloads")]
    Starved { reloads: usize },
}

/// Infinite cursor over a character dataset.
///
/// Records with a blank name or description are skipped. When the current
/// pass is exhausted the stream handle is replaced by a fresh pass with a
/// new shuffle seed, so callers never observe the end of the dataset.
pub struct CharacterSource {
    dataset: Box<dyn CharacterDataset>,
    stream: RecordStream,
    rng: StdRng,
    reloads: usize,
}

impl CharacterSource {
    /// Open the first pass over `dataset`. Fails if the dataset cannot be
    /// opened at all.
    pub fn new(dataset: impl CharacterDataset + 'static) -> Result<Self, SourceError> {
        Self::with_rng(dataset, StdRng::from_entropy())
    }

    /// Like [`CharacterSource::new`] with a caller-supplied seed generator
    pub fn with_rng(
        dataset: impl CharacterDataset + 'static,
        mut rng: StdRng,
    ) -> Result<Self, SourceError> {
        let seed = rng.gen_range(SEED_RANGE);
        let stream = dataset.open(seed)?;
        info!(dataset = dataset.name(), seed, "Character source ready");
        Ok(Self {
            dataset: Box::new(dataset),
            stream,
            rng,
            reloads: 0,
        })
    }

    /// A source that returns the same stub character forever
    pub fn stub() -> Self {
        Self::from_vec(vec![Character::stub()])
    }

    /// A source over an empty dataset; every call reports starvation
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    fn from_vec(records: Vec<Character>) -> Self {
        let dataset = VecDataset::new(records);
        let stream: RecordStream = Box::new(std::iter::empty());
        Self {
            dataset: Box::new(dataset),
            stream,
            rng: StdRng::seed_from_u64(0),
            reloads: 0,
        }
    }

    /// Number of times the underlying stream has been replaced
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    /// Pull the next valid character.
    ///
    /// Exhaustion of the underlying pass is absorbed here. The only error
    /// returned is a dataset that cannot be reopened or that yields no
    /// valid record across several consecutive passes.
    pub fn next_character(&mut self) -> Result<Character, SourceError> {
        let mut empty_reloads = 0;

        loop {
            debug!(dataset = self.dataset.name(), "Retrieving character from dataset");

            match self.stream.next() {
                Some(Ok(character)) if character.is_valid() => return Ok(character),
                Some(Ok(character)) => {
                    debug!(
                        name = %character.name.trim(),
                        "Skipping character with blank name or description"
                    );
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Skipping unreadable character record");
                }
                None => {
                    if empty_reloads >= MAX_EMPTY_RELOADS {
                        return Err(SourceError::Starved {
                            reloads: empty_reloads,
                        });
                    }
                    empty_reloads += 1;
                    self.reload()?;
                }
            }
        }
    }

    fn reload(&mut self) -> Result<(), SourceError> {
        let seed = self.rng.gen_range(SEED_RANGE);
        self.stream = self.dataset.open(seed)?;
        self.reloads += 1;
        debug!(
            dataset = self.dataset.name(),
            seed,
            reloads = self.reloads,
            "Reached end of character dataset, reloading"
        );
        Ok(())
    }
}
