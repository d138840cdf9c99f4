use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::info;
use noodles::{
    core::Position,
    fasta::{self as fasta, record::Sequence},
};

use crate::error::{ExtractError, Result};

// The genome is every record of the FASTA file joined end to end, with
// definition lines dropped and whitespace removed. Peak coordinates address
// this flat sequence, never an individual record.
pub struct Genome {
    sequence: Sequence,
}

impl Genome {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExtractError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut inner = File::open(path).map(BufReader::new)?;

        // Lines ahead of the first definition line still belong to the genome.
        let mut bases = Vec::new();
        let mut line = Vec::new();
        while !matches!(inner.fill_buf()?.first(), None | Some(b'>')) {
            line.clear();
            inner.read_until(b'\n', &mut line)?;
            bases.extend(line.iter().filter(|base| !base.is_ascii_whitespace()));
        }

        let mut reader = fasta::Reader::new(inner);
        let mut record_count = 0;
        for result in reader.records() {
            let record = result?;
            bases.extend(
                record
                    .sequence()
                    .as_ref()
                    .iter()
                    .filter(|base| !base.is_ascii_whitespace()),
            );
            record_count += 1;
        }

        info!(
            "loaded {} bp from {} record(s) in {}",
            bases.len(),
            record_count,
            path.display()
        );

        Ok(Self::from(bases))
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bases `start..=end` in 1-based inclusive coordinates, or `None` when
    /// the range runs past the end of the genome.
    pub fn get(&self, start: Position, end: Position) -> Option<&[u8]> {
        self.sequence.get(start..=end)
    }
}

impl From<Vec<u8>> for Genome {
    fn from(bases: Vec<u8>) -> Self {
        Self {
            sequence: Sequence::from(bases),
        }
    }
}
