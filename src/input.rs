use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::{ExtractError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Fasta,
    PeakTable,
}

// An input is usable when it exists and is non-empty. A FASTA file must also
// carry at least one '>' definition line somewhere in the file.
pub fn check_input(path: &Path, kind: InputKind) -> Result<()> {
    if !path.exists() {
        return Err(ExtractError::NotFound {
            path: path.to_path_buf(),
        });
    }

    if fs::metadata(path)?.len() == 0 {
        return Err(invalid(path, "the file is empty"));
    }

    if kind == InputKind::Fasta {
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            if line?.starts_with('>') {
                return Ok(());
            }
        }
        return Err(invalid(path, "no FASTA header line found"));
    }

    Ok(())
}

fn invalid(path: &Path, reason: &str) -> ExtractError {
    ExtractError::InvalidInput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
