use std::path::PathBuf;

use clap::Parser;

use crate::peaks::ColumnLayout;

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(
    about = "Creates FASTA files from a peak file to extract the Transcription Factor sequences"
)]
pub struct Cli {
    /// reference genome in FASTA format; all records are joined into one sequence
    #[arg(short, long, value_name = "FILE", required = true)]
    fasta: PathBuf,

    /// tab-separated peak table with a header row
    #[arg(short, long, value_name = "FILE", required = true)]
    peak: PathBuf,

    /// directory for the per-TF FASTA files and log.out (created if absent)
    #[arg(short, long, value_name = "DIR", required = true)]
    output: PathBuf,

    /// how peak table columns are located: by header name, by position
    /// (3, 4, 5, 7), or by name when the header carries any of the known names
    #[arg(short, long, value_enum, default_value_t = ColumnLayout::Auto)]
    columns: ColumnLayout,
}

impl Cli {
    pub fn get_input(&self) -> (PathBuf, PathBuf, ColumnLayout) {
        (self.fasta.clone(), self.peak.clone(), self.columns)
    }

    pub fn get_output(&self) -> PathBuf {
        self.output.clone()
    }
}
