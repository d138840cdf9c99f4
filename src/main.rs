use std::fs;

use clap::Parser;

mod cli;
mod error;
mod genome;
mod input;
mod peaks;
mod sequences;

use anyhow::{Context, Result};
use cli::Cli;
use genome::Genome;
use input::{check_input, InputKind};
use log::{info, warn};
use sequences::TfGroups;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse CLI arguments
    let args = Cli::parse();
    let (fasta_file, peak_file, columns) = args.get_input();
    let output_dir = args.get_output();

    // Both inputs are checked before anything is written.
    check_input(&fasta_file, InputKind::Fasta)?;
    check_input(&peak_file, InputKind::PeakTable)?;

    let genome = Genome::from_path(&fasta_file)?;
    if genome.is_empty() {
        warn!("{} contains no sequence", fasta_file.display());
    }

    // A table that cannot be read aborts here, before the output directory
    // is touched.
    let extraction = peaks::extract(&peak_file, &genome, columns)?;

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("could not create {}", output_dir.display()))?;
    peaks::write_rejection_log(&extraction.rejected, &output_dir)?;

    let groups = TfGroups::from_peaks(extraction.peaks);
    if groups.is_empty() {
        warn!("no peaks inside the genome, no FASTA files written");
    }
    let written = groups.write(&output_dir)?;
    info!("wrote {} FASTA file(s)", written.len());

    println!("FASTA files generated in {}", output_dir.display());
    Ok(())
}
