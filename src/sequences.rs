use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;
use noodles::fasta::{self as fasta, record::Definition, Record};

use crate::{error::Result, peaks::PeakSequence};

pub const LINE_WIDTH: usize = 75;

// Extracted peaks grouped by TF name.
// - `order` holds each TF name once, in the order it was first seen
// - `data` holds the peaks of each TF in their original order
#[derive(Debug, Default)]
pub struct TfGroups {
    pub order: Vec<String>,
    pub data: HashMap<String, Vec<PeakSequence>>,
}

impl TfGroups {
    pub fn from_peaks(peaks: Vec<PeakSequence>) -> Self {
        peaks.into_iter().fold(Self::default(), |mut groups, peak| {
            match groups.data.get_mut(&peak.tf_name) {
                Some(group) => group.push(peak),
                None => {
                    groups.order.push(peak.tf_name.clone());
                    groups.data.insert(peak.tf_name.clone(), vec![peak]);
                }
            }
            groups
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PeakSequence])> {
        self.order.iter().filter_map(|tf_name| {
            self.data
                .get(tf_name)
                .map(|peaks| (tf_name.as_str(), peaks.as_slice()))
        })
    }

    // Writing creates `<TF_name>.fasta` in the output directory for every
    // group, replacing any file of that name. Each peak becomes a record named
    // `<TF_name>_<peak_number>` with its bases wrapped at LINE_WIDTH, and each
    // file ends with one blank line. The directory must already exist.
    pub fn write(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.len());
        for (tf_name, peaks) in self.iter() {
            let path = output_dir.join(format!("{tf_name}.fasta"));
            let mut file = BufWriter::new(File::create(&path)?);
            write_group(&mut file, tf_name, peaks)?;
            file.flush()?;
            debug!("wrote {} peak(s) to {}", peaks.len(), path.display());
            written.push(path);
        }
        Ok(written)
    }
}

fn write_group<W: Write>(out: &mut W, tf_name: &str, peaks: &[PeakSequence]) -> Result<()> {
    {
        let mut writer = fasta::writer::Builder::default()
            .set_line_base_count(LINE_WIDTH)
            .build_with_writer(&mut *out);
        for peak in peaks {
            let definition = Definition::new(format!("{tf_name}_{}", peak.peak_number), None);
            let record = Record::new(definition, peak.sequence.clone().into());
            writer.write_record(&record)?;
        }
    }
    writeln!(out)?;
    Ok(())
}
