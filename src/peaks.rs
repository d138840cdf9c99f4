use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};
use noodles::core::Position;

use crate::{
    error::{ExtractError, Result},
    genome::Genome,
};

pub const REJECTION_LOG: &str = "log.out";

const NAMED_COLUMNS: [&str; 4] = ["TF_name", "Peak_start", "Peak_end", "Peak_number"];

// 0-based indices of TF name, start, end and peak number in the legacy layout.
const POSITIONAL_COLUMNS: [usize; 4] = [2, 3, 4, 6];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColumnLayout {
    /// `named` if the header mentions any known column, `positional` otherwise
    #[default]
    Auto,
    /// look up TF_name, Peak_start, Peak_end and Peak_number in the header
    Named,
    /// columns 3, 4, 5 and 7
    Positional,
}

impl ColumnLayout {
    fn resolve(self, headers: &StringRecord) -> Result<Columns> {
        let layout = match self {
            Self::Auto if headers.iter().any(|header| NAMED_COLUMNS.contains(&header)) => {
                Self::Named
            }
            Self::Auto => Self::Positional,
            layout => layout,
        };

        if layout == Self::Positional {
            let missing: Vec<String> = POSITIONAL_COLUMNS
                .iter()
                .zip(NAMED_COLUMNS)
                .filter(|(index, _)| **index >= headers.len())
                .map(|(index, name)| format!("column {} ({name})", index + 1))
                .collect();
            return if missing.is_empty() {
                Ok(Columns(POSITIONAL_COLUMNS))
            } else {
                Err(ExtractError::Schema { missing })
            };
        }

        let mut indices = [0; 4];
        let mut missing = Vec::new();
        for (slot, name) in indices.iter_mut().zip(NAMED_COLUMNS) {
            let mut matches = headers
                .iter()
                .enumerate()
                .filter(|(_, header)| *header == name)
                .map(|(index, _)| index);
            match (matches.next(), matches.next()) {
                (Some(index), None) => *slot = index,
                (Some(_), Some(_)) => {
                    return Err(ExtractError::AmbiguousColumn {
                        name: name.to_string(),
                    })
                }
                (None, _) => missing.push(name.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(Columns(indices))
        } else {
            Err(ExtractError::Schema { missing })
        }
    }
}

// Field indices in the order TF name, start, end, peak number.
struct Columns([usize; 4]);

impl Columns {
    fn parse(&self, record: &StringRecord, line: u64) -> Result<Peak> {
        let field = |slot: usize| {
            record
                .get(self.0[slot])
                .ok_or_else(|| ExtractError::MissingField {
                    line,
                    column: NAMED_COLUMNS[slot].to_string(),
                })
        };
        let integer = |slot: usize| -> Result<i64> {
            let value = field(slot)?;
            parse_integer(value).ok_or_else(|| ExtractError::Parse {
                line,
                column: NAMED_COLUMNS[slot].to_string(),
                value: value.to_string(),
            })
        };

        Ok(Peak {
            tf_name: field(0)?.to_string(),
            start: integer(1)?,
            end: integer(2)?,
            peak_number: integer(3)?,
        })
    }
}

// Peak tables written by dataframe tools often carry integers as "105.0".
// Those are accepted as long as nothing is lost in the conversion.
fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let x: f64 = value.parse().ok()?;
    let in_range = x >= i64::MIN as f64 && x < i64::MAX as f64;
    (x.is_finite() && x.fract() == 0.0 && in_range).then_some(x as i64)
}

/// One row of the peak table. Coordinates are 1-based and inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peak {
    pub tf_name: String,
    pub start: i64,
    pub end: i64,
    pub peak_number: i64,
}

impl Peak {
    // None when the peak leaves the genome. A start past the end is still in
    // range and yields an empty sequence.
    fn locate(&self, genome: &Genome) -> Option<Vec<u8>> {
        let genome_len = i64::try_from(genome.len()).ok()?;
        if self.start < 1 || self.end > genome_len {
            return None;
        }
        if self.start > self.end {
            return Some(Vec::new());
        }

        let start = Position::try_from(usize::try_from(self.start).ok()?).ok()?;
        let end = Position::try_from(usize::try_from(self.end).ok()?).ok()?;
        genome.get(start, end).map(<[u8]>::to_vec)
    }
}

impl fmt::Display for Peak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TF: {}, Start: {}, End: {}, Peak_number: {}",
            self.tf_name, self.start, self.end, self.peak_number
        )
    }
}

/// A peak that was found in the genome, together with its bases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeakSequence {
    pub tf_name: String,
    pub sequence: Vec<u8>,
    pub peak_number: i64,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub peaks: Vec<PeakSequence>,
    pub rejected: Vec<Peak>,
}

// Read the peak table, then cut every peak out of the genome. Peaks outside
// the genome end up in `rejected` rather than failing the run.
pub fn extract(path: &Path, genome: &Genome, layout: ColumnLayout) -> Result<Extraction> {
    let peaks = read_peaks(path, layout)?;
    let extraction = locate_peaks(peaks, genome);
    info!(
        "extracted {} peak(s), {} out of genome range",
        extraction.peaks.len(),
        extraction.rejected.len()
    );
    Ok(extraction)
}

pub fn read_peaks(path: &Path, layout: ColumnLayout) -> Result<Vec<Peak>> {
    if !path.exists() {
        return Err(ExtractError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;
    let columns = layout.resolve(reader.headers()?)?;

    let mut peaks = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |position| position.line());
        peaks.push(columns.parse(&record, line)?);
    }

    info!("read {} peak(s) from {}", peaks.len(), path.display());
    Ok(peaks)
}

pub fn locate_peaks(peaks: Vec<Peak>, genome: &Genome) -> Extraction {
    let mut extraction = Extraction::default();
    for peak in peaks {
        match peak.locate(genome) {
            Some(sequence) => extraction.peaks.push(PeakSequence {
                tf_name: peak.tf_name,
                sequence,
                peak_number: peak.peak_number,
            }),
            None => extraction.rejected.push(peak),
        }
    }
    extraction
}

// Write `log.out` into the output directory. Nothing is written when every
// peak was in range.
pub fn write_rejection_log(rejected: &[Peak], output_dir: &Path) -> Result<Option<PathBuf>> {
    if rejected.is_empty() {
        return Ok(None);
    }

    let path = output_dir.join(REJECTION_LOG);
    let mut writer = BufWriter::new(File::create(&path)?);
    writeln!(writer, "Peaks out of genome range:")?;
    for peak in rejected {
        writeln!(writer, "{peak}")?;
    }
    writer.flush()?;

    warn!(
        "{} peaks out of genome range, see {}",
        rejected.len(),
        path.display()
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const NAMED_HEADER: &str = "Dataset_Id\tTF_name\tPeak_start\tPeak_end\tPeak_center\tPeak_number";
    const POSITIONAL_HEADER: &str = "Dataset_Id\tChr\tTF\tStart\tEnd\tCenter\tNumber";

    fn genome() -> Genome {
        Genome::from(b"ACGTACGTAC".to_vec())
    }

    fn peak(tf_name: &str, start: i64, end: i64, peak_number: i64) -> Peak {
        Peak {
            tf_name: tf_name.to_string(),
            start,
            end,
            peak_number,
        }
    }

    fn table(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("peaks.tsv");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn parses_integers_written_as_floats() {
        assert_eq!(parse_integer("105"), Some(105));
        assert_eq!(parse_integer("105.0"), Some(105));
        assert_eq!(parse_integer("1e3"), Some(1000));
        assert_eq!(parse_integer("-4"), Some(-4));
        assert_eq!(parse_integer("105.5"), None);
        assert_eq!(parse_integer("NaN"), None);
        assert_eq!(parse_integer("inf"), None);
        assert_eq!(parse_integer("chr1"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn reads_positional_columns() {
        let (_dir, path) = table(&format!(
            "{POSITIONAL_HEADER}\nds1\tchr\tTF1\t2.0\t5.0\t3\t1.0\nds1\tchr\tTF2\t1\t4\t2\t7\n"
        ));
        let peaks = read_peaks(&path, ColumnLayout::Auto).unwrap();
        assert_eq!(peaks, vec![peak("TF1", 2, 5, 1), peak("TF2", 1, 4, 7)]);
    }

    #[test]
    fn reads_named_columns_in_any_order() {
        let (_dir, path) = table(&format!(
            "{NAMED_HEADER}\nds1\tTF1\t2\t5\t3\t1\n\nds1\tTF1\t6\t9\t7\t2\n"
        ));
        let peaks = read_peaks(&path, ColumnLayout::Auto).unwrap();
        assert_eq!(peaks, vec![peak("TF1", 2, 5, 1), peak("TF1", 6, 9, 2)]);
    }

    #[test]
    fn missing_named_column_is_a_schema_error() {
        let (_dir, path) = table("Dataset_Id\tTF_name\tPeak_start\tPeak_number\nds1\tTF1\t2\t1\n");
        match read_peaks(&path, ColumnLayout::Auto) {
            Err(ExtractError::Schema { missing }) => assert_eq!(missing, vec!["Peak_end"]),
            other => panic!("expected a schema error, got {other:?}"),
        }
    }

    #[test]
    fn short_positional_header_is_a_schema_error() {
        let (_dir, path) = table("a\tb\tc\td\te\nx\tx\tTF1\t1\t2\n");
        match read_peaks(&path, ColumnLayout::Positional) {
            Err(ExtractError::Schema { missing }) => {
                assert_eq!(missing, vec!["column 7 (Peak_number)"])
            }
            other => panic!("expected a schema error, got {other:?}"),
        }
    }

    #[test]
    fn forced_named_layout_ignores_positions() {
        let (_dir, path) = table(&format!("{POSITIONAL_HEADER}\nds1\tchr\tTF1\t2\t5\t3\t1\n"));
        let err = read_peaks(&path, ColumnLayout::Named).unwrap_err();
        assert!(matches!(err, ExtractError::Schema { missing } if missing.len() == 4));
    }

    #[test]
    fn duplicated_named_column_is_rejected() {
        let (_dir, path) = table("TF_name\tPeak_start\tPeak_end\tPeak_number\tPeak_start\n");
        let err = read_peaks(&path, ColumnLayout::Named).unwrap_err();
        assert!(matches!(err, ExtractError::AmbiguousColumn { name } if name == "Peak_start"));
    }

    #[test]
    fn non_numeric_cell_names_line_and_column() {
        let (_dir, path) = table(&format!(
            "{NAMED_HEADER}\nds1\tTF1\t2\t5\t3\t1\nds1\tTF1\t2\tfive\t3\t2\n"
        ));
        match read_peaks(&path, ColumnLayout::Auto) {
            Err(ExtractError::Parse {
                line,
                column,
                value,
            }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "Peak_end");
                assert_eq!(value, "five");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn short_row_is_a_missing_field() {
        let (_dir, path) = table(&format!("{POSITIONAL_HEADER}\nds1\tchr\tTF1\t2\t5\n"));
        let err = read_peaks(&path, ColumnLayout::Auto).unwrap_err();
        assert!(
            matches!(err, ExtractError::MissingField { line: 2, column } if column == "Peak_number")
        );
    }

    #[test]
    fn missing_table_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_peaks(&dir.path().join("peaks.tsv"), ColumnLayout::Auto).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }));
    }

    #[test]
    fn extracts_inclusive_ranges() {
        let extraction = locate_peaks(vec![peak("TF1", 2, 5, 1)], &genome());
        assert_eq!(
            extraction.peaks,
            vec![PeakSequence {
                tf_name: "TF1".to_string(),
                sequence: b"CGTA".to_vec(),
                peak_number: 1,
            }]
        );
        assert!(extraction.rejected.is_empty());
    }

    #[test]
    fn sequence_length_matches_coordinates() {
        let genome = genome();
        let bases = b"ACGTACGTAC";
        for start in 1..=10 {
            for end in start..=10 {
                let extraction = locate_peaks(vec![peak("TF1", start, end, 1)], &genome);
                let sequence = &extraction.peaks[0].sequence;
                assert_eq!(sequence.len() as i64, end - start + 1);
                assert_eq!(&sequence[..], &bases[start as usize - 1..end as usize]);
            }
        }
    }

    #[test]
    fn out_of_range_peaks_are_rejected() {
        let peaks = vec![
            peak("TF2", 1, 11, 2),
            peak("TF3", 0, 4, 3),
            peak("TF3", -5, 4, 4),
            peak("TF1", 1, 10, 5),
        ];
        let extraction = locate_peaks(peaks, &genome());
        assert_eq!(extraction.peaks.len(), 1);
        assert_eq!(extraction.peaks[0].peak_number, 5);
        assert_eq!(
            extraction.rejected,
            vec![peak("TF2", 1, 11, 2), peak("TF3", 0, 4, 3), peak("TF3", -5, 4, 4)]
        );
    }

    #[test]
    fn reversed_ranges_give_empty_sequences() {
        let extraction = locate_peaks(vec![peak("TF1", 6, 5, 1), peak("TF1", 9, 2, 2)], &genome());
        assert!(extraction.rejected.is_empty());
        assert!(extraction.peaks.iter().all(|peak| peak.sequence.is_empty()));
    }

    #[test]
    fn extract_reads_and_locates() {
        let (_dir, path) = table(&format!(
            "{NAMED_HEADER}\nds1\tTF1\t2\t5\t3\t1\nds1\tTF2\t1\t11\t6\t2\n"
        ));
        let extraction = extract(&path, &genome(), ColumnLayout::Auto).unwrap();
        assert_eq!(extraction.peaks.len(), 1);
        assert_eq!(extraction.rejected, vec![peak("TF2", 1, 11, 2)]);
    }

    #[test]
    fn rejection_log_format() {
        let dir = tempdir().unwrap();
        let path = write_rejection_log(&[peak("TF2", 1, 11, 2)], dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join(REJECTION_LOG));
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Peaks out of genome range:\nTF: TF2, Start: 1, End: 11, Peak_number: 2\n"
        );
    }

    #[test]
    fn no_rejection_log_without_rejects() {
        let dir = tempdir().unwrap();
        assert_eq!(write_rejection_log(&[], dir.path()).unwrap(), None);
        assert!(!dir.path().join(REJECTION_LOG).exists());
    }
}
