//! Local FASTQ → FASTA conversion, used when the server offers neither an
//! assembler nor a conversion tool.
//!
//! Only four-line FASTQ records are accepted. Each record's `@` header is
//! written as a `>` header followed by the sequence; quality lines are
//! dropped after checking their length matches the sequence.

use crate::config::ReadFiles;
use crate::error::GalaxyError;
use crate::pipeline::input::is_gzip;
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Records and bases written by a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    pub records: u64,
    pub bases: u64,
}

impl std::ops::AddAssign for ConversionCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.records += rhs.records;
        self.bases += rhs.bases;
    }
}

/// Convert one FASTQ stream to FASTA.
pub fn fastq_to_fasta<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
) -> Result<ConversionCounts, GalaxyError> {
    let mut counts = ConversionCounts::default();
    let mut line_no = 0usize;
    let mut header = String::new();
    let mut seq = String::new();
    let mut plus = String::new();
    let mut qual = String::new();

    let mut next = |buf: &mut String, line_no: &mut usize| -> Result<bool, GalaxyError> {
        buf.clear();
        let n = reader.read_line(buf).map_err(|e| GalaxyError::MalformedFastq {
            line: *line_no + 1,
            detail: format!("read failed: {e}"),
        })?;
        *line_no += 1;
        let trimmed = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed);
        Ok(n > 0)
    };

    // Blank lines are only allowed after the last record.
    let mut first_blank: Option<usize> = None;

    loop {
        if !next(&mut header, &mut line_no)? {
            break;
        }
        if header.trim().is_empty() {
            first_blank.get_or_insert(line_no);
            continue;
        }
        if let Some(blank) = first_blank {
            return Err(malformed(blank, "blank line between records"));
        }
        let record_line = line_no;
        let Some(name) = header.strip_prefix('@') else {
            return Err(malformed(record_line, "header must start with '@'"));
        };

        if !next(&mut seq, &mut line_no)? {
            return Err(malformed(record_line, "record truncated before sequence"));
        }
        if !next(&mut plus, &mut line_no)? || !plus.starts_with('+') {
            return Err(malformed(line_no, "expected '+' separator line"));
        }
        if !next(&mut qual, &mut line_no)? {
            return Err(malformed(line_no, "record truncated before quality"));
        }
        if qual.len() != seq.len() {
            return Err(malformed(
                line_no,
                &format!(
                    "quality length {} does not match sequence length {}",
                    qual.len(),
                    seq.len()
                ),
            ));
        }

        writeln!(writer, ">{name}\n{seq}").map_err(|e| GalaxyError::Internal(e.to_string()))?;
        counts.records += 1;
        counts.bases += seq.len() as u64;
    }

    writer
        .flush()
        .map_err(|e| GalaxyError::Internal(e.to_string()))?;
    Ok(counts)
}

fn malformed(line: usize, detail: &str) -> GalaxyError {
    GalaxyError::MalformedFastq {
        line,
        detail: detail.to_string(),
    }
}

/// Open a read file, transparently decompressing gzip.
fn open_reads(path: &Path) -> Result<Box<dyn BufRead>, GalaxyError> {
    let file = File::open(path).map_err(|_| GalaxyError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let gz = is_gzip(path).map_err(|e| GalaxyError::Internal(e.to_string()))?;
    let inner: Box<dyn Read> = if gz {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(inner)))
}

/// Convert every read file into one FASTA at `output` (R1 then R2).
///
/// Written to a temp file in the output directory and renamed into place.
/// Reads with no records give `EmptyOutput` and leave `output` untouched.
pub fn convert_local_blocking(
    reads: &ReadFiles,
    output: &Path,
) -> Result<ConversionCounts, GalaxyError> {
    let write_err = |source| GalaxyError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    let mut total = ConversionCounts::default();
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for path in reads.iter() {
            debug!("Converting {} locally", path.display());
            let counts = fastq_to_fasta(open_reads(path)?, &mut writer)?;
            info!(
                "{}: {} records, {} bases",
                path.display(),
                counts.records,
                counts.bases
            );
            total += counts;
        }
        writer.flush().map_err(write_err)?;
    }
    if total.records == 0 {
        return Err(GalaxyError::EmptyOutput {
            dataset_id: "local".to_string(),
            path: output.to_path_buf(),
        });
    }
    tmp.persist(output).map_err(|e| write_err(e.error))?;
    Ok(total)
}

/// Async wrapper running [`convert_local_blocking`] on the blocking pool.
pub async fn convert_local(
    reads: &ReadFiles,
    output: &Path,
) -> Result<ConversionCounts, GalaxyError> {
    let reads = reads.clone();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || convert_local_blocking(&reads, &output))
        .await
        .map_err(|e| GalaxyError::Internal(format!("Conversion task panicked: {e}")))?
}
