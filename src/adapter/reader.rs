//! Record reader: format-dispatching lazy reader
//!
//! Produces rows (`field → value` maps) from CSV, TSV, JSON, JSON-lines and
//! GTF/GFF files, transparently decompressing `.gz` inputs. Reading never
//! fails towards the caller: problems are logged and the stream simply ends.

use crate::graph::PropertyValue;
use flate2::read::MultiGzDecoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{error, warn};

/// One raw record from a source file
pub type Row = BTreeMap<String, PropertyValue>;

/// GTF columns preceding the attribute block
const GTF_COLUMNS: [&str; 8] = [
    "seqname", "source", "feature", "start", "end", "score", "strand", "frame",
];

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Tsv,
    Json,
    Jsonl,
    Gtf,
}

impl DataFormat {
    /// Parse a format name (case-insensitive). `gff` is read by the GTF
    /// reader, which also accepts GFF3 `key=value` attributes.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Some(DataFormat::Csv),
            "tsv" => Some(DataFormat::Tsv),
            "json" => Some(DataFormat::Json),
            "jsonl" => Some(DataFormat::Jsonl),
            "gtf" | "gff" => Some(DataFormat::Gtf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Tsv => "tsv",
            DataFormat::Json => "json",
            DataFormat::Jsonl => "jsonl",
            DataFormat::Gtf => "gtf",
        }
    }
}

/// Errors hit while opening a source; logged, never surfaced to callers.
#[derive(Debug, Error)]
enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lazy, finite, non-restartable sequence of rows.
///
/// Owns the underlying file handle; dropping the iterator closes it.
pub struct Records {
    inner: Box<dyn Iterator<Item = Row>>,
}

impl Records {
    fn new(inner: impl Iterator<Item = Row> + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// A sequence that yields nothing
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Iterator for Records {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

/// Read `path` as `format` (a format name such as `"tsv"`).
///
/// An unsupported format or an unreadable file is reported through the log
/// and yields an empty sequence.
pub fn read_records(path: &Path, format: &str) -> Records {
    match DataFormat::parse(format) {
        Some(format) => read_format(path, format),
        None => {
            error!(format, path = %path.display(), "Unsupported data format");
            Records::empty()
        }
    }
}

/// Read `path` with an already-resolved format.
pub fn read_format(path: &Path, format: DataFormat) -> Records {
    match open_records(path, format) {
        Ok(records) => records,
        Err(e) => {
            error!(path = %path.display(), format = format.as_str(), error = %e, "Error reading file");
            Records::empty()
        }
    }
}

fn open_records(path: &Path, format: DataFormat) -> Result<Records, ReadError> {
    let reader = open_source(path)?;
    let label = path.display().to_string();

    match format {
        DataFormat::Csv => csv_records(reader, b',', label),
        DataFormat::Tsv => csv_records(reader, b'\t', label),
        DataFormat::Json => json_records(reader),
        DataFormat::Jsonl => Ok(jsonl_records(reader, label)),
        DataFormat::Gtf => Ok(gtf_records(reader, label)),
    }
}

/// Open a file, decompressing when the name ends in `.gz`.
pub(crate) fn open_source(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Lines of a reader; an IO error is logged and ends the sequence.
fn lines_of(reader: Box<dyn BufRead>, label: String) -> impl Iterator<Item = String> {
    reader.lines().map_while(move |line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            error!(path = %label, error = %e, "Read failed, stopping");
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn csv_records(reader: Box<dyn BufRead>, delimiter: u8, label: String) -> Result<Records, ReadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let rows = csv_reader.into_records().map_while(move |record| match record {
        Ok(record) => {
            let row: Row = headers
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = record
                        .get(i)
                        .map(|v| PropertyValue::String(v.to_string()))
                        .unwrap_or(PropertyValue::Null);
                    (name.to_string(), value)
                })
                .collect();
            Some(row)
        }
        Err(e) => {
            error!(path = %label, error = %e, "Malformed delimited record, stopping");
            None
        }
    });

    Ok(Records::new(rows))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn json_object_to_row(value: serde_json::Value) -> Option<Row> {
    if !value.is_object() {
        warn!("Skipping non-object JSON record");
        return None;
    }
    match serde_json::from_value::<Row>(value) {
        Ok(row) => Some(row),
        Err(e) => {
            warn!(error = %e, "Skipping undecodable JSON record");
            None
        }
    }
}

fn json_records(reader: Box<dyn BufRead>) -> Result<Records, ReadError> {
    let document: serde_json::Value = serde_json::from_reader(reader)?;
    let items = match document {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };
    Ok(Records::new(items.into_iter().filter_map(json_object_to_row)))
}

fn jsonl_records(reader: Box<dyn BufRead>, label: String) -> Records {
    let rows = lines_of(reader, label)
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => json_object_to_row(value),
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping unparsable JSON line");
                None
            }
        });
    Records::new(rows)
}

// ---------------------------------------------------------------------------
// GTF / GFF
// ---------------------------------------------------------------------------

fn gtf_records(reader: Box<dyn BufRead>, label: String) -> Records {
    Records::new(lines_of(reader, label).filter_map(|line| parse_gtf_line(&line)))
}

/// Parse one GTF line into a row.
///
/// Returns `None` for comments and lines with fewer than nine columns.
/// Attributes are GTF `key "value"` or GFF3 `key=value` pairs, whichever
/// separator comes first; other fragments are skipped.
pub fn parse_gtf_line(line: &str) -> Option<Row> {
    if line.starts_with('#') {
        return None;
    }

    let parts: Vec<&str> = line.trim().split('\t').collect();
    if parts.len() < 9 {
        return None;
    }

    let mut row: Row = GTF_COLUMNS
        .iter()
        .zip(parts.iter())
        .map(|(key, value)| (key.to_string(), PropertyValue::String(value.to_string())))
        .collect();

    for fragment in parts[8].split(';') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        match split_attribute(fragment) {
            Some((key, value)) => {
                let value = value.trim().trim_matches('"');
                row.insert(key.to_string(), PropertyValue::String(value.to_string()));
            }
            None => warn!(fragment, "Skipping malformed GTF attribute"),
        }
    }

    Some(row)
}

fn split_attribute(fragment: &str) -> Option<(&str, &str)> {
    let at = fragment.find([' ', '='])?;
    let key = fragment[..at].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, &fragment[at + 1..]))
}
