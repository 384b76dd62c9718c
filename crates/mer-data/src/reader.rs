//! CSV file discovery and streaming row access shared by the converter and
//! the analyzer.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use mer_core::error::{MerError, Result};
use tracing::warn;

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── RowReader ─────────────────────────────────────────────────────────────────

/// Streams the data rows of one CSV file, one reused record at a time.
///
/// Rows are numbered from 1; the header line is not counted.
pub struct RowReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: StringRecord,
    record: StringRecord,
    row: u64,
}

impl RowReader {
    /// Open `path` for reading. Nothing beyond the file handle is touched yet.
    ///
    /// `flexible` lets rows carry fewer or more fields than the header, which
    /// irregular raw dumps need.
    pub fn open(path: &Path, flexible: bool) -> Result<Self> {
        let file = File::open(path).map_err(|source| MerError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = csv::ReaderBuilder::new()
            .flexible(flexible)
            .trim(csv::Trim::All)
            .from_reader(file);
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers: StringRecord::new(),
            record: StringRecord::new(),
            row: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the header line. An empty file yields an empty header.
    pub fn headers(&mut self) -> Result<&StringRecord> {
        match self.reader.headers() {
            Ok(h) => self.headers = h.clone(),
            Err(e) => return Err(read_error(&self.path, 0, e)),
        }
        Ok(&self.headers)
    }

    /// Advance to the next data row, returning its 1-based number and fields.
    pub fn next_row(&mut self) -> Result<Option<(u64, &StringRecord)>> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                self.row += 1;
                Ok(Some((self.row, &self.record)))
            }
            Ok(false) => Ok(None),
            Err(e) => Err(read_error(&self.path, self.row + 1, e)),
        }
    }
}

/// Map a csv read failure onto the pipeline taxonomy: I/O problems make the
/// source unreadable, everything else is a bad row.
fn read_error(path: &Path, row: u64, err: csv::Error) -> MerError {
    let reason = err.to_string();
    if err.is_io_error() {
        if let csv::ErrorKind::Io(source) = err.into_kind() {
            return MerError::SourceUnreadable {
                path: path.to_path_buf(),
                source,
            };
        }
    }
    MerError::malformed_row(path, row, None, reason)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
