//! Raw dump → normalized file conversion.
//!
//! Rows are streamed through the [`ColumnMap`] of the resolved [`RawFormat`]
//! and written to a sibling temporary file that is renamed into place only
//! when every row converted.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use mer_core::error::{MerError, Result};
use mer_core::models::{NormalizedRecord, NORMALIZED_HEADER};
use mer_core::month::{MonthKey, KILL_DUMP_SUFFIX};
use tracing::{debug, info};

use crate::normalizer::{ColumnMap, Field, RawFormat, RowError};
use crate::reader::{find_csv_files, RowReader};

// ── Converter ─────────────────────────────────────────────────────────────────

/// Converts one raw dump file into the normalized schema.
#[derive(Debug, Clone)]
pub struct Converter {
    source: PathBuf,
    output_dir: Option<PathBuf>,
    format: Option<RawFormat>,
}

impl Converter {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: None,
            format: None,
        }
    }

    /// Write output into `dir` instead of next to the source.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Use `format` instead of detecting it.
    pub fn with_format(mut self, format: Option<RawFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Where the normalized file for this source goes.
    pub fn output_path(&self) -> PathBuf {
        let file_name = self.source.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let name = match MonthKey::from_file_name(file_name) {
            Some(month) => month.file_name(),
            None => {
                let stem = self
                    .source
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("dump");
                format!("{}{}", stem, KILL_DUMP_SUFFIX)
            }
        };
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        dir.join(name)
    }

    /// Convert the source file and return the path of the normalized output.
    ///
    /// Fails on the first unreadable or unconvertible row; on any failure no
    /// output file is created or changed.
    pub fn convert(&self) -> Result<PathBuf> {
        let output = self.output_path();
        if same_file(&self.source, &output) {
            return Err(MerError::Config(format!(
                "refusing to overwrite source {} with its own output",
                self.source.display()
            )));
        }

        let mut reader = RowReader::open(&self.source, true)?;
        let headers = reader.headers()?.clone();

        let columns = if headers.is_empty() {
            None
        } else {
            let format = RawFormat::resolve(self.format, &self.source, &headers).ok_or_else(|| {
                MerError::MissingColumn {
                    path: self.source.clone(),
                    column: "system identifier".to_string(),
                }
            })?;
            debug!("Converting {} as {} dump", self.source.display(), format);
            let columns = ColumnMap::resolve(format, &headers).map_err(|column| {
                MerError::MissingColumn {
                    path: self.source.clone(),
                    column,
                }
            })?;
            Some(columns)
        };

        let dir = output.parent().unwrap_or_else(|| Path::new(""));
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|source| MerError::OutputWrite {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let (pending, file) = PendingOutput::create(&output)?;
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        let write_err = |e: csv::Error| pending.write_error(e);

        writer.write_record(NORMALIZED_HEADER).map_err(write_err)?;

        let mut rows = 0u64;
        let mut kills = 0u64;
        if let Some(columns) = &columns {
            while let Some((row, record)) = reader.next_row()? {
                let normalized = columns
                    .normalize(record)
                    .map_err(|e| e.at(&self.source, row))?;
                kills = kills.checked_add(normalized.kills).ok_or_else(|| {
                    RowError::new(Field::Kills, "kill total overflows").at(&self.source, row)
                })?;
                rows += 1;
                writer.write_record(output_fields(&normalized)).map_err(write_err)?;
            }
        }

        let file = writer.into_inner().map_err(|e| pending.io_error(e.into_error()))?;
        file.sync_all().map_err(|e| pending.io_error(e))?;
        drop(file);
        pending.commit()?;

        info!(
            "Converted {} → {} ({} rows, {} kills)",
            self.source.display(),
            output.display(),
            rows,
            kills
        );
        Ok(output)
    }
}

/// Convert every raw `.csv` under `dir`, in path order, stopping at the first
/// failure.
///
/// Files already named `*_kill_dump.csv` are normalized output and skipped.
/// Two sources that would write the same output fail the whole sweep before
/// anything is written.
pub fn convert_dir(dir: &Path, output_dir: Option<&Path>, format: Option<RawFormat>) -> Result<Vec<PathBuf>> {
    let mut planned: Vec<Converter> = Vec::new();
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();

    for source in find_csv_files(dir) {
        if is_normalized_name(&source) {
            debug!("Skipping normalized file {}", source.display());
            continue;
        }
        let mut converter = Converter::new(&source).with_format(format);
        if let Some(out) = output_dir {
            converter = converter.with_output_dir(out);
        }
        let output = converter.output_path();
        if let Some(first) = owners.insert(output.clone(), source.clone()) {
            return Err(MerError::Config(format!(
                "{} and {} both convert to {}",
                first.display(),
                source.display(),
                output.display()
            )));
        }
        planned.push(converter);
    }

    let mut outputs = Vec::with_capacity(planned.len());
    for converter in &planned {
        outputs.push(converter.convert()?);
    }
    info!("Converted {} files from {}", outputs.len(), dir.display());
    Ok(outputs)
}

fn is_normalized_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase().ends_with(KILL_DUMP_SUFFIX))
        .unwrap_or(false)
}

/// Field values of a normalized record, in [`NORMALIZED_HEADER`] order.
fn output_fields(record: &NormalizedRecord) -> [String; 5] {
    [
        record.system.clone(),
        record.system_id.map(|id| id.to_string()).unwrap_or_default(),
        record.region.clone().unwrap_or_default(),
        record
            .security_status
            .map(|s| s.to_string())
            .unwrap_or_default(),
        record.kills.to_string(),
    ]
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ── PendingOutput ─────────────────────────────────────────────────────────────

/// A temporary output file next to its destination. Removed on drop unless
/// committed.
struct PendingOutput {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PendingOutput {
    fn create(target: &Path) -> Result<(Self, File)> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = target.with_file_name(format!(".{}.tmp", name));
        let file = File::create(&tmp).map_err(|source| MerError::OutputWrite {
            path: tmp.clone(),
            source,
        })?;
        let pending = Self {
            tmp,
            target: target.to_path_buf(),
            committed: false,
        };
        Ok((pending, file))
    }

    fn io_error(&self, source: std::io::Error) -> MerError {
        MerError::OutputWrite {
            path: self.tmp.clone(),
            source,
        }
    }

    fn write_error(&self, err: csv::Error) -> MerError {
        let source = match err.into_kind() {
            csv::ErrorKind::Io(e) => e,
            other => std::io::Error::other(format!("{:?}", other)),
        };
        self.io_error(source)
    }

    fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.tmp, &self.target).map_err(|source| MerError::OutputWrite {
            path: self.target.clone(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingOutput {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_fixture(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    const KILLMAIL_RAW: &str = "\
killID,killTime,solarSystemName,regionName,security
1,2016.06.01 00:01,Jita,The Forge,0.9459
2,2016.06.01 00:02,Amamake,Heimatar,0.4
3,2016.06.01 00:03,J123456,B-R00004,-0.99
";

    const SUMMARY_RAW: &str = "\
solar_system_id,solar_system_name,region_name,security_status,kills
30000142,Jita,The Forge,0.9459,120
30002537,Amamake,Heimatar,0.4,45.0
31000005,,,-1.0,3
";

    fn output_of(dir: &TempDir, name: &str) -> String {
        std::fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_output_path_naming() {
        let c = Converter::new("/data/raw/201606_raw_kills.csv");
        assert_eq!(c.output_path(), PathBuf::from("/data/raw/201606_kill_dump.csv"));

        let c = Converter::new("/data/raw/export.csv").with_output_dir("/out");
        assert_eq!(c.output_path(), PathBuf::from("/out/export_kill_dump.csv"));
    }

    #[test]
    fn test_convert_killmail_epoch() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("201606_raw.csv");
        write_fixture(&src, KILLMAIL_RAW);

        let out = Converter::new(&src).convert().unwrap();
        assert_eq!(out, dir.path().join("201606_kill_dump.csv"));
        assert_eq!(
            output_of(&dir, "201606_kill_dump.csv"),
            "system,system_id,region,security_status,kills\n\
             Jita,,The Forge,0.9459,1\n\
             Amamake,,Heimatar,0.4,1\n\
             J123456,,B-R00004,-0.99,1\n"
        );
    }

    #[test]
    fn test_convert_summary_epoch() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("202203_mer.csv");
        write_fixture(&src, SUMMARY_RAW);

        Converter::new(&src).convert().unwrap();
        assert_eq!(
            output_of(&dir, "202203_kill_dump.csv"),
            "system,system_id,region,security_status,kills\n\
             Jita,30000142,The Forge,0.9459,120\n\
             Amamake,30002537,Heimatar,0.4,45\n\
             31000005,31000005,,-1,3\n"
        );
    }

    #[test]
    fn test_declared_format_overrides_file_name() {
        let dir = TempDir::new().unwrap();
        // The file-name month says killmail epoch, the declared format wins.
        let src = dir.path().join("201606_raw.csv");
        write_fixture(&src, SUMMARY_RAW);

        Converter::new(&src)
            .with_format(Some(RawFormat::Summary))
            .convert()
            .unwrap();
        assert!(output_of(&dir, "201606_kill_dump.csv").contains("Jita,30000142,The Forge,0.9459,120"));
    }

    #[test]
    fn test_convert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("201606_raw.csv");
        write_fixture(&src, KILLMAIL_RAW);

        Converter::new(&src).convert().unwrap();
        let first = std::fs::read(dir.path().join("201606_kill_dump.csv")).unwrap();
        Converter::new(&src).convert().unwrap();
        let second = std::fs::read(dir.path().join("201606_kill_dump.csv")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_row_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("202201_raw.csv");
        write_fixture(
            &src,
            "solar_system_name,security_status,kills\nJita,0.9,4\nAmamake,0.4,lots\n",
        );

        let err = Converter::new(&src).convert().unwrap_err();
        assert_eq!(err.row(), Some(2));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "only the source remains: {leftovers:?}");
    }

    #[test]
    fn test_kill_total_overflow_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("202201_raw.csv");
        write_fixture(
            &src,
            "solar_system_name,kills\nJita,18446744073709551615\nAmamake,1\n",
        );

        let err = Converter::new(&src).convert().unwrap_err();
        assert_eq!(err.row(), Some(2));
        assert!(err.to_string().ends_with("(field 'kills'): kill total overflows"));
        assert!(!dir.path().join("202201_kill_dump.csv").exists());
    }

    #[test]
    fn test_failure_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("202201_raw.csv");
        let out = dir.path().join("202201_kill_dump.csv");
        write_fixture(&out, "previous");
        write_fixture(&src, "solar_system_name,kills\n,4\n");

        assert!(Converter::new(&src).convert().is_err());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous");
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("202201_raw.csv");
        write_fixture(&src, "solar_system_name,security_status\nJita,0.9\n");

        let err = Converter::new(&src).convert().unwrap_err();
        assert!(matches!(err, MerError::MissingColumn { ref column, .. } if column.contains("kills")));
    }

    #[test]
    fn test_unknown_layout_is_reported() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("export.csv");
        write_fixture(&src, "foo,bar\n1,2\n");

        assert!(matches!(
            Converter::new(&src).convert(),
            Err(MerError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_missing_source_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = Converter::new(dir.path().join("201606_raw.csv"))
            .convert()
            .unwrap_err();
        assert!(matches!(err, MerError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_refuses_to_overwrite_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("201606_kill_dump.csv");
        write_fixture(&src, KILLMAIL_RAW);

        assert!(matches!(
            Converter::new(&src).convert(),
            Err(MerError::Config(_))
        ));
        assert_eq!(std::fs::read_to_string(&src).unwrap(), KILLMAIL_RAW);
    }

    #[test]
    fn test_empty_source_gives_header_only_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("201607_raw.csv");
        write_fixture(&src, "");

        Converter::new(&src).convert().unwrap();
        assert_eq!(
            output_of(&dir, "201607_kill_dump.csv"),
            "system,system_id,region,security_status,kills\n"
        );
    }

    #[test]
    fn test_convert_dir_into_output_dir() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(&raw.path().join("201606_raw.csv"), KILLMAIL_RAW);
        write_fixture(&raw.path().join("202203_raw.csv"), SUMMARY_RAW);

        let outputs = convert_dir(raw.path(), Some(out.path()), None).unwrap();
        assert_eq!(
            outputs,
            vec![
                out.path().join("201606_kill_dump.csv"),
                out.path().join("202203_kill_dump.csv"),
            ]
        );
    }

    #[test]
    fn test_convert_dir_skips_existing_outputs_in_place() {
        let dir = TempDir::new().unwrap();
        write_fixture(&dir.path().join("201606_raw.csv"), KILLMAIL_RAW);
        write_fixture(
            &dir.path().join("201605_kill_dump.csv"),
            "system,system_id,region,security_status,kills\n",
        );

        let outputs = convert_dir(dir.path(), None, None).unwrap();
        assert_eq!(outputs, vec![dir.path().join("201606_kill_dump.csv")]);
    }

    #[test]
    fn test_convert_dir_stops_at_first_failure() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(&raw.path().join("201606_raw.csv"), "solarSystemName\n\n");
        write_fixture(&raw.path().join("202201_raw.csv"), "solar_system_name,kills\nJita,x\n");
        write_fixture(&raw.path().join("202202_raw.csv"), SUMMARY_RAW);

        assert!(convert_dir(raw.path(), Some(out.path()), None).is_err());
        assert!(!out.path().join("202202_kill_dump.csv").exists());
    }

    #[test]
    fn test_convert_dir_skips_unmonthed_normalized_files() {
        let dir = TempDir::new().unwrap();
        write_fixture(&dir.path().join("export.csv"), SUMMARY_RAW);

        let first = convert_dir(dir.path(), None, None).unwrap();
        assert_eq!(first, vec![dir.path().join("export_kill_dump.csv")]);

        let second = convert_dir(dir.path(), None, None).unwrap();
        assert_eq!(second, first);
        assert!(!dir.path().join("export_kill_dump_kill_dump.csv").exists());
    }

    #[test]
    fn test_convert_dir_rejects_colliding_months() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(
            &raw.path().join("201606_a.csv"),
            "solarSystemName,security\nJita,0.9\nJita,0.9\n",
        );
        write_fixture(
            &raw.path().join("201606_b.csv"),
            "solarSystemName,security\nAmamake,0.4\n",
        );

        let err = convert_dir(raw.path(), Some(out.path()), None).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, MerError::Config(_)));
        assert!(msg.contains("201606_a.csv") && msg.contains("201606_b.csv"));
        assert!(!out.path().join("201606_kill_dump.csv").exists());
    }
}
