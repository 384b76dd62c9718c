//! Row schema normalizer: maps raw dump rows from each publication epoch onto
//! the canonical [`NormalizedRecord`] shape.
//!
//! Each epoch is a [`RawFormat`] variant with an explicit field-mapping table.
//! Columns are resolved by header name, so reordered columns are tolerated and
//! optional columns missing from older epochs default to unknown.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use csv::StringRecord;
use mer_core::error::MerError;
use mer_core::models::NormalizedRecord;
use mer_core::month::MonthKey;
use thiserror::Error;

// ── Fields ────────────────────────────────────────────────────────────────────

/// Logical columns a raw dump may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SystemName,
    SystemId,
    Region,
    SecurityStatus,
    Kills,
}

impl Field {
    /// Canonical column name reported in errors.
    pub fn name(self) -> &'static str {
        match self {
            Field::SystemName => "system",
            Field::SystemId => "system_id",
            Field::Region => "region",
            Field::SecurityStatus => "security_status",
            Field::Kills => "kills",
        }
    }
}

/// One entry of a field-mapping table: the header aliases a field goes by.
#[derive(Debug)]
pub struct FieldMapping {
    pub field: Field,
    pub aliases: &'static [&'static str],
}

/// Where a format's kill count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSource {
    /// Every row is one killmail.
    PerRow,
    /// An explicit kill-count column.
    Column,
}

const KILLMAIL_FIELDS: &[FieldMapping] = &[
    FieldMapping { field: Field::SystemName, aliases: &["solarSystemName", "system"] },
    FieldMapping { field: Field::Region, aliases: &["regionName", "region"] },
    FieldMapping { field: Field::SecurityStatus, aliases: &["security", "securityStatus"] },
];

const REGIONAL_FIELDS: &[FieldMapping] = &[
    FieldMapping { field: Field::SystemName, aliases: &["solarSystemName", "system"] },
    FieldMapping { field: Field::SystemId, aliases: &["solarSystemID", "system_id"] },
    FieldMapping { field: Field::Region, aliases: &["regionName", "region"] },
    FieldMapping { field: Field::SecurityStatus, aliases: &["securityStatus", "security"] },
];

const SUMMARY_FIELDS: &[FieldMapping] = &[
    FieldMapping {
        field: Field::SystemName,
        aliases: &["solar_system_name", "solarSystemName", "system"],
    },
    FieldMapping {
        field: Field::SystemId,
        aliases: &["solar_system_id", "solarSystemID", "system_id"],
    },
    FieldMapping { field: Field::Region, aliases: &["region_name", "regionName", "region"] },
    FieldMapping {
        field: Field::SecurityStatus,
        aliases: &["security_status", "securityStatus", "security"],
    },
    FieldMapping { field: Field::Kills, aliases: &["kills", "kill_count", "destroyed"] },
];

// ── RawFormat ─────────────────────────────────────────────────────────────────

/// Column layouts MER kill dumps have been published with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawFormat {
    /// One row per killmail, system names only.
    Killmail,
    /// One row per killmail with solar-system IDs.
    Regional,
    /// One row per system with an explicit kill count.
    Summary,
}

impl RawFormat {
    /// Newest first; header sniffing tries formats in this order.
    pub const ALL: [RawFormat; 3] = [RawFormat::Summary, RawFormat::Regional, RawFormat::Killmail];

    pub fn name(self) -> &'static str {
        match self {
            RawFormat::Killmail => "killmail",
            RawFormat::Regional => "regional",
            RawFormat::Summary => "summary",
        }
    }

    /// The field-mapping table for this format.
    pub fn mappings(self) -> &'static [FieldMapping] {
        match self {
            RawFormat::Killmail => KILLMAIL_FIELDS,
            RawFormat::Regional => REGIONAL_FIELDS,
            RawFormat::Summary => SUMMARY_FIELDS,
        }
    }

    pub fn kill_source(self) -> KillSource {
        match self {
            RawFormat::Summary => KillSource::Column,
            RawFormat::Killmail | RawFormat::Regional => KillSource::PerRow,
        }
    }

    /// Fields a header must provide for this format; each inner slice needs
    /// at least one of its fields present.
    fn required(self) -> &'static [&'static [Field]] {
        match self {
            RawFormat::Killmail => &[&[Field::SystemName]],
            RawFormat::Regional => &[&[Field::SystemId]],
            RawFormat::Summary => &[&[Field::SystemName, Field::SystemId], &[Field::Kills]],
        }
    }

    /// Format in force for a given report month.
    pub fn for_month(month: MonthKey) -> Self {
        match (month.year(), month.month()) {
            (y, _) if y <= 2018 => RawFormat::Killmail,
            (y, _) if y <= 2021 => RawFormat::Regional,
            _ => RawFormat::Summary,
        }
    }

    /// First format, newest first, whose required columns are all present.
    pub fn sniff(headers: &StringRecord) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| ColumnMap::resolve(*format, headers).is_ok())
    }

    /// Pick the format for a source file: the declared one, else the epoch of
    /// the month in the file name, else whatever the header looks like.
    pub fn resolve(declared: Option<RawFormat>, source: &Path, headers: &StringRecord) -> Option<Self> {
        declared
            .or_else(|| {
                source
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(MonthKey::from_file_name)
                    .map(Self::for_month)
            })
            .or_else(|| Self::sniff(headers))
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RawFormat {
    type Err = MerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "killmail" => Ok(RawFormat::Killmail),
            "regional" => Ok(RawFormat::Regional),
            "summary" => Ok(RawFormat::Summary),
            other => Err(MerError::UnknownFormat(other.to_string())),
        }
    }
}

// ── RowError ──────────────────────────────────────────────────────────────────

/// Why a single row could not be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}")]
pub struct RowError {
    pub field: Option<&'static str>,
    pub reason: String,
}

impl RowError {
    pub fn new(field: Field, reason: impl Into<String>) -> Self {
        Self {
            field: Some(field.name()),
            reason: reason.into(),
        }
    }

    /// Attach the file and row number.
    pub fn at(self, path: &Path, row: u64) -> MerError {
        MerError::malformed_row(path, row, self.field, self.reason)
    }
}

// ── ColumnMap ─────────────────────────────────────────────────────────────────

/// Header positions of each field for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    format: RawFormat,
    system_name: Option<usize>,
    system_id: Option<usize>,
    region: Option<usize>,
    security_status: Option<usize>,
    kills: Option<usize>,
}

impl ColumnMap {
    /// Resolve `format`'s mapping table against a header line.
    ///
    /// On failure returns a description of the missing column(s).
    pub fn resolve(format: RawFormat, headers: &StringRecord) -> Result<Self, String> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let position = |field: Field| -> Option<usize> {
            let mapping = format.mappings().iter().find(|m| m.field == field)?;
            mapping.aliases.iter().find_map(|alias| {
                let alias = alias.to_lowercase();
                normalized.iter().position(|h| *h == alias)
            })
        };

        let map = Self {
            format,
            system_name: position(Field::SystemName),
            system_id: position(Field::SystemId),
            region: position(Field::Region),
            security_status: position(Field::SecurityStatus),
            kills: position(Field::Kills),
        };

        for group in format.required() {
            if !group.iter().any(|f| map.position_of(*f).is_some()) {
                let wanted: Vec<&str> = group
                    .iter()
                    .flat_map(|f| aliases_of(format, *f))
                    .copied()
                    .collect();
                return Err(wanted.join(" or "));
            }
        }

        Ok(map)
    }

    pub fn format(&self) -> RawFormat {
        self.format
    }

    fn position_of(&self, field: Field) -> Option<usize> {
        match field {
            Field::SystemName => self.system_name,
            Field::SystemId => self.system_id,
            Field::Region => self.region,
            Field::SecurityStatus => self.security_status,
            Field::Kills => self.kills,
        }
    }

    fn value<'r>(&self, record: &'r StringRecord, field: Field) -> Option<&'r str> {
        self.position_of(field)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Normalize one raw row. Pure: no I/O and no cross-row state.
    pub fn normalize(&self, record: &StringRecord) -> Result<NormalizedRecord, RowError> {
        let system_id = self
            .value(record, Field::SystemId)
            .map(|v| parse_system_id(v))
            .transpose()?;

        let system = match (self.value(record, Field::SystemName), system_id) {
            (Some(name), _) => name.to_string(),
            (None, Some(id)) => id.to_string(),
            (None, None) => {
                return Err(RowError::new(Field::SystemName, "no system name or ID"));
            }
        };

        let security_status = self
            .value(record, Field::SecurityStatus)
            .map(parse_raw_security)
            .transpose()?;

        let kills = match self.format.kill_source() {
            KillSource::PerRow => 1,
            KillSource::Column => match self.value(record, Field::Kills) {
                Some(v) => parse_raw_kills(v)?,
                None => return Err(RowError::new(Field::Kills, "missing kill count")),
            },
        };

        Ok(NormalizedRecord {
            system,
            system_id,
            region: self.value(record, Field::Region).map(str::to_string),
            security_status,
            kills,
        })
    }
}

fn aliases_of(format: RawFormat, field: Field) -> &'static [&'static str] {
    format
        .mappings()
        .iter()
        .find(|m| m.field == field)
        .map(|m| m.aliases)
        .unwrap_or(&[])
}

// ── Value parsers ─────────────────────────────────────────────────────────────

pub(crate) fn parse_system_id(value: &str) -> Result<u64, RowError> {
    value
        .parse()
        .map_err(|_| RowError::new(Field::SystemId, format!("not a system ID: '{}'", value)))
}

/// Parse a security status and validate its range.
pub(crate) fn parse_security(value: &str) -> Result<f64, RowError> {
    match value.parse::<f64>() {
        Ok(s) if (-1.0..=1.0).contains(&s) => Ok(s),
        Ok(s) if s.is_finite() => Err(RowError::new(
            Field::SecurityStatus,
            format!("out of range [-1.0, 1.0]: {}", s),
        )),
        _ => Err(RowError::new(
            Field::SecurityStatus,
            format!("not a number: '{}'", value),
        )),
    }
}

/// Raw dumps are clamped into range rather than rejected.
fn parse_raw_security(value: &str) -> Result<f64, RowError> {
    match value.parse::<f64>() {
        Ok(s) if s.is_finite() => Ok(s.clamp(-1.0, 1.0)),
        _ => Err(RowError::new(
            Field::SecurityStatus,
            format!("not a number: '{}'", value),
        )),
    }
}

/// Strict kill count: a non-negative integer.
pub(crate) fn parse_kills(value: &str) -> Result<u64, RowError> {
    value
        .parse()
        .map_err(|_| RowError::new(Field::Kills, format!("not a non-negative integer: '{}'", value)))
}

/// Raw kill counts may also be exported as whole floats such as `12.0`.
fn parse_raw_kills(value: &str) -> Result<u64, RowError> {
    if let Ok(k) = value.parse::<u64>() {
        return Ok(k);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(f as u64),
        _ => Err(RowError::new(
            Field::Kills,
            format!("not a non-negative integer: '{}'", value),
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    // ── format resolution ─────────────────────────────────────────────────────

    #[test]
    fn test_format_from_str() {
        assert_eq!("Summary".parse::<RawFormat>().unwrap(), RawFormat::Summary);
        assert!(matches!(
            "xml".parse::<RawFormat>(),
            Err(MerError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_format_for_month_epochs() {
        let m = |s: &str| s.parse::<MonthKey>().unwrap();
        assert_eq!(RawFormat::for_month(m("201606")), RawFormat::Killmail);
        assert_eq!(RawFormat::for_month(m("201812")), RawFormat::Killmail);
        assert_eq!(RawFormat::for_month(m("201901")), RawFormat::Regional);
        assert_eq!(RawFormat::for_month(m("202112")), RawFormat::Regional);
        assert_eq!(RawFormat::for_month(m("202201")), RawFormat::Summary);
    }

    #[test]
    fn test_sniff_prefers_newest_matching_format() {
        let summary = rec(&["solar_system_id", "solar_system_name", "kills"]);
        assert_eq!(RawFormat::sniff(&summary), Some(RawFormat::Summary));

        let regional = rec(&["killTime", "solarSystemID", "solarSystemName"]);
        assert_eq!(RawFormat::sniff(&regional), Some(RawFormat::Regional));

        let killmail = rec(&["killTime", "solarSystemName", "regionName"]);
        assert_eq!(RawFormat::sniff(&killmail), Some(RawFormat::Killmail));

        assert_eq!(RawFormat::sniff(&rec(&["foo", "bar"])), None);
    }

    #[test]
    fn test_resolve_order() {
        let headers = rec(&["solarSystemName"]);
        // Declared wins.
        assert_eq!(
            RawFormat::resolve(Some(RawFormat::Summary), Path::new("201606_raw.csv"), &headers),
            Some(RawFormat::Summary)
        );
        // Then the file-name month.
        assert_eq!(
            RawFormat::resolve(None, Path::new("/x/202003_raw.csv"), &headers),
            Some(RawFormat::Regional)
        );
        // Then the header.
        assert_eq!(
            RawFormat::resolve(None, Path::new("dump.csv"), &headers),
            Some(RawFormat::Killmail)
        );
    }

    // ── column resolution ─────────────────────────────────────────────────────

    #[test]
    fn test_columns_case_insensitive_and_reordered() {
        let headers = rec(&["KILLS", " Security_Status ", "solar_system_name"]);
        let map = ColumnMap::resolve(RawFormat::Summary, &headers).unwrap();
        let out = map.normalize(&rec(&["7", "0.4", "Tama"])).unwrap();
        assert_eq!(out.system, "Tama");
        assert_eq!(out.kills, 7);
        assert_eq!(out.security_status, Some(0.4));
    }

    #[test]
    fn test_bom_in_first_header() {
        let headers = rec(&["\u{feff}solarSystemName", "security"]);
        let map = ColumnMap::resolve(RawFormat::Killmail, &headers).unwrap();
        assert_eq!(map.normalize(&rec(&["Jita", "0.9"])).unwrap().system, "Jita");
    }

    #[test]
    fn test_missing_required_column() {
        let err = ColumnMap::resolve(RawFormat::Summary, &rec(&["solar_system_name"])).unwrap_err();
        assert!(err.contains("kills"));
        let err = ColumnMap::resolve(RawFormat::Regional, &rec(&["solarSystemName"])).unwrap_err();
        assert!(err.contains("solarSystemID"));
    }

    // ── row normalization ─────────────────────────────────────────────────────

    #[test]
    fn test_killmail_rows_count_one_each() {
        let map = ColumnMap::resolve(
            RawFormat::Killmail,
            &rec(&["killTime", "solarSystemName", "regionName", "security"]),
        )
        .unwrap();
        let out = map
            .normalize(&rec(&["2016.06.01 00:01", "Amamake", "Heimatar", "0.4"]))
            .unwrap();
        assert_eq!(out.kills, 1);
        assert_eq!(out.region.as_deref(), Some("Heimatar"));
        assert_eq!(out.system_id, None);
    }

    #[test]
    fn test_missing_optional_security_defaults_to_unknown() {
        let map = ColumnMap::resolve(RawFormat::Killmail, &rec(&["solarSystemName"])).unwrap();
        let out = map.normalize(&rec(&["Amamake"])).unwrap();
        assert_eq!(out.security_status, None);
        assert_eq!(out.region, None);
    }

    #[test]
    fn test_empty_security_cell_is_unknown() {
        let map =
            ColumnMap::resolve(RawFormat::Killmail, &rec(&["solarSystemName", "security"])).unwrap();
        assert_eq!(map.normalize(&rec(&["X", ""])).unwrap().security_status, None);
        // Short rows from irregular dumps behave like empty cells.
        assert_eq!(map.normalize(&rec(&["X"])).unwrap().security_status, None);
    }

    #[test]
    fn test_id_used_when_name_absent() {
        let map = ColumnMap::resolve(
            RawFormat::Regional,
            &rec(&["solarSystemID", "solarSystemName"]),
        )
        .unwrap();
        let out = map.normalize(&rec(&["31000005", ""])).unwrap();
        assert_eq!(out.system, "31000005");
        assert_eq!(out.system_id, Some(31000005));
    }

    #[test]
    fn test_no_system_identifier_is_malformed() {
        let map = ColumnMap::resolve(
            RawFormat::Summary,
            &rec(&["solar_system_name", "kills"]),
        )
        .unwrap();
        let err = map.normalize(&rec(&["  ", "3"])).unwrap_err();
        assert_eq!(err.field, Some("system"));
    }

    #[test]
    fn test_bad_kill_count_is_malformed() {
        let map = ColumnMap::resolve(
            RawFormat::Summary,
            &rec(&["solar_system_name", "kills"]),
        )
        .unwrap();
        for bad in ["ten", "-1", "2.5", ""] {
            let err = map.normalize(&rec(&["Jita", bad])).unwrap_err();
            assert_eq!(err.field, Some("kills"), "value {bad:?}");
        }
        assert_eq!(map.normalize(&rec(&["Jita", "12.0"])).unwrap().kills, 12);
    }

    #[test]
    fn test_raw_kill_count_beyond_u64_is_malformed() {
        let map = ColumnMap::resolve(
            RawFormat::Summary,
            &rec(&["solar_system_name", "kills"]),
        )
        .unwrap();
        for too_big in ["18446744073709551616", "18446744073709551616.0", "1e20"] {
            let err = map.normalize(&rec(&["Jita", too_big])).unwrap_err();
            assert_eq!(err.field, Some("kills"), "value {too_big:?}");
        }
    }

    #[test]
    fn test_bad_security_is_malformed() {
        let map =
            ColumnMap::resolve(RawFormat::Killmail, &rec(&["solarSystemName", "security"])).unwrap();
        let err = map.normalize(&rec(&["Jita", "high"])).unwrap_err();
        assert_eq!(err.field, Some("security_status"));
    }

    #[test]
    fn test_raw_security_is_clamped() {
        let map =
            ColumnMap::resolve(RawFormat::Killmail, &rec(&["solarSystemName", "security"])).unwrap();
        assert_eq!(map.normalize(&rec(&["X", "1.2"])).unwrap().security_status, Some(1.0));
        assert_eq!(map.normalize(&rec(&["X", "-3"])).unwrap().security_status, Some(-1.0));
    }

    #[test]
    fn test_bad_system_id_is_malformed() {
        let map = ColumnMap::resolve(RawFormat::Regional, &rec(&["solarSystemID"])).unwrap();
        let err = map.normalize(&rec(&["J-123"])).unwrap_err();
        assert_eq!(err.field, Some("system_id"));
    }

    #[test]
    fn test_row_error_at_carries_position() {
        let err = RowError::new(Field::Kills, "bad").at(Path::new("f.csv"), 4);
        assert_eq!(err.row(), Some(4));
        assert!(err.to_string().contains("f.csv"));
    }

    // ── strict parsers ────────────────────────────────────────────────────────

    #[test]
    fn test_strict_parsers() {
        assert_eq!(parse_kills("42").unwrap(), 42);
        assert!(parse_kills("42.0").is_err());
        assert_eq!(parse_security("-0.25").unwrap(), -0.25);
        assert!(parse_security("1.5").is_err());
        assert!(parse_security("NaN").is_err());
        assert_eq!(parse_system_id("30000142").unwrap(), 30000142);
    }
}
