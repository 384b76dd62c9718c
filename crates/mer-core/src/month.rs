//! `YYYYMM` month tokens used to name and discover monthly dump files.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MerError;

/// Suffix shared by every normalized monthly file.
pub const KILL_DUMP_SUFFIX: &str = "_kill_dump.csv";

static MONTH_TOKEN: OnceLock<Regex> = OnceLock::new();

fn month_token() -> &'static Regex {
    MONTH_TOKEN.get_or_init(|| Regex::new(r"(?:^|\D)(\d{6})(?:\D|$)").expect("regex is valid"))
}

/// A calendar month, rendered as `YYYYMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    /// Build a month from a year and a 1-based month number.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The following calendar month.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    /// `YYYYMM` token, e.g. `"201606"`.
    pub fn token(&self) -> String {
        self.0.format("%Y%m").to_string()
    }

    /// File name of the normalized dump for this month.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.token(), KILL_DUMP_SUFFIX)
    }

    /// Extract the first plausible `YYYYMM` token from a file name.
    ///
    /// Six-digit runs embedded in longer digit runs are ignored.
    pub fn from_file_name(name: &str) -> Option<Self> {
        month_token()
            .captures_iter(name)
            .filter_map(|c| c.get(1))
            .find_map(|m| m.as_str().parse().ok())
    }
}

impl FromStr for MonthKey {
    type Err = MerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MerError::InvalidMonth(s.to_string()));
        }
        let year: i32 = s[..4]
            .parse()
            .map_err(|_| MerError::InvalidMonth(s.to_string()))?;
        let month: u32 = s[4..]
            .parse()
            .map_err(|_| MerError::InvalidMonth(s.to_string()))?;
        Self::new(year, month).ok_or_else(|| MerError::InvalidMonth(s.to_string()))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
