//! Text formatting helpers shared by the plain-text report and the TUI.

use crate::calculations::ClassReport;
use crate::models::SecurityClass;

/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use mer_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Format an optional ratio with a fixed number of decimals, `"-"` when absent.
///
/// # Examples
///
/// ```
/// use mer_core::formatting::format_ratio;
///
/// assert_eq!(format_ratio(Some(12.345), 1), "12.3");
/// assert_eq!(format_ratio(None, 2), "-");
/// ```
pub fn format_ratio(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.prec$}", v, prec = decimals),
        _ => "-".to_string(),
    }
}

/// Share of `part` in `whole` as a percentage; `0.0` when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Label used for a report row. Abyssal space also covers Pochven.
pub fn report_label(class: SecurityClass) -> &'static str {
    match class {
        SecurityClass::Abyssal => "Abyss/Pochven",
        other => other.label(),
    }
}

const TABLE_WIDTH: usize = 94;

/// Render `report` as a fixed-width text table.
pub fn render_plain_report(title: &str, report: &ClassReport) -> String {
    let rule = format!("{}\n", "-".repeat(TABLE_WIDTH));
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&rule);
    out.push_str(&format!(
        "|{:<14}|{:>12}|{:>7}|{:>7}|{:>11}|{:>13}|{:>22}|\n",
        "System Class", "Losses", "Share", "Systems", "Loss/System", "Distribution", "Loss/Character"
    ));
    out.push_str(&rule);

    for row in &report.rows {
        out.push_str(&format!(
            "|{:<14}|{:>12}|{:>6.1}%|{:>7}|{:>11}|{:>13}|{:>22}|\n",
            report_label(row.class),
            format_count(row.losses),
            percentage(row.losses, report.total_losses),
            row.systems,
            format_ratio(row.losses_per_system, 1),
            format_ratio(row.distribution, 2),
            format_ratio(row.losses_per_character, 2),
        ));
    }

    out.push_str(&rule);
    out.push_str(&format!(
        "|{:<14}|{:>12}|{:>7}|{:>7}|{:>11}|{:>13}|{:>22}|\n",
        "Total",
        format_count(report.total_losses),
        "",
        "",
        "",
        "",
        ""
    ));
    out.push_str(&rule);

    if report.unknown_losses > 0 {
        out.push_str(&format!(
            "{} losses could not be classified\n",
            format_count(report.unknown_losses)
        ));
    }
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    let digits = s.len();
    let mut result = String::with_capacity(digits + digits / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (digits - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
