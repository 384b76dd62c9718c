use mer_core::models::SecurityClass;
use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
}

/// Detect the terminal background from `COLORFGBG` (`"fg;bg"`).
///
/// Background values 0–6 are dark, 7–15 light. Absent or unparseable values
/// count as dark.
pub fn detect_background() -> BackgroundType {
    std::env::var("COLORFGBG")
        .ok()
        .as_deref()
        .and_then(|val| val.split(';').next_back())
        .and_then(|bg| bg.parse::<u8>().ok())
        .map(|bg| {
            if bg <= 6 {
                BackgroundType::Dark
            } else {
                BackgroundType::Light
            }
        })
        .unwrap_or(BackgroundType::Dark)
}

/// Styles used by the report table and the series chart.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Text ─────────────────────────────────────────────────────────────────
    pub title: Style,
    pub text: Style,
    pub dim: Style,
    pub warning: Style,
    pub error: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,
    pub table_total: Style,

    // ── Security classes ─────────────────────────────────────────────────────
    pub highsec: Style,
    pub lowsec: Style,
    pub nullsec: Style,
    pub wormhole: Style,
    pub abyssal: Style,
    pub unknown: Style,
    /// The chart's all-classes line.
    pub total: Style,
    pub axis: Style,
}

impl Theme {
    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),

            table_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),
            table_total: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            highsec: Style::default().fg(Color::Green),
            lowsec: Style::default().fg(Color::Yellow),
            nullsec: Style::default().fg(Color::Red),
            wormhole: Style::default().fg(Color::Magenta),
            abyssal: Style::default().fg(Color::Blue),
            unknown: Style::default().fg(Color::DarkGray),
            total: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            axis: Style::default().fg(Color::Gray),
        }
    }

    /// Light-background terminal theme.
    pub fn light() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),

            table_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::Gray),
            table_row: Style::default().fg(Color::Black),
            table_row_alt: Style::default().fg(Color::DarkGray),
            table_total: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            highsec: Style::default().fg(Color::Green),
            lowsec: Style::default().fg(Color::Yellow),
            nullsec: Style::default().fg(Color::Red),
            wormhole: Style::default().fg(Color::Magenta),
            abyssal: Style::default().fg(Color::Blue),
            unknown: Style::default().fg(Color::Gray),
            total: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            axis: Style::default().fg(Color::DarkGray),
        }
    }

    /// Choose a theme from the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            BackgroundType::Dark => Self::dark(),
        }
    }

    /// Construct a theme by name, falling back to `auto_detect`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            _ => Self::auto_detect(),
        }
    }

    /// Line and label colour for a security class.
    pub fn class_style(&self, class: SecurityClass) -> Style {
        match class {
            SecurityClass::Highsec => self.highsec,
            SecurityClass::Lowsec => self.lowsec,
            SecurityClass::Nullsec => self.nullsec,
            SecurityClass::Wormhole => self.wormhole,
            SecurityClass::Abyssal => self.abyssal,
            SecurityClass::Unknown => self.unknown,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
