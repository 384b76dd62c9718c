//! Class report table for one analysed month.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per security
//! class plus a highlighted totals row at the bottom.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use mer_core::calculations::ClassReport;
use mer_core::formatting::{format_count, format_ratio, percentage, report_label};

use crate::themes::Theme;

const HEADERS: [&str; 7] = [
    "System Class",
    "Losses",
    "Share",
    "Systems",
    "Loss/System",
    "Distribution",
    "Loss/Character",
];

/// Render `report` into `area`, titled `title` (usually the month token).
pub fn render_report(frame: &mut Frame, area: Rect, title: &str, report: &ClassReport, theme: &Theme) {
    let [table_area, footer_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(2)]).areas(area);

    let header = Row::new(HEADERS.iter().map(|h| Cell::from(*h).style(theme.table_header))).height(1);

    let mut rows: Vec<Row> = report
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(report_label(row.class)).style(theme.class_style(row.class)),
                Cell::from(format_count(row.losses)),
                Cell::from(format!("{:.1}%", percentage(row.losses, report.total_losses))),
                Cell::from(row.systems.to_string()),
                Cell::from(format_ratio(row.losses_per_system, 1)),
                Cell::from(format_ratio(row.distribution, 2)),
                Cell::from(format_ratio(row.losses_per_character, 2)),
            ])
            .style(style)
        })
        .collect();

    rows.push(
        Row::new(vec![
            Cell::from("Total"),
            Cell::from(format_count(report.total_losses)),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(15),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(13),
        Constraint::Length(15),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(Span::styled(format!(" {} ", title), theme.title)),
        )
        .style(theme.text);
    frame.render_widget(table, table_area);

    let mut footer = Vec::new();
    if report.unknown_losses > 0 {
        footer.push(Line::from(Span::styled(
            format!("{} losses could not be classified", format_count(report.unknown_losses)),
            theme.warning,
        )));
    }
    footer.push(Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)));
    frame.render_widget(Paragraph::new(footer), footer_area);
}

/// Render a "no data" placeholder when the file held no kills.
pub fn render_no_data(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No kills recorded", theme.warning)),
        Line::from(""),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mer_core::models::{ClassCounter, SecurityClass};
    use mer_core::settings::ReportConfig;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn report(unknown: u64) -> ClassReport {
        let mut c = ClassCounter::new();
        c.add(SecurityClass::Highsec, 12_000).unwrap();
        c.add(SecurityClass::Lowsec, 4_500).unwrap();
        c.add(SecurityClass::Nullsec, 9_100).unwrap();
        c.add(SecurityClass::Wormhole, 800).unwrap();
        c.add(SecurityClass::Abyssal, 150).unwrap();
        c.add(SecurityClass::Unknown, unknown).unwrap();
        ClassReport::build(&c.finish(), &ReportConfig::default())
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_report_shows_classes_and_total() {
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        let theme = Theme::dark();
        let report = report(0);

        terminal
            .draw(|frame| render_report(frame, frame.area(), "201606", &report, &theme))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("201606"));
        assert!(text.contains("Highsec"));
        assert!(text.contains("Abyss/Pochven"));
        assert!(text.contains("26,550"));
        assert!(!text.contains("could not be classified"));
    }

    #[test]
    fn test_render_report_mentions_unknown() {
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        let theme = Theme::light();
        let report = report(42);

        terminal
            .draw(|frame| render_report(frame, frame.area(), "202201", &report, &theme))
            .unwrap();
        assert!(buffer_text(&terminal).contains("42 losses could not be classified"));
    }

    #[test]
    fn test_render_report_small_area_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(20, 4)).unwrap();
        let theme = Theme::dark();
        let report = report(1);
        terminal
            .draw(|frame| render_report(frame, frame.area(), "x", &report, &theme))
            .unwrap();
    }

    #[test]
    fn test_render_no_data_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let theme = Theme::dark();
        terminal
            .draw(|frame| render_no_data(frame, frame.area(), "201606", &theme))
            .unwrap();
        assert!(buffer_text(&terminal).contains("No kills recorded"));
    }
}
