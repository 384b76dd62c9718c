//! Monthly series chart: one line per security class plus the total.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use mer_core::calculations::REPORT_CLASSES;
use mer_core::formatting::{format_count, report_label};
use mer_core::models::{SecurityClass, StatsSnapshot};
use mer_runtime::series::MonthlySeries;

use crate::themes::Theme;

pub const CHART_TITLE: &str = "MER Killmails By Security Class";

/// One plotted line.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLine {
    /// `None` for the all-classes total.
    pub class: Option<SecurityClass>,
    pub points: Vec<(f64, f64)>,
}

impl SeriesLine {
    pub fn name(&self) -> &'static str {
        match self.class {
            Some(SecurityClass::Abyssal) => "Abyssal",
            Some(class) => class.label(),
            None => "Total",
        }
    }
}

/// Points for the Total line followed by one line per report class; the x
/// value is the month's index in the series.
pub fn series_lines(series: &MonthlySeries) -> Vec<SeriesLine> {
    let line = |class: Option<SecurityClass>, value: &dyn Fn(&StatsSnapshot) -> u64| SeriesLine {
        class,
        points: series
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, value(&p.snapshot) as f64))
            .collect(),
    };

    std::iter::once(line(None, &|s| s.total_kills()))
        .chain(
            REPORT_CLASSES
                .iter()
                .map(|&class| line(Some(class), &move |s| s.kills(class))),
        )
        .collect()
}

/// First, middle and last month tokens.
pub fn x_labels(series: &MonthlySeries) -> Vec<String> {
    let points = &series.points;
    match points.len() {
        0 => Vec::new(),
        1 => vec![points[0].month.token()],
        2 => vec![points[0].month.token(), points[1].month.token()],
        n => vec![
            points[0].month.token(),
            points[(n - 1) / 2].month.token(),
            points[n - 1].month.token(),
        ],
    }
}

/// Render the series chart into `area`.
pub fn render_chart(frame: &mut Frame, area: Rect, series: &MonthlySeries, theme: &Theme) {
    if series.is_empty() {
        render_message(frame, area, "No monthly dumps found", theme.warning, theme);
        return;
    }

    let [chart_area, footer_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);

    let lines = series_lines(series);
    let max_y = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|(_, y)| *y))
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let max_x = (series.len().saturating_sub(1) as f64).max(1.0);

    let datasets: Vec<Dataset> = lines
        .iter()
        .map(|l| {
            let style = l.class.map(|c| theme.class_style(c)).unwrap_or(theme.total);
            Dataset::default()
                .name(l.name())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(style)
                .data(&l.points)
        })
        .collect();

    let y_labels = vec![
        "0".to_string(),
        format_count((max_y / 2.0).round() as u64),
        format_count(max_y.round() as u64),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(format!(" {} ", CHART_TITLE), theme.title)),
        )
        .x_axis(
            Axis::default()
                .title("Month")
                .style(theme.axis)
                .bounds([0.0, max_x])
                .labels(x_labels(series)),
        )
        .y_axis(
            Axis::default()
                .title("Killmails")
                .style(theme.axis)
                .bounds([0.0, max_y * 1.05])
                .labels(y_labels),
        );
    frame.render_widget(chart, chart_area);

    let mut footer = vec![Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)];
    if !series.skipped.is_empty() {
        footer.push(Span::styled(
            format!("  ({} months skipped)", series.skipped.len()),
            theme.warning,
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(footer)), footer_area);
}

/// Placeholder shown while the series is still being analysed.
pub fn render_loading(frame: &mut Frame, area: Rect, theme: &Theme) {
    render_message(frame, area, "Analysing monthly dumps…", theme.text, theme);
}

/// Shown when the series build failed.
pub fn render_failed(frame: &mut Frame, area: Rect, reason: &str, theme: &Theme) {
    render_message(frame, area, reason, theme.error, theme);
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, style: ratatui::style::Style, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), style)),
        Line::from(""),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", CHART_TITLE)),
            ),
        area,
    );
}

/// The series as a fixed-width text table, one line per month.
pub fn render_plain_series(series: &MonthlySeries) -> String {
    let mut out = format!("{}\n", CHART_TITLE);
    out.push_str(&format!("{:<8}{:>12}", "Month", "Total"));
    for class in REPORT_CLASSES {
        out.push_str(&format!("{:>15}", report_label(class)));
    }
    out.push('\n');

    for point in &series.points {
        out.push_str(&format!(
            "{:<8}{:>12}",
            point.month.token(),
            format_count(point.snapshot.total_kills())
        ));
        for class in REPORT_CLASSES {
            out.push_str(&format!("{:>15}", format_count(point.snapshot.kills(class))));
        }
        out.push('\n');
    }

    for skipped in &series.skipped {
        out.push_str(&format!("skipped {}: {}\n", skipped.month, skipped.reason));
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mer_core::models::ClassCounter;
    use mer_core::month::MonthKey;
    use mer_runtime::series::{SeriesPoint, SkippedMonth};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn point(token: &str, high: u64, worm: u64) -> SeriesPoint {
        let mut c = ClassCounter::new();
        c.add(SecurityClass::Highsec, high).unwrap();
        c.add(SecurityClass::Wormhole, worm).unwrap();
        SeriesPoint {
            month: token.parse::<MonthKey>().unwrap(),
            snapshot: c.finish(),
        }
    }

    fn series() -> MonthlySeries {
        MonthlySeries {
            points: vec![
                point("201606", 100, 5),
                point("201607", 120, 7),
                point("201608", 90, 4),
                point("201609", 130, 9),
            ],
            skipped: vec![],
        }
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
    fn test_series_lines_order_and_values() {
        let lines = series_lines(&series());
        let names: Vec<&str> = lines.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["Total", "Highsec", "Lowsec", "Nullsec", "Wormhole", "Abyssal"]);
        assert_eq!(lines[0].points[1], (1.0, 127.0));
        assert_eq!(lines[4].points[3], (3.0, 9.0));
    }

    #[test]
    fn test_x_labels() {
        assert_eq!(x_labels(&series()), vec!["201606", "201607", "201609"]);
        assert!(x_labels(&MonthlySeries::default()).is_empty());
    }

    #[test]
    fn test_render_chart_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let theme = Theme::dark();
        let s = series();
        terminal
            .draw(|frame| render_chart(frame, frame.area(), &s, &theme))
            .unwrap();
        assert!(buffer_text(&terminal).contains(CHART_TITLE));
    }

    #[test]
    fn test_render_single_month_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let theme = Theme::light();
        let s = MonthlySeries {
            points: vec![point("201606", 1, 0)],
            skipped: vec![],
        };
        terminal
            .draw(|frame| render_chart(frame, frame.area(), &s, &theme))
            .unwrap();
    }

    #[test]
    fn test_render_empty_series_shows_message() {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let theme = Theme::dark();
        terminal
            .draw(|frame| render_chart(frame, frame.area(), &MonthlySeries::default(), &theme))
            .unwrap();
        assert!(buffer_text(&terminal).contains("No monthly dumps found"));
    }

    #[test]
    fn test_render_loading_and_failed_do_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        let theme = Theme::dark();
        terminal
            .draw(|frame| render_loading(frame, frame.area(), &theme))
            .unwrap();
        terminal
            .draw(|frame| render_failed(frame, frame.area(), "Malformed row 2", &theme))
            .unwrap();
        assert!(buffer_text(&terminal).contains("Malformed row 2"));
    }

    #[test]
    fn test_render_plain_series() {
        let mut s = series();
        s.skipped.push(SkippedMonth {
            month: "201610".parse().unwrap(),
            path: "201610_kill_dump.csv".into(),
            reason: "bad row".into(),
        });
        let text = render_plain_series(&s);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CHART_TITLE);
        assert!(lines[1].starts_with("Month"));
        assert!(lines[2].starts_with("201606"));
        assert!(lines[2].contains("105"));
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[6], "skipped 201610: bad row");
    }
}
