mod bootstrap;

use std::path::Path;

use anyhow::{Context, Result};
use clap::CommandFactory;
use mer_core::calculations::ClassReport;
use mer_core::formatting::render_plain_report;
use mer_core::month::MonthKey;
use mer_core::ruleset::StaticRuleset;
use mer_core::settings::{ReportConfig, Settings};
use mer_data::{convert_dir, Analyzer, Classifier, Converter, RawFormat};
use mer_runtime::orchestrator::SeriesOrchestrator;
use mer_runtime::series::{FailurePolicy, SeriesBuilder};
use mer_ui::app::{restore_terminal, App};
use mer_ui::chart_view::render_plain_series;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories()?;
    let log_file = settings.log.then(|| {
        settings
            .log_file
            .clone()
            .unwrap_or_else(bootstrap::default_log_file)
    });
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("MER stats v{} starting", env!("CARGO_PKG_VERSION"));

    let format = settings
        .format
        .as_deref()
        .map(str::parse::<RawFormat>)
        .transpose()?;

    let mut ran = false;

    if let Some(source) = &settings.convert {
        ran = true;
        Converter::new(source)
            .with_format(format)
            .with_output_dir(settings.effective_output_dir())
            .convert()?;
    }

    if let Some(dir) = &settings.convert_dir {
        ran = true;
        convert_dir(dir, Some(settings.effective_output_dir()), format)?;
    }

    if let Some(path) = &settings.analyze {
        ran = true;
        analyze(&settings, path).await?;
    }

    if settings.plot {
        ran = true;
        plot(&settings).await?;
    }

    if !ran {
        tracing::warn!("Nothing to do; pass --convert, --convert-dir, --analyze or --plot");
        Settings::command().print_help()?;
    }

    Ok(())
}

fn load_classifier(settings: &Settings) -> Result<Classifier> {
    let ruleset = StaticRuleset::load(&settings.ruleset)
        .with_context(|| format!("loading ruleset {}", settings.ruleset.display()))?;
    tracing::info!("Using ruleset '{}'", ruleset.version());
    Ok(Classifier::new(ruleset))
}

/// Analyse one normalized file and show its class report.
async fn analyze(settings: &Settings, path: &Path) -> Result<()> {
    let classifier = load_classifier(settings)?;
    let config = ReportConfig::load_from(&settings.config)?;

    let snapshot = Analyzer::open(path, classifier)?.analyze()?;
    let report = ClassReport::build(&snapshot, &config);

    let title = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|name| match MonthKey::from_file_name(name) {
            Some(month) => month.token(),
            None => name.to_string(),
        })
        .unwrap_or_else(|| path.display().to_string());

    if settings.plain {
        print!("{}", render_plain_report(&title, &report));
        return Ok(());
    }

    App::new(&settings.theme).run_report(title, report).await?;
    Ok(())
}

/// Build the monthly series and chart it.
async fn plot(settings: &Settings) -> Result<()> {
    let classifier = load_classifier(settings)?;
    let policy = if settings.skip_failed {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Abort
    };
    let builder = SeriesBuilder::new(&settings.data_dir, settings.start, classifier)
        .until(settings.until)
        .policy(policy);
    let orchestrator =
        SeriesOrchestrator::new(builder, settings.parallel).with_export(settings.export.clone());

    if settings.plain {
        let series = orchestrator.run().await?;
        print!("{}", render_plain_series(&series));
        return Ok(());
    }

    let (rx, handle) = orchestrator.start();
    let app = App::new(&settings.theme);

    // The chart loop yields once per tick, so an OS-level SIGINT (raw mode
    // turns a typed Ctrl+C into a key event instead) is still observed here.
    tokio::select! {
        result = app.run_chart(rx) => {
            handle.abort();
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; stopping series build");
            handle.abort();
            restore_terminal()?;
        }
    }
    Ok(())
}
