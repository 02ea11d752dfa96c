use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hydrolysis_sim::app::{format_elapsed, ProcessApp};
use hydrolysis_sim::config::{Cli, Config};
use hydrolysis_sim::headless;
use hydrolysis_sim::steps::definition;

fn main() -> Result<()> {
    let config = Config::from(Cli::parse());

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if config.headless {
        return run_headless(&config);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 760.0])
            .with_min_inner_size([900.0, 620.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Hydrolysis Process Simulator",
        options,
        Box::new(move |cc| Ok(Box::new(ProcessApp::new(cc, &config)))),
    )
    .map_err(|err| anyhow!("window loop failed: {err}"))
}

fn run_headless(config: &Config) -> Result<()> {
    let report = headless::run_cycle(config)?;

    println!(
        "{:>8} {:<24} {:>8} {:>8} {:>8}",
        "At (s)", "Step", "Temp °C", "MPa", "Elapsed"
    );
    println!("{}", "-".repeat(60));
    for entry in &report.entries {
        println!(
            "{:>8.1} {:<24} {:>8.0} {:>8.1} {:>8}",
            entry.at.as_secs_f64(),
            definition(entry.step).title,
            entry.temperature,
            entry.pressure,
            format_elapsed(entry.time_elapsed)
        );
    }

    if report.recorded {
        if let Some(path) = &config.record_to {
            println!("\nTrace written to {}", path.display());
        }
    }
    Ok(())
}
