use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error};
use report_compare::cli::Args;
use report_compare::config::CompareConfig;
use report_compare::loader::ReportLoader;
use report_compare::reporting::{self, ComparisonExport, ReportFormat};
use report_compare::scroll::{outline_from_html, shared_sections};
use report_compare::session::{CompareSession, ComparisonSnapshot};
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "ERROR:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => CompareConfig::from_file(path)?,
        None => CompareConfig::default(),
    };
    let format = ReportFormat::from_str(&args.format);
    debug!("Output format: {:?}", format);

    let loader = ReportLoader::for_root(&args.root, args.allow_local, &config)?;
    let mut session = CompareSession::new(loader, config);

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Loading {} and {}", args.left, args.right));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = session.compare(&args.left, &args.right).await;
    spinner.finish_and_clear();
    let snapshot = outcome?;

    let threshold = session.config().ranking.detail_threshold;
    let output = args.output.as_deref().map(|p| format.output_path(p));
    if output.is_some() {
        colored::control::set_override(false);
    }

    let rendered = match format {
        ReportFormat::Text => {
            let mut text = reporting::render_console(&snapshot, threshold);
            if args.sections {
                text.push_str(&render_sections(&snapshot));
            }
            text
        }
        ReportFormat::Json => {
            let export = ComparisonExport::from_snapshot(&snapshot);
            if let Some(path) = &output {
                export.write_to_file(path)?;
                println!("Saved comparison to {}", path.display());
                return Ok(());
            }
            export.to_json()?
        }
        ReportFormat::Html => reporting::render_page(&snapshot, threshold)?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved comparison to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn render_sections(snapshot: &ComparisonSnapshot) -> String {
    let shared = shared_sections(
        &outline_from_html(&snapshot.left.content),
        &outline_from_html(&snapshot.right.content),
    );

    let mut out = format!("\n{}\n", "共同章節".bold().underline());
    for heading in shared {
        out.push_str(&format!("  {}\n", heading));
    }
    out
}
