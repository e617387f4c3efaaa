use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "report-compare")]
#[command(version)]
#[command(about = "Side-by-side comparison of generated analysis reports.", long_about = None)]
pub struct Args {
    /// Site root the reports live under (http(s) URL, or a directory with --allow-local).
    #[arg(short, long)]
    pub root: String,

    /// Identifier of the older report (e.g. monthly/2024-05).
    #[arg(short, long)]
    pub left: String,

    /// Identifier of the newer report.
    #[arg(short = 'R', long)]
    pub right: String,

    /// Permit reading reports from the local filesystem.
    #[arg(long)]
    pub allow_local: bool,

    /// YAML file overriding selectors, thresholds and column hints.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format: text, json or html.
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Write the output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also list the section headings both reports share.
    #[arg(long)]
    pub sections: bool,
}
