pub mod models;
pub mod config;
pub mod utils;
pub mod cli;

/// Retrieval and extraction of report documents
pub mod loader;

/// Table diffing and change ranking
pub mod analysis;

/// Comparison state and query selection
pub mod session;

/// Side-by-side scroll coupling
pub mod scroll;

/// Chart inputs and the report search index
pub mod chart_data;
pub mod search;

/// Text, JSON and HTML output
pub mod reporting;
