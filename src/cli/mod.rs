//! Command-line interface for the vehicle catalog.

mod commands;

use clap::{Parser, Subcommand};

/// Vehicle catalog - brands, models and engine variants by production year
#[derive(Parser)]
#[command(name = "vehicle-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct PageArgs {
    /// Zero-based page number
    #[arg(long)]
    pub page: Option<u32>,
    /// Page size (clamped to the configured maximum)
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// List active brands
    #[command(alias = "b")]
    Brands {
        /// Substring filter on name or alias
        #[arg(long, short)]
        search: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// List active models of a brand, optionally only those built in a year
    #[command(alias = "m")]
    Models {
        brand_id: i32,
        /// Production year the model must cover
        #[arg(long, short)]
        year: Option<i32>,
        #[arg(long, short)]
        search: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// List engine variants of a model with their engine codes
    #[command(alias = "v", alias = "types")]
    Variants {
        model_id: i32,
        #[arg(long, short)]
        search: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Free-text search across the catalog
    #[command(alias = "s")]
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        /// all, brands, models or engine_variants
        #[arg(long)]
        scope: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Import catalog data from a JSON file
    Import {
        /// Path to the JSON payload
        path: String,
    },

    /// Show row counts per catalog table
    Stats,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
