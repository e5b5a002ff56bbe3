//! imageio CLI Library
//!
//! Command-line client for an imageio server.
//!
//! # Overview
//!
//! - **Brands**: list, create and delete brands and categories (`imageio brands ...`)
//! - **Imports**: upload a spreadsheet and follow its progress (`imageio import`)
//! - **Exports**: download a brand's image archive or link sheet (`imageio export ...`)

pub mod api;
pub mod commands;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// imageio - bulk image ingestion for brand catalogs
#[derive(Parser, Debug)]
#[command(name = "imageio")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(
        long,
        env = "IMAGEIO_SERVER_URL",
        default_value = api::client::DEFAULT_SERVER_URL,
        global = true
    )]
    pub server_url: String,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage brands and categories
    Brands {
        #[command(subcommand)]
        command: BrandsCommand,
    },

    /// Import a spreadsheet of image URLs into a brand
    Import {
        /// Brand or category id
        brand_id: i64,

        /// Spreadsheet to upload (.xlsx, .xls, .xlsb, .ods or .csv)
        file: PathBuf,
    },

    /// Download a brand's images or links
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
}

/// Brand management subcommands
#[derive(Subcommand, Debug)]
pub enum BrandsCommand {
    /// List brands and categories with their counts
    List,

    /// Create a brand or category
    Create {
        /// Display name
        name: String,

        /// Whether this is a brand or a category
        #[arg(short, long, value_enum, default_value_t = BrandKindArg::Brand)]
        kind: BrandKindArg,
    },

    /// Delete a brand with its items and stored images
    Delete {
        /// Brand or category id
        id: i64,
    },
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    /// Zip archive of downloaded images, one folder per item
    Zip {
        /// Brand or category id
        brand_id: i64,

        /// Output file (defaults to the name suggested by the server)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// XLSX sheet of public image links, re-importable as-is
    Links {
        /// Brand or category id
        brand_id: i64,

        /// Output file (defaults to the name suggested by the server)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrandKindArg {
    Brand,
    Category,
}

impl BrandKindArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Category => "category",
        }
    }
}
