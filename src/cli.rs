//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Maintenance toolkit for a quartz-based blog
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root (default: the enclosing git work tree, else the current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: sitekit.toml)
    #[arg(short = 'C', long, default_value = "sitekit.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check the built site for rendering and formatting regressions
    CheckSite {
        /// Also require the preloaded EB Garamond subfont on every page
        #[arg(long)]
        check_fonts: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check markdown sources, their frontmatter and the font stylesheet
    CheckSources {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert assets and rewrite the markdown that references them
    Convert {
        /// Remove original files after conversion
        #[arg(short = 'r', long)]
        remove_originals: bool,

        /// Strip metadata from converted files
        #[arg(short, long)]
        strip_metadata: bool,

        /// Directory containing assets to convert
        #[arg(short = 'd', long)]
        asset_directory: Option<PathBuf>,

        /// File names to leave untouched
        #[arg(long, num_args = 1..)]
        ignore_files: Vec<String>,

        /// A single asset to convert
        #[arg(required_unless_present = "asset_directory")]
        file: Option<PathBuf>,
    },

    /// Compress one image to AVIF or one video to MP4/HEVC and WebM/VP9
    Compress {
        /// Path to the file to compress
        path: PathBuf,

        /// AVIF quality (0-100, lower means smaller file)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        quality_img: Option<u8>,

        /// HEVC CRF (0-51, lower is better quality)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
        quality_hevc: Option<u8>,

        /// WebM CRF (0-63, lower is better quality)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=63))]
        quality_webm: Option<u8>,
    },

    /// Stamp publish and update dates into post frontmatter
    UpdateDates,
}

#[allow(unused)]
impl Cli {
    pub const fn is_check(&self) -> bool {
        matches!(
            self.command,
            Commands::CheckSite { .. } | Commands::CheckSources { .. }
        )
    }
    pub const fn is_asset_command(&self) -> bool {
        matches!(
            self.command,
            Commands::Convert { .. } | Commands::Compress { .. }
        )
    }
}
