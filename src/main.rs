//! sitekit - Maintenance toolkit for a quartz-based blog.

mod assets;
mod checks;
mod cli;
mod config;
mod html;
mod logger;
mod probe;
mod publish;
mod report;
mod utils;

use anyhow::Result;
use assets::{compress, convert};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use probe::HttpProbe;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::load(cli)?));

    if cli.is_asset_command() {
        compress::check_dependencies()?;
    }

    let clean = match &cli.command {
        Commands::CheckSite { json, .. } => {
            let probe = HttpProbe::new()?;
            let report = checks::site::run(config, &probe)?;
            !report.print(*json)?
        }
        Commands::CheckSources { json } => {
            let probe = HttpProbe::new()?;
            let report = checks::source::run(config, &probe)?;
            !report.print(*json)?
        }
        Commands::Convert {
            remove_originals,
            strip_metadata,
            asset_directory,
            ignore_files,
            file,
        } => {
            let opts = convert::ConvertOptions::from_config(config, *remove_originals, *strip_metadata);
            convert::run(config, file.as_deref(), asset_directory.as_deref(), ignore_files, opts)?;
            true
        }
        Commands::Compress { path, .. } => {
            let settings = &config.compress;
            compress::compress(path, settings.image_quality, settings.hevc_crf, settings.vp9_crf)?;
            true
        }
        Commands::UpdateDates => {
            publish::run(config)?;
            true
        }
    };

    if !clean {
        std::process::exit(1);
    }
    Ok(())
}
