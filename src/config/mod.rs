//! Project configuration management for `sitekit.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[paths]`    | Markdown sources, built site, font stylesheet    |
//! | `[site]`     | Allowed asset hosts, pages without markdown      |
//! | `[check]`    | Validator thresholds and opt-in checks           |
//! | `[compress]` | AVIF quality and video CRF values                |
//!
//! The file is optional: every field has a default.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! content = "content"
//! public = "public"
//!
//! [check]
//! description_max = 155
//!
//! [compress]
//! hevc_crf = 28
//! ```

mod check;
mod compress;
pub mod defaults;
mod error;
mod paths;
mod site;

use check::CheckConfig;
use compress::CompressConfig;
pub use error::ConfigError;
use paths::PathsConfig;
use site::SiteSection;

use crate::{
    cli::{Cli, Commands},
    utils::git::git_root,
};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Highest CRF accepted by libx265
pub const HEVC_CRF_MAX: u8 = 51;
/// Highest CRF accepted by libvpx-vp9
pub const VP9_CRF_MAX: u8 = 63;

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing sitekit.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute project root (set after loading)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub site: SiteSection,

    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub compress: CompressConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `sitekit.toml` from the project root, falling back to defaults.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let root = Self::resolve_root(cli.root.as_deref());
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli, &root);
        config.validate()?;
        Ok(config)
    }

    /// `--root`, else the enclosing git work tree, else the current directory.
    fn resolve_root(cli_root: Option<&Path>) -> PathBuf {
        if let Some(root) = cli_root {
            return Self::normalize_path(&Self::expand_tilde(root));
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        git_root(&cwd).unwrap_or(cwd)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli, root: &Path) {
        self.cli = Some(cli);
        self.update_path_with_root(root, &cli.config);

        match &cli.command {
            Commands::CheckSite { check_fonts, .. } => {
                self.check.check_fonts |= *check_fonts;
            }
            Commands::Compress {
                quality_img,
                quality_hevc,
                quality_webm,
                ..
            } => {
                Self::update_option(&mut self.compress.image_quality, quality_img.as_ref());
                Self::update_option(&mut self.compress.hevc_crf, quality_hevc.as_ref());
                Self::update_option(&mut self.compress.vp9_crf, quality_webm.as_ref());
            }
            _ => {}
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve every configured path against `root` and make it absolute
    fn update_path_with_root(&mut self, root: &Path, config_name: &Path) {
        let root = Self::normalize_path(root);
        self.config_path = Self::normalize_path(&root.join(config_name));

        let resolve = |path: &Path| Self::normalize_path(&root.join(Self::expand_tilde(path)));
        self.paths.content = resolve(&self.paths.content);
        self.paths.public = resolve(&self.paths.public);
        self.paths.fonts_scss = resolve(&self.paths.fonts_scss);
        self.root = root;
    }

    fn expand_tilde(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
            None => path.to_path_buf(),
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        if self.compress.image_quality > 100 {
            bail!(ConfigError::Validation(
                "[compress.image_quality] must be between 0 and 100".into()
            ));
        }
        if self.compress.hevc_crf > HEVC_CRF_MAX {
            bail!(ConfigError::Validation(format!(
                "[compress.hevc_crf] must be between 0 and {HEVC_CRF_MAX}"
            )));
        }
        if self.compress.vp9_crf > VP9_CRF_MAX {
            bail!(ConfigError::Validation(format!(
                "[compress.vp9_crf] must be between 0 and {VP9_CRF_MAX}"
            )));
        }
        if self.check.description_min > self.check.description_max {
            bail!(ConfigError::Validation(
                "[check.description_min] must not exceed [check.description_max]".into()
            ));
        }
        if self.site.asset_domains.is_empty() {
            bail!(ConfigError::Validation(
                "[site.asset_domains] must have at least one element".into()
            ));
        }

        match self.cli.map(|cli| &cli.command) {
            Some(Commands::CheckSite { .. }) if !self.paths.public.is_dir() => {
                bail!(ConfigError::MissingPath {
                    field: "[paths.public]",
                    path: self.paths.public.clone(),
                })
            }
            Some(Commands::CheckSources { .. } | Commands::UpdateDates)
                if !self.paths.content.is_dir() =>
            {
                bail!(ConfigError::MissingPath {
                    field: "[paths.content]",
                    path: self.paths.content.clone(),
                })
            }
            _ => {}
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
