//! Command line argument parsing and validation.

use crate::error::CliError;
use crate::{DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL, PublishConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Upload an Android App Bundle to Google Play and commit it
#[derive(Parser, Debug)]
#[command(
    name = "play_publish",
    version,
    about = "Upload an Android App Bundle to Google Play and commit it",
    long_about = "Open a Google Play edit, upload one .aab into it, commit the edit and close it.

Usage:
  play_publish app-release.aab --package com.example.app
  play_publish app-release.aab -p com.example.app -c service-account.json
  PLAY_PACKAGE_NAME=com.example.app play_publish build/app.aab"
)]
pub struct Args {
    /// Path to the .aab bundle to upload
    #[arg(index = 1, value_name = "ARTIFACT", env = "PLAY_ARTIFACT_PATH")]
    pub artifact: PathBuf,

    /// Application package name
    #[arg(short = 'p', long = "package", value_name = "PACKAGE", env = "PLAY_PACKAGE_NAME")]
    pub package_name: String,

    /// Service-account JSON key
    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        env = "PLAY_CREDENTIALS",
        default_value = "credentials.json"
    )]
    pub credentials: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 300)]
    pub timeout: u64,

    /// Show per-step details
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Edits API root
    #[arg(long, hide = true, env = "PLAY_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Media upload API root
    #[arg(
        long,
        hide = true,
        env = "PLAY_UPLOAD_BASE_URL",
        default_value = DEFAULT_UPLOAD_BASE_URL
    )]
    pub upload_base_url: String,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        let invalid = |reason: String| CliError::InvalidArguments { reason };

        if self.package_name.is_empty() {
            return Err(invalid("Package name is required".to_string()));
        }

        if !is_valid_package_name(&self.package_name) {
            return Err(invalid(format!(
                "'{}' is not a valid package name (expected e.g. com.example.app)",
                self.package_name
            )));
        }

        if self.timeout == 0 {
            return Err(invalid("Timeout must be at least 1 second".to_string()));
        }

        Ok(())
    }

    /// Build the publish configuration
    pub fn to_config(&self) -> PublishConfig {
        let mut config = PublishConfig::new(
            self.artifact.clone(),
            self.package_name.clone(),
            self.credentials.clone(),
        );
        config.request_timeout = Duration::from_secs(self.timeout);
        config.api_base_url = self.api_base_url.clone();
        config.upload_base_url = self.upload_base_url.clone();
        config
    }
}

/// Dotted identifier with at least two segments, each starting with a letter
fn is_valid_package_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() >= 2
        && segments.iter().all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
