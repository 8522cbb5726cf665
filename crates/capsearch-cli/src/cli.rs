//! Command-line arguments

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use capsearch_core::FinderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per source as results arrive, then the verdict
    Text,
    /// The final session summary as a JSON document
    Json,
    /// Every protocol event as one JSON line
    Events,
}

/// Search video archives, streaming results as each source answers
#[derive(Debug, Parser)]
#[command(name = "capsearch", version)]
pub struct Cli {
    /// Video ID or URL
    pub target: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Cancel the search after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Lookup service root (overrides config and CAPSEARCH_BASE_URL)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Feed protocol version to request
    #[arg(long, value_name = "N")]
    pub api_version: Option<u32>,

    /// Replay a captured feed file instead of querying the server
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Chunk size used when replaying, in bytes
    #[arg(long, default_value_t = 1024, requires = "replay")]
    pub chunk_size: usize,

    /// Report protocol violations instead of silently skipping them
    #[arg(long)]
    pub strict: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Flags take precedence over the config file and environment
    pub fn apply(&self, config: &mut FinderConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(api_version) = self.api_version {
            config.api_version = api_version;
        }
        if self.strict {
            config.strict = true;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["capsearch", "dQw4w9WgXcQ"]).unwrap();
        assert_eq!(cli.target, "dQw4w9WgXcQ");
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.timeout(), None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "capsearch",
            "--base-url",
            "http://localhost:8000",
            "--api-version",
            "3",
            "--strict",
            "--timeout",
            "30",
            "-vv",
            "abc",
        ])
        .unwrap();

        let mut config = FinderConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.api_version, 3);
        assert!(config.strict);
        assert_eq!(cli.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_chunk_size_requires_replay() {
        assert!(Cli::try_parse_from(["capsearch", "--chunk-size", "1", "abc"]).is_err());
        let cli = Cli::try_parse_from([
            "capsearch",
            "--replay",
            "feed.jsonl",
            "--chunk-size",
            "1",
            "--format",
            "events",
            "abc",
        ])
        .unwrap();
        assert_eq!(cli.chunk_size, 1);
        assert_eq!(cli.format, OutputFormat::Events);
    }
}
