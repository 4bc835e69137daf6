//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// jellyfetch - Download media libraries from a Jellyfin server
#[derive(Parser, Debug)]
#[command(name = "jellyfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip preflight checks
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download items (movies, series, seasons, episodes, collections)
    Fetch(FetchArgs),

    /// Forget the saved session for a server
    Logout {
        /// Server URL
        #[arg(value_name = "SERVER")]
        server: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Server URL, e.g. http://localhost:8096
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Item ids to download
    #[arg(value_name = "IDS", required = true)]
    pub ids: Vec<String>,

    /// Destination folder (default: config value or current directory)
    #[arg(short, long, value_name = "DEST")]
    pub dest: Option<PathBuf>,

    /// Pick the files to download from a list
    #[arg(short, long)]
    pub list: bool,

    /// Do not descend into seasons and episodes
    #[arg(short, long)]
    pub shallow: bool,

    /// Skip NFO metadata files
    #[arg(short = 'n', long)]
    pub no_nfo: bool,

    /// Skip media files
    #[arg(short = 'm', long)]
    pub no_media: bool,

    /// Skip images
    #[arg(short = 'i', long)]
    pub no_image: bool,

    /// Skip external subtitles
    #[arg(short = 'x', long)]
    pub no_external: bool,

    /// Items downloaded at the same time
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Accept defaults without prompting
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be downloaded and stop
    #[arg(long)]
    pub dry_run: bool,

    /// Username for signing in (prompted when needed)
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_flags() {
        let cli = Cli::try_parse_from([
            "jellyfetch",
            "fetch",
            "http://localhost:8096",
            "abc",
            "def",
            "-d",
            "/media",
            "-l",
            "-x",
            "-j",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.ids, vec!["abc", "def"]);
                assert_eq!(args.dest, Some(PathBuf::from("/media")));
                assert!(args.list);
                assert!(args.no_external);
                assert!(!args.no_nfo);
                assert_eq!(args.jobs, Some(3));
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_fetch_requires_ids() {
        assert!(Cli::try_parse_from(["jellyfetch", "fetch", "http://localhost"]).is_err());
    }
}
