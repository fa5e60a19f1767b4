use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "phpswitch",
    version,
    about = "Switch the active Homebrew PHP version"
)]
pub struct Cli {
    /// Print debug output to the terminal.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Switch the active PHP version (falls back to the project pin, then
    /// the configured default, when no version is given).
    #[command(alias = "switch")]
    Use {
        /// Version to activate, e.g. "8.2", "php@8.2", or "default".
        version: Option<String>,

        /// Install the version first if it is missing.
        #[arg(long)]
        install: bool,
    },

    /// Install a PHP version via Homebrew.
    #[command(alias = "i")]
    Install {
        version: String,
    },

    /// Uninstall a PHP version.
    #[command(alias = "rm")]
    Uninstall {
        version: String,
    },

    /// List installed and available PHP versions.
    #[command(alias = "ls")]
    List {
        /// Skip the cache and query Homebrew directly.
        #[arg(long)]
        no_cache: bool,
    },

    /// Show the linked formula and the version active on PATH.
    Current,

    /// Show or set this project's pinned version.
    Project {
        /// Version to pin in ./.php-version; prints the current pin when
        /// omitted.
        version: Option<String>,
    },

    /// Manage the available-version cache.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Delete the cached available-version listing.
    Clear,
    /// Re-run the registry search and rewrite the cache.
    Refresh,
}
