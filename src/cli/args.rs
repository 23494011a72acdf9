//! Command line argument parsing and validation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use url::Url;

/// Mirror package distributions into an environment staging area
#[derive(Parser, Debug)]
#[command(
    name = "pkgmirror",
    version,
    about = "Mirror package distributions from a registry into an environment staging area",
    long_about = "Mirror package distributions from a remote registry into a destination \
environment's staging area, tracking uploads in a durable state file, and optionally \
publishing the environment afterwards.

Usage:
  pkgmirror mirror --package mypkg --registry-url https://pkgs.example.com/simple \\
      --workspace-id <WS> --environment-id <ENV> --staging-token <TOKEN>
  pkgmirror upload --file dist/mypkg-1.0-py3-none-any.whl \\
      --workspace-id <WS> --environment-id <ENV> --staging-token <TOKEN> --publish"
)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Suppress non-error output
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Top-level subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mirror one or more packages from a registry into staging
    Mirror(MirrorArgs),
    /// Upload a single artifact file to staging
    Upload(UploadArgs),
}

/// Resolution strategy selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKindArg {
    /// Simple-index HTML listing at {registry-url}/{package}/
    SimpleIndex,
    /// Storage-API file listing (requires --repo)
    Storage,
    /// Feed-enumeration fallback (requires --feed)
    Feed,
}

/// Arguments for the batch mirror flow
#[derive(clap::Args, Debug)]
pub struct MirrorArgs {
    /// Package name to mirror (repeatable)
    #[arg(long = "package", value_name = "NAME")]
    pub packages: Vec<String>,

    /// File with package names, one per line ('#' comments ignored)
    #[arg(long, value_name = "PATH")]
    pub package_list_file: Option<PathBuf>,

    /// Registry base URL (the simple-index root for index listings)
    #[arg(long, value_name = "URL")]
    pub registry_url: Url,

    /// Restrict resolution to a single strategy (default: try all in order)
    #[arg(long, value_enum)]
    pub registry_kind: Option<RegistryKindArg>,

    /// Repository name for storage-API listings
    #[arg(long, value_name = "REPO")]
    pub repo: Option<String>,

    /// Feed name for the packaging-API fallback
    #[arg(long, value_name = "FEED")]
    pub feed: Option<String>,

    /// Feed-management API base URL (defaults to --registry-url)
    #[arg(long, value_name = "URL")]
    pub feed_api_url: Option<Url>,

    /// Registry personal access token, sent as Basic auth
    #[arg(long, env = "PKGMIRROR_REGISTRY_PAT", value_name = "PAT")]
    pub registry_pat: Option<String>,

    /// Registry bearer token
    #[arg(long, env = "PKGMIRROR_REGISTRY_TOKEN", value_name = "TOKEN")]
    pub registry_token: Option<String>,

    /// Registry API key, sent as the X-JFrog-Art-Api header
    #[arg(long, env = "PKGMIRROR_REGISTRY_API_KEY", value_name = "KEY")]
    pub registry_api_key: Option<String>,

    /// Destination flags shared with the upload subcommand
    #[command(flatten)]
    pub staging: StagingArgs,

    /// Local cache directory for downloaded distributions
    #[arg(long, default_value = "cache", value_name = "DIR")]
    pub cache_dir: PathBuf,

    /// Mirror state file (default: {cache-dir}/mirror_state.json)
    #[arg(long, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Publish the environment once after all uploads
    #[arg(long)]
    pub publish: bool,

    /// Upload every distribution kind, not just wheels
    #[arg(long)]
    pub upload_all_kinds: bool,

    /// Retry bound for downloads and uploads (overrides env configuration)
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

/// Arguments for the single-artifact upload flow
#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Path to the artifact file to upload
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    /// Destination flags
    #[command(flatten)]
    pub staging: StagingArgs,

    /// Publish the environment after a successful upload
    #[arg(long)]
    pub publish: bool,

    /// Retry bound for the upload
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

/// Destination staging-service coordinates and credential
#[derive(clap::Args, Debug)]
pub struct StagingArgs {
    /// Staging service API base URL
    #[arg(long, default_value = "https://api.fabric.microsoft.com/v1", value_name = "URL")]
    pub staging_url: Url,

    /// Workspace ID
    #[arg(long, value_name = "ID")]
    pub workspace_id: String,

    /// Environment ID
    #[arg(long, value_name = "ID")]
    pub environment_id: String,

    /// Bearer token for the staging service
    #[arg(long, env = "PKGMIRROR_STAGING_TOKEN", value_name = "TOKEN")]
    pub staging_token: Option<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Mirror(mirror) => mirror.validate(),
            Command::Upload(upload) => {
                if upload.file.as_os_str().is_empty() {
                    return Err("--file is required".to_string());
                }
                Ok(())
            }
        }
    }
}

impl MirrorArgs {
    fn validate(&self) -> Result<(), String> {
        if self.packages.is_empty() && self.package_list_file.is_none() {
            return Err("provide at least one --package or a --package-list-file".to_string());
        }
        if self.registry_kind == Some(RegistryKindArg::Storage) && self.repo.is_none() {
            return Err("--registry-kind storage requires --repo".to_string());
        }
        if self.registry_kind == Some(RegistryKindArg::Feed) && self.feed.is_none() {
            return Err("--registry-kind feed requires --feed".to_string());
        }
        Ok(())
    }
}
