#![deny(clippy::mod_module_files)]
use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod git;
mod object;
mod protocol;
mod session;
mod storage;
mod walk;

use config::RemoteConfig;
use git::GitRepository;
use protocol::Outcome;
use session::Session;
use storage::{FilesystemStorage, RemoteStore};

/// URL scheme this helper answers to, e.g. `example:///srv/repo`.
const URL_SCHEME: &str = "example://";

/// Git remote helper that stores objects and refs in a plain directory.
///
/// Git runs it as `git-remote-example <remote-name> <url>` and talks to it
/// over stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "git-remote-example", version)]
struct Args {
    /// Name of the remote, e.g. "origin"
    remote_name: String,
    /// Remote URL, e.g. "example:///tmp/storage" or "/tmp/storage"
    url: Option<String>,
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let args = Args::parse();
    let url = args.url.context("No URL given")?;
    let root = parse_remote_url(&url)?;
    tracing::debug!("remote {} using storage at {:?}", args.remote_name, root);

    let config = RemoteConfig::load().context("Failed to load configuration")?;

    let remote = FilesystemStorage::new(&root).with_compression(config.compress_objects);
    remote
        .initialize()
        .with_context(|| format!("Failed to initialize storage at {:?}", root))?;
    let local = GitRepository::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let outcome = protocol::handle_commands(
        Session::new(&local, &remote, &config),
        stdin.lock(),
        &mut stdout,
    )?;

    Ok(match outcome {
        Outcome::Clean => ExitCode::SUCCESS,
        Outcome::Failed => ExitCode::FAILURE,
    })
}

/// Log to stderr; stdout belongs to the protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if env::var_os("GIT_EXAMPLE_VERBOSE").is_some() {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Map a remote URL to the storage root directory.
///
/// Git hands over either the full URL (`example:///tmp/storage`), or just the
/// address part when the remote was given as `example::/tmp/storage`.
fn parse_remote_url(url: &str) -> Result<PathBuf> {
    let path = url
        .strip_prefix(URL_SCHEME)
        .or_else(|| url.strip_prefix("example::"))
        .unwrap_or(url);

    if path.is_empty() {
        anyhow::bail!("Remote URL {:?} has no storage path", url);
    }
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_url() {
        assert_eq!(
            parse_remote_url("example:///tmp/storage").unwrap(),
            PathBuf::from("/tmp/storage")
        );
        assert_eq!(
            parse_remote_url("example::/tmp/storage").unwrap(),
            PathBuf::from("/tmp/storage")
        );
        assert_eq!(
            parse_remote_url("/tmp/storage").unwrap(),
            PathBuf::from("/tmp/storage")
        );
        assert!(parse_remote_url("example://").is_err());
    }

    #[test]
    fn test_args_require_remote_name() {
        assert!(Args::try_parse_from(["git-remote-example"]).is_err());
        let args = Args::try_parse_from(["git-remote-example", "origin"]).unwrap();
        assert!(args.url.is_none());
    }
}
