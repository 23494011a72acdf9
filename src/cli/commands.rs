//! Subcommand execution: wiring arguments into the pipeline.

use crate::auth::RegistryAuth;
use crate::cache::DownloadCache;
use crate::cli::args::{Args, Command, MirrorArgs, RegistryKindArg, UploadArgs};
use crate::cli::output::OutputManager;
use crate::cli::retry_config::RetryConfig;
use crate::error::{CliError, Result};
use crate::ledger::MirrorLedger;
use crate::pipeline::{BatchSummary, MirrorPipeline, UploadPolicy};
use crate::resolve::{FeedSource, RegistrySource, SimpleIndexSource, StorageSource};
use crate::retry::Backoff;
use crate::staging::{StagingClient, StagingConfig};
use std::time::Duration;

/// Execute the parsed command, returning the process exit code.
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.quiet);

    if let Err(reason) = args.validate() {
        return Err(CliError::InvalidArguments { reason }.into());
    }

    match args.command {
        Command::Mirror(mirror) => execute_mirror(mirror, &output).await,
        Command::Upload(upload) => execute_upload(upload, &output).await,
    }
}

/// The batch mirror flow: resolve, download, upload, record, maybe publish.
async fn execute_mirror(args: MirrorArgs, output: &OutputManager) -> Result<i32> {
    let packages = collect_packages(&args)?;
    if packages.is_empty() {
        return Err(CliError::InvalidArguments {
            reason: "package list resolved to zero packages".to_string(),
        }
        .into());
    }

    let retry = RetryConfig::from_env().with_retries(args.retries);
    retry
        .validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let auth = registry_auth(&args);
    let client = auth.client()?;
    let sources = build_sources(&args, client.clone())?;

    let cache = DownloadCache::new(
        &args.cache_dir,
        client,
        Backoff::new(retry.downloads, Duration::from_secs(1)),
    )?;
    let state_file = args
        .state_file
        .clone()
        .unwrap_or_else(|| args.cache_dir.join("mirror_state.json"));
    let ledger = MirrorLedger::load(&state_file);

    let staging = StagingClient::new(staging_config(
        &args.staging.staging_url,
        &args.staging.workspace_id,
        &args.staging.environment_id,
        args.staging.staging_token.clone(),
        &retry,
    ))?;

    let policy = if args.upload_all_kinds {
        UploadPolicy::AllDistributions
    } else {
        UploadPolicy::PrimaryBinaryOnly
    };

    output.section("Mirror");
    output.info(&format!(
        "mirroring {} package(s) into workspace {} / environment {}",
        packages.len(),
        staging.workspace_id(),
        staging.environment_id()
    ));
    output.indent(&format!("cache: {}", args.cache_dir.display()));
    output.indent(&format!("state: {}", state_file.display()));

    let mut pipeline = MirrorPipeline::new(sources, cache, ledger, staging, policy);
    let summary = pipeline.run(&packages, args.publish).await;

    print_summary(&summary, output);

    // Per-artifact failures are reported but do not fail the run; the next
    // invocation retries anything the ledger does not record as uploaded.
    Ok(0)
}

/// The single-artifact upload flow.
async fn execute_upload(args: UploadArgs, output: &OutputManager) -> Result<i32> {
    let retry = RetryConfig::from_env().with_retries(args.retries);
    retry
        .validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let staging = StagingClient::new(staging_config(
        &args.staging.staging_url,
        &args.staging.workspace_id,
        &args.staging.environment_id,
        args.staging.staging_token.clone(),
        &retry,
    ))?;

    output.section("Upload");
    output.info(&format!("uploading {}", args.file.display()));

    let report = staging.upload(&args.file, Some(retry.uploads)).await;
    if !report.success {
        output.error(&report.to_string());
        return Ok(1);
    }
    output.success(&report.to_string());

    if args.publish {
        output.info("publishing environment");
        let outcome = staging.publish().await;
        if outcome.is_success() {
            output.success(&outcome.detail());
        } else {
            output.error(&outcome.detail());
            output.indent("the artifact is staged; publish manually once the issue is resolved");
            return Ok(1);
        }
    }

    Ok(0)
}

/// Merge `--package` flags with the optional package list file, deduplicating
/// while preserving first-seen order.
fn collect_packages(args: &MirrorArgs) -> Result<Vec<String>> {
    let mut packages: Vec<String> = Vec::new();
    let mut push = |name: &str, packages: &mut Vec<String>| {
        let name = name.trim();
        if !name.is_empty() && !packages.iter().any(|p| p == name) {
            packages.push(name.to_string());
        }
    };

    for name in &args.packages {
        push(name, &mut packages);
    }

    if let Some(path) = &args.package_list_file {
        let contents = std::fs::read_to_string(path).map_err(|e| CliError::PackageList {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        for line in contents.lines() {
            let line = line.split('#').next().unwrap_or("");
            push(line, &mut packages);
        }
    }

    Ok(packages)
}

/// Pick the registry credential. An explicit bearer token wins over a PAT,
/// which wins over an API key.
fn registry_auth(args: &MirrorArgs) -> RegistryAuth {
    if let Some(token) = &args.registry_token {
        RegistryAuth::Bearer(token.clone())
    } else if let Some(pat) = &args.registry_pat {
        RegistryAuth::BasicPat(pat.clone())
    } else if let Some(key) = &args.registry_api_key {
        RegistryAuth::ApiKey(key.clone())
    } else {
        RegistryAuth::Anonymous
    }
}

/// Assemble resolution sources in priority order.
///
/// With no `--registry-kind`, every strategy the flags can support is
/// configured: simple index always, storage when `--repo` is given, feed
/// when `--feed` is given.
fn build_sources(args: &MirrorArgs, client: reqwest::Client) -> Result<Vec<RegistrySource>> {
    let index = SimpleIndexSource::new(args.registry_url.clone(), client.clone());

    let mut sources = Vec::new();
    let wants = |kind: RegistryKindArg| args.registry_kind.is_none() || args.registry_kind == Some(kind);

    if wants(RegistryKindArg::SimpleIndex) {
        sources.push(RegistrySource::SimpleIndex(index.clone()));
    }
    if wants(RegistryKindArg::Storage) {
        if let Some(repo) = &args.repo {
            sources.push(RegistrySource::Storage(StorageSource::new(
                args.registry_url.clone(),
                repo,
                client.clone(),
            )));
        }
    }
    if wants(RegistryKindArg::Feed) {
        if let Some(feed) = &args.feed {
            let api_base = args
                .feed_api_url
                .clone()
                .unwrap_or_else(|| args.registry_url.clone());
            sources.push(RegistrySource::Feed(FeedSource::new(
                api_base, feed, client, index,
            )));
        }
    }

    if sources.is_empty() {
        return Err(CliError::InvalidArguments {
            reason: "no resolution strategy is configured for the given flags".to_string(),
        }
        .into());
    }
    Ok(sources)
}

fn staging_config(
    base_url: &url::Url,
    workspace_id: &str,
    environment_id: &str,
    token: Option<String>,
    retry: &RetryConfig,
) -> StagingConfig {
    let mut config = StagingConfig::new(base_url.clone(), workspace_id, environment_id, token);
    config.backoff = Backoff::new(retry.uploads, Duration::from_secs(1));
    config.poll_interval = retry.poll_interval();
    config.publish_timeout = retry.publish_timeout();
    config
}

fn print_summary(summary: &BatchSummary, output: &OutputManager) {
    output.section("Summary");
    for report in &summary.packages {
        output.println(&format!(
            "{}: resolved {}, uploaded {}, already uploaded {}, skipped by policy {}, filtered {}, failed {}",
            report.package,
            report.resolved,
            report.uploaded,
            report.already_uploaded,
            report.skipped_by_policy,
            report.filtered_out,
            report.failed
        ));
    }
    if summary.total_failed() > 0 {
        output.warn(&format!(
            "{} artifact(s) failed; rerun to retry them",
            summary.total_failed()
        ));
    } else {
        output.success(&format!("{} artifact(s) uploaded", summary.total_uploaded()));
    }

    match &summary.publish {
        Some(outcome) if outcome.is_success() => output.success(&outcome.detail()),
        Some(outcome) => {
            output.error(&outcome.detail());
            output.indent("uploads are staged; publish manually once the issue is resolved");
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn parse_mirror(extra: &[&str]) -> MirrorArgs {
        let mut argv = vec![
            "pkgmirror",
            "mirror",
            "--registry-url",
            "https://pkgs.example.com/simple",
            "--workspace-id",
            "ws-1",
            "--environment-id",
            "env-1",
        ];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Mirror(mirror) => mirror,
            _ => unreachable!(),
        }
    }

    #[test]
    fn package_list_file_merges_and_dedupes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "alpha").unwrap();
        writeln!(file, "beta  # trailing comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "alpha").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = parse_mirror(&["--package", "beta", "--package-list-file", &path]);
        let packages = collect_packages(&args).unwrap();
        assert_eq!(packages, vec!["beta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn missing_package_list_file_is_an_error() {
        let args = parse_mirror(&["--package-list-file", "/nonexistent/packages.txt"]);
        assert!(collect_packages(&args).is_err());
    }

    #[test]
    fn bearer_token_outranks_pat_and_api_key() {
        let args = parse_mirror(&[
            "--package",
            "demo",
            "--registry-token",
            "tok",
            "--registry-pat",
            "pat",
            "--registry-api-key",
            "key",
        ]);
        assert!(matches!(registry_auth(&args), RegistryAuth::Bearer(_)));

        let args = parse_mirror(&["--package", "demo", "--registry-pat", "pat"]);
        assert!(matches!(registry_auth(&args), RegistryAuth::BasicPat(_)));

        let args = parse_mirror(&["--package", "demo"]);
        assert!(matches!(registry_auth(&args), RegistryAuth::Anonymous));
    }

    #[test]
    fn sources_default_to_every_configured_strategy() {
        let client = reqwest::Client::new();
        let args = parse_mirror(&["--package", "demo", "--repo", "pypi-local", "--feed", "f1"]);
        let sources = build_sources(&args, client.clone()).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.strategy_name()).collect();
        assert_eq!(names, vec!["simple-index", "storage", "feed"]);

        let args = parse_mirror(&["--package", "demo"]);
        let sources = build_sources(&args, client).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.strategy_name()).collect();
        assert_eq!(names, vec!["simple-index"]);
    }

    #[test]
    fn restricting_kind_keeps_only_that_strategy() {
        let client = reqwest::Client::new();
        let args = parse_mirror(&[
            "--package",
            "demo",
            "--registry-kind",
            "storage",
            "--repo",
            "pypi-local",
        ]);
        let sources = build_sources(&args, client).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].strategy_name(), "storage");
    }
}
