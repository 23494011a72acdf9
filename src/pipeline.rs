//! The mirror pipeline driver.
//!
//! Sequences, per package: resolve, filter, download, hash, ledger check,
//! upload, record. One artifact's failure never aborts the batch; publish
//! runs at most once after the whole batch.

use crate::cache::DownloadCache;
use crate::hash::sha256_of_file;
use crate::ledger::MirrorLedger;
use crate::resolve::{ArtifactKind, RegistrySource, filter_distributions, resolve_with_fallback};
use crate::staging::{PublishOutcome, StagingClient};

/// Which distribution kinds are pushed to staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    /// Upload only the primary binary artifact (wheels). Other distribution
    /// kinds are still downloaded for completeness but skipped at upload
    /// time. This is the default and a deliberate scope limiter.
    PrimaryBinaryOnly,
    /// Upload every distribution kind on the allow-list.
    AllDistributions,
}

impl UploadPolicy {
    /// Whether this policy permits uploading an artifact of `kind`.
    pub fn permits(self, kind: ArtifactKind) -> bool {
        match self {
            UploadPolicy::PrimaryBinaryOnly => kind == ArtifactKind::Wheel,
            UploadPolicy::AllDistributions => kind.is_distribution(),
        }
    }
}

/// Per-package outcome counters.
#[derive(Debug, Clone, Default)]
pub struct PackageReport {
    /// Package this report covers.
    pub package: String,
    /// Entries the resolver produced before filtering.
    pub resolved: usize,
    /// Entries dropped by the extension allow-list.
    pub filtered_out: usize,
    /// Entries skipped because the ledger already records them uploaded.
    pub already_uploaded: usize,
    /// Entries downloaded but excluded from upload by policy.
    pub skipped_by_policy: usize,
    /// Entries uploaded and recorded this run.
    pub uploaded: usize,
    /// Entries that failed to download, hash, or upload.
    pub failed: usize,
}

impl PackageReport {
    fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            ..Self::default()
        }
    }
}

/// Outcome of a whole batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Per-package reports, in processing order.
    pub packages: Vec<PackageReport>,
    /// Publish outcome, when publishing was requested.
    pub publish: Option<PublishOutcome>,
}

impl BatchSummary {
    /// Total artifacts uploaded across the batch.
    pub fn total_uploaded(&self) -> usize {
        self.packages.iter().map(|p| p.uploaded).sum()
    }

    /// Total per-artifact failures across the batch.
    pub fn total_failed(&self) -> usize {
        self.packages.iter().map(|p| p.failed).sum()
    }
}

/// Drives the mirror-and-publish pipeline for a batch of packages.
///
/// Owns the ledger for the duration of the run; packages and entries are
/// processed strictly sequentially, which keeps the ledger's
/// load-mutate-persist cycle single-writer.
pub struct MirrorPipeline {
    sources: Vec<RegistrySource>,
    cache: DownloadCache,
    ledger: MirrorLedger,
    staging: StagingClient,
    policy: UploadPolicy,
}

impl MirrorPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        sources: Vec<RegistrySource>,
        cache: DownloadCache,
        ledger: MirrorLedger,
        staging: StagingClient,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            sources,
            cache,
            ledger,
            staging,
            policy,
        }
    }

    /// Mirror every entry of one package. Failures are counted, never
    /// propagated: a bad artifact must not sink the batch.
    pub async fn mirror_package(&mut self, package: &str) -> PackageReport {
        let mut report = PackageReport::new(package);
        log::info!("mirroring package: {package}");

        let entries = resolve_with_fallback(&self.sources, package).await;
        report.resolved = entries.len();
        if entries.is_empty() {
            log::warn!("no entries resolved for '{package}'; skipping");
            return report;
        }

        let (entries, dropped) = filter_distributions(entries);
        report.filtered_out = dropped;
        if entries.is_empty() {
            log::warn!("no distribution files for '{package}' after filtering; skipping");
            return report;
        }

        for entry in entries {
            let local_path = match self.cache.ensure(&entry).await {
                Ok(path) => path,
                Err(err) => {
                    log::error!("failed to download {}: {err}", entry.filename);
                    report.failed += 1;
                    continue;
                }
            };

            let digest = match sha256_of_file(&local_path).await {
                Ok(digest) => digest,
                Err(err) => {
                    log::error!("failed to hash {}: {err}", entry.filename);
                    report.failed += 1;
                    continue;
                }
            };

            if self.ledger.is_uploaded(package, &entry.filename, &digest) {
                log::info!("already uploaded {}, skipping", entry.filename);
                report.already_uploaded += 1;
                continue;
            }

            if !self.policy.permits(entry.kind()) {
                log::info!(
                    "skipping {} ({:?} excluded by upload policy)",
                    entry.filename,
                    entry.kind()
                );
                report.skipped_by_policy += 1;
                continue;
            }

            let upload = self.staging.upload(&local_path, None).await;
            if upload.success {
                match self
                    .ledger
                    .mark_uploaded(package, &entry.filename, &digest, upload.to_meta())
                {
                    Ok(()) => log::info!("uploaded and recorded: {}", entry.filename),
                    // The artifact is staged; only its tracking is at risk.
                    Err(err) => log::error!(
                        "uploaded {} but could not record it: {err}",
                        entry.filename
                    ),
                }
                report.uploaded += 1;
            } else {
                log::error!(
                    "upload failed for {}: {}",
                    entry.filename,
                    upload.error.as_deref().unwrap_or("unknown error")
                );
                report.failed += 1;
            }
        }

        report
    }

    /// Run the batch: every package, then at most one publish.
    pub async fn run(&mut self, packages: &[String], publish: bool) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for package in packages {
            let report = self.mirror_package(package).await;
            summary.packages.push(report);
        }

        if publish {
            log::info!("publishing environment after uploads");
            summary.publish = Some(self.staging.publish().await);
        }
        summary
    }

    /// The ledger, for post-run inspection.
    pub fn ledger(&self) -> &MirrorLedger {
        &self.ledger
    }
}
