//! Destination staging service: artifact upload and environment publish.
//!
//! [`StagingClient`] owns the authenticated connection to the destination.
//! Uploads land in the environment's staging area and become effective only
//! after a publish, which may complete immediately or as a long-running
//! operation observed by polling.

mod client;
mod publish;
mod upload;

pub use client::{StagingClient, StagingConfig};
pub use publish::{OperationStatus, PublishOutcome};
pub use upload::UploadReport;
