//! Environment publish: promote staged artifacts, polling the long-running
//! operation to completion.

use super::client::StagingClient;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Response header carrying the long-running-operation id.
const OPERATION_ID_HEADER: &str = "x-ms-operation-id";

/// Server-reported status of a publish operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum OperationStatus {
    /// Operation accepted but not yet begun.
    NotStarted,
    /// Operation in progress.
    Running,
    /// Operation completed successfully.
    Succeeded,
    /// Operation failed; the server reports an error payload.
    Failed,
    /// Any status value this client does not recognize.
    #[default]
    #[serde(other)]
    Unknown,
}

/// One poll of the operation-status resource.
#[derive(Debug, Deserialize)]
pub(super) struct OperationSnapshot {
    #[serde(default)]
    pub(super) status: OperationStatus,
    #[serde(default)]
    pub(super) error: Option<serde_json::Value>,
}

/// Terminal outcome of a publish request.
///
/// A timeout is deliberately distinct from a server-reported failure: it
/// means the outcome is unknown and worth checking manually, not that the
/// publish is known to have failed.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Staged artifacts are now effective.
    Published {
        /// Human-readable detail.
        message: String,
    },
    /// The server reported the publish as failed.
    Failed {
        /// Server-provided diagnostic payload.
        error: String,
        /// HTTP status of the rejecting response, when one was received.
        status_code: Option<u16>,
    },
    /// The operation did not reach a terminal state within the wall-clock
    /// bound.
    TimedOut {
        /// Operation whose outcome is unknown.
        operation_id: String,
        /// How long the poller waited.
        waited: Duration,
    },
}

impl PublishOutcome {
    /// Whether the publish is known to have succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }

    /// Failure or timeout detail for display.
    pub fn detail(&self) -> String {
        match self {
            PublishOutcome::Published { message } => message.clone(),
            PublishOutcome::Failed { error, .. } => error.clone(),
            PublishOutcome::TimedOut {
                operation_id,
                waited,
            } => format!(
                "timed out after {}s waiting for operation {operation_id}; check the destination UI for the final status",
                waited.as_secs()
            ),
        }
    }
}

impl StagingClient {
    /// Promote the environment's staged artifacts.
    ///
    /// An immediate success status resolves right away; an accepted
    /// asynchronous status hands off to the polling loop; anything else is a
    /// failure carrying the server's diagnostic body.
    pub async fn publish(&self) -> PublishOutcome {
        let url = self.endpoint("staging/publish");
        log::info!("publishing environment {}", self.environment_id);

        let response = match self.client.post(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                return PublishOutcome::Failed {
                    error: format!("publish request failed: {err}"),
                    status_code: None,
                };
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::ACCEPTED {
            let operation_id = response
                .headers()
                .get(OPERATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return match operation_id {
                Some(id) => {
                    log::info!("publish accepted as long-running operation {id}");
                    self.wait_for_operation(&id).await
                }
                // Accepted without an operation id: nothing to poll.
                None => PublishOutcome::Published {
                    message: "publish accepted (no operation id reported)".to_string(),
                },
            };
        }
        if status.is_success() {
            return PublishOutcome::Published {
                message: "environment published".to_string(),
            };
        }

        let detail = response.text().await.unwrap_or_default();
        PublishOutcome::Failed {
            error: format!("Publish failed: HTTP {status} - {detail}"),
            status_code: Some(status.as_u16()),
        }
    }

    /// Poll the operation-status resource until it is terminal or the
    /// wall-clock bound expires.
    async fn wait_for_operation(&self, operation_id: &str) -> PublishOutcome {
        let url = self.operation_endpoint(operation_id);
        drive_operation(
            operation_id,
            self.poll_interval,
            self.publish_timeout,
            || async {
                let snapshot: OperationSnapshot = self
                    .client
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(snapshot)
            },
        )
        .await
    }
}

/// The publish polling state machine, factored over any poll function.
///
/// `NotStarted`, `Running`, `Unknown`, and transport errors all keep the
/// loop alive; `Succeeded` and `Failed` are terminal; crossing the deadline
/// yields `TimedOut`.
pub(super) async fn drive_operation<F, Fut>(
    operation_id: &str,
    interval: Duration,
    timeout: Duration,
    mut poll: F,
) -> PublishOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<OperationSnapshot, anyhow::Error>>,
{
    let start = tokio::time::Instant::now();
    let deadline = start + timeout;
    loop {
        if tokio::time::Instant::now() >= deadline {
            log::warn!("timed out waiting for operation {operation_id}");
            return PublishOutcome::TimedOut {
                operation_id: operation_id.to_string(),
                waited: start.elapsed(),
            };
        }

        match poll().await {
            Ok(snapshot) => match snapshot.status {
                OperationStatus::Succeeded => {
                    return PublishOutcome::Published {
                        message: "environment published and active".to_string(),
                    };
                }
                OperationStatus::Failed => {
                    let error = snapshot
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "Unknown error".to_string());
                    return PublishOutcome::Failed {
                        error: format!("Publish operation failed: {error}"),
                        status_code: None,
                    };
                }
                status => {
                    log::debug!("operation {operation_id} status: {status:?}");
                }
            },
            Err(err) => {
                log::warn!("could not check operation {operation_id}: {err}");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;

    fn snapshot(status: OperationStatus) -> OperationSnapshot {
        OperationSnapshot {
            status,
            error: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn running_then_succeeded_polls_exactly_three_times() {
        let polls = AtomicU32::new(0);
        let outcome = drive_operation(
            "op-1",
            Duration::from_secs(10),
            Duration::from_secs(300),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(match n {
                        1 | 2 => snapshot(OperationStatus::Running),
                        _ => snapshot(OperationStatus::Succeeded),
                    })
                }
            },
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn endless_running_times_out_rather_than_failing() {
        let outcome = drive_operation(
            "op-2",
            Duration::from_secs(10),
            Duration::from_secs(300),
            || async { Ok(snapshot(OperationStatus::Running)) },
        )
        .await;

        match outcome {
            PublishOutcome::TimedOut { operation_id, waited } => {
                assert_eq!(operation_id, "op-2");
                assert!(waited >= Duration::from_secs(300));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn server_reported_failure_carries_the_payload() {
        let outcome = drive_operation(
            "op-3",
            Duration::from_secs(10),
            Duration::from_secs(300),
            || async {
                Ok(OperationSnapshot {
                    status: OperationStatus::Failed,
                    error: Some(serde_json::json!({"code": "PublishBlocked"})),
                })
            },
        )
        .await;

        match outcome {
            PublishOutcome::Failed { error, .. } => assert!(error.contains("PublishBlocked")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_keep_polling() {
        let polls = AtomicU32::new(0);
        let outcome = drive_operation(
            "op-4",
            Duration::from_secs(10),
            Duration::from_secs(300),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(anyhow::anyhow!("connection reset"))
                    } else {
                        Ok(snapshot(OperationStatus::Succeeded))
                    }
                }
            },
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unknown_status_values_deserialize_to_unknown() {
        let snap: OperationSnapshot =
            serde_json::from_str(r#"{"status": "Mystifying"}"#).unwrap();
        assert_eq!(snap.status, OperationStatus::Unknown);
        let snap: OperationSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snap.status, OperationStatus::Unknown);
    }

    #[tokio::test]
    async fn immediate_success_status_publishes_without_polling() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/workspaces/ws-1/environments/env-1/staging/publish");
            then.status(200);
        });

        let config = StagingConfig::new(
            Url::parse(&server.url("")).unwrap(),
            "ws-1",
            "env-1",
            Some("tok".to_string()),
        );
        let outcome = StagingClient::new(config).unwrap().publish().await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn accepted_with_operation_header_polls_to_success() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/workspaces/ws-1/environments/env-1/staging/publish");
            then.status(202).header(OPERATION_ID_HEADER, "op-42");
        });
        let op = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/operations/op-42");
            then.status(200).json_body(serde_json::json!({"status": "Succeeded"}));
        });

        let config = StagingConfig::new(
            Url::parse(&server.url("")).unwrap(),
            "ws-1",
            "env-1",
            Some("tok".to_string()),
        );
        let outcome = StagingClient::new(config).unwrap().publish().await;
        assert!(outcome.is_success());
        op.assert_hits(1);
    }

    #[tokio::test]
    async fn rejected_publish_is_a_failure_with_status() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/workspaces/ws-1/environments/env-1/staging/publish");
            then.status(409).body("another publish is in flight");
        });

        let config = StagingConfig::new(
            Url::parse(&server.url("")).unwrap(),
            "ws-1",
            "env-1",
            Some("tok".to_string()),
        );
        let outcome = StagingClient::new(config).unwrap().publish().await;
        match outcome {
            PublishOutcome::Failed { status_code, error } => {
                assert_eq!(status_code, Some(409));
                assert!(error.contains("409"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
