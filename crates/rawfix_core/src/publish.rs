use serde::Serialize;

use crate::config::PublishConfig;
use crate::vcs::VersionControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    Status,
    Commit,
    Push,
}

impl PublishStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Commit => "commit",
            Self::Push => "push",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// Publishing was not attempted.
    Skipped { reason: String },
    /// Working tree had nothing to commit.
    Clean,
    Published { status: String },
    Failed { step: PublishStep, error: String },
}

impl PublishOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Commit and push whatever the working tree holds. Every call is tried once;
/// a failure is logged and returned, never raised.
pub fn publish(vcs: &dyn VersionControl, config: &PublishConfig) -> PublishOutcome {
    let status = match vcs.status() {
        Ok(status) => status,
        Err(error) => return failed(PublishStep::Status, error),
    };
    if status.trim().is_empty() {
        tracing::info!("working tree clean, nothing to publish");
        return PublishOutcome::Clean;
    }

    if let Err(error) = vcs.commit_all(&config.commit_message) {
        return failed(PublishStep::Commit, error);
    }
    tracing::info!(message = %config.commit_message, "committed");

    if let Err(error) = vcs.push(&config.remote, &config.branch) {
        return failed(PublishStep::Push, error);
    }
    tracing::info!(remote = %config.remote, branch = %config.branch, "pushed");

    PublishOutcome::Published { status }
}

fn failed(step: PublishStep, error: anyhow::Error) -> PublishOutcome {
    tracing::warn!(step = step.as_str(), "publish failed: {error:#}");
    PublishOutcome::Failed {
        step,
        error: format!("{error:#}"),
    }
}


#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::testing::RecordingVcs;
    use super::*;
    use crate::config::RunConfig;

    fn publish_config() -> PublishConfig {
        RunConfig::with_defaults(Path::new("/repo")).publish
    }

    #[test]
    fn clean_tree_commits_nothing() {
        let vcs = RecordingVcs::with_status("");
        assert_eq!(publish(&vcs, &publish_config()), PublishOutcome::Clean);
        assert_eq!(vcs.calls(), vec!["status".to_string()]);
    }

    #[test]
    fn dirty_tree_commits_then_pushes() {
        let vcs = RecordingVcs::with_status(" M Cache/Gartic/a.json");
        let config = publish_config();
        let outcome = publish(&vcs, &config);
        assert_eq!(
            outcome,
            PublishOutcome::Published {
                status: " M Cache/Gartic/a.json".to_string()
            }
        );
        assert_eq!(
            vcs.calls(),
            vec![
                "status".to_string(),
                format!("commit_all {}", config.commit_message),
                "push origin main".to_string(),
            ]
        );
    }

    #[test]
    fn status_failure_is_reported() {
        let vcs = RecordingVcs::failing("", "status");
        let outcome = publish(&vcs, &publish_config());
        assert!(matches!(
            outcome,
            PublishOutcome::Failed {
                step: PublishStep::Status,
                ..
            }
        ));
    }

    #[test]
    fn commit_failure_skips_push() {
        let vcs = RecordingVcs::failing(" M a.json", "commit");
        let outcome = publish(&vcs, &publish_config());
        assert!(matches!(
            outcome,
            PublishOutcome::Failed {
                step: PublishStep::Commit,
                ..
            }
        ));
        assert!(!vcs.calls().iter().any(|call| call.starts_with("push")));
    }

    #[test]
    fn push_failure_keeps_error_message() {
        let vcs = RecordingVcs::failing(" M a.json", "push");
        match publish(&vcs, &publish_config()) {
            PublishOutcome::Failed { step, error } => {
                assert_eq!(step, PublishStep::Push);
                assert!(error.contains("push rejected"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
