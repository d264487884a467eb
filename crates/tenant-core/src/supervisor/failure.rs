use tracing::{error, info};

use tenant_model::{ANNOTATION_RUNTIME, ANNOTATION_RUNTIME_FAILED, TenantKey};

use crate::{dispatch::FeedbackSender, error::RuntimeError, mutator::Mutator};

/// Records an asynchronous runtime failure so the next reconciliation can act on it.
///
/// The failure is persisted as an annotation (survives restarts and is visible to
/// the next pass), then a feedback event forces that pass without waiting for a
/// store notification.
pub(crate) struct FailureReporter {
    pub(crate) key: TenantKey,
    pub(crate) mutator: Mutator,
    pub(crate) feedback: FeedbackSender,
}

impl FailureReporter {
    pub(crate) async fn report(self, err: RuntimeError) {
        error!(tenant = %self.key, label = err.as_label(), error = %err, "tenant runtime exited with error");

        let annotated = self
            .mutator
            .annotate(&self.key, |annotations| {
                annotations.insert(
                    ANNOTATION_RUNTIME.to_string(),
                    ANNOTATION_RUNTIME_FAILED.to_string(),
                );
            })
            .await;
        if let Err(e) = annotated {
            error!(tenant = %self.key, error = %e, "unable to record tenant runtime failure");
        }

        if self.feedback.send(self.key.clone()) {
            info!(tenant = %self.key, "tenant runtime failure enqueued for reconciliation");
        }
    }
}
