//! Outbound port for cross-aggregate side effects.
//!
//! The engine never writes to the employee/user collection itself. When a
//! record's derived status changes it emits a command through this trait;
//! the consumer (the employee-record service) owns the actual write. Both
//! calls are idempotent — safe to deliver more than once on retry.

use async_trait::async_trait;

/// Consumer of onboarding lifecycle events.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// An onboarding record was created for `employee`; their own
    /// `onboarding_status` should move to in-progress.
    async fn onboarding_started(&self, employee: &str);

    /// The record for `employee` reached 100% and became completed.
    async fn onboarding_completed(&self, employee: &str);
}

/// Default notifier: logs the command. Stands in until a real employee
/// service consumer is wired up.
pub struct LogNotifier;

#[async_trait]
impl CompletionNotifier for LogNotifier {
    async fn onboarding_started(&self, employee: &str) {
        tracing::info!(employee, "onboarding started");
    }

    async fn onboarding_completed(&self, employee: &str) {
        tracing::info!(employee, "onboarding completed");
    }
}
