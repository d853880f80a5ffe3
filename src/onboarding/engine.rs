//! LifecycleEngine — orchestrates record creation, step transitions, and
//! the completion cascade.
//!
//! Every mutating operation follows the same shape: load the record,
//! validate the requested change, authorize the actor through the policy,
//! apply the change, recompute derived state, and write back with a
//! compare-and-swap. A conflicted write is retried from a fresh read a
//! bounded number of times, so the record an observer sees is never
//! partially updated or stale relative to its steps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result, StoreError};
use crate::store::traits::{ListFilter, OnboardingStore, RecordPage, StatsOverview};

use super::model::{
    FeedbackEntry, MAX_NOTES_LEN, MAX_STEP_FEEDBACK_LEN, OnboardingRecord, RecordStatus, Step,
    StepFeedback, StepStatus, validate_rating,
};
use super::notify::CompletionNotifier;
use super::policy::{Actor, MutationField, RecordField, Role, StepField, can_mutate, can_read, is_admin_or_hr};
use super::template;

/// Default number of compare-and-swap retries before surfacing a conflict.
pub const DEFAULT_WRITE_RETRIES: u32 = 3;

/// Request to create an onboarding record.
#[derive(Debug, Clone)]
pub struct CreateOnboarding {
    pub employee: String,
    pub expected_completion_date: DateTime<Utc>,
    pub assigned_buddy: Option<String>,
    /// Custom step plan. `None` seeds the default six-step template.
    pub steps: Option<Vec<Step>>,
}

/// Orchestrates all mutations of onboarding records.
pub struct LifecycleEngine {
    store: Arc<dyn OnboardingStore>,
    notifier: Arc<dyn CompletionNotifier>,
    write_retries: u32,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn OnboardingStore>, notifier: Arc<dyn CompletionNotifier>) -> Self {
        Self {
            store,
            notifier,
            write_retries: DEFAULT_WRITE_RETRIES,
        }
    }

    /// Builder: override the CAS retry budget.
    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    /// Create an onboarding record for an employee. HR/admin only; the
    /// creator becomes the assigned HR. Fails with `Duplicate` if a record
    /// already exists — the store's unique constraint makes the check and
    /// the insert one atomic operation, so a concurrent create race leaves
    /// exactly one record.
    pub async fn create(&self, req: CreateOnboarding, actor: &Actor) -> Result<OnboardingRecord> {
        if !is_admin_or_hr(actor) {
            return Err(Error::Unauthorized {
                actor: actor.id.clone(),
            });
        }

        let steps = req.steps.unwrap_or_else(template::default_steps);
        let mut record = OnboardingRecord::new(
            req.employee,
            actor.id.clone(),
            req.expected_completion_date,
            steps,
        );
        if let Some(buddy) = req.assigned_buddy {
            record = record.with_buddy(buddy);
        }
        record.validate()?;

        self.store.insert(&record).await.map_err(|e| match e {
            StoreError::DuplicateEmployee(employee) => Error::Duplicate { employee },
            other => Error::Store(other),
        })?;

        info!(
            record_id = %record.id,
            employee = %record.employee,
            steps = record.steps.len(),
            "Onboarding record created"
        );
        self.notifier.onboarding_started(&record.employee).await;
        Ok(record)
    }

    /// Transition a step to `target`. Validates the transition table, the
    /// dependency gate, and the actor's authority, in that order.
    pub async fn transition_step(
        &self,
        record_id: Uuid,
        step_id: &str,
        actor: &Actor,
        target: StepStatus,
        note: Option<&str>,
    ) -> Result<OnboardingRecord> {
        if let Some(note) = note {
            if note.len() > MAX_NOTES_LEN {
                return Err(Error::Validation(format!(
                    "note exceeds {MAX_NOTES_LEN} characters"
                )));
            }
        }

        let record = self
            .read_modify_write(record_id, |record, now| {
                let step = record
                    .step(step_id)
                    .ok_or_else(|| Error::step_not_found(step_id))?;
                let from = step.status;

                // (a) Transition legality, dependency gate included.
                check_transition(record, step, target)?;

                // (b) Actor authorization. Blocked, skipped, and unblocking
                // are HR/admin-level overrides regardless of step assignee.
                let elevated = matches!(target, StepStatus::Blocked | StepStatus::Skipped)
                    || from == StepStatus::Blocked;
                if elevated && !is_elevated(actor, record) {
                    return Err(Error::Unauthorized {
                        actor: actor.id.clone(),
                    });
                }
                let field = MutationField::Step {
                    step_id,
                    field: StepField::Status,
                };
                if !can_mutate(actor, record, &field) {
                    return Err(Error::Unauthorized {
                        actor: actor.id.clone(),
                    });
                }

                // Blocking requires a stated reason.
                if target == StepStatus::Blocked && note.map(str::trim).unwrap_or("").is_empty()
                {
                    return Err(Error::Validation(
                        "a reason note is required to block a step".into(),
                    ));
                }

                // (c) Apply.
                let step = record.step_mut(step_id).expect("step exists");
                step.status = target;
                if from == StepStatus::Pending && step.started_at.is_none() {
                    step.started_at = Some(now);
                }
                if target == StepStatus::Completed {
                    step.completed_at = Some(now);
                }
                if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
                    step.notes = Some(match step.notes.take() {
                        Some(existing) => format!("{existing}\n{note}"),
                        None => note.to_string(),
                    });
                }

                info!(
                    record_id = %record.id,
                    step_id,
                    actor = %actor.id,
                    %from,
                    to = %target,
                    "Step transitioned"
                );
                Ok(())
            })
            .await?;
        Ok(record)
    }

    /// Replace the notes on a step. Assignee-level mutation.
    pub async fn update_step_notes(
        &self,
        record_id: Uuid,
        step_id: &str,
        actor: &Actor,
        notes: &str,
    ) -> Result<OnboardingRecord> {
        if notes.len() > MAX_NOTES_LEN {
            return Err(Error::Validation(format!(
                "notes exceed {MAX_NOTES_LEN} characters"
            )));
        }
        self.read_modify_write(record_id, |record, _now| {
            record
                .step(step_id)
                .ok_or_else(|| Error::step_not_found(step_id))?;
            let field = MutationField::Step {
                step_id,
                field: StepField::Notes,
            };
            if !can_mutate(actor, record, &field) {
                return Err(Error::Unauthorized {
                    actor: actor.id.clone(),
                });
            }
            record.step_mut(step_id).expect("step exists").notes = Some(notes.to_string());
            Ok(())
        })
        .await
    }

    /// Set the feedback (rating + comment) on a step.
    pub async fn set_step_feedback(
        &self,
        record_id: Uuid,
        step_id: &str,
        actor: &Actor,
        feedback: StepFeedback,
    ) -> Result<OnboardingRecord> {
        validate_rating(feedback.rating)?;
        if feedback
            .comment
            .as_ref()
            .is_some_and(|c| c.len() > MAX_STEP_FEEDBACK_LEN)
        {
            return Err(Error::Validation(format!(
                "feedback comment exceeds {MAX_STEP_FEEDBACK_LEN} characters"
            )));
        }
        self.read_modify_write(record_id, |record, _now| {
            record
                .step(step_id)
                .ok_or_else(|| Error::step_not_found(step_id))?;
            let field = MutationField::Step {
                step_id,
                field: StepField::Feedback,
            };
            if !can_mutate(actor, record, &field) {
                return Err(Error::Unauthorized {
                    actor: actor.id.clone(),
                });
            }
            record.step_mut(step_id).expect("step exists").feedback = Some(feedback.clone());
            Ok(())
        })
        .await
    }

    /// Append a record-level feedback entry.
    pub async fn add_feedback(
        &self,
        record_id: Uuid,
        actor: &Actor,
        entry: FeedbackEntry,
    ) -> Result<OnboardingRecord> {
        self.read_modify_write(record_id, |record, _now| {
            if !can_mutate(actor, record, &MutationField::Record(RecordField::Feedback)) {
                return Err(Error::Unauthorized {
                    actor: actor.id.clone(),
                });
            }
            record.feedback.push(entry.clone());
            Ok(())
        })
        .await
    }

    /// Put a record on hold or release it. The only way `on-hold` is ever
    /// set; recomputation preserves it until the record completes.
    pub async fn set_hold(
        &self,
        record_id: Uuid,
        actor: &Actor,
        on_hold: bool,
    ) -> Result<OnboardingRecord> {
        self.read_modify_write(record_id, |record, _now| {
            if !can_mutate(actor, record, &MutationField::Record(RecordField::Status)) {
                return Err(Error::Unauthorized {
                    actor: actor.id.clone(),
                });
            }
            if record.status == RecordStatus::Completed {
                return Err(Error::Validation(
                    "a completed record cannot be put on hold".into(),
                ));
            }
            record.status = if on_hold {
                RecordStatus::OnHold
            } else {
                // Recompute derives in-progress/not-started from the steps.
                RecordStatus::NotStarted
            };
            Ok(())
        })
        .await
    }

    /// Fetch a record by id, honoring read-side access control.
    pub async fn get(&self, record_id: Uuid, actor: &Actor) -> Result<OnboardingRecord> {
        let record = self
            .store
            .get(record_id)
            .await?
            .ok_or_else(|| Error::record_not_found(record_id))?;
        if !can_read(actor, &record) {
            return Err(Error::Unauthorized {
                actor: actor.id.clone(),
            });
        }
        Ok(record)
    }

    /// Fetch the record for an employee, honoring read-side access control.
    pub async fn get_by_employee(&self, employee: &str, actor: &Actor) -> Result<OnboardingRecord> {
        let record = self
            .store
            .get_by_employee(employee)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "Onboarding record",
                id: employee.to_string(),
            })?;
        if !can_read(actor, &record) {
            return Err(Error::Unauthorized {
                actor: actor.id.clone(),
            });
        }
        Ok(record)
    }

    /// List records, newest first. Admin/HR only.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: &ListFilter,
        page: u32,
        limit: u32,
    ) -> Result<RecordPage> {
        if !is_admin_or_hr(actor) {
            return Err(Error::Unauthorized {
                actor: actor.id.clone(),
            });
        }
        Ok(self.store.list(filter, page, limit).await?)
    }

    /// Aggregate statistics. Admin/HR only.
    pub async fn stats(&self, actor: &Actor) -> Result<StatsOverview> {
        if !is_admin_or_hr(actor) {
            return Err(Error::Unauthorized {
                actor: actor.id.clone(),
            });
        }
        Ok(self.store.stats().await?)
    }

    /// The default six-step onboarding plan.
    pub fn default_template(&self) -> Vec<Step> {
        template::default_steps()
    }

    /// Core read→validate→mutate→recompute→write sequence with bounded
    /// CAS retries. `mutate` must be a pure function of the record; it is
    /// re-run from a fresh read after every conflict.
    async fn read_modify_write<F>(&self, record_id: Uuid, mutate: F) -> Result<OnboardingRecord>
    where
        F: Fn(&mut OnboardingRecord, DateTime<Utc>) -> Result<()>,
    {
        let mut attempts = 0;
        loop {
            let mut record = self
                .store
                .get(record_id)
                .await?
                .ok_or_else(|| Error::record_not_found(record_id))?;

            let now = Utc::now();
            mutate(&mut record, now)?;
            let became_completed = record.recompute(now);
            record.updated_at = now;

            match self.store.update(&record).await {
                Ok(version) => {
                    record.version = version;
                    if became_completed {
                        info!(
                            record_id = %record.id,
                            employee = %record.employee,
                            "Onboarding reached 100%, cascading completion"
                        );
                        self.notifier.onboarding_completed(&record.employee).await;
                    }
                    return Ok(record);
                }
                Err(StoreError::VersionConflict(id)) => {
                    attempts += 1;
                    if attempts > self.write_retries {
                        return Err(Error::Conflict { id });
                    }
                    warn!(
                        record_id = %id,
                        attempt = attempts,
                        "Concurrent write detected, retrying"
                    );
                }
                Err(other) => return Err(Error::Store(other)),
            }
        }
    }
}

/// Whether the actor holds record-level override authority (admin, or the
/// assigned HR).
fn is_elevated(actor: &Actor, record: &OnboardingRecord) -> bool {
    actor.role == Role::Admin || (actor.role == Role::Hr && actor.id == record.assigned_hr)
}

/// The step transition table. Completed is terminal; blocking is allowed
/// from any non-terminal status; a blocked step can only go back to
/// pending (unblock); skipping only applies to steps that never started.
fn check_transition(record: &OnboardingRecord, step: &Step, target: StepStatus) -> Result<()> {
    use StepStatus::*;

    let legal = matches!(
        (step.status, target),
        (Pending, InProgress)
            | (InProgress, Completed)
            | (Pending, Blocked)
            | (InProgress, Blocked)
            | (Blocked, Pending)
            | (Pending, Skipped)
    );
    if !legal {
        return Err(Error::IllegalTransition {
            step_id: step.step_id.clone(),
            from: step.status.to_string(),
            to: target.to_string(),
        });
    }

    if step.status == Pending && target == InProgress {
        let unmet = record.unmet_dependencies(step);
        if !unmet.is_empty() {
            return Err(Error::DependencyNotSatisfied {
                step_id: step.step_id.clone(),
                unmet,
            });
        }
    }
    Ok(())
}
