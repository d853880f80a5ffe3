//! Onboarding data model — records, steps, enums, and auxiliary collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// What kind of checklist item a step is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepCategory {
    Documentation,
    Training,
    Setup,
    Meeting,
    Orientation,
    Compliance,
}

/// Step priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for StepPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Current lifecycle status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
    Blocked,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

/// Who a step is assigned to: a role resolved against the record, or a
/// specific user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum StepAssignee {
    Role(AssigneeRole),
    User(String),
}

/// Roles a step can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssigneeRole {
    Employee,
    Buddy,
    Hr,
    ItTeam,
}

/// Rating + comment left on an individual step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFeedback {
    /// 1–5.
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A single checklist item within an onboarding record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Opaque identifier, unique within the record.
    pub step_id: String,
    pub title: String,
    pub description: String,
    pub category: StepCategory,
    #[serde(default)]
    pub priority: StepPriority,
    /// Estimated effort in hours. Must be positive.
    pub estimated_duration_hours: f64,
    /// `step_id`s that must be completed before this step may start.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub assignee: StepAssignee,
    pub status: StepStatus,
    /// Set once, on the first transition away from `pending`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set if and only if status is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<StepFeedback>,
}

impl Step {
    /// Create a pending step with defaults.
    pub fn new(
        step_id: impl Into<String>,
        title: impl Into<String>,
        category: StepCategory,
        estimated_duration_hours: f64,
        assignee: StepAssignee,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            title: title.into(),
            description: String::new(),
            category,
            priority: StepPriority::default(),
            estimated_duration_hours,
            dependencies: Vec::new(),
            assignee,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            notes: None,
            feedback: None,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set priority.
    pub fn with_priority(mut self, priority: StepPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: set dependencies.
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }
}

/// Derived status of the whole onboarding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::OnHold => "on-hold",
        };
        write!(f, "{s}")
    }
}

/// Who a feedback entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackKind {
    Employee,
    Buddy,
    Hr,
    Manager,
}

/// Record-level feedback entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Identity of the author.
    pub from: String,
    pub kind: FeedbackKind,
    /// 1–5.
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Scheduled onboarding meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub status: MeetingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Free-form checklist item, separate from the dependency-tracked steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
}

/// Maximum length for step notes (mirrors the document schema limit).
pub const MAX_NOTES_LEN: usize = 500;
/// Maximum length for a step feedback comment.
pub const MAX_STEP_FEEDBACK_LEN: usize = 300;
/// Maximum length for a record feedback comment.
pub const MAX_FEEDBACK_COMMENT_LEN: usize = 500;

/// The aggregate tracking one employee's onboarding journey.
///
/// Exactly one record exists per employee; the store enforces uniqueness.
/// `status`, `overall_progress`, and `actual_completion_date` are derived
/// by [`OnboardingRecord::recompute`], which the engine runs after every
/// step mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingRecord {
    pub id: Uuid,
    /// Reference to the employee identity (owned elsewhere).
    pub employee: String,
    pub status: RecordStatus,
    pub start_date: DateTime<Utc>,
    pub expected_completion_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_completion_date: Option<DateTime<Utc>>,
    /// HR identity with elevated mutation rights on this record.
    pub assigned_hr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_buddy: Option<String>,
    /// Insertion order; never reordered.
    pub steps: Vec<Step>,
    /// 0–100, derived from step completion.
    pub overall_progress: u8,
    #[serde(default)]
    pub feedback: Vec<FeedbackEntry>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Document references (owned elsewhere).
    #[serde(default)]
    pub documents: Vec<String>,
    /// Optimistic-concurrency counter, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingRecord {
    /// Create a new not-started record. Steps are validated separately via
    /// [`OnboardingRecord::validate`].
    pub fn new(
        employee: impl Into<String>,
        assigned_hr: impl Into<String>,
        expected_completion_date: DateTime<Utc>,
        steps: Vec<Step>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            employee: employee.into(),
            status: RecordStatus::NotStarted,
            start_date: now,
            expected_completion_date,
            actual_completion_date: None,
            assigned_hr: assigned_hr.into(),
            assigned_buddy: None,
            steps,
            overall_progress: 0,
            feedback: Vec::new(),
            meetings: Vec::new(),
            checklist: Vec::new(),
            documents: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set the assigned buddy.
    pub fn with_buddy(mut self, buddy: impl Into<String>) -> Self {
        self.assigned_buddy = Some(buddy.into());
        self
    }

    /// Validate the record's step list and dates.
    ///
    /// Rejects: empty step list, duplicate step ids, dependencies on step
    /// ids not present in the record, self-dependencies, non-positive
    /// durations, out-of-range feedback ratings, and an expected completion
    /// date before the start date.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Validation("at least one step is required".into()));
        }
        if self.expected_completion_date < self.start_date {
            return Err(Error::Validation(
                "expected completion date is before the start date".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.step_id.trim().is_empty() {
                return Err(Error::Validation("step id must not be empty".into()));
            }
            if !seen.insert(step.step_id.as_str()) {
                return Err(Error::Validation(format!(
                    "duplicate step id: {}",
                    step.step_id
                )));
            }
            if step.title.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "step {} has an empty title",
                    step.step_id
                )));
            }
            if !(step.estimated_duration_hours > 0.0) {
                return Err(Error::Validation(format!(
                    "step {} must have a positive estimated duration",
                    step.step_id
                )));
            }
        }
        for step in &self.steps {
            for dep in &step.dependencies {
                if dep == &step.step_id {
                    return Err(Error::Validation(format!(
                        "step {} depends on itself",
                        step.step_id
                    )));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(Error::Validation(format!(
                        "step {} depends on unknown step {}",
                        step.step_id, dep
                    )));
                }
            }
            if let Some(ref fb) = step.feedback {
                validate_rating(fb.rating)?;
                if fb.comment.as_ref().is_some_and(|c| c.len() > MAX_STEP_FEEDBACK_LEN) {
                    return Err(Error::Validation(format!(
                        "feedback comment on step {} exceeds {MAX_STEP_FEEDBACK_LEN} characters",
                        step.step_id
                    )));
                }
            }
            if let Some(ref notes) = step.notes {
                if notes.len() > MAX_NOTES_LEN {
                    return Err(Error::Validation(format!(
                        "notes on step {} exceed {MAX_NOTES_LEN} characters",
                        step.step_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Look up a step by id, mutably.
    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.step_id == step_id)
    }

    /// Dependency ids of `step` that are not yet completed.
    pub fn unmet_dependencies(&self, step: &Step) -> Vec<String> {
        step.dependencies
            .iter()
            .filter(|dep| {
                self.step(dep)
                    .map(|d| d.status != StepStatus::Completed)
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Recompute derived state from the step list.
    ///
    /// Progress is `round(100 * completed / total)`, 0 for an empty record.
    /// At 100% the record becomes `completed` and `actual_completion_date`
    /// is stamped once; completion is terminal. A manual `on-hold` status
    /// survives recomputation at any progress below 100.
    ///
    /// Returns `true` if this call moved the record into `completed`.
    pub fn recompute(&mut self, now: DateTime<Utc>) -> bool {
        let total = self.steps.len();
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        self.overall_progress = if total == 0 {
            0
        } else {
            ((100.0 * completed as f64 / total as f64).round()) as u8
        };

        let was_completed = self.status == RecordStatus::Completed;
        if self.overall_progress == 100 {
            self.status = RecordStatus::Completed;
            if self.actual_completion_date.is_none() {
                self.actual_completion_date = Some(now);
            }
        } else if self.status == RecordStatus::OnHold || was_completed {
            // on-hold is a manual override; completed never reverts
        } else if self.overall_progress > 0 {
            self.status = RecordStatus::InProgress;
        } else {
            self.status = RecordStatus::NotStarted;
        }

        !was_completed && self.status == RecordStatus::Completed
    }

    /// Whole days elapsed since the start date.
    pub fn days_since_start(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_date).num_days()
    }

    /// Whole days until the expected completion date (negative if overdue).
    pub fn days_until_expected_completion(&self, now: DateTime<Utc>) -> i64 {
        (self.expected_completion_date - now).num_days()
    }

    /// First step still in `pending`, in insertion order.
    pub fn next_pending_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    /// All currently blocked steps.
    pub fn blocked_steps(&self) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Blocked)
            .collect()
    }

    /// Whether the record is overdue relative to `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != RecordStatus::Completed && self.expected_completion_date < now
    }
}

/// Validate a 1–5 rating.
pub fn validate_rating(rating: u8) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "rating must be between 1 and 5, got {rating}"
        )))
    }
}

impl FeedbackEntry {
    /// Create a feedback entry stamped now. Validates rating and comment.
    pub fn new(
        from: impl Into<String>,
        kind: FeedbackKind,
        rating: u8,
        comment: impl Into<String>,
    ) -> Result<Self> {
        validate_rating(rating)?;
        let comment = comment.into();
        if comment.trim().is_empty() {
            return Err(Error::Validation("feedback comment is required".into()));
        }
        if comment.len() > MAX_FEEDBACK_COMMENT_LEN {
            return Err(Error::Validation(format!(
                "feedback comment exceeds {MAX_FEEDBACK_COMMENT_LEN} characters"
            )));
        }
        Ok(Self {
            from: from.into(),
            kind,
            rating,
            comment,
            created_at: Utc::now(),
        })
    }
}
