//! Access control policy — one pure function deciding every mutation.
//!
//! The source of truth for who may touch what on an onboarding record.
//! Route handlers and the engine never re-derive permissions; they build a
//! [`MutationField`] and ask [`can_mutate`]. The function is side-effect
//! free and total over (actor, record, field).

use serde::{Deserialize, Serialize};

use super::model::{AssigneeRole, OnboardingRecord, Step, StepAssignee};

/// Global role of the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Hr,
    Employee,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "hr" => Ok(Self::Hr),
            "employee" => Ok(Self::Employee),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The identity + role performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Step-level fields an actor may want to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepField {
    Status,
    Notes,
    Feedback,
}

/// Record-level fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    /// Manual status override (on-hold / release).
    Status,
    ExpectedCompletionDate,
    AssignedBuddy,
    /// Append to the record-level feedback list.
    Feedback,
    Meetings,
    Checklist,
    Documents,
}

/// A field an actor wants to mutate, addressed within the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationField<'a> {
    Record(RecordField),
    Step {
        step_id: &'a str,
        field: StepField,
    },
}

/// Whether a step's assignee resolves to `role` (or directly to `identity`)
/// in the context of this record.
fn step_assigned_to(step: &Step, role: AssigneeRole, identity: &str) -> bool {
    match &step.assignee {
        StepAssignee::Role(r) => *r == role,
        StepAssignee::User(id) => id == identity,
    }
}

/// Decide whether `actor` may mutate `field` on `record`.
///
/// Rules are evaluated in order; the first match wins:
/// 1. admin — all fields.
/// 2. the assigned HR (role `hr` and identity match) — all fields. Any
///    other `hr` actor falls through and is denied.
/// 3. the employee of the record — step status/notes/feedback on steps
///    assigned to the employee role (or to them directly), plus appending
///    record-level feedback.
/// 4. the assigned buddy — the same, for buddy-assigned steps.
/// 5. deny.
pub fn can_mutate(actor: &Actor, record: &OnboardingRecord, field: &MutationField) -> bool {
    // Rule 1: admin.
    if actor.role == Role::Admin {
        return true;
    }

    // Rule 2: the assigned HR.
    if actor.role == Role::Hr && actor.id == record.assigned_hr {
        return true;
    }

    // Rule 3: the employee of the record.
    if actor.id == record.employee {
        return match field {
            MutationField::Record(RecordField::Feedback) => true,
            MutationField::Step { step_id, field } => {
                matches!(
                    field,
                    StepField::Status | StepField::Notes | StepField::Feedback
                ) && record
                    .step(step_id)
                    .map(|s| step_assigned_to(s, AssigneeRole::Employee, &actor.id))
                    .unwrap_or(false)
            }
            _ => false,
        };
    }

    // Rule 4: the assigned buddy.
    if record.assigned_buddy.as_deref() == Some(actor.id.as_str()) {
        return match field {
            MutationField::Record(RecordField::Feedback) => true,
            MutationField::Step { step_id, field } => {
                matches!(
                    field,
                    StepField::Status | StepField::Notes | StepField::Feedback
                ) && record
                    .step(step_id)
                    .map(|s| step_assigned_to(s, AssigneeRole::Buddy, &actor.id))
                    .unwrap_or(false)
            }
            _ => false,
        };
    }

    // Rule 5: deny.
    false
}

/// Read-side access: admin and any HR role may read, as may the employee,
/// the assigned HR, and the assigned buddy of this record.
pub fn can_read(actor: &Actor, record: &OnboardingRecord) -> bool {
    actor.role == Role::Admin
        || actor.role == Role::Hr
        || actor.id == record.employee
        || actor.id == record.assigned_hr
        || record.assigned_buddy.as_deref() == Some(actor.id.as_str())
}

/// Whether the actor may use the fleet-wide surfaces (list, stats, create).
pub fn is_admin_or_hr(actor: &Actor) -> bool {
    matches!(actor.role, Role::Admin | Role::Hr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{OnboardingRecord, Step, StepCategory};
    use chrono::{Duration, Utc};

    fn record() -> OnboardingRecord {
        let steps = vec![
            Step::new(
                "emp_step",
                "Employee step",
                StepCategory::Documentation,
                1.0,
                StepAssignee::Role(AssigneeRole::Employee),
            ),
            Step::new(
                "buddy_step",
                "Buddy step",
                StepCategory::Meeting,
                1.0,
                StepAssignee::Role(AssigneeRole::Buddy),
            ),
            Step::new(
                "it_step",
                "IT step",
                StepCategory::Setup,
                1.0,
                StepAssignee::Role(AssigneeRole::ItTeam),
            ),
            Step::new(
                "direct_step",
                "Direct step",
                StepCategory::Training,
                1.0,
                StepAssignee::User("emp-1".into()),
            ),
        ];
        OnboardingRecord::new("emp-1", "hr-1", Utc::now() + Duration::days(30), steps)
            .with_buddy("buddy-1")
    }

    fn step_status<'a>(step_id: &'a str) -> MutationField<'a> {
        MutationField::Step {
            step_id,
            field: StepField::Status,
        }
    }

    #[test]
    fn admin_may_mutate_everything() {
        let r = record();
        let admin = Actor::new("anyone", Role::Admin);
        assert!(can_mutate(&admin, &r, &step_status("it_step")));
        assert!(can_mutate(
            &admin,
            &r,
            &MutationField::Record(RecordField::Status)
        ));
        assert!(can_mutate(
            &admin,
            &r,
            &MutationField::Record(RecordField::AssignedBuddy)
        ));
    }

    #[test]
    fn assigned_hr_may_mutate_everything() {
        let r = record();
        let hr = Actor::new("hr-1", Role::Hr);
        assert!(can_mutate(&hr, &r, &step_status("it_step")));
        assert!(can_mutate(
            &hr,
            &r,
            &MutationField::Record(RecordField::ExpectedCompletionDate)
        ));
    }

    #[test]
    fn unassigned_hr_is_denied() {
        let r = record();
        let other_hr = Actor::new("hr-2", Role::Hr);
        assert!(!can_mutate(&other_hr, &r, &step_status("emp_step")));
        assert!(!can_mutate(
            &other_hr,
            &r,
            &MutationField::Record(RecordField::Status)
        ));
    }

    #[test]
    fn employee_may_touch_own_steps_only() {
        let r = record();
        let emp = Actor::new("emp-1", Role::Employee);
        assert!(can_mutate(&emp, &r, &step_status("emp_step")));
        assert!(can_mutate(
            &emp,
            &r,
            &MutationField::Step {
                step_id: "emp_step",
                field: StepField::Notes
            }
        ));
        assert!(can_mutate(
            &emp,
            &r,
            &MutationField::Step {
                step_id: "emp_step",
                field: StepField::Feedback
            }
        ));
        // Steps assigned to other roles are off limits.
        assert!(!can_mutate(&emp, &r, &step_status("it_step")));
        assert!(!can_mutate(&emp, &r, &step_status("buddy_step")));
        // So are record-level fields other than feedback.
        assert!(!can_mutate(
            &emp,
            &r,
            &MutationField::Record(RecordField::Status)
        ));
        assert!(can_mutate(
            &emp,
            &r,
            &MutationField::Record(RecordField::Feedback)
        ));
    }

    #[test]
    fn employee_may_touch_steps_assigned_directly_to_them() {
        let r = record();
        let emp = Actor::new("emp-1", Role::Employee);
        assert!(can_mutate(&emp, &r, &step_status("direct_step")));
    }

    #[test]
    fn buddy_may_touch_buddy_steps_only() {
        let r = record();
        let buddy = Actor::new("buddy-1", Role::Employee);
        assert!(can_mutate(&buddy, &r, &step_status("buddy_step")));
        assert!(!can_mutate(&buddy, &r, &step_status("emp_step")));
        assert!(!can_mutate(&buddy, &r, &step_status("it_step")));
        assert!(can_mutate(
            &buddy,
            &r,
            &MutationField::Record(RecordField::Feedback)
        ));
        assert!(!can_mutate(
            &buddy,
            &r,
            &MutationField::Record(RecordField::Status)
        ));
    }

    #[test]
    fn stranger_is_denied() {
        let r = record();
        let stranger = Actor::new("rando", Role::Employee);
        assert!(!can_mutate(&stranger, &r, &step_status("emp_step")));
        assert!(!can_mutate(
            &stranger,
            &r,
            &MutationField::Record(RecordField::Feedback)
        ));
    }

    #[test]
    fn unknown_step_id_is_denied_for_non_elevated_actors() {
        let r = record();
        let emp = Actor::new("emp-1", Role::Employee);
        assert!(!can_mutate(&emp, &r, &step_status("ghost")));
    }

    #[test]
    fn decision_is_deterministic() {
        let r = record();
        let emp = Actor::new("emp-1", Role::Employee);
        let field = step_status("emp_step");
        let first = can_mutate(&emp, &r, &field);
        for _ in 0..10 {
            assert_eq!(can_mutate(&emp, &r, &field), first);
        }
    }

    #[test]
    fn read_access() {
        let r = record();
        assert!(can_read(&Actor::new("x", Role::Admin), &r));
        assert!(can_read(&Actor::new("hr-2", Role::Hr), &r));
        assert!(can_read(&Actor::new("emp-1", Role::Employee), &r));
        assert!(can_read(&Actor::new("buddy-1", Role::Employee), &r));
        assert!(!can_read(&Actor::new("rando", Role::Employee), &r));
    }

    #[test]
    fn role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("hr".parse::<Role>().unwrap(), Role::Hr);
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert!("superuser".parse::<Role>().is_err());
    }
}
