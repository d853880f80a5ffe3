//! Default onboarding step template — the six canonical steps seeded into
//! new records when the caller does not supply a custom plan.

use super::model::{AssigneeRole, Step, StepAssignee, StepCategory, StepPriority};

/// The default onboarding plan: orientation and HR paperwork up front,
/// IT setup gated on paperwork, department intro gated on orientation,
/// role training gated on both, compliance free-standing.
pub fn default_steps() -> Vec<Step> {
    vec![
        Step::new(
            "welcome_orientation",
            "Welcome & Company Orientation",
            StepCategory::Orientation,
            4.0,
            StepAssignee::Role(AssigneeRole::Hr),
        )
        .with_description("Introduction to company culture, values, and overview")
        .with_priority(StepPriority::High),
        Step::new(
            "hr_documentation",
            "HR Documentation & Paperwork",
            StepCategory::Documentation,
            2.0,
            StepAssignee::Role(AssigneeRole::Employee),
        )
        .with_description("Complete all required HR forms and documentation")
        .with_priority(StepPriority::Critical),
        Step::new(
            "it_setup",
            "IT Setup & Account Creation",
            StepCategory::Setup,
            3.0,
            StepAssignee::Role(AssigneeRole::ItTeam),
        )
        .with_description("Set up computer, accounts, and access to systems")
        .with_priority(StepPriority::High)
        .with_dependencies(vec!["hr_documentation".into()]),
        Step::new(
            "department_introduction",
            "Department Introduction",
            StepCategory::Meeting,
            2.0,
            StepAssignee::Role(AssigneeRole::Buddy),
        )
        .with_description("Meet team members and understand department structure")
        .with_priority(StepPriority::Medium)
        .with_dependencies(vec!["welcome_orientation".into()]),
        Step::new(
            "role_training",
            "Role-Specific Training",
            StepCategory::Training,
            16.0,
            StepAssignee::Role(AssigneeRole::Employee),
        )
        .with_description("Training specific to job role and responsibilities")
        .with_priority(StepPriority::High)
        .with_dependencies(vec!["it_setup".into(), "department_introduction".into()]),
        Step::new(
            "compliance_training",
            "Compliance & Safety Training",
            StepCategory::Compliance,
            4.0,
            StepAssignee::Role(AssigneeRole::Employee),
        )
        .with_description("Complete mandatory compliance and safety training")
        .with_priority(StepPriority::Critical),
    ]
}
