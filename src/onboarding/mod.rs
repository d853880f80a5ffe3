//! Onboarding lifecycle — models, access policy, and the engine that
//! drives a new employee through their step checklist.
//!
//! The engine owns every mutation: the policy decides who may touch what,
//! the transition table decides which step moves are legal, and derived
//! state (progress, record status, completion date) is recomputed after
//! every change before anything is persisted.

pub mod engine;
pub mod model;
pub mod notify;
pub mod policy;
pub mod routes;
pub mod template;

pub use engine::{CreateOnboarding, LifecycleEngine};
pub use model::{
    FeedbackEntry, FeedbackKind, OnboardingRecord, RecordStatus, Step, StepAssignee,
    StepCategory, StepFeedback, StepPriority, StepStatus,
};
pub use notify::{CompletionNotifier, LogNotifier};
pub use policy::{Actor, MutationField, RecordField, Role, StepField, can_mutate, can_read};
pub use routes::{OnboardingRouteState, onboarding_routes};
