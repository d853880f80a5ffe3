//! Integration tests for the onboarding lifecycle engine against a real
//! (in-memory libSQL) store, end to end: creation, the dependency graph,
//! progress aggregation, and the completion cascade.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use hr_onboarding::error::{Error, StoreError};
use hr_onboarding::onboarding::engine::{CreateOnboarding, LifecycleEngine};
use hr_onboarding::onboarding::model::{
    AssigneeRole, OnboardingRecord, RecordStatus, Step, StepAssignee, StepCategory, StepStatus,
};
use hr_onboarding::onboarding::notify::CompletionNotifier;
use hr_onboarding::onboarding::policy::{Actor, Role};
use hr_onboarding::store::{
    LibSqlStore, ListFilter, OnboardingStore, RecordPage, StatsOverview,
};

/// Notifier that counts cascade deliveries.
#[derive(Default)]
struct CountingNotifier {
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionNotifier for CountingNotifier {
    async fn onboarding_started(&self, employee: &str) {
        self.started.lock().unwrap().push(employee.to_string());
    }
    async fn onboarding_completed(&self, employee: &str) {
        self.completed.lock().unwrap().push(employee.to_string());
    }
}

async fn engine() -> (Arc<LifecycleEngine>, Arc<CountingNotifier>) {
    let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let notifier = Arc::new(CountingNotifier::default());
    let engine = Arc::new(LifecycleEngine::new(
        store,
        Arc::clone(&notifier) as Arc<dyn CompletionNotifier>,
    ));
    (engine, notifier)
}

fn plan() -> Vec<Step> {
    vec![
        Step::new(
            "a",
            "Paperwork",
            StepCategory::Documentation,
            2.0,
            StepAssignee::Role(AssigneeRole::Employee),
        ),
        Step::new(
            "b",
            "Workstation",
            StepCategory::Setup,
            3.0,
            StepAssignee::Role(AssigneeRole::Employee),
        )
        .with_dependencies(vec!["a".into()]),
    ]
}

fn create_req(employee: &str) -> CreateOnboarding {
    CreateOnboarding {
        employee: employee.into(),
        expected_completion_date: Utc::now() + Duration::days(30),
        assigned_buddy: Some("buddy-1".into()),
        steps: Some(plan()),
    }
}

fn hr() -> Actor {
    Actor::new("hr-1", Role::Hr)
}

#[tokio::test]
async fn dependency_gate_then_full_completion() {
    let (engine, notifier) = engine().await;
    let record = engine.create(create_req("emp-1"), &hr()).await.unwrap();
    let emp = Actor::new("emp-1", Role::Employee);

    // Scenario 1: B cannot start while A is incomplete.
    let err = engine
        .transition_step(record.id, "b", &emp, StepStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DependencyNotSatisfied { .. }));
    let snapshot = engine.get(record.id, &emp).await.unwrap();
    assert_eq!(snapshot.step("b").unwrap().status, StepStatus::Pending);
    assert_eq!(snapshot.overall_progress, 0);

    // Scenario 2: walk A to completion, then B may start.
    engine
        .transition_step(record.id, "a", &emp, StepStatus::InProgress, None)
        .await
        .unwrap();
    let r = engine
        .transition_step(record.id, "a", &emp, StepStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(r.overall_progress, 50);
    assert_eq!(r.status, RecordStatus::InProgress);

    engine
        .transition_step(record.id, "b", &emp, StepStatus::InProgress, None)
        .await
        .unwrap();

    // Scenario 3: completing B completes the record and cascades once.
    let r = engine
        .transition_step(record.id, "b", &emp, StepStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(r.overall_progress, 100);
    assert_eq!(r.status, RecordStatus::Completed);
    assert!(r.actual_completion_date.is_some());
    assert_eq!(
        *notifier.completed.lock().unwrap(),
        vec!["emp-1".to_string()]
    );
    assert_eq!(*notifier.started.lock().unwrap(), vec!["emp-1".to_string()]);
}

#[tokio::test]
async fn employee_cannot_touch_steps_assigned_elsewhere() {
    let (engine, _) = engine().await;
    let steps = vec![
        Step::new(
            "it_setup",
            "IT Setup",
            StepCategory::Setup,
            3.0,
            StepAssignee::Role(AssigneeRole::ItTeam),
        ),
        Step::new(
            "forms",
            "Forms",
            StepCategory::Documentation,
            1.0,
            StepAssignee::Role(AssigneeRole::Employee),
        ),
    ];
    let record = engine
        .create(
            CreateOnboarding {
                employee: "emp-1".into(),
                expected_completion_date: Utc::now() + Duration::days(14),
                assigned_buddy: None,
                steps: Some(steps),
            },
            &hr(),
        )
        .await
        .unwrap();

    // Scenario 4: IT-assigned step is off limits to the employee.
    let emp = Actor::new("emp-1", Role::Employee);
    let err = engine
        .transition_step(record.id, "it_setup", &emp, StepStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));

    // Their own step works.
    engine
        .transition_step(record.id, "forms", &emp, StepStatus::InProgress, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn non_assigned_hr_falls_through_to_deny() {
    let (engine, _) = engine().await;
    let record = engine.create(create_req("emp-1"), &hr()).await.unwrap();

    // Scenario 5: an hr-role actor who is not the assigned HR is denied.
    let other_hr = Actor::new("hr-2", Role::Hr);
    let err = engine
        .transition_step(record.id, "a", &other_hr, StepStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));

    // Read access for hr-role actors is still allowed.
    assert!(engine.get(record.id, &other_hr).await.is_ok());
}

#[tokio::test]
async fn concurrent_creates_produce_exactly_one_record() {
    let (engine, _) = engine().await;

    // Scenario 6: two concurrent creates for the same employee.
    let hr_a = hr();
    let hr_b = hr();
    let first = engine.create(create_req("emp-race"), &hr_a);
    let second = engine.create(create_req("emp-race"), &hr_b);
    let (a, b) = tokio::join!(first, second);

    let ok_count = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
    assert_eq!(ok_count, 1, "exactly one create must win");
    let dup = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(dup, Error::Duplicate { .. }));

    // And the surviving record is readable by the employee.
    let emp = Actor::new("emp-race", Role::Employee);
    let record = engine.get_by_employee("emp-race", &emp).await.unwrap();
    assert_eq!(record.employee, "emp-race");
}

#[tokio::test]
async fn get_by_employee_not_found_and_denied() {
    let (engine, _) = engine().await;
    engine.create(create_req("emp-1"), &hr()).await.unwrap();

    let emp = Actor::new("emp-1", Role::Employee);
    let err = engine.get_by_employee("ghost", &emp).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));

    // Another employee cannot read emp-1's record.
    let other = Actor::new("emp-2", Role::Employee);
    let err = engine.get_by_employee("emp-1", &other).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
}

#[tokio::test]
async fn buddy_works_their_steps_and_leaves_feedback() {
    let (engine, _) = engine().await;
    let steps = vec![
        Step::new(
            "intro",
            "Team intro",
            StepCategory::Meeting,
            1.0,
            StepAssignee::Role(AssigneeRole::Buddy),
        ),
        Step::new(
            "forms",
            "Forms",
            StepCategory::Documentation,
            1.0,
            StepAssignee::Role(AssigneeRole::Employee),
        ),
    ];
    let record = engine
        .create(
            CreateOnboarding {
                employee: "emp-1".into(),
                expected_completion_date: Utc::now() + Duration::days(14),
                assigned_buddy: Some("buddy-1".into()),
                steps: Some(steps),
            },
            &hr(),
        )
        .await
        .unwrap();

    let buddy = Actor::new("buddy-1", Role::Employee);
    engine
        .transition_step(record.id, "intro", &buddy, StepStatus::InProgress, None)
        .await
        .unwrap();
    let r = engine
        .transition_step(record.id, "intro", &buddy, StepStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(r.overall_progress, 50);

    // Buddy cannot touch the employee's step.
    let err = engine
        .transition_step(record.id, "forms", &buddy, StepStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));

    let entry = hr_onboarding::onboarding::model::FeedbackEntry::new(
        "buddy-1",
        hr_onboarding::onboarding::model::FeedbackKind::Buddy,
        5,
        "picking things up quickly",
    )
    .unwrap();
    let r = engine.add_feedback(record.id, &buddy, entry).await.unwrap();
    assert_eq!(r.feedback.len(), 1);
    assert_eq!(r.feedback[0].from, "buddy-1");
}

/// Store wrapper that fails the next `n` compare-and-swap writes with a
/// version conflict before delegating, so the engine's retry loop can be
/// driven deterministically.
struct ContendedStore {
    inner: LibSqlStore,
    conflicts_left: std::sync::atomic::AtomicU32,
    reads: std::sync::atomic::AtomicU32,
}

impl ContendedStore {
    async fn with_conflicts(n: u32) -> Self {
        Self {
            inner: LibSqlStore::new_memory().await.unwrap(),
            conflicts_left: std::sync::atomic::AtomicU32::new(n),
            reads: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl OnboardingStore for ContendedStore {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        self.inner.run_migrations().await
    }

    async fn insert(&self, record: &OnboardingRecord) -> Result<(), StoreError> {
        self.inner.insert(record).await
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Option<OnboardingRecord>, StoreError> {
        self.reads
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn get_by_employee(
        &self,
        employee: &str,
    ) -> Result<Option<OnboardingRecord>, StoreError> {
        self.inner.get_by_employee(employee).await
    }

    async fn update(&self, record: &OnboardingRecord) -> Result<u64, StoreError> {
        let left = self
            .conflicts_left
            .load(std::sync::atomic::Ordering::SeqCst);
        if left > 0 {
            self.conflicts_left
                .store(left - 1, std::sync::atomic::Ordering::SeqCst);
            return Err(StoreError::VersionConflict(record.id));
        }
        self.inner.update(record).await
    }

    async fn list(
        &self,
        filter: &ListFilter,
        page: u32,
        limit: u32,
    ) -> Result<RecordPage, StoreError> {
        self.inner.list(filter, page, limit).await
    }

    async fn stats(&self) -> Result<StatsOverview, StoreError> {
        self.inner.stats().await
    }
}

#[tokio::test]
async fn conflicted_write_retries_from_a_fresh_read() {
    let store = Arc::new(ContendedStore::with_conflicts(2).await);
    let engine = LifecycleEngine::new(
        Arc::clone(&store) as Arc<dyn OnboardingStore>,
        Arc::new(CountingNotifier::default()) as Arc<dyn CompletionNotifier>,
    );
    let record = engine.create(create_req("emp-1"), &hr()).await.unwrap();
    let emp = Actor::new("emp-1", Role::Employee);

    let reads_before = store.reads.load(std::sync::atomic::Ordering::SeqCst);
    let r = engine
        .transition_step(record.id, "a", &emp, StepStatus::InProgress, None)
        .await
        .unwrap();
    assert_eq!(r.step("a").unwrap().status, StepStatus::InProgress);

    // Two injected conflicts mean three attempts, each from a fresh read.
    let reads_after = store.reads.load(std::sync::atomic::Ordering::SeqCst);
    assert_eq!(reads_after - reads_before, 3);

    // The write that finally landed is visible and consistently versioned.
    let reloaded = engine.get(record.id, &emp).await.unwrap();
    assert_eq!(reloaded.step("a").unwrap().status, StepStatus::InProgress);
    assert_eq!(reloaded.version, r.version);
}

#[tokio::test]
async fn retry_budget_exhaustion_surfaces_conflict() {
    let store = Arc::new(ContendedStore::with_conflicts(u32::MAX).await);
    let engine = LifecycleEngine::new(
        store as Arc<dyn OnboardingStore>,
        Arc::new(CountingNotifier::default()) as Arc<dyn CompletionNotifier>,
    )
    .with_write_retries(2);
    let record = engine.create(create_req("emp-1"), &hr()).await.unwrap();
    let emp = Actor::new("emp-1", Role::Employee);

    let err = engine
        .transition_step(record.id, "a", &emp, StepStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict { id } if id == record.id));
}

#[tokio::test]
async fn concurrent_transitions_both_land_with_consistent_progress() {
    let (engine, notifier) = engine().await;
    let steps = vec![
        Step::new(
            "a",
            "Paperwork",
            StepCategory::Documentation,
            2.0,
            StepAssignee::Role(AssigneeRole::Employee),
        ),
        Step::new(
            "b",
            "Workstation",
            StepCategory::Setup,
            3.0,
            StepAssignee::Role(AssigneeRole::Employee),
        ),
    ];
    let record = engine
        .create(
            CreateOnboarding {
                employee: "emp-1".into(),
                expected_completion_date: Utc::now() + Duration::days(30),
                assigned_buddy: None,
                steps: Some(steps),
            },
            &hr(),
        )
        .await
        .unwrap();
    let emp = Actor::new("emp-1", Role::Employee);

    let (a, b) = tokio::join!(
        engine.transition_step(record.id, "a", &emp, StepStatus::InProgress, None),
        engine.transition_step(record.id, "b", &emp, StepStatus::InProgress, None),
    );
    a.unwrap();
    b.unwrap();

    let (a, b) = tokio::join!(
        engine.transition_step(record.id, "a", &emp, StepStatus::Completed, None),
        engine.transition_step(record.id, "b", &emp, StepStatus::Completed, None),
    );
    a.unwrap();
    b.unwrap();

    // Neither write was lost: both steps are completed and the derived
    // state reflects all of them.
    let reloaded = engine.get(record.id, &emp).await.unwrap();
    assert_eq!(reloaded.step("a").unwrap().status, StepStatus::Completed);
    assert_eq!(reloaded.step("b").unwrap().status, StepStatus::Completed);
    assert_eq!(reloaded.overall_progress, 100);
    assert_eq!(reloaded.status, RecordStatus::Completed);
    assert_eq!(
        *notifier.completed.lock().unwrap(),
        vec!["emp-1".to_string()]
    );
}
