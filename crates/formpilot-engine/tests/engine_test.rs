mod common;

use common::{Behavior, El, MockBackend, Op};
use formpilot_common::plan::{
    Action, ActionStatus, ActionValue, FieldKind, FillPlan, RunStatus,
};
use formpilot_engine::engine::{EngineError, ExecutionEngine};
use formpilot_engine::executor::{ExecutorRegistry, TextExecutor};
use formpilot_engine::pacing::Pacing;

const URL: &str = "https://example.com/apply";

fn engine() -> ExecutionEngine {
    ExecutionEngine::new(ExecutorRegistry::default(), Pacing::fast())
}

fn text_action(id: &str, selector: &str, value: &str, required: bool) -> Action {
    Action {
        id: id.to_string(),
        kind: FieldKind::Text,
        selector: selector.to_string(),
        value: Some(ActionValue::Text(value.to_string())),
        required,
        file_name: None,
    }
}

fn plan(actions: Vec<Action>) -> FillPlan {
    FillPlan {
        target_url: URL.to_string(),
        actions,
    }
}

#[tokio::test]
async fn single_text_action_completes() {
    let mut backend = MockBackend::new();
    backend.add(
        El::new("input")
            .sel("#first_name")
            .value("")
            .behavior(Behavior::TextInput),
    );

    let report = engine()
        .execute(&mut backend, &plan(vec![text_action("a1", "#first_name", "Ada", true)]))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.status_of("a1"), Some(ActionStatus::Success));
    assert!(report.errors.is_empty());
    assert_eq!(backend.ops.first(), Some(&Op::Navigate(URL.to_string())));
}

#[tokio::test]
async fn one_failure_does_not_abort_the_rest() {
    let mut backend = MockBackend::new();
    backend.add(
        El::new("input")
            .sel("#last_name")
            .value("")
            .behavior(Behavior::TextInput),
    );

    let report = engine()
        .execute(
            &mut backend,
            &plan(vec![
                text_action("a1", "#does_not_exist", "x", false),
                text_action("a2", "#last_name", "Lovelace", false),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(report.status_of("a1"), Some(ActionStatus::Failed));
    assert_eq!(report.status_of("a2"), Some(ActionStatus::Success));
    assert!(report.errors.contains_key("a1"));
}

#[tokio::test]
async fn optional_failures_still_complete() {
    let mut backend = MockBackend::new();
    backend.add(
        El::new("input")
            .sel("#first_name")
            .value("")
            .behavior(Behavior::TextInput),
    );

    let report = engine()
        .execute(
            &mut backend,
            &plan(vec![
                text_action("a1", "#first_name", "Ada", true),
                text_action("a2", "#optional_missing", "x", false),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.status_of("a2"), Some(ActionStatus::Failed));
}

#[tokio::test]
async fn required_failure_fails_the_run() {
    let mut backend = MockBackend::new();

    let report = engine()
        .execute(
            &mut backend,
            &plan(vec![text_action("a1", "#required_missing", "x", true)]),
        )
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.status_of("a1"), Some(ActionStatus::Failed));
}

#[tokio::test]
async fn valueless_action_is_skipped() {
    let mut backend = MockBackend::new();
    backend.add(
        El::new("input")
            .sel("#first_name")
            .value("")
            .behavior(Behavior::TextInput),
    );

    let mut no_value = text_action("a1", "#first_name", "", false);
    no_value.value = None;

    let report = engine()
        .execute(&mut backend, &plan(vec![no_value]))
        .await
        .unwrap();

    assert_eq!(report.status_of("a1"), Some(ActionStatus::Skipped));
    assert_eq!(report.status, RunStatus::Completed);
}

#[tokio::test]
async fn unregistered_kind_fails_the_whole_plan() {
    let mut backend = MockBackend::new();
    backend.add(El::new("input").sel("#terms").behavior(Behavior::Checkbox));

    let mut registry = ExecutorRegistry::empty();
    registry.register(FieldKind::Text, Box::new(TextExecutor::single_line()));
    let engine = ExecutionEngine::new(registry, Pacing::fast());

    let checkbox_action = Action {
        id: "a1".to_string(),
        kind: FieldKind::Checkbox,
        selector: "#terms".to_string(),
        value: Some(ActionValue::Flag(true)),
        required: false,
        file_name: None,
    };

    let err = engine
        .execute(
            &mut backend,
            &plan(vec![text_action("a0", "#x", "x", false), checkbox_action]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnsupportedKind(FieldKind::Checkbox)));
    // Detected before anything ran: not even a navigation happened.
    assert!(backend.ops.is_empty());
}

#[tokio::test]
async fn invalid_target_url_is_rejected() {
    let mut backend = MockBackend::new();
    let bad_plan = FillPlan {
        target_url: "not a url".to_string(),
        actions: vec![],
    };

    let err = engine().execute(&mut backend, &bad_plan).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidUrl { .. }));
    assert!(backend.ops.is_empty());
}

#[tokio::test]
async fn empty_plan_completes() {
    let mut backend = MockBackend::new();
    let report = engine().execute(&mut backend, &plan(vec![])).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.results.is_empty());
}
