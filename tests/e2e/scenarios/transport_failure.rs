use crate::harness::{FakeApi, FlowRun};
use probe_core::{flow, FailureKind, StepOutcome, AUTH_UNAVAILABLE};

#[test]
fn test_unreachable_api_is_recorded_not_raised() {
    let report = FlowRun::new(flow::full_user_flow())
        .api(FakeApi::new().down())
        .expect_failure("health", FailureKind::Transport)
        .expect_failure("register", FailureKind::Transport)
        .expect_failure("login", FailureKind::Transport)
        .expect_skip_reason("create workspace", AUTH_UNAVAILABLE)
        .expect_exit_code(1)
        .run()
        .unwrap();

    let health = report.step("health").unwrap();
    assert_eq!(health.actual_status, None);
    assert_eq!(health.expected_status, Some(200));

    // every step is accounted for
    let summary = report.results.summarize();
    assert_eq!(summary.total, flow::full_user_flow().len());
    assert_eq!(summary.passed, 0);
    assert_eq!(summary.skipped, report.auth_dependent);
}

#[test]
fn test_unreachable_api_summary_lists_failures_in_order() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().down())
        .run()
        .unwrap();

    let failures: Vec<_> = report
        .results
        .summarize()
        .failures
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(failures, vec!["health", "register", "login"]);
    assert_eq!(
        report.outcomes(StepOutcome::Skipped),
        vec![
            "create workspace",
            "upload floor plan",
            "start recognition",
            "await recognition",
            "list scenes",
            "create scene",
            "get scene",
            "chat message",
        ]
    );
}
