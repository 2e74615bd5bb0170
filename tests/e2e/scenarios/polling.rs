use crate::harness::{FakeApi, FlowRun};
use probe_core::{flow, FailureKind, JobKind, JobStatus, Method};
use std::time::Duration;

#[test]
fn test_stuck_job_times_out_after_exact_budget() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["processing"]))
        .budget(Duration::from_secs(2), 5)
        .expect_failure("await recognition", FailureKind::JobTimeout)
        .expect_exit_code(1)
        .run()
        .unwrap();

    let prefix = "/ai/recognize/";
    assert_eq!(report.api.count(Method::Get, prefix), 5);
    // no sleep after the final attempt
    assert_eq!(report.clock.sleeps(), 4);
    assert!(report.clock.elapsed() >= Duration::from_secs(8));

    let job = report.ctx.job(JobKind::Recognition).unwrap();
    assert_eq!(job.polls, 5);
    assert!(!job.is_terminal());
}

#[test]
fn test_timeout_duration_is_reported_on_virtual_time() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["pending"]))
        .budget(Duration::from_secs(2), 3)
        .run()
        .unwrap();

    let step = report.step("await recognition").unwrap();
    assert_eq!(step.duration_ms, 4000);
}

#[test]
fn test_failed_recognition_skips_scene_steps() {
    FlowRun::new(flow::full_user_flow())
        .api(FakeApi::new().recognition_statuses(&["pending", "failed"]))
        .expect_failure("await recognition", FailureKind::JobFailed)
        .expect_passed("list scenes")
        .expect_skip_reason("get scene", "no scene")
        .expect_skip_reason("start generation", "no scene")
        .expect_skip_reason("await generation", "no generation job")
        .expect_skip_reason("list branches", "no scene")
        .expect_passed("chat message")
        .expect_passed("compliance rules")
        .expect_passed("logout")
        .expect_exit_code(1)
        .run()
        .unwrap();
}

#[test]
fn test_failed_job_keeps_error_message() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["failed"]))
        .run()
        .unwrap();

    let job = report.ctx.job(JobKind::Recognition).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("model could not read the plan"));

    let step = report.step("await recognition").unwrap();
    assert!(step.reason().contains("model could not read the plan"));
}

#[test]
fn test_unknown_status_is_tolerated_until_completion() {
    FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["warming_up", "warming_up", "completed"]))
        .budget(Duration::from_secs(1), 5)
        .expect_all_passed()
        .expect_note("await recognition", "completed after 3 poll(s)")
        .run()
        .unwrap();
}

#[test]
fn test_terminal_job_is_not_polled_again() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["completed"]))
        .expect_all_passed()
        .run()
        .unwrap();

    assert_eq!(report.api.count(Method::Get, "/ai/recognize/"), 1);
    assert_eq!(report.clock.sleeps(), 0);
}

#[test]
fn test_generation_timeout_does_not_block_later_steps() {
    FlowRun::new(flow::full_user_flow())
        .api(FakeApi::new().generation_statuses(&["processing"]))
        .budget(Duration::from_secs(2), 4)
        .expect_failure("await generation", FailureKind::JobTimeout)
        .expect_passed("get AI context")
        .expect_passed("create branch")
        .expect_passed("logout")
        .run()
        .unwrap();
}
