use crate::harness::{FakeApi, FlowRun, TestWorkspace};
use probe_core::{flow, Config, Credentials, FailureKind, ProbeError, CONFIG_FILE};
use std::time::Duration;

#[test]
fn test_partial_file_keeps_other_defaults() {
    let ws = TestWorkspace::empty().unwrap();
    let path = ws
        .write_file(
            CONFIG_FILE,
            b"[poll]\nmax_attempts = 4\n\n[user]\nemail_prefix = \"nightly\"\n",
        )
        .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.poll.max_attempts, 4);
    assert_eq!(config.poll.interval_secs, 2);
    assert_eq!(config.user.email_prefix, "nightly");
    assert_eq!(config.api, Config::default().api);
}

#[test]
fn test_invalid_values_are_config_errors() {
    let ws = TestWorkspace::empty().unwrap();
    let path = ws
        .write_file(CONFIG_FILE, b"[api]\nrequest_timeout_secs = 0\n")
        .unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ProbeError::ConfigError(_)));
    assert!(err.recovery_suggestion().is_some());
}

#[test]
fn test_configured_budget_drives_the_poll_loop() {
    let ws = TestWorkspace::empty().unwrap();
    let path = ws
        .write_file(CONFIG_FILE, b"[poll]\ninterval_secs = 3\nmax_attempts = 2\n")
        .unwrap();
    let config = Config::load(&path).unwrap();
    let user = &config.user;
    let budget = config.poll.budget();

    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["processing"]))
        .credentials(Credentials::unique(
            &user.email_prefix,
            &user.email_domain,
            &user.password,
            &user.name,
        ))
        .budget(budget.interval, budget.max_attempts)
        .expect_failure("await recognition", FailureKind::JobTimeout)
        .run()
        .unwrap();

    assert_eq!(report.clock.sleeps(), 1);
    assert_eq!(report.clock.elapsed(), Duration::from_secs(3));
    assert!(report.ctx.credentials.email.ends_with("@granula.ru"));
}
