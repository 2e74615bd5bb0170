use crate::harness::{FakeApi, FlowRun};
use probe_core::{flow, FailureKind, Method, StepOutcome, AUTH_UNAVAILABLE};

#[test]
fn test_rejected_login_skips_every_authenticated_step() {
    let report = FlowRun::new(flow::full_user_flow())
        .api(FakeApi::new().reject_login())
        .expect_status("login", 401)
        .expect_failure("login", FailureKind::StatusMismatch)
        .expect_passed("health")
        .expect_passed("login with wrong password")
        .expect_passed("get profile without token")
        .expect_skip_reason("get profile", AUTH_UNAVAILABLE)
        .expect_exit_code(1)
        .run()
        .unwrap();

    let summary = report.results.summarize();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, report.auth_dependent);

    // nothing that needs a token was sent after login failed
    assert_eq!(report.api.count(Method::Post, "/workspaces"), 0);
    assert_eq!(report.api.count(Method::Post, "/ai/recognize"), 0);
}

#[test]
fn test_rejected_refresh_is_auth_expired() {
    let report = FlowRun::new(flow::full_user_flow())
        .api(FakeApi::new().reject_refresh())
        .expect_failure("refresh tokens", FailureKind::AuthExpired)
        .expect_skip_reason("refresh with revoked token", AUTH_UNAVAILABLE)
        .expect_skip_reason("create workspace", AUTH_UNAVAILABLE)
        .expect_skip_reason("logout", AUTH_UNAVAILABLE)
        .expect_passed("get profile without token")
        .expect_exit_code(1)
        .run()
        .unwrap();

    let passed = report.outcomes(StepOutcome::Passed);
    assert!(passed.contains(&"login"));
    assert!(!passed.contains(&"get profile"));
}

#[test]
fn test_rotated_refresh_token_is_revoked() {
    let report = FlowRun::new(flow::full_user_flow())
        .expect_passed("refresh tokens")
        .expect_passed("refresh with revoked token")
        .expect_status("refresh with revoked token", 401)
        .run()
        .unwrap();

    let retired = report
        .ctx
        .retired_refresh_token
        .as_deref()
        .expect("refresh remembers the old token");
    assert!(!report.api.is_refresh_token_live(retired));
}

#[test]
fn test_auth_flow_password_change_and_logout_all() {
    let report = FlowRun::new(flow::auth_flow())
        .expect_all_passed()
        .expect_passed("change password")
        .expect_passed("login with new password")
        .expect_passed("logout all sessions")
        .expect_status("refresh after logout-all", 401)
        .expect_exit_code(0)
        .run()
        .unwrap();

    assert_eq!(report.ctx.credentials.password, probe_core::steps::ROTATED_PASSWORD);
    let retired = report.ctx.retired_refresh_token.as_deref().unwrap();
    assert!(!report.api.is_refresh_token_live(retired));
}

#[test]
fn test_logout_invalidates_refresh_token() {
    let report = FlowRun::new(flow::full_user_flow())
        .expect_passed("logout")
        .run()
        .unwrap();

    let logout = report
        .api
        .requests()
        .into_iter()
        .find(|r| r.path == "/auth/logout")
        .expect("logout sent");
    let probe_core::RequestBody::Json(body) = logout.body else {
        panic!("logout carries the refresh token");
    };
    let token = body["refresh_token"].as_str().unwrap();
    assert!(!report.api.is_refresh_token_live(token));
}
