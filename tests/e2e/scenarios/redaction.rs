use crate::harness::FlowRun;
use probe_core::{describe_body, flow, RequestBody};

#[test]
fn test_logged_bodies_never_contain_secrets() {
    let report = FlowRun::new(flow::auth_flow()).expect_all_passed().run().unwrap();
    let password = report.ctx.credentials.password.clone();
    let original_password = "SecurePassword123!";

    let requests = report.api.requests();
    assert!(!requests.is_empty());
    for request in &requests {
        let logged = describe_body(&request.body);
        assert!(!logged.contains(original_password), "leaked in {}", logged);
        assert!(!logged.contains(&password), "leaked in {}", logged);
        if let Some(token) = &request.bearer {
            assert!(!logged.contains(token.as_str()));
        }
    }
}

#[test]
fn test_transmitted_bodies_are_untouched() {
    let report = FlowRun::new(flow::auth_flow()).run().unwrap();

    let register = report
        .api
        .requests()
        .into_iter()
        .find(|r| r.path == "/auth/register")
        .unwrap();
    let RequestBody::Json(body) = &register.body else {
        panic!("register body is JSON");
    };
    assert_eq!(body["password"], "SecurePassword123!");
    assert!(describe_body(&register.body).contains(probe_core::redact::PLACEHOLDER));
}

#[test]
fn test_refresh_tokens_are_masked_in_logs() {
    let report = FlowRun::new(flow::auth_flow()).run().unwrap();

    let refresh = report
        .api
        .requests()
        .into_iter()
        .find(|r| r.path == "/auth/refresh")
        .unwrap();
    let RequestBody::Json(body) = &refresh.body else {
        panic!("refresh body is JSON");
    };
    let token = body["refresh_token"].as_str().unwrap();
    let logged = describe_body(&refresh.body);
    assert!(!logged.contains(token));
    assert!(logged.contains("..."));
}
