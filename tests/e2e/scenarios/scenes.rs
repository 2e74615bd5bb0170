use crate::harness::{FakeApi, FlowRun};
use probe_core::{flow, FailureKind, Method, RequestBody};

#[test]
fn test_recognized_scene_is_listed_and_fetched() {
    let report = FlowRun::new(flow::recognition_flow())
        .expect_all_passed()
        .expect_note("list scenes", "1 scene(s)")
        .expect_note("create scene", "already known")
        .run()
        .unwrap();

    let scene_id = report.ctx.scene_id.clone().unwrap();
    assert_eq!(report.api.count(Method::Get, &format!("/scenes/{}", scene_id)), 1);
    // the recognized scene is reused, never duplicated
    assert_eq!(report.api.count(Method::Post, "/workspaces/"), 0);
}

#[test]
fn test_scene_is_adopted_from_workspace_listing() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_without_scene())
        .expect_all_passed()
        .expect_note("await recognition", "without a scene id")
        .expect_note("list scenes", "adopted scene")
        .run()
        .unwrap();

    let scene_id = report.ctx.scene_id.as_deref().unwrap();
    assert!(scene_id.starts_with("scene-rec-"));
    assert_eq!(report.api.count(Method::Post, "/workspaces/"), 0);
}

#[test]
fn test_scene_is_created_from_floor_plan_when_recognition_stalls() {
    let report = FlowRun::new(flow::recognition_flow())
        .api(FakeApi::new().recognition_statuses(&["processing"]))
        .budget(std::time::Duration::from_secs(2), 2)
        .expect_failure("await recognition", FailureKind::JobTimeout)
        .expect_note("list scenes", "0 scene(s)")
        .expect_passed("create scene")
        .expect_status("create scene", 201)
        .expect_passed("get scene")
        .expect_passed("chat message")
        .expect_exit_code(1)
        .run()
        .unwrap();

    let created = report
        .api
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post && r.path.ends_with("/scenes"))
        .expect("scene created");
    let RequestBody::Json(body) = created.body else {
        panic!("scene body is JSON");
    };
    assert_eq!(body["floor_plan_id"], report.ctx.floor_plan_id.clone().unwrap().as_str());
    assert!(report.ctx.scene_id.is_some());
}

#[test]
fn test_chat_after_recognition_targets_the_scene() {
    let report = FlowRun::new(flow::recognition_flow()).run().unwrap();
    let scene_id = report.ctx.scene_id.clone().unwrap();

    let chat = report
        .api
        .requests()
        .into_iter()
        .find(|r| r.path == "/ai/chat")
        .expect("chat sent");
    let RequestBody::Json(body) = chat.body else {
        panic!("chat body is JSON");
    };
    assert_eq!(body["scene_id"], scene_id.as_str());
}

#[test]
fn test_scene_steps_skip_without_image() {
    FlowRun::new(flow::recognition_flow())
        .without_image()
        .expect_passed("list scenes")
        .expect_skip_reason("create scene", "no floor plan")
        .expect_skip_reason("get scene", "no scene")
        .expect_passed("chat message")
        .run()
        .unwrap();
}
