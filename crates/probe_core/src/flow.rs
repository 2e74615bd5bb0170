//! Ready-made scenarios.

use crate::runner::Scenario;
use crate::steps;

/// Health plus the authentication surface, negative cases included.
fn auth_phase() -> Scenario {
    Scenario::new("authentication")
        .step(steps::health())
        .step(steps::ready())
        .step(steps::register())
        .step(steps::register_duplicate())
        .step(steps::login())
        .step(steps::login_wrong_password())
        .step(steps::refresh())
        .step(steps::refresh_revoked())
}

/// Every phase of a user's journey, from registration to logout.
pub fn full_user_flow() -> Scenario {
    Scenario::new("full user flow")
        .then(auth_phase())
        // profile
        .step(steps::profile_get())
        .step(steps::profile_update())
        .step(steps::profile_unauthenticated())
        // workspaces
        .step(steps::workspace_create())
        .step(steps::workspace_list())
        .step(steps::workspace_get())
        .step(steps::workspace_update())
        // floor plans and recognition
        .step(steps::floor_plan_upload())
        .step(steps::floor_plan_list())
        .step(steps::recognition_submit())
        .step(steps::recognition_await())
        .step(steps::scene_list())
        .step(steps::scene_get())
        // branches, so later scene-scoped calls address one
        .step(steps::branch_list())
        .step(steps::branch_create())
        // chat
        .step(steps::chat_send())
        .step(steps::chat_follow_up())
        .step(steps::chat_history())
        .step(steps::chat_clear())
        // generation
        .step(steps::generation_submit())
        .step(steps::generation_await())
        .step(steps::ai_context_get())
        .step(steps::ai_context_update())
        .step(steps::compliance_check())
        .step(steps::compliance_rules())
        .step(steps::request_create())
        .step(steps::request_list())
        .step(steps::notifications_list())
        .step(steps::notifications_count())
        .step(steps::notifications_read_all())
        .step(steps::logout())
}

/// Authentication only: token rotation, password change, and revocation.
pub fn auth_flow() -> Scenario {
    Scenario::new("auth flow")
        .then(auth_phase())
        .step(steps::profile_get())
        .step(steps::profile_unauthenticated())
        .step(steps::change_password())
        .step(steps::login_after_password_change())
        .step(steps::logout_all())
        .step(steps::refresh_after_logout_all())
}

/// Upload one floor plan, follow its recognition job to the end, then make
/// sure a scene exists for it and chat against that scene.
pub fn recognition_flow() -> Scenario {
    Scenario::new("recognition flow")
        .step(steps::health())
        .step(steps::register())
        .step(steps::login())
        .step(steps::workspace_create())
        .step(steps::floor_plan_upload())
        .step(steps::recognition_submit())
        .step(steps::recognition_await())
        .step(steps::scene_list())
        .step(steps::scene_create())
        .step(steps::scene_get())
        .step(steps::chat_send())
}
