//! Step library for the Granula API.
//!
//! Each constructor returns a [`Step`] whose body performs one call (or one
//! submit/await pair), checks it, and writes any identifier it produced into
//! the [`ScenarioContext`]. Flows in [`crate::flow`] string them together.

use crate::context::ScenarioContext;
use crate::envelope::{self, Collection};
use crate::error::AuthError;
use crate::recorder::{Expect, Recorded};
use crate::runner::{auth_failure, Step, StepEnv, StepOutput};
use crate::transport::{ApiRequest, FilePart, MultipartForm};
use crate::types::{Failure, FailureKind, JobKind};
use serde_json::{json, Value};

/// Password set by the change-password step.
pub const ROTATED_PASSWORD: &str = "Rotated456!";

const GENERATION_PROMPT: &str =
    "Suggest two ways to merge the kitchen with the living room within building codes";

const NO_WORKSPACE: &str = "no workspace";
const NO_IMAGE: &str = "no test image";
const NO_FLOOR_PLAN: &str = "no floor plan";
const NO_SCENE: &str = "no scene";
const NO_CONVERSATION: &str = "no conversation context";
const NO_RETIRED_TOKEN: &str = "no rotated-out refresh token";

fn has_workspace(ctx: &ScenarioContext) -> bool {
    ctx.workspace_id.is_some()
}

fn has_image(ctx: &ScenarioContext) -> bool {
    ctx.image.is_some()
}

fn has_floor_plan(ctx: &ScenarioContext) -> bool {
    ctx.floor_plan_id.is_some()
}

fn has_scene(ctx: &ScenarioContext) -> bool {
    ctx.scene_id.is_some()
}

fn has_retired_token(ctx: &ScenarioContext) -> bool {
    ctx.retired_refresh_token.is_some()
}

/// Pass through a recorded call, storing its `id` into `slot` on success.
fn capture_id(rec: &Recorded, slot: &mut Option<String>) -> StepOutput {
    let out = StepOutput::from_recorded(rec);
    if !rec.passed() {
        return out;
    }
    match rec.require_str("id") {
        Ok(id) => {
            let note = format!("id {}", id);
            *slot = Some(id);
            out.with_note(note)
        }
        Err(failure) => out.fail_with(failure),
    }
}

/// Pass through a recorded list call, noting how many items came back.
fn count_items(rec: &Recorded, noun: &str) -> StepOutput {
    let out = StepOutput::from_recorded(rec);
    if rec.passed() {
        let items = rec.collection();
        out.with_note(format!("{} {}(s)", items.len(), noun))
    } else {
        out
    }
}

/// Id stored in a context slot. Only used behind a precondition on that slot.
fn id(slot: &Option<String>) -> &str {
    slot.as_deref().unwrap_or_default()
}

// ===== Health =====

pub fn health() -> Step {
    Step::new("health", |env, _| {
        let rec = env.call_anonymous(ApiRequest::get("/health").unversioned(), &Expect::ok());
        let out = StepOutput::from_recorded(&rec);
        match rec.payload().and_then(|p| envelope::str_field(p, "status")) {
            Some(status) => out.with_note(format!("status {}", status)),
            None => out,
        }
    })
    .public()
}

pub fn ready() -> Step {
    Step::new("readiness", |env, _| {
        let rec = env.call_anonymous(ApiRequest::get("/ready").unversioned(), &Expect::ok());
        StepOutput::from_recorded(&rec)
    })
    .public()
}

// ===== Authentication =====

pub fn register() -> Step {
    Step::new("register", |env, ctx| {
        let creds = ctx.credentials.clone();
        let result = env.session.register(&creds.email, &creds.password, &creds.name);
        if let Ok(session) = &result {
            ctx.user_id = session.user_id.clone();
        }
        let out = StepOutput::from_auth_result(&result, 201);
        match &ctx.user_id {
            Some(user_id) if out.is_passed() => out.with_note(format!("user {}", user_id)),
            _ => out,
        }
    })
    .public()
}

/// Registering the same email again must be refused with 409.
pub fn register_duplicate() -> Step {
    Step::new("register duplicate email", |env, ctx| {
        let creds = &ctx.credentials;
        let request = ApiRequest::post("/auth/register").json(json!({
            "email": creds.email,
            "password": creds.password,
            "name": creds.name,
        }));
        StepOutput::from_recorded(&env.call_anonymous(request, &Expect::status(409)))
    })
    .public()
}

pub fn login() -> Step {
    Step::new("login", |env, ctx| {
        let creds = &ctx.credentials;
        let result = env.session.login(&creds.email, &creds.password);
        StepOutput::from_auth_result(&result, 200)
    })
    .public()
    .blocking()
}

pub fn login_wrong_password() -> Step {
    Step::new("login with wrong password", |env, ctx| {
        let request = ApiRequest::post("/auth/login").json(json!({
            "email": ctx.credentials.email,
            "password": format!("{}-wrong", ctx.credentials.password),
        }));
        StepOutput::from_recorded(&env.call_anonymous(request, &Expect::status(401)))
    })
    .public()
}

/// Rotate tokens; the old refresh token is remembered for the revocation check.
pub fn refresh() -> Step {
    Step::new("refresh tokens", |env, ctx| {
        let previous = env.session.session().map(|s| s.refresh_token.clone());
        let result = env.session.refresh();
        let out = StepOutput::from_auth_result(&result, 200);
        match (&result, previous) {
            (Ok(rotated), Some(previous)) => {
                let same = rotated.refresh_token == previous;
                ctx.retired_refresh_token = Some(previous);
                if same {
                    out.with_note("server returned the same refresh token")
                } else {
                    out
                }
            }
            _ => out,
        }
    })
}

fn replay_retired_token(env: &mut StepEnv<'_>, ctx: &mut ScenarioContext) -> StepOutput {
    let token = id(&ctx.retired_refresh_token).to_string();
    let result = env.session.exchange_refresh_token(&token);
    let out = match &result {
        Err(AuthError::InvalidRefreshToken) => StepOutput::passed(),
        Ok(_) => StepOutput::failed(Failure::new(
            FailureKind::StatusMismatch,
            "revoked refresh token was accepted",
        )),
        Err(err) => StepOutput::failed(auth_failure(err)),
    };
    let actual = match &result {
        Ok(_) => Some(200),
        Err(err) => err.status(),
    };
    out.with_status(401, actual)
}

/// A refresh token rotated out by [`refresh`] must be refused.
pub fn refresh_revoked() -> Step {
    Step::new("refresh with revoked token", replay_retired_token)
        .requires(NO_RETIRED_TOKEN, has_retired_token)
}

/// After logout-all, the last refresh token must be refused.
pub fn refresh_after_logout_all() -> Step {
    Step::new("refresh after logout-all", replay_retired_token)
        .public()
        .requires(NO_RETIRED_TOKEN, has_retired_token)
}

pub fn change_password() -> Step {
    Step::new("change password", |env, ctx| {
        let result = env
            .session
            .change_password(&ctx.credentials.password, ROTATED_PASSWORD);
        if result.is_ok() {
            ctx.credentials.password = ROTATED_PASSWORD.to_string();
        }
        StepOutput::from_auth_result(&result, 200)
    })
}

pub fn login_after_password_change() -> Step {
    Step::new("login with new password", |env, ctx| {
        let creds = &ctx.credentials;
        let result = env.session.login(&creds.email, &creds.password);
        StepOutput::from_auth_result(&result, 200)
    })
}

pub fn logout() -> Step {
    Step::new("logout", |env, _| {
        StepOutput::from_auth_result(&env.session.logout(), 200)
    })
}

/// Invalidate every session; keeps the last refresh token for a replay check.
pub fn logout_all() -> Step {
    Step::new("logout all sessions", |env, ctx| {
        if let Some(session) = env.session.session() {
            ctx.retired_refresh_token = Some(session.refresh_token.clone());
        }
        StepOutput::from_auth_result(&env.session.logout_all(), 200)
    })
}

// ===== Profile =====

pub fn profile_get() -> Step {
    Step::new("get profile", |env, ctx| {
        let rec = env.call(ApiRequest::get("/users/me"), &Expect::ok());
        let out = StepOutput::from_recorded(&rec);
        let Some(profile) = rec.payload().filter(|_| rec.passed()) else {
            return out;
        };
        if ctx.user_id.is_none() {
            ctx.user_id = envelope::str_field(profile, "id");
        }
        match envelope::str_field(profile, "email") {
            Some(email) if !email.eq_ignore_ascii_case(&ctx.credentials.email) => {
                out.fail_with(Failure::protocol(format!(
                    "profile email {} does not match {}",
                    email, ctx.credentials.email
                )))
            }
            _ => out,
        }
    })
}

pub fn profile_update() -> Step {
    Step::new("update profile", |env, ctx| {
        let name = format!("{} (updated)", ctx.credentials.name);
        let request = ApiRequest::patch("/users/me").json(json!({
            "name": name,
            "phone": "+7 999 123 4567",
        }));
        let rec = env.call(request, &Expect::ok());
        if rec.passed() {
            ctx.credentials.name = name;
        }
        StepOutput::from_recorded(&rec)
    })
}

/// The profile endpoint must refuse a request carrying no credentials.
pub fn profile_unauthenticated() -> Step {
    Step::new("get profile without token", |env, _| {
        let rec = env.call_anonymous(ApiRequest::get("/users/me"), &Expect::status(401));
        StepOutput::from_recorded(&rec)
    })
    .public()
}

// ===== Workspaces =====

pub fn workspace_create() -> Step {
    Step::new("create workspace", |env, ctx| {
        let request = ApiRequest::post("/workspaces").json(json!({
            "name": "Probe apartment",
            "description": "Workspace created by the API probe",
            "address": "Moscow, Testovaya st. 1",
            "total_area": 65.5,
            "rooms_count": 2,
        }));
        let rec = env.call(request, &Expect::created());
        capture_id(&rec, &mut ctx.workspace_id)
    })
}

pub fn workspace_list() -> Step {
    Step::new("list workspaces", |env, ctx| {
        let rec = env.call(ApiRequest::get("/workspaces"), &Expect::ok());
        let out = count_items(&rec, "workspace");
        match &ctx.workspace_id {
            Some(workspace_id)
                if rec.passed() && !rec.collection().ids().contains(workspace_id) =>
            {
                out.with_note(format!("created workspace {} not in first page", workspace_id))
            }
            _ => out,
        }
    })
}

pub fn workspace_get() -> Step {
    Step::new("get workspace", |env, ctx| {
        let path = format!("/workspaces/{}", id(&ctx.workspace_id));
        let rec = env.call(ApiRequest::get(path), &Expect::ok());
        StepOutput::from_recorded(&rec)
    })
    .requires(NO_WORKSPACE, has_workspace)
}

pub fn workspace_update() -> Step {
    Step::new("update workspace", |env, ctx| {
        let path = format!("/workspaces/{}", id(&ctx.workspace_id));
        let request = ApiRequest::patch(path).json(json!({
            "description": "Updated description",
            "rooms_count": 3,
        }));
        StepOutput::from_recorded(&env.call(request, &Expect::ok()))
    })
    .requires(NO_WORKSPACE, has_workspace)
}

// ===== Floor plans =====

pub fn floor_plan_upload() -> Step {
    Step::new("upload floor plan", |env, ctx| {
        let Some(image) = &ctx.image else {
            return StepOutput::failed(Failure::new(FailureKind::Precondition, NO_IMAGE));
        };
        let form = MultipartForm::new()
            .text("workspace_id", id(&ctx.workspace_id))
            .text("name", format!("Plan {}", image.file_name))
            .file(FilePart {
                field: "file".to_string(),
                file_name: image.file_name.clone(),
                mime: image.mime.clone(),
                bytes: image.bytes.clone(),
            });
        let rec = env.call(
            ApiRequest::post("/floor-plans").multipart(form),
            &Expect::created().or(200),
        );
        capture_id(&rec, &mut ctx.floor_plan_id)
    })
    .requires(NO_WORKSPACE, has_workspace)
    .requires(NO_IMAGE, has_image)
}

pub fn floor_plan_list() -> Step {
    Step::new("list floor plans", |env, ctx| {
        let request = ApiRequest::get("/floor-plans").query("workspace_id", id(&ctx.workspace_id));
        count_items(&env.call(request, &Expect::ok()), "floor plan")
    })
    .requires(NO_WORKSPACE, has_workspace)
}

// ===== Async jobs =====

fn submit_job(
    env: &mut StepEnv<'_>,
    ctx: &mut ScenarioContext,
    kind: JobKind,
    payload: Value,
) -> StepOutput {
    match env.poller.submit(kind, payload, env.session.bearer()) {
        Ok(handle) => {
            let note = format!("job {}", handle.job_id);
            ctx.set_job(handle);
            StepOutput::passed().with_note(note)
        }
        Err(err) => StepOutput::from_job_error(&err),
    }
}

/// Poll the stored job of `kind` to a terminal state; returns the output and
/// the result payload on completion.
fn await_job(
    env: &mut StepEnv<'_>,
    ctx: &mut ScenarioContext,
    kind: JobKind,
) -> (StepOutput, Option<Value>) {
    let Some(handle) = ctx.job_mut(kind) else {
        let failure = Failure::new(FailureKind::Precondition, format!("no {} job", kind.label()));
        return (StepOutput::failed(failure), None);
    };
    match env.poller.await_terminal(handle, env.budget, env.session.bearer()) {
        Ok(()) => {
            let note = format!("completed after {} poll(s)", handle.polls);
            (StepOutput::passed().with_note(note), handle.result.clone())
        }
        Err(err) => (StepOutput::from_job_error(&err), None),
    }
}

pub fn recognition_submit() -> Step {
    Step::new("start recognition", |env, ctx| {
        let Some(image) = &ctx.image else {
            return StepOutput::failed(Failure::new(FailureKind::Precondition, NO_IMAGE));
        };
        let mut payload = json!({
            "image_base64": image.base64,
            "image_type": image.mime,
            "options": {
                "detect_load_bearing": true,
                "detect_wet_zones": true,
                "detect_furniture": false,
            },
        });
        if let Some(floor_plan_id) = &ctx.floor_plan_id {
            payload["floor_plan_id"] = json!(floor_plan_id);
        }
        submit_job(env, ctx, JobKind::Recognition, payload)
    })
    .requires(NO_IMAGE, has_image)
}

/// Scene id produced by a completed recognition job.
fn scene_id_of(result: &Value) -> Option<String> {
    result
        .get("scene")
        .and_then(|scene| envelope::str_field(scene, "id"))
        .or_else(|| envelope::str_field(result, "scene_id"))
}

pub fn recognition_await() -> Step {
    Step::new("await recognition", |env, ctx| {
        let (out, result) = await_job(env, ctx, JobKind::Recognition);
        match result.as_ref().and_then(scene_id_of) {
            Some(scene_id) => {
                ctx.scene_id = Some(scene_id);
                out
            }
            None if out.is_passed() => out.with_note("completed without a scene id"),
            None => out,
        }
    })
    .requires("no recognition job", |ctx| ctx.job(JobKind::Recognition).is_some())
}

// ===== Scenes =====

/// List the workspace's scenes. When recognition finished without naming a
/// scene, the first listed one is adopted.
pub fn scene_list() -> Step {
    Step::new("list scenes", |env, ctx| {
        let path = format!("/workspaces/{}/scenes", id(&ctx.workspace_id));
        let rec = env.call(ApiRequest::get(path), &Expect::ok());
        let out = count_items(&rec, "scene");
        if !rec.passed() || ctx.scene_id.is_some() {
            return out;
        }
        match rec.collection().ids().into_iter().next() {
            Some(scene_id) => {
                let note = format!("adopted scene {}", scene_id);
                ctx.scene_id = Some(scene_id);
                out.with_note(note)
            }
            None => out,
        }
    })
    .requires(NO_WORKSPACE, has_workspace)
}

/// Create a scene from the uploaded floor plan, unless one is already known.
pub fn scene_create() -> Step {
    Step::new("create scene", |env, ctx| {
        if let Some(scene_id) = &ctx.scene_id {
            return StepOutput::passed().with_note(format!("scene {} already known", scene_id));
        }
        let path = format!("/workspaces/{}/scenes", id(&ctx.workspace_id));
        let request = ApiRequest::post(path).json(json!({
            "name": "Probe scene",
            "description": "Scene created by the API probe",
            "floor_plan_id": id(&ctx.floor_plan_id),
        }));
        let rec = env.call(request, &Expect::created().or(200));
        capture_id(&rec, &mut ctx.scene_id)
    })
    .requires(NO_WORKSPACE, has_workspace)
    .requires(NO_FLOOR_PLAN, has_floor_plan)
}

pub fn scene_get() -> Step {
    Step::new("get scene", |env, ctx| {
        let path = format!("/scenes/{}", id(&ctx.scene_id));
        let rec = env.call(ApiRequest::get(path), &Expect::ok());
        let out = StepOutput::from_recorded(&rec);
        let owner = rec
            .payload()
            .filter(|_| rec.passed())
            .and_then(|scene| envelope::str_field(scene, "workspace_id"));
        match (owner, &ctx.workspace_id) {
            (Some(owner), Some(workspace_id)) if &owner != workspace_id => out.fail_with(
                Failure::protocol(format!("scene belongs to workspace {}", owner)),
            ),
            _ => out,
        }
    })
    .requires(NO_SCENE, has_scene)
}

pub fn generation_submit() -> Step {
    Step::new("start generation", |env, ctx| {
        let payload = json!({
            "scene_id": id(&ctx.scene_id),
            "prompt": GENERATION_PROMPT,
            "variants_count": 2,
            "preserve_load_bearing": true,
            "check_compliance": true,
        });
        submit_job(env, ctx, JobKind::Generation, payload)
    })
    .requires(NO_SCENE, has_scene)
}

pub fn generation_await() -> Step {
    Step::new("await generation", |env, ctx| {
        let (out, result) = await_job(env, ctx, JobKind::Generation);
        match result {
            Some(result) => {
                let variants = Collection::from_body(&result).len();
                out.with_note(format!("{} variant(s)", variants))
            }
            None => out,
        }
    })
    .requires("no generation job", |ctx| ctx.job(JobKind::Generation).is_some())
}

// ===== Chat =====

fn chat(env: &mut StepEnv<'_>, ctx: &mut ScenarioContext, message: &str) -> StepOutput {
    let request = ApiRequest::post("/ai/chat").json(ctx.chat_payload(message));
    let rec = env.call(request, &Expect::ok());
    let out = StepOutput::from_recorded(&rec);
    let Some(reply) = rec.payload().filter(|_| rec.passed()) else {
        return out;
    };
    ctx.observe_chat_reply(reply);
    match ctx.conversation() {
        Some(conversation) => out.with_note(format!(
            "context {} turn {}",
            conversation.context_id, conversation.turn_count
        )),
        None => out.with_note("reply carried no context id"),
    }
}

pub fn chat_send() -> Step {
    Step::new("chat message", |env, ctx| {
        chat(
            env,
            ctx,
            "Hello! What are the restrictions on merging the kitchen with the living room?",
        )
    })
}

pub fn chat_follow_up() -> Step {
    Step::new("chat follow-up", |env, ctx| {
        chat(env, ctx, "And if the kitchen has a gas stove, what are the options?")
    })
    .requires(NO_CONVERSATION, |ctx| ctx.conversation().is_some())
}

pub fn chat_history() -> Step {
    Step::new("chat history", |env, _| {
        let request = ApiRequest::get("/ai/chat/history").query("limit", "50");
        count_items(&env.call(request, &Expect::ok()), "message")
    })
}

pub fn chat_clear() -> Step {
    Step::new("clear chat history", |env, ctx| {
        let rec = env.call(ApiRequest::delete("/ai/chat/history"), &Expect::ok().or(204));
        if rec.passed() {
            ctx.clear_conversation();
        }
        StepOutput::from_recorded(&rec)
    })
}

// ===== AI context =====

pub fn ai_context_get() -> Step {
    Step::new("get AI context", |env, ctx| {
        let mut request = ApiRequest::get("/ai/context").query("scene_id", id(&ctx.scene_id));
        if let Some(branch_id) = &ctx.branch_id {
            request = request.query("branch_id", branch_id.as_str());
        }
        StepOutput::from_recorded(&env.call(request, &Expect::ok()))
    })
    .requires(NO_SCENE, has_scene)
}

pub fn ai_context_update() -> Step {
    Step::new("update AI context", |env, ctx| {
        let mut body = ctx.scene_scope();
        body.insert("force".into(), json!(true));
        let request = ApiRequest::post("/ai/context").json(Value::Object(body));
        StepOutput::from_recorded(&env.call(request, &Expect::ok()))
    })
    .requires(NO_SCENE, has_scene)
}

// ===== Compliance =====

pub fn compliance_check() -> Step {
    Step::new("compliance check", |env, ctx| {
        let request = ApiRequest::post("/compliance/check").json(Value::Object(ctx.scene_scope()));
        let rec = env.call(request, &Expect::ok());
        let out = StepOutput::from_recorded(&rec);
        match rec.payload().filter(|_| rec.passed()) {
            Some(report) => {
                let compliant = report.get("compliant").and_then(Value::as_bool).unwrap_or(false);
                let violations = report
                    .get("violations")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                out.with_note(format!("compliant {}, {} violation(s)", compliant, violations))
            }
            None => out,
        }
    })
    .requires(NO_SCENE, has_scene)
}

pub fn compliance_rules() -> Step {
    Step::new("compliance rules", |env, _| {
        count_items(&env.call(ApiRequest::get("/compliance/rules"), &Expect::ok()), "rule")
    })
}

// ===== Branches =====

pub fn branch_list() -> Step {
    Step::new("list branches", |env, ctx| {
        let path = format!("/scenes/{}/branches", id(&ctx.scene_id));
        count_items(&env.call(ApiRequest::get(path), &Expect::ok()), "branch")
    })
    .requires(NO_SCENE, has_scene)
}

pub fn branch_create() -> Step {
    Step::new("create branch", |env, ctx| {
        let path = format!("/scenes/{}/branches", id(&ctx.scene_id));
        let request = ApiRequest::post(path).json(json!({
            "name": "Probe branch",
            "description": "Branch created by the API probe",
        }));
        let rec = env.call(request, &Expect::created().or(200));
        capture_id(&rec, &mut ctx.branch_id)
    })
    .requires(NO_SCENE, has_scene)
}

// ===== Expert requests =====

pub fn request_create() -> Step {
    Step::new("create expert request", |env, ctx| {
        let request = ApiRequest::post("/requests").json(json!({
            "workspace_id": id(&ctx.workspace_id),
            "title": "Kitchen replanning consultation",
            "description": "Need advice on merging the kitchen with the living room",
            "category": "consultation",
            "priority": "normal",
            "contact": {
                "name": ctx.credentials.name,
                "phone": "+7 999 123 4567",
                "email": ctx.credentials.email,
            },
        }));
        let rec = env.call(request, &Expect::created().or(200));
        capture_id(&rec, &mut ctx.request_id)
    })
    .requires(NO_WORKSPACE, has_workspace)
}

pub fn request_list() -> Step {
    Step::new("list expert requests", |env, _| {
        count_items(&env.call(ApiRequest::get("/requests"), &Expect::ok()), "request")
    })
}

// ===== Notifications =====

pub fn notifications_list() -> Step {
    Step::new("list notifications", |env, _| {
        count_items(&env.call(ApiRequest::get("/notifications"), &Expect::ok()), "notification")
    })
}

pub fn notifications_count() -> Step {
    Step::new("count unread notifications", |env, _| {
        let rec = env.call(ApiRequest::get("/notifications/count"), &Expect::ok());
        let out = StepOutput::from_recorded(&rec);
        match rec
            .payload()
            .and_then(|p| p.get("count").or_else(|| p.get("unread")))
            .and_then(Value::as_u64)
        {
            Some(count) => out.with_note(format!("{} unread", count)),
            None => out,
        }
    })
}

pub fn notifications_read_all() -> Step {
    Step::new("mark notifications read", |env, _| {
        let rec = env.call(ApiRequest::post("/notifications/read-all"), &Expect::ok().or(204));
        StepOutput::from_recorded(&rec)
    })
}
