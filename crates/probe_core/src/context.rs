//! State threaded between the steps of one scenario run.

use crate::envelope;
use crate::types::{ConversationContext, Credentials, JobHandle, JobKind};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// A floor-plan image loaded once per run.
///
/// `base64` is the encoded form sent to the recognition endpoint; `bytes`
/// back the multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub base64: String,
}

/// Identifiers and conversation state produced by earlier steps.
///
/// Owned by a single run and passed to each step body by `&mut`. Tokens live
/// in the run's `SessionManager`, not here.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub credentials: Credentials,
    pub image: Option<ImageAsset>,
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub floor_plan_id: Option<String>,
    pub scene_id: Option<String>,
    pub branch_id: Option<String>,
    pub request_id: Option<String>,
    /// Refresh token rotated out by a successful refresh; replayed to prove
    /// the server revoked it.
    pub retired_refresh_token: Option<String>,
    jobs: HashMap<JobKind, JobHandle>,
    conversation: Option<ConversationContext>,
}

impl ScenarioContext {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            image: None,
            user_id: None,
            workspace_id: None,
            floor_plan_id: None,
            scene_id: None,
            branch_id: None,
            request_id: None,
            retired_refresh_token: None,
            jobs: HashMap::new(),
            conversation: None,
        }
    }

    pub fn with_image(mut self, image: ImageAsset) -> Self {
        self.image = Some(image);
        self
    }

    pub fn job(&self, kind: JobKind) -> Option<&JobHandle> {
        self.jobs.get(&kind)
    }

    pub fn job_mut(&mut self, kind: JobKind) -> Option<&mut JobHandle> {
        self.jobs.get_mut(&kind)
    }

    /// Store a freshly submitted job, replacing any earlier one of that kind.
    pub fn set_job(&mut self, handle: JobHandle) {
        self.jobs.insert(handle.kind, handle);
    }

    /// Job id of the most recent submission of `kind`.
    pub fn job_id(&self, kind: JobKind) -> Option<&str> {
        self.jobs.get(&kind).map(|job| job.job_id.as_str())
    }

    pub fn conversation(&self) -> Option<&ConversationContext> {
        self.conversation.as_ref()
    }

    /// `scene_id` and `branch_id`, each present only when known.
    ///
    /// Scene-scoped calls (chat, AI context, compliance) address the branch
    /// once one has been created.
    pub fn scene_scope(&self) -> Map<String, Value> {
        let mut scope = Map::new();
        if let Some(scene_id) = &self.scene_id {
            scope.insert("scene_id".into(), json!(scene_id));
        }
        if let Some(branch_id) = &self.branch_id {
            scope.insert("branch_id".into(), json!(branch_id));
        }
        scope
    }

    /// Request body for `POST /ai/chat`.
    ///
    /// The current conversation id and scene scope are attached whenever
    /// known, so a follow-up continues the same thread without the step
    /// naming it.
    pub fn chat_payload(&self, message: &str) -> Value {
        let mut body = self.scene_scope();
        body.insert("message".into(), json!(message));
        if let Some(conversation) = &self.conversation {
            body.insert("context_id".into(), json!(conversation.context_id));
        }
        Value::Object(body)
    }

    /// Fold a chat reply payload into the conversation.
    ///
    /// The first reply carrying a `context_id` opens the conversation; later
    /// replies count turns against it. An established id is never replaced,
    /// even if the server echoes a different one.
    pub fn observe_chat_reply(&mut self, payload: &Value) {
        match &mut self.conversation {
            Some(conversation) => {
                conversation.turn_count += 1;
                if let Some(echoed) = envelope::str_field(payload, "context_id") {
                    if echoed != conversation.context_id {
                        debug!(
                            kept = %conversation.context_id,
                            echoed = %echoed,
                            "server echoed a different context id"
                        );
                    }
                }
            }
            None => {
                if let Some(context_id) = envelope::str_field(payload, "context_id") {
                    self.conversation = Some(ConversationContext {
                        context_id,
                        scene_id: self.scene_id.clone(),
                        turn_count: 1,
                    });
                }
            }
        }
    }

    pub fn clear_conversation(&mut self) {
        self.conversation = None;
    }
}
