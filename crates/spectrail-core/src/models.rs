//! Row types for the persisted entities and the closed string sets they use.
//!
//! Rows keep their enum-ish columns as plain `String`s so they round-trip the
//! database without lossy conversions; the enums below are the single source
//! of truth for the accepted values and are used wherever the engine needs to
//! reason about them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

/// Fresh UUIDv4 identifier, stored as TEXT.
pub fn new_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Current UTC time as an ISO-8601 / RFC 3339 string.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub name: String,
    pub repo_path: String,
    pub created_at: String,
    pub last_opened_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Id,
    pub project_id: Id,
    pub title: String,
    /// One of `plan | phases | review`.
    pub mode: String,
    /// One of `draft | active | done | archived`.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Id,
    pub task_id: Id,
    pub phase_id: Option<Id>,
    pub run_type: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

impl Run {
    /// A run is open until `ended_at` is set; appends are only legal while open.
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub run_id: Id,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRow {
    pub id: Id,
    pub run_id: Id,
    pub name: String,
    pub args_json: String,
    pub result_json: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Id,
    pub task_id: Id,
    pub phase_id: Option<Id>,
    pub kind: String,
    pub content: String,
    pub created_at: String,
    pub pinned: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsKV {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

/// What kind of agent run this is. The core only opens `Plan` and `Verify`
/// runs; the remaining variants exist for the host shell's workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Plan,
    Verify,
    Handoff,
    Review,
    Phases,
    Test,
}

impl RunType {
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Plan => "plan",
            RunType::Verify => "verify",
            RunType::Handoff => "handoff",
            RunType::Review => "review",
            RunType::Phases => "phases",
            RunType::Test => "test",
        }
    }
}

/// Chat roles as they appear in the provider transcript and the messages table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// Artifact kinds. Upserts are keyed by `(task_id, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    PlanMd,
    PhaseList,
    VerificationReport,
    HandoffPrompt,
    Notes,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::PlanMd => "plan_md",
            ArtifactKind::PhaseList => "phase_list",
            ArtifactKind::VerificationReport => "verification_report",
            ArtifactKind::HandoffPrompt => "handoff_prompt",
            ArtifactKind::Notes => "notes",
        }
    }
}
