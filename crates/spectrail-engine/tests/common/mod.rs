//! Shared fixtures for the workflow integration tests.
//!
//! Each integration test binary compiles its own copy of this module, so not
//! every helper is used from every binary.
#![allow(dead_code)]

use spectrail_core::WorkbenchError;
use spectrail_engine::llm::client::ChatCompletion;
use spectrail_engine::llm::types::{AssistantTurn, ChatMessage, FunctionCallMessage, ToolCallMessage};
use spectrail_store::Store;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// A provider that replays a fixed script of assistant turns and records what
/// it observed. When the script runs dry it either repeats the last turn
/// (`repeat_last`) or fails the test.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<AssistantTurn>>,
    repeat_last: Option<AssistantTurn>,
    pub observed_context_chars: Mutex<Vec<usize>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<AssistantTurn>) -> Self {
        ScriptedProvider {
            turns: Mutex::new(turns.into()),
            repeat_last: None,
            observed_context_chars: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(turn: AssistantTurn) -> Self {
        ScriptedProvider {
            turns: Mutex::new(VecDeque::new()),
            repeat_last: Some(turn),
            observed_context_chars: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.observed_context_chars.lock().unwrap().len()
    }
}

impl ChatCompletion for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[serde_json::Value],
    ) -> Result<AssistantTurn, WorkbenchError> {
        let context: usize = messages.iter().map(ChatMessage::content_chars).sum();
        self.observed_context_chars.lock().unwrap().push(context);

        let scripted = self.turns.lock().unwrap().pop_front();
        match scripted.or_else(|| self.repeat_last.clone()) {
            Some(turn) => Ok(turn),
            None => panic!("provider script exhausted after {} calls", self.calls()),
        }
    }
}

pub fn tool_turn(call_id: &str, name: &str, arguments: &str) -> AssistantTurn {
    AssistantTurn {
        content: None,
        tool_calls: vec![ToolCallMessage {
            id: call_id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCallMessage {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }],
    }
}

pub fn final_turn(content: &str) -> AssistantTurn {
    AssistantTurn {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
    }
}

/// A repository with a single `README.md`.
pub fn repo_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("README.md"), "hello").unwrap();
    tmp
}

/// In-memory store with one project over `repo` and one plan-mode task.
pub fn store_with_task(repo: &Path, title: &str) -> (Store, String, String) {
    let store = Store::open_in_memory().unwrap();
    let project = store
        .create_project("fixture", &repo.to_string_lossy())
        .unwrap();
    let task = store.create_task(&project.id, title, "plan").unwrap();
    (store, project.id, task.id)
}

/// Initialise a git repository with one commit; `None` when git is missing.
pub fn init_git_repo(dir: &Path) -> Option<()> {
    let run = |args: &[&str]| {
        std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .output()
            .ok()
    };
    run(&["init", "-q"])?;
    run(&["add", "."])?;
    let commit = run(&["commit", "-q", "-m", "initial"])?;
    commit.status.success().then_some(())
}
