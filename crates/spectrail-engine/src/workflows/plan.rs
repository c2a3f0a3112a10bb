//! `generate_plan`: drive the agent over the repository and store the plan.

use crate::agent;
use crate::llm::client::ChatCompletion;
use crate::llm::prompts;
use crate::tools::registry::ToolExecutor;
use crate::workflows::{provider_from_settings, run_metadata};
use serde::Serialize;
use spectrail_core::{ArtifactKind, Id, RunType, WorkbenchError};
use spectrail_store::Store;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub run_id: Id,
    pub plan_md: String,
    pub tool_calls_count: usize,
    pub truncated: bool,
}

/// Entry point for the host shell: builds the HTTP provider from settings.
pub async fn generate_plan(
    store: &Store,
    project_id: &str,
    task_id: &str,
) -> Result<PlanOutcome, WorkbenchError> {
    let provider = provider_from_settings(store)?;
    generate_plan_with(&provider, store, project_id, task_id).await
}

/// Same flow with an injected provider; tests script turns through this.
pub async fn generate_plan_with<P: ChatCompletion>(
    provider: &P,
    store: &Store,
    project_id: &str,
    task_id: &str,
) -> Result<PlanOutcome, WorkbenchError> {
    let task = store.get_task(task_id)?;
    let project = store.get_project(project_id)?;
    if task.project_id != project.id {
        return Err(WorkbenchError::NotFound(format!(
            "task {task_id} does not belong to project {project_id}"
        )));
    }
    store.touch_project(project_id)?;

    let (provider_name, model) = run_metadata(store)?;
    let run = store.open_run(task_id, RunType::Plan, &provider_name, &model)?;
    info!(run_id = %run.id, task_id, "plan run started");

    let outcome = async {
        let executor = ToolExecutor::new(Path::new(&project.repo_path))
            .map_err(|err| WorkbenchError::RepoUnavailable(err.to_string()))?;
        let seed = prompts::plan_messages(&task, &project);
        agent::drive(provider, &executor, store, &run.id, project_id, seed).await
    }
    .await;

    match outcome {
        Ok(outcome) => {
            store.upsert_artifact(task_id, ArtifactKind::PlanMd, &outcome.final_content)?;
            store.close_run(&run.id)?;
            info!(run_id = %run.id, tool_calls = outcome.tool_calls_count, "plan run finished");
            Ok(PlanOutcome {
                run_id: run.id,
                plan_md: outcome.final_content,
                tool_calls_count: outcome.tool_calls_count,
                truncated: outcome.truncated,
            })
        }
        Err(err) => {
            // Close the run but keep the partial transcript for inspection.
            let _ = store.close_run(&run.id);
            Err(err)
        }
    }
}
