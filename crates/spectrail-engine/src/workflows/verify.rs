//! `verify_task`: pre-run the requested checks, seed their output into the
//! conversation, then drive the agent to a verification report.

use crate::agent;
use crate::llm::client::ChatCompletion;
use crate::llm::prompts::{self, VerifyContext};
use crate::tools::registry::{ToolExecutor, ToolId};
use crate::workflows::{provider_from_settings, run_metadata};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use spectrail_core::{ArtifactKind, Id, RunType, WorkbenchError};
use spectrail_store::Store;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOptions {
    #[serde(default = "default_true")]
    pub run_tests: bool,
    #[serde(default)]
    pub run_lint: bool,
    #[serde(default)]
    pub run_build: bool,
    #[serde(default)]
    pub staged: bool,
}

fn default_true() -> bool {
    true
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            run_tests: true,
            run_lint: false,
            run_build: false,
            staged: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RanChecks {
    pub tests: bool,
    pub lint: bool,
    pub build: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub run_id: Id,
    pub report_md: String,
    pub ran_checks: RanChecks,
    pub truncated: bool,
}

pub async fn verify_task(
    store: &Store,
    project_id: &str,
    task_id: &str,
    options: VerifyOptions,
) -> Result<VerifyOutcome, WorkbenchError> {
    let provider = provider_from_settings(store)?;
    verify_task_with(&provider, store, project_id, task_id, options).await
}

pub async fn verify_task_with<P: ChatCompletion>(
    provider: &P,
    store: &Store,
    project_id: &str,
    task_id: &str,
    options: VerifyOptions,
) -> Result<VerifyOutcome, WorkbenchError> {
    let task = store.get_task(task_id)?;
    let project = store.get_project(project_id)?;
    if task.project_id != project.id {
        return Err(WorkbenchError::NotFound(format!(
            "task {task_id} does not belong to project {project_id}"
        )));
    }
    store.touch_project(project_id)?;

    let (provider_name, model) = run_metadata(store)?;
    let run = store.open_run(task_id, RunType::Verify, &provider_name, &model)?;
    info!(run_id = %run.id, task_id, "verify run started");

    let outcome = run_verify(provider, store, &run.id, project_id, &task, &project, &options).await;

    match outcome {
        Ok((report_md, ran_checks, truncated)) => {
            store.upsert_artifact(task_id, ArtifactKind::VerificationReport, &report_md)?;
            store.close_run(&run.id)?;
            info!(run_id = %run.id, "verify run finished");
            Ok(VerifyOutcome {
                run_id: run.id,
                report_md,
                ran_checks,
                truncated,
            })
        }
        Err(err) => {
            let _ = store.close_run(&run.id);
            Err(err)
        }
    }
}

async fn run_verify<P: ChatCompletion>(
    provider: &P,
    store: &Store,
    run_id: &str,
    project_id: &str,
    task: &spectrail_core::Task,
    project: &spectrail_core::Project,
    options: &VerifyOptions,
) -> Result<(String, RanChecks, bool), WorkbenchError> {
    let executor = ToolExecutor::new(Path::new(&project.repo_path))
        .map_err(|err| WorkbenchError::RepoUnavailable(err.to_string()))?;

    let git_status = prerun(store, &executor, run_id, project_id, ToolId::GitStatus, json!({})).await?;
    let git_diff = prerun(
        store,
        &executor,
        run_id,
        project_id,
        ToolId::GitDiff,
        json!({ "staged": options.staged }),
    )
    .await?;

    let mut ran_checks = RanChecks {
        tests: false,
        lint: false,
        build: false,
    };
    let mut test_output = None;
    let mut lint_output = None;
    let mut build_output = None;

    if options.run_tests {
        test_output = Some(
            prerun(store, &executor, run_id, project_id, ToolId::RunCommand, json!({ "kind": "tests" }))
                .await?,
        );
        ran_checks.tests = true;
    }
    if options.run_lint {
        lint_output = Some(
            prerun(store, &executor, run_id, project_id, ToolId::RunCommand, json!({ "kind": "lint" }))
                .await?,
        );
        ran_checks.lint = true;
    }
    if options.run_build {
        build_output = Some(
            prerun(store, &executor, run_id, project_id, ToolId::RunCommand, json!({ "kind": "build" }))
                .await?,
        );
        ran_checks.build = true;
    }

    let plan_md = store
        .latest_artifact(&task.id, ArtifactKind::PlanMd)?
        .map(|artifact| artifact.content);

    let ctx = VerifyContext {
        plan_md,
        git_status,
        git_diff,
        staged: options.staged,
        test_output,
        lint_output,
        build_output,
    };
    let (seed, seed_truncated) = prompts::verify_messages(task, project, &ctx);

    let outcome = agent::drive(provider, &executor, store, run_id, project_id, seed).await?;
    Ok((
        outcome.final_content,
        ran_checks,
        seed_truncated || outcome.truncated,
    ))
}

/// Execute one pre-run check through the normal tool path, recording the
/// tool-call row on the run. Tool failures become error payloads in the
/// seeded context, exactly as they would inside the loop; only a vanished
/// repository aborts.
async fn prerun(
    store: &Store,
    executor: &ToolExecutor,
    run_id: &str,
    project_id: &str,
    tool: ToolId,
    mut args: Value,
) -> Result<String, WorkbenchError> {
    if let Some(object) = args.as_object_mut() {
        object.insert("project_id".to_string(), json!(project_id));
    }
    let result = match executor.execute(tool.name(), &args).await {
        Ok(value) => value,
        Err(err) if err.is_fatal() => {
            return Err(WorkbenchError::RepoUnavailable(err.to_string()))
        }
        Err(err) => err.to_payload(),
    };
    let result_json = result.to_string();
    store.append_tool_call(run_id, tool.name(), &args.to_string(), &result_json)?;
    Ok(result_json)
}
