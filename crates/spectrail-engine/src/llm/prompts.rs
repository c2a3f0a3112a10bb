//! Prompt builders for the plan and verify workflows.
//!
//! Each mode produces the opening system+user pair. The system prompts pin
//! the exact Markdown layout of the final artifact so downstream rendering
//! can rely on the section structure.

use crate::llm::types::ChatMessage;
use crate::tools::bound::bound_str;
use spectrail_core::{Project, Task};

/// Byte caps applied to material interpolated into the verify user message.
const PLAN_CONTEXT_CAP: usize = 5_000;
const DIFF_CONTEXT_CAP: usize = 30_000;
const TEST_OUTPUT_CAP: usize = 10_000;
const CHECK_OUTPUT_CAP: usize = 5_000;
const USER_MESSAGE_CAP: usize = 100_000;

pub const PLAN_SYSTEM_PROMPT: &str = r#"You are a senior technical lead creating detailed implementation plans.

Your task: explore the codebase with the provided tools, then produce a comprehensive implementation plan.

Required output format (Markdown):

# Implementation Plan: [Title]

## 1. Summary
Brief overview of the approach (2-3 sentences).

## 2. Goals & Non-Goals
**Goals:**
- What this implementation achieves

**Non-Goals:**
- What is explicitly out of scope

## 3. Repo Context Assumptions
- Key files/modules that exist
- Dependencies to leverage

## 4. File-by-File Changes
For each file to modify/create:
- **Path**: relative path
- **Purpose**: what this file does
- **Key Changes**: specific modifications

## 5. Step-by-Step Implementation Checklist
- [ ] Step 1: ...
- [ ] Step 2: ...
(Ordered by dependency, earliest first)

## 6. Risks + Mitigations
| Risk | Mitigation |
|------|------------|
| Risk description | How to address it |

## 7. Validation Steps
- [ ] Tests: `run_command` with kind="tests"
- [ ] Lint: `run_command` with kind="lint"
- [ ] Build: `run_command` with kind="build"

---

Instructions:
1. Use the provided tools to explore the codebase before writing the plan
2. Call `list_files` to understand the project structure
3. Call `read_file` to examine key files
4. Call `grep` to find relevant code patterns
5. Call `git_status` and `git_diff` to see current state
6. Only write the plan after gathering sufficient context
7. When complete, output ONLY the plan in the format above (no tool calls in the final output)"#;

pub const VERIFY_SYSTEM_PROMPT: &str = r#"You are a senior code reviewer verifying repository changes against their plan.

Your task: compare the actual changes against the implementation plan (if provided) and produce a verification report.

Required output format (Markdown):

# Verification Report

## 1. Compliance
How the changes line up with the plan: what was implemented correctly, what is missing or incomplete, and what diverged. If no plan was provided, state "No plan provided - general review" and describe what changed.

## 2. Risk
| Risk | Severity | Notes |
|------|----------|-------|
| e.g., Breaking change | High/Med/Low | Explanation |

## 3. Quality
Code quality observations: correctness, tests, structure, naming, error handling. Summarize test/lint/build results when available.

## 4. Recommendations
- [ ] Specific action item
- [ ] Another action item

---

Instructions:
- Be objective and thorough
- Cite specific files/paths when discussing changes
- Use the provided tools if you need more context than the diff shows
- Keep every section, even when it is a single line"#;

pub fn plan_messages(task: &Task, project: &Project) -> Vec<ChatMessage> {
    let user = format!(
        "Task: {title}\n\n\
         Repository: {repo_path}\n\n\
         Please explore this codebase and create a detailed implementation plan.\n\n\
         Start by listing files to understand the project structure, then read key files \
         to understand the codebase before writing your plan.",
        title = task.title,
        repo_path = project.repo_path,
    );
    vec![
        ChatMessage::system(PLAN_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}

/// Inputs gathered by the facade before the verify run starts.
#[derive(Debug, Default)]
pub struct VerifyContext {
    pub plan_md: Option<String>,
    pub git_status: String,
    pub git_diff: String,
    pub staged: bool,
    pub test_output: Option<String>,
    pub lint_output: Option<String>,
    pub build_output: Option<String>,
}

/// Build the verify seed messages. The bool reports whether any interpolated
/// input had to be clipped.
pub fn verify_messages(task: &Task, project: &Project, ctx: &VerifyContext) -> (Vec<ChatMessage>, bool) {
    let mut truncated = false;
    let mut clipped = |raw: &str, cap: usize| -> String {
        let bounded = bound_str(raw, cap);
        truncated |= bounded.truncated;
        bounded.text
    };

    let mut user = format!(
        "Task: {title}\n\nRepository: {repo_path}\n\n",
        title = task.title,
        repo_path = project.repo_path,
    );

    match ctx.plan_md.as_deref() {
        Some(plan) => {
            user.push_str("## Implementation Plan\n\n");
            user.push_str(&clipped(plan, PLAN_CONTEXT_CAP));
            user.push_str("\n\n---\n\n");
        }
        None => {
            user.push_str("*No implementation plan provided. Conducting general code review.*\n\n");
        }
    }

    user.push_str("## Repository State\n\n");
    user.push_str(&format!(
        "### Git Status\n```\n{}\n```\n\n",
        clipped(&ctx.git_status, CHECK_OUTPUT_CAP)
    ));

    let diff_label = if ctx.staged { "Staged Changes" } else { "Unstaged Changes" };
    user.push_str(&format!(
        "### {diff_label}\n```diff\n{}\n```\n\n",
        clipped(&ctx.git_diff, DIFF_CONTEXT_CAP)
    ));

    if let Some(output) = ctx.test_output.as_deref() {
        user.push_str(&format!(
            "### Test Results\n```\n{}\n```\n\n",
            clipped(output, TEST_OUTPUT_CAP)
        ));
    }
    if let Some(output) = ctx.lint_output.as_deref() {
        user.push_str(&format!(
            "### Lint Results\n```\n{}\n```\n\n",
            clipped(output, CHECK_OUTPUT_CAP)
        ));
    }
    if let Some(output) = ctx.build_output.as_deref() {
        user.push_str(&format!(
            "### Build Results\n```\n{}\n```\n\n",
            clipped(output, CHECK_OUTPUT_CAP)
        ));
    }

    if truncated {
        user.push_str("*Note: some inputs were truncated due to size limits.*\n");
    }

    let bounded = bound_str(&user, USER_MESSAGE_CAP);
    if bounded.truncated {
        truncated = true;
        user = format!("{}\n\n[Content truncated due to size limits]", bounded.text);
    }

    (
        vec![ChatMessage::system(VERIFY_SYSTEM_PROMPT), ChatMessage::user(user)],
        truncated,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrail_core::{new_id, now_iso};

    fn fixtures() -> (Task, Project) {
        let stamp = now_iso();
        let project = Project {
            id: new_id(),
            name: "demo".into(),
            repo_path: "/home/dev/demo".into(),
            created_at: stamp.clone(),
            last_opened_at: None,
        };
        let task = Task {
            id: new_id(),
            project_id: project.id.clone(),
            title: "Add config reload".into(),
            mode: "plan".into(),
            status: "active".into(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        (task, project)
    }

    #[test]
    fn plan_seed_interpolates_task_and_repo() {
        let (task, project) = fixtures();
        let messages = plan_messages(&task, &project);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        let user = messages[1].content.as_deref().unwrap();
        assert!(user.contains("Add config reload"));
        assert!(user.contains("/home/dev/demo"));
    }

    #[test]
    fn plan_system_prompt_names_all_seven_sections() {
        for section in [
            "## 1. Summary",
            "## 2. Goals & Non-Goals",
            "## 3. Repo Context Assumptions",
            "## 4. File-by-File Changes",
            "## 5. Step-by-Step Implementation Checklist",
            "## 6. Risks + Mitigations",
            "## 7. Validation Steps",
        ] {
            assert!(PLAN_SYSTEM_PROMPT.contains(section), "missing {section}");
        }
    }

    #[test]
    fn verify_system_prompt_names_all_four_sections() {
        for section in [
            "## 1. Compliance",
            "## 2. Risk",
            "## 3. Quality",
            "## 4. Recommendations",
        ] {
            assert!(VERIFY_SYSTEM_PROMPT.contains(section), "missing {section}");
        }
    }

    #[test]
    fn verify_seed_embeds_diff_and_checks() {
        let (task, project) = fixtures();
        let ctx = VerifyContext {
            plan_md: Some("# Plan".into()),
            git_status: "## main".into(),
            git_diff: "+added line".into(),
            staged: false,
            test_output: Some("2 passed".into()),
            lint_output: None,
            build_output: None,
        };
        let (messages, truncated) = verify_messages(&task, &project, &ctx);
        let user = messages[1].content.as_deref().unwrap();
        assert!(user.contains("# Plan"));
        assert!(user.contains("+added line"));
        assert!(user.contains("Unstaged Changes"));
        assert!(user.contains("2 passed"));
        assert!(!user.contains("Lint Results"));
        assert!(!truncated);
    }

    #[test]
    fn oversized_diff_sets_truncated() {
        let (task, project) = fixtures();
        let ctx = VerifyContext {
            git_diff: "x".repeat(40_000),
            ..Default::default()
        };
        let (messages, truncated) = verify_messages(&task, &project, &ctx);
        assert!(truncated);
        let user = messages[1].content.as_deref().unwrap();
        assert!(user.contains("truncated due to size limits"));
    }

    #[test]
    fn staged_flag_changes_diff_label() {
        let (task, project) = fixtures();
        let ctx = VerifyContext {
            staged: true,
            ..Default::default()
        };
        let (messages, _) = verify_messages(&task, &project, &ctx);
        assert!(messages[1]
            .content
            .as_deref()
            .unwrap()
            .contains("Staged Changes"));
    }
}
