//! Engine for the SpecTrail workbench core.
//!
//! Three layers, leaf first:
//! - `tools`: sandboxed repository introspection (path guard, output bounds,
//!   process runner, the seven repo tools, and the registry that exposes them
//!   to a model as callable functions);
//! - `llm`: the OpenAI-compatible chat provider and the prompt builders;
//! - `agent` + `workflows`: the bounded tool-calling loop and the
//!   `generate_plan` / `verify_task` entry points the host shell calls.
//!
//! The agent loop depends only on the `ChatCompletion` trait, the tool
//! executor, and the store's run-log surface — never on the workflows above
//! it, which keeps provider stubs trivial to inject in tests.

pub mod agent;
pub mod llm;
pub mod tools;
pub mod workflows;

pub use agent::LoopOutcome;
pub use llm::client::{ChatCompletion, HttpProvider};
pub use llm::config::ProviderConfig;
pub use tools::registry::{tool_schemas, ToolExecutor, ToolId};
pub use workflows::plan::{generate_plan, generate_plan_with, PlanOutcome};
pub use workflows::verify::{verify_task, verify_task_with, RanChecks, VerifyOptions, VerifyOutcome};
