//! Domain models and the caller-facing error taxonomy for SpecTrail.
//!
//! This crate is deliberately small: it holds the row types shared by the
//! store and the engine, the id/timestamp helpers, and the typed errors a
//! workflow surfaces to its host. Nothing here performs I/O.

pub mod error;
pub mod models;

pub use error::{ErrorEnvelope, WorkbenchError};
pub use models::{
    new_id, now_iso, Artifact, ArtifactKind, Id, Message, Project, Role, Run, RunType, SettingsKV,
    Task, ToolCallRow,
};
