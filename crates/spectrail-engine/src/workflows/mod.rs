//! Public entry points the host shell calls.

pub mod plan;
pub mod verify;

use crate::llm::config::ProviderConfig;
use crate::llm::HttpProvider;
use spectrail_core::WorkbenchError;
use spectrail_store::Store;

/// Snapshot settings, validate the provider configuration, and build the
/// HTTP provider. Called once per workflow invocation.
pub(crate) fn provider_from_settings(store: &Store) -> Result<HttpProvider, WorkbenchError> {
    let settings = store.all_settings()?;
    let config = ProviderConfig::from_settings(&settings)?;
    HttpProvider::new(config)
}

/// Run metadata recorded on the run row. Read leniently: stub-driven tests
/// have no credentials, and the run row only needs the names.
pub(crate) fn run_metadata(store: &Store) -> Result<(String, String), WorkbenchError> {
    let settings = store.all_settings()?;
    let provider = settings
        .get("provider_name")
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| crate::llm::config::DEFAULT_PROVIDER_NAME.to_string());
    let model = settings
        .get("model")
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| crate::llm::config::DEFAULT_MODEL.to_string());
    Ok((provider, model))
}
