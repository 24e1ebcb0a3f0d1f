//! schemes_get / schemes_set tool implementations.

use offcache_core::SchemeRegistry;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the schemes_set tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemesSetParams {
    /// The complete new set of intercepted schemes. An empty list disables interception.
    pub schemes: Vec<String>,
}

/// Output from both scheme tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemesOutput {
    pub schemes: Vec<String>,
}

fn snapshot(registry: &SchemeRegistry) -> SchemesOutput {
    SchemesOutput { schemes: registry.supported_schemes().iter().cloned().collect() }
}

pub fn get_impl(registry: &SchemeRegistry) -> Result<CallToolResult, McpError> {
    json_result(&snapshot(registry))
}

/// Replace the registered schemes; takes effect for the next request.
pub fn set_impl(registry: &SchemeRegistry, params: SchemesSetParams) -> Result<CallToolResult, McpError> {
    registry.set_supported_schemes(&params.schemes);
    tracing::info!(schemes = ?params.schemes, "updated supported schemes");
    json_result(&snapshot(registry))
}
