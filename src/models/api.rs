use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;

/// Body the analytics agent expects on `POST /chat`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
}

/// Agent reply. `response` is either a plain string or a chart specification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub response: JsonValue,
}

/// Returned by the proxy when the agent answers with a non-success status.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProxyErrorBody {
    pub error: String,
}

/// Returned by the proxy with a 502 when the agent cannot be reached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProxyFallbackBody {
    pub response: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub upstream: String,
}
