//! Shared request/response types for daemon IPC.
//!
//! These types are serialized as JSON over the Unix domain socket
//! transport. Both the IPC server (daemon) and client (CLI) use them.

use serde::{Deserialize, Serialize};

/// Daemon health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_profile: String,
}

/// Daemon runtime status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub git_hash: String,
    pub uptime_secs: u64,
    pub pid: u32,
    pub config_version: u64,
    pub target: String,
    pub interval: u64,
    pub tomorrow_reset: bool,
    pub contacts: usize,
    pub keywords: usize,
    pub reply_count: u64,
    /// RFC 3339, local offset.
    pub last_event_time: String,
    pub subscribers: usize,
}

/// Daemon shutdown response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub acknowledged: bool,
    pub message: String,
}

/// Configuration response (serialized TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub toml: String,
}

/// Result of committing new reply settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub version: u64,
    pub contacts: usize,
    pub keywords: usize,
}

/// Generic error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
