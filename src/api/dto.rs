//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use crate::aggregate::CategoryShare;
use crate::replay::Standing;
use serde::{Deserialize, Serialize};

// ============================================
// CHART DTOs
// ============================================

/// Category breakdown for one country
#[derive(Debug, Serialize)]
pub struct CountryResponse {
    pub country: String,
    pub total: u64,
    pub categories: Vec<CategoryShare>,
}

/// Selection request, as sent when a country is clicked
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub country: String,
}

/// Selection accepted for processing
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionResponse {
    /// Status: "accepted"
    pub status: String,
    pub country: String,
}

// ============================================
// REPLAY DTOs
// ============================================

/// Replay (re)started
#[derive(Debug, Serialize, Deserialize)]
pub struct RestartResponse {
    pub run: u64,
    pub dates: usize,
    pub interval_ms: u64,
}

/// Final medal table
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalTableResponse {
    pub countries: usize,
    pub table: Vec<Standing>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// Countries in the athlete data
    pub countries: usize,
    /// Distinct replay dates
    pub replay_dates: usize,
    /// Open WebSocket connections
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
