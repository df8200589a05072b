//! Wire types — JSON request/response payloads shared across services

use crate::store::EventRecord;
use serde::{Deserialize, Serialize};

/// POST /events/create request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub date: String,
}

/// POST /events/create response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventResponse {
    /// Generated row id, rendered as a string
    pub id: String,
}

/// POST /events/update request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
}

/// POST /events/update response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventResponse {
    pub success: bool,
}

/// GET /events response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventsResponse {
    pub events: Vec<EventRecord>,
}

/// POST /notify request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub user_id: String,
    pub message: String,
}

/// POST /notify response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub success: bool,
}

/// GET /status response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Standard failure payload: a status code plus message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
