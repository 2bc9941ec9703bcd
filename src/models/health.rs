use serde::Serialize;
use chrono::{DateTime, Utc};

/// Corps de GET /health; `degraded` quand la base ne répond pas
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok", time: Utc::now() }
    }

    pub fn degraded() -> Self {
        Self { status: "degraded", time: Utc::now() }
    }
}
