use serde::Serialize;
use uuid::Uuid;

use crate::models::{Signal, SignalKind};

#[derive(Debug, Clone, Serialize)]
pub struct SignalUserResponse {
    pub github_username: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalResponse {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    /// ISO-8601 calendar date.
    pub date: String,
    pub users: Vec<SignalUserResponse>,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalsListResponse {
    pub signals: Vec<SignalResponse>,
}

impl From<&Signal> for SignalResponse {
    fn from(signal: &Signal) -> Self {
        Self {
            kind: signal.kind,
            date: signal.date.format("%Y-%m-%d").to_string(),
            users: signal
                .peers
                .iter()
                .map(|peer| SignalUserResponse {
                    github_username: peer.name.clone(),
                    avatar_url: peer.avatar_url.clone(),
                })
                .collect(),
            detail: signal.detail.clone(),
            circle_id: signal.group_id,
            circle_name: signal.group_name.clone(),
        }
    }
}

impl From<&[Signal]> for SignalsListResponse {
    fn from(signals: &[Signal]) -> Self {
        Self {
            signals: signals.iter().map(SignalResponse::from).collect(),
        }
    }
}
