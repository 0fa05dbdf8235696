//! Supervisor health probe and the pure mapping from probe outcome to state.

use std::time::Duration;

use serde::Deserialize;

use crate::state::{HealthState, HealthStatus};

/// What came back from the endpoint, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResponse {
    /// 2xx with a body.
    Body(String),
    /// Reachable, but answered with a non-success status.
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Timeout,
    Transport(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Timeout => write!(f, "timed out"),
            ProbeError::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

pub trait HealthProbe {
    fn fetch(&mut self, token: &str) -> Result<ProbeResponse, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct InfoDocument {
    data: Option<InfoData>,
}

#[derive(Debug, Deserialize)]
struct InfoData {
    state: Option<String>,
    version: Option<String>,
}

/// Map a probe outcome to a health status.
///
/// Transport failures and bodies that are not the expected JSON object are
/// `error`; a reachable endpoint with a non-success status or without
/// `data.state` is `unknown`.
pub fn classify(outcome: Result<ProbeResponse, ProbeError>) -> HealthStatus {
    match outcome {
        Ok(ProbeResponse::Body(body)) => match serde_json::from_str::<InfoDocument>(&body) {
            Ok(doc) => {
                let data = doc.data;
                let version = data.as_ref().and_then(|d| d.version.clone());
                let state = data
                    .and_then(|d| d.state)
                    .map(|s| HealthState::from_reported(&s))
                    .unwrap_or(HealthState::Unknown);
                HealthStatus { state, version }
            }
            Err(_) => HealthStatus::new(HealthState::Error),
        },
        Ok(ProbeResponse::Status(_)) => HealthStatus::new(HealthState::Unknown),
        Err(_) => HealthStatus::new(HealthState::Error),
    }
}

/// Blocking GET against the supervisor `info` endpoint with a hard timeout.
pub struct SupervisorProbe {
    agent: ureq::Agent,
    url: String,
}

impl SupervisorProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl HealthProbe for SupervisorProbe {
    fn fetch(&mut self, token: &str) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .agent
            .get(&self.url)
            .set("Authorization", &format!("Bearer {token}"))
            .call();
        match response {
            Ok(resp) => resp
                .into_string()
                .map(ProbeResponse::Body)
                .map_err(|err| map_io_err(&err)),
            Err(ureq::Error::Status(code, _)) => Ok(ProbeResponse::Status(code)),
            Err(ureq::Error::Transport(transport)) => Err(map_transport(&transport)),
        }
    }
}

fn map_transport(transport: &ureq::Transport) -> ProbeError {
    let io = std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<std::io::Error>());
    match io {
        Some(err) => map_io_err(err),
        None => ProbeError::Transport(transport.to_string()),
    }
}

fn map_io_err(err: &std::io::Error) -> ProbeError {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ProbeError::Timeout,
        _ => ProbeError::Transport(err.to_string()),
    }
}
