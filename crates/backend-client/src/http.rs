//! reqwest-backed implementation of the backend interface

use crate::{BackendError, Classifier, SessionKind, SessionLifecycle};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use detection::{AlarmSettings, DetectionResult, SessionId, StatsSnapshot};
use frame_source::EncodedFrame;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct StartSessionRequest {
    #[serde(rename = "type")]
    kind: SessionKind,
}

#[derive(Deserialize)]
struct StartSessionResponse {
    session_id: SessionId,
}

#[derive(Serialize)]
struct AnalyzeFrameRequest {
    session_id: SessionId,
    image_data: String,
}

#[derive(Deserialize)]
struct AnalyzeFrameResponse {
    #[serde(default)]
    detections: Vec<DetectionResult>,
}

#[derive(Serialize)]
struct EndSessionRequest {
    session_id: SessionId,
    jwt: String,
}

/// HTTP client for the detection backend
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    /// Create a client for the given API base URL and bearer token
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .header("x-request-id", Uuid::new_v4().to_string())
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl Classifier for HttpBackend {
    async fn classify(
        &self,
        session: &SessionId,
        frame: &EncodedFrame,
    ) -> Result<Vec<DetectionResult>, BackendError> {
        let request = AnalyzeFrameRequest {
            session_id: session.clone(),
            image_data: format!("data:image/jpeg;base64,{}", STANDARD.encode(&frame.jpeg)),
        };

        let response = self
            .post("/detection/analyze-frame")
            .json(&request)
            .send()
            .await?;
        let body: AnalyzeFrameResponse = Self::check(response).await?.json().await?;

        debug!(session = %session, detections = body.detections.len(), "frame classified");
        Ok(body.detections)
    }
}

impl SessionLifecycle for HttpBackend {
    async fn start_session(&self, kind: SessionKind) -> Result<SessionId, BackendError> {
        let response = self
            .post("/detection/start-session")
            .json(&StartSessionRequest { kind })
            .send()
            .await?;
        let body: StartSessionResponse = Self::check(response).await?.json().await?;

        debug!(session = %body.session_id, "session started");
        Ok(body.session_id)
    }

    async fn stop_session(&self, session: &SessionId) -> Result<(), BackendError> {
        let response = self
            .post(&format!("/detection/stop-session/{session}"))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_stats(
        &self,
        session: &SessionId,
        stats: StatsSnapshot,
    ) -> Result<(), BackendError> {
        let response = self
            .post(&format!("/detection/update-session/{session}"))
            .json(&stats)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn end_session_best_effort(&self, session: SessionId) {
        // Detached task with no result channel; the caller may be tearing
        // down and must not wait on the network.
        let backend = self.clone();
        tokio::spawn(async move {
            let request = EndSessionRequest {
                session_id: session.clone(),
                jwt: backend.token.clone(),
            };
            let sent = backend
                .post("/detection/end-session")
                .json(&request)
                .send()
                .await;

            match sent {
                Ok(response) if response.status().is_success() => {
                    debug!(session = %session, "session marked interrupted");
                }
                Ok(response) => {
                    warn!(session = %session, status = %response.status(), "end-session rejected");
                }
                Err(e) => {
                    warn!(session = %session, error = %e, "end-session delivery failed");
                }
            }
        });
    }

    async fn alarm_settings(&self) -> Result<AlarmSettings, BackendError> {
        let response = self
            .client
            .get(self.url("/settings/alarm"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let settings: AlarmSettings = Self::check(response).await?.json().await?;
        Ok(settings.sanitized())
    }

    async fn save_alarm_settings(&self, settings: &AlarmSettings) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url("/settings/alarm"))
            .bearer_auth(&self.token)
            .json(settings)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
