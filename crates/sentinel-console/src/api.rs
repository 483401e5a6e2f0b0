//! API gateway client
//!
//! Every request to the SOAR backend goes through [`SoarApi`]. The HTTP
//! implementation is [`ApiClient`]; the simulated backend lives in
//! [`crate::simulation`].

use crate::error::{ConsoleError, ConsoleResult};
use crate::models::*;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Response header carrying the chat session id
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Bearer credential shared by every request of one client.
///
/// Readers are unrestricted; the only writer is [`crate::session::SessionStore`].
#[derive(Debug, Default)]
pub struct Credentials {
    bearer: RwLock<Option<String>>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bearer token, if any
    pub fn bearer(&self) -> Option<String> {
        self.bearer.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.read().is_some()
    }

    /// `Authorization` header value for the current token
    pub fn authorization(&self) -> Option<String> {
        self.bearer.read().as_ref().map(|t| format!("Bearer {}", t))
    }

    pub(crate) fn set(&self, token: Option<String>) {
        *self.bearer.write() = token;
    }
}

/// Incremental body of a streaming response
#[async_trait]
pub trait ChunkSource: Send {
    /// Next raw chunk, `None` once the stream is complete
    async fn next_chunk(&mut self) -> ConsoleResult<Option<Vec<u8>>>;
}

#[async_trait]
impl ChunkSource for reqwest::Response {
    async fn next_chunk(&mut self) -> ConsoleResult<Option<Vec<u8>>> {
        self.chunk()
            .await
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .map_err(|e| ConsoleError::Network(e.to_string()))
    }
}

/// Open assistant reply stream
pub struct ChatStream {
    /// Session id announced by the server, if any
    pub session_id: Option<i64>,
    pub chunks: Box<dyn ChunkSource>,
}

/// Contract surface of the SOAR backend
#[async_trait]
pub trait SoarApi: Send + Sync {
    async fn system_health(&self) -> ConsoleResult<SystemHealth>;

    async fn live_traffic(&self) -> ConsoleResult<Vec<Packet>>;

    async fn pending_incidents(&self) -> ConsoleResult<Vec<Packet>>;

    async fn resolve_incident(&self, id: i64, action: ResolveAction) -> ConsoleResult<ResolveResponse>;

    async fn audit_log(&self) -> ConsoleResult<Vec<AuditLogEntry>>;

    /// Precomputed aggregate; may be absent on older backends
    async fn overview_metrics(&self) -> ConsoleResult<OverviewMetrics>;

    async fn threat_map(&self) -> ConsoleResult<Vec<ThreatPoint>>;

    async fn current_config(&self) -> ConsoleResult<CurrentConfig>;

    async fn update_config(&self, update: &PolicyUpdate) -> ConsoleResult<PolicyUpdateResponse>;

    async fn admin_login(&self, username: &str, password: &str) -> ConsoleResult<LoginResponse>;

    async fn admin_me(&self) -> ConsoleResult<AdminIdentity>;

    async fn open_chat(&self, request: &ChatRequest) -> ConsoleResult<ChatStream>;
}

/// HTTP client for the SOAR backend
pub struct ApiClient {
    base_url: String,
    credentials: Arc<Credentials>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Arc<Credentials>, timeout: Duration) -> ConsoleResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Arc<Credentials> {
        self.credentials.clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ConsoleResult<T> {
        let resp = self.execute(self.client.get(self.url(path))).await?;
        Self::decode(resp).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ConsoleResult<T> {
        let resp = self.execute(self.client.post(self.url(path)).json(body)).await?;
        Self::decode(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, mut req: reqwest::RequestBuilder) -> ConsoleResult<reqwest::Response> {
        if let Some(token) = self.credentials.bearer() {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| ConsoleError::Network(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ConsoleError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ConsoleError::Status { status: status.as_u16(), body });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ConsoleResult<T> {
        resp.json::<T>().await.map_err(|e| ConsoleError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SoarApi for ApiClient {
    async fn system_health(&self) -> ConsoleResult<SystemHealth> {
        self.get("/system/health").await
    }

    async fn live_traffic(&self) -> ConsoleResult<Vec<Packet>> {
        self.get("/traffic/live").await
    }

    async fn pending_incidents(&self) -> ConsoleResult<Vec<Packet>> {
        self.get("/incidents/pending").await
    }

    async fn resolve_incident(&self, id: i64, action: ResolveAction) -> ConsoleResult<ResolveResponse> {
        self.post(&format!("/incidents/{}/resolve", id), &ResolveRequest { action }).await
    }

    async fn audit_log(&self) -> ConsoleResult<Vec<AuditLogEntry>> {
        self.get("/logs/audit").await
    }

    async fn overview_metrics(&self) -> ConsoleResult<OverviewMetrics> {
        self.get("/metrics/overview").await
    }

    async fn threat_map(&self) -> ConsoleResult<Vec<ThreatPoint>> {
        self.get("/threats/map").await
    }

    async fn current_config(&self) -> ConsoleResult<CurrentConfig> {
        self.get("/config/current").await
    }

    async fn update_config(&self, update: &PolicyUpdate) -> ConsoleResult<PolicyUpdateResponse> {
        update.validate().map_err(ConsoleError::Config)?;
        self.post("/config/update-body", update).await
    }

    async fn admin_login(&self, username: &str, password: &str) -> ConsoleResult<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post("/auth/admin/login", &body).await
    }

    async fn admin_me(&self) -> ConsoleResult<AdminIdentity> {
        self.get("/auth/admin/me").await
    }

    async fn open_chat(&self, request: &ChatRequest) -> ConsoleResult<ChatStream> {
        let resp = self.execute(self.client.post(self.url("/ai/chat")).json(request)).await?;
        let session_id = resp
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        Ok(ChatStream {
            session_id,
            chunks: Box::new(resp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, credentials: Arc<Credentials>) -> ApiClient {
        ApiClient::new(&format!("{}/api/", server.uri()), credentials, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_fetched_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/health"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "HEALTHY",
                "uptime_seconds": 120,
                "traffic_processed": "1.2k",
                "automation_rate": "92.0%"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Arc::new(Credentials::new());
        credentials.set(Some("abc".into()));
        let health = client(&server, credentials).system_health().await.unwrap();

        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.automation_rate, "92.0%");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/api/auth/admin/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/api/metrics/overview"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let api = client(&server, Arc::new(Credentials::new()));
        assert!(matches!(api.admin_me().await, Err(ConsoleError::Unauthorized)));
        match api.overview_metrics().await {
            Err(ConsoleError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "warming up");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_resolve_posts_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/incidents/42/resolve"))
            .and(body_json(serde_json::json!({"action": "BLOCK"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success", "action_taken": "BLOCK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Arc::new(Credentials::new()));
        let resp = api.resolve_incident(42, ResolveAction::Block).await.unwrap();
        assert_eq!(resp.status, "success");
    }

    #[tokio::test]
    async fn test_invalid_policy_update_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(path("/api/config/update-body"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server, Arc::new(Credentials::new()));
        let update = PolicyUpdate { model_noise_rate: Some(0.9), ..Default::default() };
        assert!(matches!(api.update_config(&update).await, Err(ConsoleError::Config(_))));
    }

    #[tokio::test]
    async fn test_chat_stream_reads_session_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_ID_HEADER, "17")
                    .set_body_string("Here are the latest incidents:\n"),
            )
            .mount(&server)
            .await;

        let api = client(&server, Arc::new(Credentials::new()));
        let request = ChatRequest { query: "latest incidents".into(), session_id: None };
        let mut stream = api.open_chat(&request).await.unwrap();
        assert_eq!(stream.session_id, Some(17));

        let mut body = Vec::new();
        while let Some(chunk) = stream.chunks.next_chunk().await.unwrap() {
            body.extend(chunk);
        }
        assert_eq!(String::from_utf8(body).unwrap(), "Here are the latest incidents:\n");
    }
}
