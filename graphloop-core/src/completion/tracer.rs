use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use uuid::Uuid;

const LANGSMITH_API_URL: &str = "https://api.smith.langchain.com";
pub const DEFAULT_TRACE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TracingError {
    #[error("Tracing HTTP error: {0}")]
    Http(String),

    #[error("Tracing error: {0}")]
    Other(String),
}

/// Receives start/end records for every model call.
///
/// Failures are reported to the caller, which logs them; they never fail the
/// model call being traced.
#[async_trait]
pub trait TracingProvider: Send + Sync {
    async fn start_trace(
        &self,
        trace_id: Uuid,
        name: &str,
        run_type: &str,
        inputs: &Value,
        parent_trace_id: Option<Uuid>,
        start_time: SystemTime,
    ) -> Result<(), TracingError>;

    async fn end_trace(
        &self,
        trace_id: Uuid,
        outputs: &Value,
        end_time: SystemTime,
    ) -> Result<(), TracingError>;
}

/// Sends runs to the LangSmith REST API
#[derive(Debug, Clone)]
pub struct LangSmithTracer {
    base_url: String,
    api_key: String,
    timeout: Duration,
    http_client: Client,
}

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

impl LangSmithTracer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: LANGSMITH_API_URL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TRACE_TIMEOUT,
            http_client: http_client(DEFAULT_TRACE_TIMEOUT),
        }
    }

    /// Reads `LANGSMITH_API_KEY`; `None` when unset
    pub fn from_env() -> Option<Self> {
        std::env::var("LANGSMITH_API_KEY").ok().map(Self::new)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Upper bound for each request to the tracing backend
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.http_client = http_client(timeout);
        self
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<(), TracingError> {
        let resp = request
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|err| TracingError::Http(err.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(TracingError::Http(format!("{} failed: HTTP {} {}", action, status, text)))
    }
}

#[derive(Serialize)]
struct StartRunBody<'a> {
    id: String,
    name: &'a str,
    run_type: &'a str,
    inputs: &'a Value,
    start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_run_id: Option<String>,
}

#[derive(Serialize)]
struct EndRunBody<'a> {
    outputs: &'a Value,
    end_time: String,
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl TracingProvider for LangSmithTracer {
    async fn start_trace(
        &self,
        trace_id: Uuid,
        name: &str,
        run_type: &str,
        inputs: &Value,
        parent_trace_id: Option<Uuid>,
        start_time: SystemTime,
    ) -> Result<(), TracingError> {
        let body = StartRunBody {
            id: trace_id.to_string(),
            name,
            run_type,
            inputs,
            start_time: rfc3339(start_time),
            parent_run_id: parent_trace_id.map(|p| p.to_string()),
        };
        let url = format!("{}/runs", self.base_url);
        self.send(self.http_client.post(url).json(&body), "start_trace")
            .await
    }

    async fn end_trace(
        &self,
        trace_id: Uuid,
        outputs: &Value,
        end_time: SystemTime,
    ) -> Result<(), TracingError> {
        let body = EndRunBody {
            outputs,
            end_time: rfc3339(end_time),
        };
        let url = format!("{}/runs/{}", self.base_url, trace_id);
        self.send(self.http_client.patch(url).json(&body), "end_trace")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;
    use tokio::net::TcpListener;

    #[test]
    fn test_timestamps_are_rfc3339_millis() {
        let time = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(rfc3339(time), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let tracer = LangSmithTracer::new("key").with_base_url("http://localhost:1984/");
        assert_eq!(tracer.base_url, "http://localhost:1984");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_http_error() {
        let tracer = LangSmithTracer::new("key").with_base_url("http://127.0.0.1:9");
        let err = tracer
            .end_trace(Uuid::new_v4(), &Value::Null, SystemTime::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TracingError::Http(_)));
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let tracer = LangSmithTracer::new("key")
            .with_base_url(format!("http://{}", addr))
            .with_timeout(Duration::from_millis(200));
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            tracer.start_trace(
                Uuid::new_v4(),
                "chat_completion",
                "llm",
                &Value::Null,
                None,
                SystemTime::now(),
            ),
        )
        .await
        .expect("tracer request should give up on its own");
        assert!(matches!(result, Err(TracingError::Http(_))));
    }
}
