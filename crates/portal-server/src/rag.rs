//! HTTP client for the external retrieval-augmented chat service.
//!
//! Three calls: `POST /chat`, `GET /health` and `POST /process-document`.
//! Each call carries its own timeout; nothing is retried.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of retrieved passages requested per chat query.
pub const CHAT_RESULT_COUNT: u32 = 3;
pub const CHUNK_SIZE: u32 = 1000;
pub const CHUNK_OVERLAP: u32 = 100;

#[derive(Debug, Error)]
pub enum RagError {
  /// Connection refused, DNS failure or host unreachable.
  #[error("service unavailable: {0}")]
  Unavailable(#[source] reqwest::Error),
  #[error("request timed out: {0}")]
  Timeout(#[source] reqwest::Error),
  #[error("unexpected status {0}")]
  Status(StatusCode),
  #[error("undecodable response: {0}")]
  Decode(#[source] reqwest::Error),
  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),
}

impl RagError {
  /// Short label for log fields.
  pub fn kind(&self) -> &'static str {
    match self {
      RagError::Unavailable(_) => "unavailable",
      RagError::Timeout(_) => "timeout",
      RagError::Status(_) => "status",
      RagError::Decode(_) => "decode",
      RagError::Transport(_) => "transport",
    }
  }

  fn from_send(e: reqwest::Error) -> Self {
    // Connect failures are checked first: a connect timeout is reported as
    // unavailability, not as a slow answer.
    if e.is_connect() {
      RagError::Unavailable(e)
    } else if e.is_timeout() {
      RagError::Timeout(e)
    } else {
      RagError::Transport(e)
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatQuery<'a> {
  pub query:          &'a str,
  pub student_course: Option<&'a str>,
  pub student_school: Option<&'a str>,
  pub k:              u32,
  pub use_base:       bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
  #[serde(default)]
  pub success:    bool,
  pub response:   Option<String>,
  pub sources:    Option<Vec<serde_json::Value>>,
  pub query_type: Option<String>,
  pub message:    Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessRequest<'a> {
  pub file_path:     &'a str,
  pub school:        &'a str,
  pub course:        &'a str,
  pub chunk_size:    u32,
  pub chunk_overlap: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessAnswer {
  #[serde(default)]
  pub success:        bool,
  pub chunks_created: Option<u64>,
  pub message:        Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RagTimeouts {
  pub chat:    Duration,
  pub health:  Duration,
  pub process: Duration,
}

impl Default for RagTimeouts {
  fn default() -> Self {
    Self {
      chat:    Duration::from_secs(30),
      health:  Duration::from_secs(5),
      process: Duration::from_secs(60),
    }
  }
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct RagClient {
  client:   Client,
  base_url: String,
  timeouts: RagTimeouts,
}

impl RagClient {
  pub fn new(base_url: impl Into<String>, timeouts: RagTimeouts) -> reqwest::Result<Self> {
    let client = Client::builder().build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      timeouts,
    })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  /// `POST /chat`
  pub async fn chat(&self, query: &ChatQuery<'_>) -> Result<ChatAnswer, RagError> {
    let resp = self
      .client
      .post(self.url("/chat"))
      .timeout(self.timeouts.chat)
      .json(query)
      .send()
      .await
      .map_err(RagError::from_send)?;

    if !resp.status().is_success() {
      return Err(RagError::Status(resp.status()));
    }
    resp.json().await.map_err(|e| {
      if e.is_timeout() {
        RagError::Timeout(e)
      } else {
        RagError::Decode(e)
      }
    })
  }

  /// `GET /health`. Any 2xx answer counts as reachable.
  pub async fn health(&self) -> Result<(), RagError> {
    let resp = self
      .client
      .get(self.url("/health"))
      .timeout(self.timeouts.health)
      .send()
      .await
      .map_err(RagError::from_send)?;

    if resp.status().is_success() {
      Ok(())
    } else {
      Err(RagError::Status(resp.status()))
    }
  }

  /// `POST /process-document`
  pub async fn process_document(
    &self,
    file_path: &str,
    school: &str,
    course: &str,
  ) -> Result<ProcessAnswer, RagError> {
    let body = ProcessRequest {
      file_path,
      school,
      course,
      chunk_size: CHUNK_SIZE,
      chunk_overlap: CHUNK_OVERLAP,
    };
    let resp = self
      .client
      .post(self.url("/process-document"))
      .timeout(self.timeouts.process)
      .json(&body)
      .send()
      .await
      .map_err(RagError::from_send)?;

    if !resp.status().is_success() {
      return Err(RagError::Status(resp.status()));
    }
    resp.json().await.map_err(RagError::Decode)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{Json, Router, routing::{get, post}};
  use serde_json::{Value, json};

  async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/")
  }

  #[tokio::test]
  async fn process_document_sends_chunking_parameters() {
    let app = Router::new().route(
      "/process-document",
      post(|Json(body): Json<Value>| async move {
        assert_eq!(body["chunk_size"], 1000);
        assert_eq!(body["chunk_overlap"], 100);
        assert_eq!(body["school"], "soet");
        Json(json!({ "success": true, "chunks_created": 12 }))
      }),
    );
    let client = RagClient::new(serve(app).await, RagTimeouts::default()).unwrap();
    let answer = client
      .process_document("/srv/uploads/soet/mca/x.pdf", "soet", "mca")
      .await
      .unwrap();
    assert!(answer.success);
    assert_eq!(answer.chunks_created, Some(12));
  }

  #[tokio::test]
  async fn health_reports_non_success_status() {
    let app = Router::new().route(
      "/health",
      get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let client = RagClient::new(serve(app).await, RagTimeouts::default()).unwrap();
    assert!(matches!(
      client.health().await,
      Err(RagError::Status(StatusCode::SERVICE_UNAVAILABLE))
    ));
  }

  #[tokio::test]
  async fn refused_connection_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RagClient::new(format!("http://{addr}"), RagTimeouts::default()).unwrap();
    let err = client.health().await.unwrap_err();
    assert_eq!(err.kind(), "unavailable");
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let client = RagClient::new("http://localhost:5000/", RagTimeouts::default()).unwrap();
    assert_eq!(client.url("/chat"), "http://localhost:5000/chat");
  }
}
