//! HTTP surface of the university portal.
//!
//! Exposes an axum [`Router`] backed by any [`PortalStore`]: login and token
//! verification, registrar document management, and a chat endpoint that
//! relays questions to an external retrieval service.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod placement;
pub mod rag;
pub mod relay;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use portal_core::{store::PortalStore, taxonomy::Taxonomy};
use serde::Deserialize;
use thiserror::Error;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use placement::DocumentPlacement;
use rag::{RagClient, RagTimeouts};
use session::SessionIssuer;

/// Room for multipart boundaries and the text fields around the file part.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `portal.toml` and
/// `PORTAL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub database_path:            PathBuf,
  pub upload_root:              PathBuf,
  pub jwt_secret:               String,
  pub session_ttl_days:         i64,
  pub rag_api_url:              String,
  pub rag_chat_timeout_secs:    u64,
  pub rag_health_timeout_secs:  u64,
  pub rag_process_timeout_secs: u64,
  pub max_upload_bytes:         usize,
  /// Directory served for any path not matched by the API.
  pub static_dir:               Option<PathBuf>,
  /// Replaces the built-in school/course taxonomy.
  pub taxonomy_path:            Option<PathBuf>,
  /// Include source error text in 500 bodies.
  pub expose_internal_errors:   bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                     "127.0.0.1".to_string(),
      port:                     3000,
      database_path:            PathBuf::from("portal.db"),
      upload_root:              PathBuf::from("uploads"),
      jwt_secret:               String::new(),
      session_ttl_days:         7,
      rag_api_url:              "http://localhost:5000".to_string(),
      rag_chat_timeout_secs:    30,
      rag_health_timeout_secs:  5,
      rag_process_timeout_secs: 60,
      max_upload_bytes:         10 * 1024 * 1024,
      static_dir:               None,
      taxonomy_path:            None,
      expose_internal_errors:   false,
    }
  }
}

impl ServerConfig {
  pub fn rag_timeouts(&self) -> RagTimeouts {
    RagTimeouts {
      chat:    Duration::from_secs(self.rag_chat_timeout_secs),
      health:  Duration::from_secs(self.rag_health_timeout_secs),
      process: Duration::from_secs(self.rag_process_timeout_secs),
    }
  }
}

#[derive(Debug, Error)]
pub enum StartupError {
  #[error("jwt_secret must be set to a non-empty value")]
  MissingSecret,
  #[error("session_ttl_days must be positive, got {0}")]
  InvalidTtl(i64),
  #[error("failed to prepare upload root {path:?}: {source}")]
  UploadRoot {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("failed to read taxonomy {path:?}: {source}")]
  TaxonomyRead {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("failed to load taxonomy: {0}")]
  Taxonomy(#[from] portal_core::Error),
  #[error("failed to build HTTP client: {0}")]
  HttpClient(#[from] reqwest::Error),
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: PortalStore> {
  pub store:     Arc<S>,
  pub config:    Arc<ServerConfig>,
  pub sessions:  Arc<SessionIssuer>,
  pub placement: Arc<DocumentPlacement>,
  pub taxonomy:  Arc<Taxonomy>,
  pub rag:       RagClient,
}

impl<S: PortalStore> AppState<S> {
  /// Assemble state from a store and a configuration, creating the upload
  /// root and loading the taxonomy.
  pub async fn from_config(store: S, config: ServerConfig) -> Result<Self, StartupError> {
    if config.jwt_secret.trim().is_empty() {
      return Err(StartupError::MissingSecret);
    }
    if config.session_ttl_days <= 0 {
      return Err(StartupError::InvalidTtl(config.session_ttl_days));
    }

    let placement = DocumentPlacement::new(&config.upload_root)
      .await
      .map_err(|source| StartupError::UploadRoot {
        path: config.upload_root.clone(),
        source,
      })?;

    let taxonomy = match &config.taxonomy_path {
      Some(path) => {
        let source = tokio::fs::read_to_string(path)
          .await
          .map_err(|source| StartupError::TaxonomyRead { path: path.clone(), source })?;
        Taxonomy::from_toml(&source)?
      }
      None => Taxonomy::builtin()?,
    };

    let sessions = SessionIssuer::new(
      &config.jwt_secret,
      chrono::Duration::days(config.session_ttl_days),
    );
    let rag = RagClient::new(config.rag_api_url.clone(), config.rag_timeouts())?;

    Ok(Self {
      store: Arc::new(store),
      config: Arc::new(config),
      sessions: Arc::new(sessions),
      placement: Arc::new(placement),
      taxonomy: Arc::new(taxonomy),
      rag,
    })
  }

  /// Wrap an unexpected failure, honouring `expose_internal_errors`.
  pub fn internal(
    &self,
    message: &str,
    source: &(dyn std::error::Error + 'static),
  ) -> Error {
    Error::internal(message, source, self.config.expose_internal_errors)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the portal's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  use handlers::{auth, chat, documents, health, taxonomy};

  let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

  let api = Router::new()
    .route("/api/health",            get(health::handler))
    .route("/api/taxonomy",          get(taxonomy::handler::<S>))
    .route("/api/auth/login",        post(auth::login::<S>))
    .route("/api/auth/verify",       get(auth::verify))
    .route("/api/documents",         get(documents::list::<S>))
    .route(
      "/api/documents/upload",
      post(documents::upload::<S>).layer(DefaultBodyLimit::max(upload_limit)),
    )
    .route(
      "/api/documents/{id}",
      get(documents::get_one::<S>).delete(documents::delete_one::<S>),
    )
    .route("/api/chat",              post(chat::chat::<S>))
    .route("/api/chat/health",       get(chat::health::<S>));

  let app = match &state.config.static_dir {
    Some(dir) => api.fallback_service(ServeDir::new(dir)),
    None => api,
  };

  app
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
