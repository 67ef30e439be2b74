//! Chat relay: enrich a user's question with course context and forward it
//! to the chat service.
//!
//! Transport failures never reach the caller. They are downgraded to a
//! canned reply so the chat window always gets an answer.

use portal_core::{
  classify::classify,
  principal::{Principal, PrincipalKind},
  store::PortalStore,
};
use serde::Serialize;

use crate::{
  rag::{CHAT_RESULT_COUNT, ChatQuery, RagClient, RagError},
  session::Claims,
};

const UNAVAILABLE_REPLY: &str = "I'm currently being set up. The RAG system is not available \
  right now. Please ensure the Python RAG API server is running, or contact the registrar \
  office for assistance.";

const TIMEOUT_REPLY: &str = "The request is taking longer than expected. Please try again with \
  a simpler question, or contact the registrar office.";

const GENERIC_REPLY: &str = "I'm currently being set up. The RAG system encountered an issue. \
  For immediate assistance, please contact the registrar office.";

const FALLBACK_QUERY_TYPE: &str = "general";

/// Reply body for `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
  pub success:    bool,
  pub response:   String,
  pub sources:    Vec<serde_json::Value>,
  pub query_type: String,
}

impl ChatReply {
  fn fallback(error: &RagError) -> Self {
    let text = match error {
      RagError::Unavailable(_) => UNAVAILABLE_REPLY,
      RagError::Timeout(_) => TIMEOUT_REPLY,
      RagError::Status(_) | RagError::Decode(_) | RagError::Transport(_) => GENERIC_REPLY,
    };
    Self {
      success:    true,
      response:   text.to_string(),
      sources:    Vec::new(),
      query_type: FALLBACK_QUERY_TYPE.to_string(),
    }
  }
}

/// The chat service answered but reported a failure.
#[derive(Debug)]
pub struct Rejected(pub String);

/// Course context attached to a query. Empty for registrars and for
/// students without a recorded course.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CourseContext {
  pub course: Option<String>,
  pub school: Option<&'static str>,
}

/// Look up the caller's course and classify it. Lookup failures are logged
/// and treated as "no context".
pub async fn course_context<S: PortalStore>(store: &S, claims: &Claims) -> CourseContext {
  if claims.kind != PrincipalKind::Student {
    return CourseContext::default();
  }
  match store.find_by_id(PrincipalKind::Student, claims.id).await {
    Ok(Some(Principal::Student(student))) => {
      let school = student.course.as_deref().and_then(classify);
      CourseContext { course: student.course, school }
    }
    Ok(_) => CourseContext::default(),
    Err(e) => {
      tracing::warn!(student = claims.id, error = %e, "failed to load student course for chat");
      CourseContext::default()
    }
  }
}

/// Forward `message` to the chat service on behalf of `claims`.
pub async fn relay<S: PortalStore>(
  store: &S,
  rag: &RagClient,
  claims: &Claims,
  message: &str,
) -> Result<ChatReply, Rejected> {
  let context = course_context(store, claims).await;
  tracing::debug!(
    user = claims.id,
    course = ?context.course,
    school = ?context.school,
    "relaying chat query"
  );

  let query = ChatQuery {
    query:          message,
    student_course: context.course.as_deref(),
    student_school: context.school,
    k:              CHAT_RESULT_COUNT,
    use_base:       true,
  };

  match rag.chat(&query).await {
    Ok(answer) if answer.success => Ok(ChatReply {
      success:    true,
      response:   answer.response.unwrap_or_default(),
      sources:    answer.sources.unwrap_or_default(),
      query_type: answer
        .query_type
        .unwrap_or_else(|| FALLBACK_QUERY_TYPE.to_string()),
    }),
    Ok(answer) => {
      let message = answer
        .message
        .unwrap_or_else(|| "Error processing query".to_string());
      tracing::error!(%message, "chat service reported failure");
      Err(Rejected(message))
    }
    Err(e) => {
      tracing::warn!(kind = e.kind(), error = %e, "chat service call failed, using fallback reply");
      Ok(ChatReply::fallback(&e))
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{Json, Router, routing::post};
  use portal_core::principal::NewStudent;
  use portal_store_sqlite::SqliteStore;
  use serde_json::{Value, json};

  use super::*;
  use crate::rag::RagTimeouts;

  async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  fn client(url: String, chat_timeout: Duration) -> RagClient {
    RagClient::new(url, RagTimeouts { chat: chat_timeout, ..Default::default() }).unwrap()
  }

  fn claims(kind: PrincipalKind, id: i64) -> Claims {
    Claims {
      id,
      email: "someone@example.edu".into(),
      kind,
      student_id: None,
      iat: 0,
      exp: i64::MAX,
    }
  }

  async fn store_with_student(course: &str) -> (SqliteStore, i64) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let student = store
      .add_student(NewStudent {
        student_id:    "KR2024001".into(),
        email:         "rahul@example.edu".into(),
        password_hash: "x".into(),
        full_name:     "Rahul Sharma".into(),
        course:        Some(course.into()),
        year:          Some(3),
        phone:         None,
      })
      .await
      .unwrap();
    (store, student.id)
  }

  /// Echoes the received course context back in the reply.
  fn echo_service() -> Router {
    Router::new().route(
      "/chat",
      post(|Json(body): Json<Value>| async move {
        Json(json!({
          "success": true,
          "response": format!("{}|{}", body["student_course"], body["student_school"]),
          "sources": [{ "title": "Handbook" }],
          "query_type": "course_specific",
          "k": body["k"],
        }))
      }),
    )
  }

  #[tokio::test]
  async fn student_query_carries_course_and_school() {
    let (store, id) = store_with_student("B.Tech Computer Science").await;
    let rag = client(serve(echo_service()).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "exam dates?")
      .await
      .unwrap();
    assert!(reply.success);
    assert_eq!(reply.response, r#""B.Tech Computer Science"|"soet""#);
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.query_type, "course_specific");
  }

  #[tokio::test]
  async fn registrar_query_has_no_context() {
    let (store, _) = store_with_student("MBA").await;
    let rag = client(serve(echo_service()).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Registrar, 1), "hello")
      .await
      .unwrap();
    assert_eq!(reply.response, "null|null");
  }

  #[tokio::test]
  async fn unclassified_course_sends_course_without_school() {
    let (store, id) = store_with_student("random hobby course").await;
    let rag = client(serve(echo_service()).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap();
    assert_eq!(reply.response, r#""random hobby course"|null"#);
  }

  #[tokio::test]
  async fn refused_connection_yields_unavailable_reply() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (store, id) = store_with_student("BBA").await;
    let rag = client(format!("http://{addr}"), Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap();
    assert!(reply.success);
    assert_eq!(reply.response, UNAVAILABLE_REPLY);
    assert!(reply.sources.is_empty());
    assert_eq!(reply.query_type, "general");
  }

  #[tokio::test]
  async fn null_fields_in_success_pass_through() {
    let app = Router::new().route(
      "/chat",
      post(|| async {
        Json(json!({ "success": true, "response": "Exams start May 2", "sources": null }))
      }),
    );
    let (store, id) = store_with_student("LLB").await;
    let rag = client(serve(app).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap();
    assert!(reply.success);
    assert_eq!(reply.response, "Exams start May 2");
    assert!(reply.sources.is_empty());
    assert_eq!(reply.query_type, "general");
  }

  #[tokio::test]
  async fn null_response_becomes_empty_text() {
    let app = Router::new().route(
      "/chat",
      post(|| async {
        Json(json!({ "success": true, "response": null, "sources": [], "query_type": "general" }))
      }),
    );
    let (store, id) = store_with_student("LLB").await;
    let rag = client(serve(app).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap();
    assert!(reply.success);
    assert_eq!(reply.response, "");
  }

  #[tokio::test]
  async fn query_is_forwarded_untrimmed() {
    let app = Router::new().route(
      "/chat",
      post(|Json(body): Json<Value>| async move {
        Json(json!({ "success": true, "response": body["query"] }))
      }),
    );
    let (store, id) = store_with_student("LLB").await;
    let rag = client(serve(app).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "  exam dates?\n")
      .await
      .unwrap();
    assert_eq!(reply.response, "  exam dates?\n");
  }

  #[tokio::test]
  async fn slow_service_yields_timeout_reply() {
    let app = Router::new().route(
      "/chat",
      post(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!({ "success": true, "response": "too late" }))
      }),
    );
    let (store, id) = store_with_student("LLB").await;
    let rag = client(serve(app).await, Duration::from_millis(200));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap();
    assert_eq!(reply.response, TIMEOUT_REPLY);
  }

  #[tokio::test]
  async fn error_status_yields_generic_reply() {
    let app = Router::new().route(
      "/chat",
      post(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let (store, id) = store_with_student("LLB").await;
    let rag = client(serve(app).await, Duration::from_secs(5));

    let reply = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap();
    assert!(reply.success);
    assert_eq!(reply.response, GENERIC_REPLY);
  }

  #[tokio::test]
  async fn reported_failure_is_rejected() {
    let app = Router::new().route(
      "/chat",
      post(|| async { Json(json!({ "success": false, "message": "index not built" })) }),
    );
    let (store, id) = store_with_student("LLB").await;
    let rag = client(serve(app).await, Duration::from_secs(5));

    let Rejected(message) = relay(&store, &rag, &claims(PrincipalKind::Student, id), "hi")
      .await
      .unwrap_err();
    assert_eq!(message, "index not built");
  }

  #[tokio::test]
  async fn missing_student_row_means_no_context() {
    let (store, _) = store_with_student("MBA").await;
    let context = course_context(&store, &claims(PrincipalKind::Student, 999)).await;
    assert_eq!(context, CourseContext::default());
  }
}
