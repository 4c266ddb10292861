//! Session gate against a mock auth backend

use app_state::query::{Query, QueryClient, QueryKey, QueryState};
use app_state::session::{GateState, SessionGate};
use async_trait::async_trait;
use std::sync::Arc;
use storage::CacheConfig;
use supabase_client::auth::{Session, SignUpOutcome};
use supabase_client::rest::ClientConfig;
use supabase_client::session::{FileSessionStorage, MemorySessionStorage, SessionStorage};
use supabase_client::SupabaseClient;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "6f1c2d3e-4b5a-4c7d-8e9f-0a1b2c3d4e5f";

fn user_json() -> serde_json::Value {
    serde_json::json!({
        "id": USER_ID,
        "email": "ana@example.com",
        "user_metadata": {"username": "ana"}
    })
}

fn session_json(token: &str, expires_at: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_at": expires_at,
        "refresh_token": "refresh-1",
        "user": user_json()
    })
}

fn far_future() -> i64 {
    unix_now() + 3600
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

struct CachedValue;

#[async_trait]
impl Query for CachedValue {
    type Data = u32;

    async fn fetch(&self) -> app_state::query::Result<u32> {
        Ok(7)
    }

    fn key(&self) -> QueryKey {
        QueryKey::new("user-favorites", USER_ID)
    }
}

fn gate_for(server: &MockServer, storage: Arc<dyn SessionStorage>) -> (SessionGate, SupabaseClient, QueryClient) {
    let client = SupabaseClient::new(ClientConfig::new(server.uri(), "anon-key")).unwrap();
    let queries = QueryClient::new(CacheConfig::default());
    (SessionGate::new(client.clone(), storage, queries.clone()), client, queries)
}

#[tokio::test]
async fn test_sign_in_then_sign_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("user-token", far_future())))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemorySessionStorage::new());
    let (gate, client, queries) = gate_for(&server, storage.clone());
    let mut rx = gate.subscribe();

    assert_eq!(gate.restore().await, GateState::Unauthenticated);

    gate.sign_in("ana@example.com", "secret").await.unwrap();
    rx.changed().await.unwrap();
    assert!(matches!(&*rx.borrow(), GateState::Authenticated(s) if s.access_token == "user-token"));
    assert_eq!(gate.current_user().unwrap().email.as_deref(), Some("ana@example.com"));
    assert!(client.rest().has_access_token().await);
    assert!(storage.load().await.unwrap().is_some());

    queries.fetch(&CachedValue).await.unwrap();

    gate.sign_out().await.unwrap();
    assert_eq!(gate.state(), GateState::Unauthenticated);
    assert!(!client.rest().has_access_token().await);
    assert!(storage.load().await.unwrap().is_none());
    assert_eq!(queries.state(&CachedValue.key()).await, QueryState::Idle);
}

#[tokio::test]
async fn test_sign_out_clears_locally_when_backend_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("user-token", far_future())))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (gate, _, _) = gate_for(&server, Arc::new(MemorySessionStorage::new()));
    gate.restore().await;
    gate.sign_in("ana@example.com", "secret").await.unwrap();

    gate.sign_out().await.unwrap();
    assert_eq!(gate.state(), GateState::Unauthenticated);
}

#[tokio::test]
async fn test_restore_validates_persisted_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("session.json");

    let session: Session = serde_json::from_value(session_json("stored-token", far_future())).unwrap();
    FileSessionStorage::new(&file).save(&session).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let (gate, client, _) = gate_for(&server, Arc::new(FileSessionStorage::new(&file)));
    let state = gate.restore().await;

    assert!(matches!(state, GateState::Authenticated(s) if s.access_token == "stored-token"));
    assert!(client.rest().has_access_token().await);
}

#[tokio::test]
async fn test_restore_refreshes_expired_session() {
    let server = MockServer::start().await;
    let storage = Arc::new(MemorySessionStorage::new());

    let expired: Session = serde_json::from_value(session_json("old-token", unix_now() - 60)).unwrap();
    storage.save(&expired).await.unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("new-token", far_future())))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let (gate, _, _) = gate_for(&server, storage.clone());
    gate.restore().await;

    assert_eq!(gate.current_session().unwrap().access_token, "new-token");
    assert_eq!(storage.load().await.unwrap().unwrap().access_token, "new-token");
}

#[tokio::test]
async fn test_restore_discards_rejected_session() {
    let server = MockServer::start().await;
    let storage = Arc::new(MemorySessionStorage::new());

    let session: Session = serde_json::from_value(session_json("revoked", far_future())).unwrap();
    storage.save(&session).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"msg": "invalid JWT"})))
        .mount(&server)
        .await;

    let (gate, _, _) = gate_for(&server, storage.clone());

    assert_eq!(gate.restore().await, GateState::Unauthenticated);
    assert!(storage.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_sign_in_keeps_gate_closed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let (gate, _, _) = gate_for(&server, Arc::new(MemorySessionStorage::new()));
    gate.restore().await;

    assert!(gate.sign_in("ana@example.com", "wrong").await.is_err());
    assert_eq!(gate.state(), GateState::Unauthenticated);
    assert!(!gate.is_submitting());
}

#[tokio::test]
async fn test_sign_up_pending_confirmation_stays_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let (gate, _, _) = gate_for(&server, Arc::new(MemorySessionStorage::new()));
    gate.restore().await;

    let outcome = gate.sign_up("ana@example.com", "secret", "ana").await.unwrap();
    assert!(matches!(outcome, SignUpOutcome::ConfirmationPending(_)));
    assert_eq!(gate.state(), GateState::Unauthenticated);
}

#[tokio::test]
async fn test_complete_oauth_adopts_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let (gate, _, _) = gate_for(&server, Arc::new(MemorySessionStorage::new()));
    gate.restore().await;

    let session: Session = serde_json::from_value(session_json("oauth-token", far_future())).unwrap();
    gate.complete_oauth(session).await.unwrap();

    assert_eq!(gate.current_user().unwrap().metadata_username(), Some("ana"));
}
