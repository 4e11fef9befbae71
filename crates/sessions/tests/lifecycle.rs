//! Activation and connection authorization through a full broker.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{handle_with, mint, Authorize, MockController};
use tg_controller::RpcError;
use tg_domain::config::Config;
use tg_protocol::{ConnectionStatus, SessionStatus};
use tg_sessions::{SessionBroker, SessionError};
use tokio_util::sync::CancellationToken;

fn broker(mock: Arc<MockController>) -> SessionBroker {
    let mut config = Config::default();
    config.worker.name = "worker-test".into();
    SessionBroker::new(&config, handle_with(mock))
}

fn pending_mock(id: &str) -> Arc<MockController> {
    Arc::new(MockController::serving(
        mint(&[id]),
        SessionStatus::Pending,
        chrono::Duration::hours(1),
    ))
}

#[tokio::test]
async fn activation_passes_inputs_through() {
    let mock = pending_mock("s_act");
    let broker = broker(mock.clone());
    let ctx = CancellationToken::new();

    let status = broker
        .lifecycle()
        .activate_session(&ctx, "s_act", "tofu-xyz", 7)
        .await
        .unwrap();
    assert_eq!(status, SessionStatus::Active);

    let seen = mock.activations.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].session_id, "s_act");
    assert_eq!(seen[0].tofu_token, "tofu-xyz");
    assert_eq!(seen[0].version, 7);
    assert_eq!(seen[0].worker_id, "worker-test");
}

#[tokio::test]
async fn activation_failure_is_wrapped_and_changes_nothing() {
    let mock = pending_mock("s_act");
    mock.set_activate(Err(RpcError::Rejected("version mismatch".into())));
    let broker = broker(mock.clone());
    broker.resolver().resolve_session_tls("s_act").await.unwrap();

    let err = broker
        .lifecycle()
        .activate_session(&CancellationToken::new(), "s_act", "tofu", 2)
        .await
        .unwrap_err();
    match &err {
        SessionError::ActivationFailed(RpcError::Rejected(msg)) => assert_eq!(msg, "version mismatch"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!err.is_retriable());
    assert_eq!(
        broker.registry().get("s_act").unwrap().status(),
        SessionStatus::Pending
    );
    // No retry behind the caller's back.
    assert_eq!(mock.activations.lock().len(), 1);
}

#[tokio::test]
async fn quota_counts_down_with_distinct_ids() {
    let mock = pending_mock("s_q");
    mock.set_authorize(Authorize::Quota(5));
    let broker = broker(mock.clone());
    broker.resolver().resolve_session_tls("s_q").await.unwrap();
    let ctx = CancellationToken::new();

    let (first, left1) = broker.lifecycle().authorize_connection(&ctx, "s_q").await.unwrap();
    let (second, left2) = broker.lifecycle().authorize_connection(&ctx, "s_q").await.unwrap();
    assert_eq!(left1, 4);
    assert_eq!(left2, 3);
    assert_ne!(first.id(), second.id());

    let session = broker.registry().get("s_q").unwrap();
    assert_eq!(session.connection_count(), 2);
    assert!(session.has_pending_connections());
}

#[tokio::test]
async fn authorization_failure_records_nothing() {
    let mock = pending_mock("s_full");
    mock.set_authorize(Authorize::Fail(RpcError::Rejected("connection limit reached".into())));
    let broker = broker(mock.clone());
    broker.resolver().resolve_session_tls("s_full").await.unwrap();

    let err = broker
        .lifecycle()
        .authorize_connection(&CancellationToken::new(), "s_full")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AuthorizationFailed(_)));
    assert_eq!(broker.registry().get("s_full").unwrap().connection_count(), 0);
    assert_eq!(mock.authorizations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_connection_id_is_rejected() {
    let mock = pending_mock("s_dup");
    mock.set_authorize(Authorize::FixedId("c_same".into(), 3));
    let broker = broker(mock.clone());
    broker.resolver().resolve_session_tls("s_dup").await.unwrap();
    let ctx = CancellationToken::new();

    let (conn, _) = broker.lifecycle().authorize_connection(&ctx, "s_dup").await.unwrap();
    let err = broker
        .lifecycle()
        .authorize_connection(&ctx, "s_dup")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AuthorizationFailed(RpcError::Rejected(_))));

    let session = broker.registry().get("s_dup").unwrap();
    assert_eq!(session.connection_count(), 1);
    assert!(Arc::ptr_eq(&session.connection("c_same").unwrap(), &conn));
}

#[tokio::test]
async fn unregistered_session_still_gets_a_connection() {
    let broker = broker(pending_mock("s_unreg"));
    let (conn, left) = broker
        .lifecycle()
        .authorize_connection(&CancellationToken::new(), "s_unreg")
        .await
        .unwrap();
    assert_eq!(conn.session_id(), "s_unreg");
    assert_eq!(left, 4);
    assert!(broker.registry().is_empty());
}

#[tokio::test]
async fn resolve_activate_authorize_end_to_end() {
    let mock = pending_mock("s_abc123");
    let broker = broker(mock.clone());
    let ctx = CancellationToken::new();

    let tls = broker.resolver().resolve_session_tls("s_abc123").await.unwrap();
    assert_eq!(tls.server_name(), "s_abc123");
    let session = broker.registry().get("s_abc123").unwrap();
    assert_eq!(session.status(), SessionStatus::Pending);

    let status = broker
        .lifecycle()
        .activate_session(&ctx, "s_abc123", "tofu1", 1)
        .await
        .unwrap();
    assert_eq!(status, SessionStatus::Active);
    assert_eq!(session.status(), SessionStatus::Active);

    let (conn, left) = broker
        .lifecycle()
        .authorize_connection(&ctx, "s_abc123")
        .await
        .unwrap();
    assert_eq!(conn.id(), "c_1");
    assert_eq!(conn.status(), ConnectionStatus::Authorized);
    assert_eq!(left, 4);

    // The transport binds a stream, then the broker shuts down.
    let scope = session.bind_connection("c_1").unwrap();
    assert_eq!(broker.shutdown(), 1);
    assert!(scope.is_cancelled());
    assert_eq!(conn.status(), ConnectionStatus::Closed);
}
