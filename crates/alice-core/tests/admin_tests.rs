//! Admin runtime tests
//!
//! Runs [`AdminRuntime`] against a mock admin API:
//! - Invitation submission paths and parameters
//! - Readiness resolution from the returned record
//! - Sub-wallet creation and switching
//! - Timing and readiness polling

use std::time::Duration;

use alice_core::config::{EndorserRole, StartupConfig};
use alice_core::error::Error;
use alice_core::invitation::decode;
use alice_core::runtime::{AdminRuntime, AgentRuntime, WalletSwitch};
use alice_core::signal::ConnectionSignal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEGACY_INVITE: &str =
    r#"{"@type": "https://didcomm.org/connections/1.0/invitation", "label": "faber.agent"}"#;
const OOB_INVITE: &str =
    r#"{"@type": "https://didcomm.org/out-of-band/1.1/invitation", "label": "faber.agent"}"#;

fn runtime_for(server: &MockServer) -> AdminRuntime {
    AdminRuntime::new(StartupConfig {
        admin_url: Some(server.uri()),
        ..StartupConfig::default()
    })
}

mod submit_tests {
    use super::*;

    #[tokio::test]
    async fn test_legacy_invitation_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connections/receive-invitation"))
            .and(body_partial_json(json!({"label": "faber.agent"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connection_id": "conn-1",
                "rfc23_state": "request-sent",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let (signal, resolver) = ConnectionSignal::create();
        let record = runtime
            .submit_invitation(&decode(LEGACY_INVITE).unwrap(), Some(resolver))
            .await
            .unwrap();

        assert_eq!(record.connection_id.as_deref(), Some("conn-1"));
        assert_eq!(runtime.connection_id().as_deref(), Some("conn-1"));
        assert!(!signal.peek_ready());
    }

    #[tokio::test]
    async fn test_out_of_band_invitation_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/out-of-band/receive-invitation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connection_id": "conn-2",
                "state": "initial",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let record = runtime
            .submit_invitation(&decode(OOB_INVITE).unwrap(), None)
            .await
            .unwrap();

        assert_eq!(record.connection_id.as_deref(), Some("conn-2"));
    }

    #[tokio::test]
    async fn test_author_sets_alias() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connections/receive-invitation"))
            .and(query_param("alias", "endorser"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"connection_id": "conn-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let runtime = AdminRuntime::new(StartupConfig {
            admin_url: Some(server.uri()),
            endorser_role: EndorserRole::Author,
            ..StartupConfig::default()
        });
        runtime
            .submit_invitation(&decode(LEGACY_INVITE).unwrap(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_already_completed_connection_resolves() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connections/receive-invitation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connection_id": "conn-1",
                "rfc23_state": "completed",
            })))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let (signal, resolver) = ConnectionSignal::create();
        runtime
            .submit_invitation(&decode(LEGACY_INVITE).unwrap(), Some(resolver))
            .await
            .unwrap();

        assert!(signal.peek_ready());
        assert!(signal.await_ready().await);
    }

    #[tokio::test]
    async fn test_rejected_invitation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connections/receive-invitation"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Invalid invitation"))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let (signal, resolver) = ConnectionSignal::create();
        let err = runtime
            .submit_invitation(&decode(LEGACY_INVITE).unwrap(), Some(resolver))
            .await
            .unwrap_err();

        match err {
            Error::Admin { path, status, body } => {
                assert_eq!(path, "/connections/receive-invitation");
                assert_eq!(status, 422);
                assert_eq!(body, "Invalid invitation");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // The dropped resolver fails the signal
        assert!(!signal.await_ready().await);

        // A later invitation can arm again
        let (_signal, resolver) = ConnectionSignal::create();
        let again = runtime
            .submit_invitation(&decode(LEGACY_INVITE).unwrap(), Some(resolver))
            .await;
        assert!(matches!(again, Err(Error::Admin { .. })));
    }
}

mod wallet_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_switch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/multitenancy/wallet"))
            .and(body_partial_json(json!({
                "wallet_name": "bob",
                "key_management_mode": "managed",
                "wallet_dispatch_type": "base",
                "wallet_type": "askar",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "wallet_id": "w-bob",
                "token": "tok-bob",
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/connections/conn-1/send-message"))
            .and(header("authorization", "Bearer tok-bob"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);

        let created = runtime.register_or_switch_wallet("bob", false).await.unwrap();
        assert_eq!(
            created,
            WalletSwitch::Created {
                wallet_id: "w-bob".to_string()
            }
        );
        assert!(runtime.admin().has_wallet_token());

        let switched = runtime.register_or_switch_wallet("bob", false).await.unwrap();
        assert_eq!(
            switched,
            WalletSwitch::Switched {
                wallet_id: "w-bob".to_string()
            }
        );

        runtime
            .admin_post(
                "/connections/conn-1/send-message",
                &[],
                json!({"content": "hi"}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wallet_response_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/multitenancy/wallet"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"wallet_id": "w-1"})))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let err = runtime.register_or_switch_wallet("bob", false).await.unwrap_err();

        assert!(matches!(err, Error::Wallet(_)));
        assert!(!runtime.admin().has_wallet_token());
    }
}

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_timing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": "1.0.0",
                "timing": {
                    "count": {"receive_invitation": 2},
                    "total": {"receive_invitation": 0.5},
                    "avg": {"receive_invitation": 0.25},
                    "min": {"receive_invitation": 0.2},
                    "max": {"receive_invitation": 0.3},
                },
            })))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let timing = runtime.fetch_timing().await.unwrap().expect("timing data");

        assert_eq!(timing.count["receive_invitation"], 2);
        assert_eq!(timing.avg["receive_invitation"], 0.25);
    }

    #[tokio::test]
    async fn test_fetch_timing_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "1.0.0"})))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        assert!(runtime.fetch_timing().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/ready"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ready": true})))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        runtime
            .admin()
            .wait_ready(Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_ready_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/ready"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ready": false})))
            .mount(&server)
            .await;

        let runtime = runtime_for(&server);
        let err = runtime
            .admin()
            .wait_ready(Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(1)));
    }

    #[tokio::test]
    async fn test_terminate_without_start() {
        let server = MockServer::start().await;
        let runtime = runtime_for(&server);

        assert!(runtime.drain_events().is_empty());
        assert!(runtime.terminate().await);
    }
}
