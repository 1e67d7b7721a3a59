mod common;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::{json, Value};

use common::{config_for, mainnet_node, spawn_rpc_server};
use wallet_confirm_adapters::{
    AdapterSet, AnalyticsAdapter, DappSession, DappSessionAdapter, HistoryAdapter,
    SessionResponse,
};
use wallet_confirm_core::{
    AccountInfo, AnalyticsEvent, AnalyticsPort, Approval, ConfirmConfig, ConfirmOutcome,
    ConfirmState, ConfirmationSession, DappSessionPort, GasFeeParams, HistoryPort,
    HistoryRecord, HistoryStatus, PendingRequest, PortError, RequestMethod, RequestSource,
    RequestType, TimestampMs,
};

fn account() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid account")
}

fn session_adapter() -> DappSessionAdapter {
    let adapter = DappSessionAdapter::default();
    adapter
        .insert_session(DappSession {
            session_id: "topic-1".to_owned(),
            dapp_name: "Example dApp".to_owned(),
            dapp_url: "https://dapp.example".to_owned(),
            active: true,
        })
        .expect("insert session");
    adapter
}

fn send_request() -> PendingRequest {
    PendingRequest {
        request_id: "req-9".to_owned(),
        session_id: "topic-1".to_owned(),
        method: RequestMethod::SendTransaction,
        params: vec![json!({
            "from": account().to_string(),
            "to": "0x000000000000000000000000000000000000cafe",
            "value": "0x2386f26fc10000",
            "gas": "0x5208",
            "maxFeePerGas": "0x1",
        })],
        chain_id: 1,
        address: account(),
        dapp_name: "Example dApp".to_owned(),
        dapp_url: "https://dapp.example".to_owned(),
        image_url: None,
        source: RequestSource::Browser,
    }
}

fn record(hash: B256, nonce: u64) -> HistoryRecord {
    HistoryRecord {
        hash,
        chain_id: 1,
        from: account(),
        to: None,
        value: U256::ZERO,
        data: Bytes::new(),
        nonce,
        gas_limit: 21_000,
        gas_params: GasFeeParams::Legacy {
            gas_price: U256::from(1u64),
        },
        status: HistoryStatus::Pending,
        dapp_name: "Example dApp".to_owned(),
        dapp_icon: None,
        added_at_ms: TimestampMs(0),
    }
}

#[tokio::test]
async fn session_adapter_answers_each_request_once() {
    let adapter = session_adapter();
    assert!(adapter.is_session_active("topic-1").await.expect("lookup"));
    assert!(!adapter.is_session_active("topic-2").await.expect("lookup"));

    adapter
        .respond_success("req-1", Value::String("0x01".to_owned()))
        .await
        .expect("first answer");
    let err = adapter
        .respond_error("req-1", 4001, "late")
        .await
        .expect_err("second answer");
    assert!(matches!(err, PortError::Conflict(_)));
    assert_eq!(
        adapter.response("req-1").expect("response"),
        Some(SessionResponse::Success(Value::String("0x01".to_owned())))
    );

    adapter.disconnect("topic-1").expect("disconnect");
    assert!(!adapter.is_session_active("topic-1").await.expect("lookup"));
}

#[tokio::test]
async fn history_tracks_latest_nonce_and_rejects_duplicates() {
    let history = HistoryAdapter::default();
    assert_eq!(history.latest_nonce(account(), 1).await.expect("empty"), None);

    history
        .add_transaction(account(), 1, record(B256::repeat_byte(1), 4))
        .await
        .expect("first");
    history
        .add_transaction(account(), 1, record(B256::repeat_byte(2), 9))
        .await
        .expect("second");
    assert_eq!(history.latest_nonce(account(), 1).await.expect("nonce"), Some(9));
    assert_eq!(history.latest_nonce(account(), 10).await.expect("other chain"), None);

    let err = history
        .add_transaction(account(), 1, record(B256::repeat_byte(1), 4))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, PortError::Conflict(_)));
    assert_eq!(history.transactions(account(), 1).expect("list").len(), 2);
}

#[test]
fn analytics_adapter_drains_events() {
    let analytics = AnalyticsAdapter::default();
    analytics.track(AnalyticsEvent::TxRequestShownSheet {
        source: RequestSource::Browser,
        request_type: RequestType::Signature,
    });
    assert_eq!(analytics.drain().len(), 1);
    assert!(analytics.drain().is_empty());
}

#[tokio::test]
async fn send_request_runs_end_to_end_against_mock_node() {
    let (url, log) = spawn_rpc_server(mainnet_node);
    let mut adapters = AdapterSet::from_config(&config_for(1, &url)).expect("adapters");
    adapters.session = session_adapter();

    let session = ConfirmationSession::open(
        send_request(),
        AccountInfo::software(account()),
        adapters.ports(),
        ConfirmConfig::default(),
    );
    let view = session.prepare().await.expect("prepare");
    assert_eq!(view.state, ConfirmState::Ready);
    assert_eq!(view.nonce, Some(7));
    assert_eq!(view.gas_limit, Some(21_000));
    assert!(view.can_confirm);

    let outcome = session.confirm().await.expect("confirm");
    let hash = match outcome {
        ConfirmOutcome::Approved(Approval::Sent(result)) => result.hash,
        other => panic!("expected a sent transaction, got {other:?}"),
    };

    assert_eq!(
        adapters.session.response("req-9").expect("response"),
        Some(SessionResponse::Success(Value::String(hash.to_string())))
    );
    let recorded = adapters.history.transactions(account(), 1).expect("history");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].nonce, 7);
    let dismissed = adapters.navigator.dismissed().expect("dismissed");
    assert_eq!(dismissed.len(), 1);
    assert!(!dismissed[0].canceled);

    let names: Vec<_> = adapters.analytics.drain().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["tx_request.shown_sheet", "tx_request.approve"]);
    assert!(log.methods().contains(&"eth_getBalance".to_owned()));
    assert!(!log.methods().contains(&"eth_sendRawTransaction".to_owned()));
}
