//! End-to-end lifecycle against the mock gateway over real HTTP

mod common;

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use certnotary::crypto::public_key_hex;
use certnotary::{AccountState, CancelHandle, CancelToken, Certificate, NotaryError, TransportErrorKind, TxStatus};
use common::{MockNag, PRIVATE_KEY};

#[tokio::test]
async fn test_submit_then_query_returns_same_transaction() {
    let nag = MockNag::new(7);
    nag.with(|s| {
        s.public_key = Some(public_key_hex(PRIVATE_KEY).unwrap());
        s.pending_polls = 2;
    });
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(0, Duration::ZERO));
    account.set_poll_interval(Duration::from_millis(20));
    let cancel = CancelToken::never();

    account.set_network("testnet", &cancel).await.unwrap();
    assert_eq!(account.gateway_url(), format!("{}/NAG.php?cep=", base));
    assert_eq!(account.state(), AccountState::NetworkConfigured);

    assert_eq!(account.refresh_nonce(&cancel).await.unwrap(), 8);
    assert_eq!(account.state(), AccountState::NonceKnown);

    let mut certificate = Certificate::new();
    certificate.set_data("quarterly audit, signed");
    let submission = account
        .submit_certificate(&certificate, PRIVATE_KEY, &cancel)
        .await
        .unwrap();
    assert!(submission.accepted(), "rejected: {:?}", submission.response);
    assert_eq!(submission.request.nonce, 8);
    assert_eq!(account.nonce(), 9);

    let reply = account
        .query(submission.tx_id(), 0, 10, &cancel)
        .await
        .unwrap();
    assert!(reply.is_success());
    assert_eq!(reply.response["ID"], submission.request.id.as_str());
    assert_eq!(reply.response["Payload"], submission.request.payload.as_str());
    assert_eq!(reply.response["Status"], "Pending");

    let outcome = account
        .wait_for_outcome(submission.tx_id(), Duration::from_secs(5), &cancel)
        .await
        .unwrap();
    assert_eq!(outcome.status, TxStatus::Executed);
    assert_eq!(outcome.id, submission.request.id);
    assert_eq!(outcome.block_id.as_deref(), Some("0000b10c"));
    assert_eq!(outcome.nag_fee, Some(0.1));
}

#[tokio::test]
async fn test_unknown_network_leaves_account_unchanged() {
    let nag = MockNag::new(0);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(0, Duration::ZERO));
    let err = account
        .set_network("nowhere", &CancelToken::never())
        .await
        .unwrap_err();
    match err {
        NotaryError::NetworkResolution { message, .. } => assert_eq!(message, "Unknown network"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(account.gateway_url(), certnotary::gateway::DEFAULT_NAG_URL);
    assert_eq!(account.state(), AccountState::Open);
}

#[tokio::test]
async fn test_sequential_submissions_advance_nonce_by_one() {
    let nag = MockNag::new(20);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(0, Duration::ZERO));
    let cancel = CancelToken::never();
    account.set_network("testnet", &cancel).await.unwrap();
    let start = account.refresh_nonce(&cancel).await.unwrap();

    for i in 0..5u64 {
        let submission = assert_ok!(
            account
                .submit(format!("doc-{}", i).as_bytes(), PRIVATE_KEY, &cancel)
                .await
        );
        assert!(submission.accepted());
        assert_eq!(submission.request.nonce, start + i);
    }
    assert_eq!(account.nonce(), start + 5);
    assert_eq!(nag.last_nonce(), start + 4);
}

#[tokio::test]
async fn test_concurrent_submissions_get_distinct_nonces() {
    let nag = MockNag::new(0);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(0, Duration::ZERO));
    let cancel = CancelToken::never();
    account.set_network("testnet", &cancel).await.unwrap();
    account.refresh_nonce(&cancel).await.unwrap();

    let account = Arc::new(account);
    let mut handles = Vec::new();
    for i in 0..8 {
        let account = account.clone();
        handles.push(tokio::spawn(async move {
            account
                .submit(format!("parallel-{}", i).as_bytes(), PRIVATE_KEY, &CancelToken::never())
                .await
        }));
    }

    let mut nonces = Vec::new();
    for handle in handles {
        let submission = handle.await.unwrap().unwrap();
        // the gateway only accepts last + 1, so every acceptance proves ordering
        assert!(submission.accepted(), "rejected: {:?}", submission.response);
        nonces.push(submission.request.nonce);
    }
    nonces.sort_unstable();
    assert_eq!(nonces, (1..=8).collect::<Vec<_>>());
    assert_eq!(account.nonce(), 9);
}

#[tokio::test]
async fn test_rejected_nonce_is_not_consumed() {
    let nag = MockNag::new(3);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(0, Duration::ZERO));
    let cancel = CancelToken::never();
    account.set_network("testnet", &cancel).await.unwrap();

    // stale local nonce 0; gateway expects 4
    let submission = account.submit(b"early", PRIVATE_KEY, &cancel).await.unwrap();
    assert!(!submission.accepted());
    assert_eq!(submission.response.error_message().as_deref(), Some("Invalid Nonce"));
    assert_eq!(account.nonce(), 0);

    account.refresh_nonce(&cancel).await.unwrap();
    let submission = account.submit(b"early", PRIVATE_KEY, &cancel).await.unwrap();
    assert!(submission.accepted());
    assert_eq!(account.nonce(), 5);
}

#[tokio::test]
async fn test_unavailable_gateway_is_retried() {
    let nag = MockNag::new(11);
    nag.with(|s| s.unavailable = 2);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(3, Duration::from_millis(10)));
    account.set_gateway_url(format!("{}/NAG.php?cep=", base));

    assert_eq!(account.refresh_nonce(&CancelToken::never()).await.unwrap(), 12);
    assert_eq!(
        nag.calls(),
        vec!["Circular_GetWalletNonce_".to_string(); 3]
    );
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let nag = MockNag::new(0);
    nag.with(|s| s.forced_status = Some(StatusCode::NOT_FOUND));
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(3, Duration::from_millis(10)));
    account.set_gateway_url(format!("{}/NAG.php?cep=", base));

    let err = account.refresh_nonce(&CancelToken::never()).await.unwrap_err();
    match err {
        NotaryError::Transport(e) => {
            assert_eq!(e.kind, TransportErrorKind::Terminal);
            assert_eq!(e.status, Some(404));
            assert_eq!(e.attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(nag.calls().len(), 1);
    assert_eq!(account.nonce(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_report_attempts() {
    let nag = MockNag::new(0);
    nag.with(|s| s.unavailable = 10);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(2, Duration::from_millis(5)));
    account.set_gateway_url(format!("{}/NAG.php?cep=", base));

    let err = account.refresh_nonce(&CancelToken::never()).await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        NotaryError::Transport(e) => {
            assert_eq!(e.status, Some(503));
            assert_eq!(e.attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(nag.calls().len(), 3);
}

#[tokio::test]
async fn test_cancel_interrupts_retry_sleep() {
    let nag = MockNag::new(0);
    nag.with(|s| s.unavailable = u32::MAX);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(5, Duration::from_secs(30)));
    account.set_gateway_url(format!("{}/NAG.php?cep=", base));

    let handle = CancelHandle::new();
    let token = handle.token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), account.refresh_nonce(&token))
        .await
        .expect("cancellation should end the retry sleep")
        .unwrap_err();
    match err {
        NotaryError::Transport(e) => assert_eq!(e.kind, TransportErrorKind::Cancelled),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(nag.calls().len(), 1);
}

#[tokio::test]
async fn test_refresh_on_unopened_account_makes_no_call() {
    let nag = MockNag::new(5);
    let base = nag.spawn().await;

    let mut account = common::account(&base, common::transport(0, Duration::ZERO));
    account.close();

    let err = assert_err!(account.refresh_nonce(&CancelToken::never()).await);
    assert!(matches!(err, NotaryError::AccountNotOpen));
    assert_eq!(account.nonce(), 0);
    assert!(nag.calls().is_empty());
}
