//! Unit tests for Lightning swap preconditions
//!
//! Tests cover duplicate payment detection, liquidity snapshot caching,
//! single-channel inbound policy and abort propagation between sibling checks.

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{MockLightningWallet, DUMMY_PAID_HASH, DUMMY_UNKNOWN_HASH};

use std::sync::Arc;
use std::time::Duration;

use swap_intermediary::assertions::{LightningAssertions, DEFAULT_LIQUIDITY_TTL};
use swap_intermediary::cancel::AbortController;
use swap_intermediary::config::Config;
use swap_intermediary::error::{
    SwapError, DUPLICATE_PAYMENT, NOT_ENOUGH_INBOUND_LIQUIDITY, NOT_ENOUGH_LIQUIDITY,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn assertions_for(wallet: &Arc<MockLightningWallet>) -> LightningAssertions {
    LightningAssertions::new(wallet.clone(), DEFAULT_LIQUIDITY_TTL)
}

// ============================================================================
// PRIOR PAYMENT TESTS
// ============================================================================

/// Test: check_prior_payment rejects a hash the node already paid
/// Verifies: Fault 20010 "Already processed"
/// Why: Paying the same invoice twice loses funds
#[tokio::test]
async fn test_prior_payment_duplicate_is_rejected() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    let err = assertions
        .check_prior_payment(DUMMY_PAID_HASH, &controller.signal())
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(DUPLICATE_PAYMENT));
    match err {
        SwapError::Business(fault) => assert_eq!(fault.msg, "Already processed"),
        other => panic!("Expected business fault, got {:?}", other),
    }
}

/// Test: check_prior_payment passes for an unknown hash
/// Verifies: No fault when the node has no matching payment
#[tokio::test]
async fn test_prior_payment_unknown_hash_passes() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    assert!(assertions
        .check_prior_payment(DUMMY_UNKNOWN_HASH, &controller.signal())
        .await
        .is_ok());
}

/// Test: check_prior_payment honors a scope aborted before the call
/// Verifies: The original abort cause is returned even though the hash is unknown
/// Why: A sibling failure must stop every check sharing the controller
#[tokio::test]
async fn test_prior_payment_honors_pre_aborted_scope() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();
    controller.abort(SwapError::business(NOT_ENOUGH_LIQUIDITY, "Not enough liquidity"));

    let err = assertions
        .check_prior_payment(DUMMY_UNKNOWN_HASH, &controller.signal())
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(NOT_ENOUGH_LIQUIDITY));
}

/// Test: a failed payment lookup in an aborted scope reports the abort cause
/// Verifies: The sibling's fault 20002 wins over the backend error
/// Why: Callers must see why the scope stopped, not a secondary failure
#[tokio::test]
async fn test_prior_payment_lookup_failure_keeps_abort_cause() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000).failing_payments());
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();
    controller.abort(SwapError::business(NOT_ENOUGH_LIQUIDITY, "Not enough liquidity"));

    let err = assertions
        .check_prior_payment(DUMMY_UNKNOWN_HASH, &controller.signal())
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(NOT_ENOUGH_LIQUIDITY));
}

/// Test: a failed payment lookup in a live scope surfaces the backend error
#[tokio::test]
async fn test_prior_payment_lookup_failure_without_abort() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000).failing_payments());
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    let err = assertions
        .check_prior_payment(DUMMY_UNKNOWN_HASH, &controller.signal())
        .await
        .unwrap_err();

    assert!(matches!(err, SwapError::Backend(_)));
    assert!(err.to_string().contains("lnd payment lookup failed"));
}

// ============================================================================
// OUTBOUND LIQUIDITY TESTS
// ============================================================================

/// Test: assertions built from configuration use the configured snapshot lifetime
/// Verifies: `[lightning] liquidity_cache_ttl_ms` decides reuse versus refresh
#[tokio::test(start_paused = true)]
async fn test_liquidity_ttl_from_config() {
    let config = Config::from_toml_str(
        r#"
[api]
host = "127.0.0.1"
port = 4000

[info]
default_chain = "A"

[[chains]]
chain_id = "A"
type = "ed25519"
private_key_env = "TEST_CHAIN_A_KEY"

[lightning]
liquidity_cache_ttl_ms = 1000
"#,
    )
    .unwrap();
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = LightningAssertions::from_config(wallet.clone(), &config.lightning);
    let signal = AbortController::new().signal();

    assert_eq!(assertions.liquidity_ttl(), Duration::from_millis(1000));

    assertions.check_liquidity(10_000, &signal, true).await.unwrap();
    tokio::time::advance(Duration::from_millis(900)).await;
    assertions.check_liquidity(10_000, &signal, true).await.unwrap();
    assert_eq!(wallet.balance_calls(), 1);

    // Past the configured lifetime but well inside the default one
    tokio::time::advance(Duration::from_millis(200)).await;
    assertions.check_liquidity(10_000, &signal, true).await.unwrap();
    assert_eq!(wallet.balance_calls(), 2);
}

/// Test: two cached liquidity checks within the TTL query the node once
/// Verifies: Snapshot reuse
#[tokio::test(start_paused = true)]
async fn test_liquidity_snapshot_reused_within_ttl() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let signal = AbortController::new().signal();

    assertions.check_liquidity(10_000, &signal, true).await.unwrap();
    tokio::time::advance(Duration::from_millis(4_000)).await;
    assertions.check_liquidity(20_000, &signal, true).await.unwrap();

    assert_eq!(wallet.balance_calls(), 1);
}

/// Test: a cached liquidity check after the TTL refreshes the snapshot
/// Verifies: Expired snapshots are never used
#[tokio::test(start_paused = true)]
async fn test_liquidity_snapshot_refreshed_after_ttl() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let signal = AbortController::new().signal();

    assertions.check_liquidity(10_000, &signal, true).await.unwrap();
    tokio::time::advance(DEFAULT_LIQUIDITY_TTL + Duration::from_millis(1)).await;

    // Balance dropped meanwhile; the refreshed snapshot must see it
    wallet.set_local_balance(5_000);
    let err = assertions.check_liquidity(10_000, &signal, true).await.unwrap_err();

    assert_eq!(wallet.balance_calls(), 2);
    assert_eq!(err.code(), Some(NOT_ENOUGH_LIQUIDITY));
    assert_eq!(assertions.snapshot().await.map(|s| s.amount), Some(5_000));
}

/// Test: use_cached = false always queries the node
/// Verifies: Callers can force a fresh balance
#[tokio::test(start_paused = true)]
async fn test_liquidity_uncached_always_queries() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let signal = AbortController::new().signal();

    assertions.check_liquidity(10_000, &signal, false).await.unwrap();
    assertions.check_liquidity(10_000, &signal, false).await.unwrap();

    assert_eq!(wallet.balance_calls(), 2);
}

/// Test: liquidity equal to the amount is sufficient, one sat more is not
/// Verifies: Fault 20002 boundary
#[tokio::test]
async fn test_liquidity_boundary() {
    let wallet = Arc::new(MockLightningWallet::new(50_000));
    let assertions = assertions_for(&wallet);
    let signal = AbortController::new().signal();

    assert!(assertions.check_liquidity(50_000, &signal, true).await.is_ok());
    let err = assertions.check_liquidity(50_001, &signal, true).await.unwrap_err();
    assert_eq!(err.code(), Some(NOT_ENOUGH_LIQUIDITY));
}

/// Test: snapshots are owned per assertions instance
/// Verifies: A second backend never sees the first backend's cached balance
#[tokio::test]
async fn test_liquidity_snapshot_not_shared_across_instances() {
    let rich = Arc::new(MockLightningWallet::new(1_000_000));
    let poor = Arc::new(MockLightningWallet::new(1_000));
    let signal = AbortController::new().signal();

    assertions_for(&rich).check_liquidity(10_000, &signal, true).await.unwrap();
    let err = assertions_for(&poor)
        .check_liquidity(10_000, &signal, true)
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(NOT_ENOUGH_LIQUIDITY));
}

// ============================================================================
// INBOUND LIQUIDITY TESTS
// ============================================================================

/// Test: inbound liquidity requires one channel covering the whole amount
/// Verifies: Remote balances are not summed across channels (fault 20050)
#[tokio::test]
async fn test_inbound_liquidity_single_channel_policy() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000).with_channels(&[30_000, 40_000]));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    let prefetch = assertions.get_channels_prefetch(&controller);
    let err = assertions
        .check_inbound_liquidity(50_000, prefetch, &controller.signal())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(NOT_ENOUGH_INBOUND_LIQUIDITY));

    let prefetch = assertions.get_channels_prefetch(&controller);
    assert!(assertions
        .check_inbound_liquidity(40_000, prefetch, &controller.signal())
        .await
        .is_ok());
}

/// Test: a failed channel prefetch aborts the scope
/// Verifies: The inbound check returns the fetch error, not a generic cancellation
#[tokio::test]
async fn test_inbound_liquidity_prefetch_failure_aborts_scope() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000).failing_channels(Duration::ZERO));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    let prefetch = assertions.get_channels_prefetch(&controller);
    let err = assertions
        .check_inbound_liquidity(1_000, prefetch, &controller.signal())
        .await
        .unwrap_err();

    assert!(controller.is_aborted());
    assert!(matches!(err, SwapError::Backend(_)));
    assert!(err.to_string().contains("lnd unreachable"));
}

// ============================================================================
// COMBINED PRECONDITION TESTS
// ============================================================================

/// Test: all preconditions pass for a fresh payment with enough liquidity
#[tokio::test]
async fn test_swap_preconditions_pass() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000).with_channels(&[200_000]));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    assertions
        .check_swap_preconditions(DUMMY_UNKNOWN_HASH, 100_000, Some(100_000), &controller)
        .await
        .unwrap();

    assert!(!controller.is_aborted());
    assert_eq!(wallet.balance_calls(), 1);
}

/// Test: a failing precondition aborts the shared controller with its cause
/// Verifies: Later observers of the scope see fault 20010
#[tokio::test]
async fn test_swap_preconditions_failure_aborts_controller() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    let err = assertions
        .check_swap_preconditions(DUMMY_PAID_HASH, 1_000, None, &controller)
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(DUPLICATE_PAYMENT));
    assert!(controller.is_aborted());
    assert_eq!(
        controller.signal().throw_if_aborted().unwrap_err().code(),
        Some(DUPLICATE_PAYMENT)
    );
}

/// Test: a prefetch failing while the liquidity query is in flight halts the liquidity check
/// Verifies: The sibling observes the prefetch error at its next checkpoint
/// Why: The prefetch and the liquidity check never call each other; the controller links them
#[tokio::test(start_paused = true)]
async fn test_prefetch_failure_halts_in_flight_liquidity_check() {
    let wallet = Arc::new(
        MockLightningWallet::new(1_000_000)
            .failing_channels(Duration::from_millis(10))
            .with_balance_delay(Duration::from_millis(50)),
    );
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    let err = assertions
        .check_swap_preconditions(DUMMY_UNKNOWN_HASH, 1_000, Some(1_000), &controller)
        .await
        .unwrap_err();

    assert!(matches!(err, SwapError::Backend(_)));
    assert!(err.to_string().contains("lnd unreachable"));
    assert_eq!(wallet.balance_calls(), 1);
    assert!(controller.is_aborted());
}

/// Test: no channel prefetch is started when no inbound amount is requested
#[tokio::test]
async fn test_swap_preconditions_skip_inbound_check() {
    let wallet = Arc::new(MockLightningWallet::new(1_000_000));
    let assertions = assertions_for(&wallet);
    let controller = AbortController::new();

    assertions
        .check_swap_preconditions(DUMMY_UNKNOWN_HASH, 1_000, None, &controller)
        .await
        .unwrap();

    assert_eq!(wallet.channel_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
