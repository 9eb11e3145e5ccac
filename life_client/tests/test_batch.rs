use candid::Principal;
use life_client::batch::BatchPhase;
use life_client::patterns::{self, Pattern};
use life_client::types::FAUCET_AMOUNT;
use life_client::{
    AuthorityClient, BatchError, Cell, ClientConfig, LocalAuthority, QuadrantLayout, Session,
    Stepper, TieBreak,
};
use std::sync::Arc;
use std::time::Duration;

const COMMIT_TIMEOUT: Duration = Duration::from_secs(1);

fn config() -> ClientConfig {
    ClientConfig {
        grid_size: 16,
        quadrants: 4,
        step_interval: Duration::from_millis(100),
        sync_interval: Duration::from_millis(1_000),
        fetch_timeout: Duration::from_millis(500),
        commit_timeout: COMMIT_TIMEOUT,
        wipe_period_secs: 300,
        tie_break: TieBreak::CellPosition,
    }
}

fn player(n: u8) -> Principal {
    Principal::from_slice(&[n])
}

/// Authority with player 1 funded, plus a session for player 1
fn setup() -> (Arc<LocalAuthority>, Arc<AuthorityClient>, Session) {
    let layout = QuadrantLayout::new(16, 4).unwrap();
    let auth = Arc::new(LocalAuthority::new(
        Stepper::new(layout, TieBreak::CellPosition),
        Duration::from_secs(300),
    ));
    auth.join(player(1)).unwrap();
    auth.faucet(player(1)).unwrap();
    let client = Arc::new(auth.client(player(1)));
    let session = Session::new(config(), client.clone()).unwrap();
    (auth, client, session)
}

#[tokio::test]
async fn test_commit_adopts_authority_balance() {
    let (auth, _, session) = setup();
    session.sync_once().await.unwrap();
    assert_eq!(session.store().balance(), Some(FAUCET_AMOUNT));

    session.batcher().add(&patterns::glider(), (2, 2)).unwrap();
    session.batcher().add(&patterns::block(), (10, 10)).unwrap();
    assert_eq!(session.batcher().cost(), 9);

    let result = session.commit().await.unwrap();
    assert_eq!(result.placed, 9);
    assert_eq!(result.new_balance, FAUCET_AMOUNT - 9);
    assert_eq!(session.store().balance(), Some(FAUCET_AMOUNT - 9));
    assert_eq!(session.store().status().balances, vec![FAUCET_AMOUNT - 9]);
    assert!(session.batcher().is_empty());
    assert_eq!(session.batcher().phase(), BatchPhase::Empty);

    // Placements reach the local grid only through the next sync
    assert_eq!(session.store().snapshot().grid.alive_count(), 0);
    session.sync_once().await.unwrap();
    assert_eq!(session.store().snapshot().grid, auth.grid());
    assert_eq!(session.store().snapshot().grid.get(3, 2), Cell::new(1, true, 1));
}

#[tokio::test]
async fn test_commit_before_first_sync_has_no_funds() {
    let (_, _, session) = setup();
    session.batcher().add(&patterns::glider(), (2, 2)).unwrap();

    let err = session.commit().await.unwrap_err();
    assert_eq!(err, BatchError::InsufficientFunds { cost: 5, balance: 0 });
    assert_eq!(session.batcher().len(), 1);
}

#[tokio::test]
async fn test_live_cell_conflict_is_caught_locally() {
    let (auth, _, session) = setup();
    auth.seed_cell(11, 10, Cell::new(2, true, 0));
    auth.seed_cell(10, 11, Cell::new(2, true, 0));
    session.sync_once().await.unwrap();

    session.batcher().add(&patterns::block(), (10, 10)).unwrap();
    let err = session.commit().await.unwrap_err();
    assert_eq!(
        err,
        BatchError::LiveCellConflict {
            cells: vec![(10, 11), (11, 10)]
        }
    );
    assert_eq!(auth.balance_of(player(1)), FAUCET_AMOUNT);
}

#[tokio::test]
async fn test_internal_overlap_wraps_edges() {
    let (_, _, session) = setup();
    session.sync_once().await.unwrap();

    session.batcher().add(&patterns::blinker(), (14, 0)).unwrap();
    // Anchor -2 wraps onto column 14
    session.batcher().add(&patterns::block(), (-2, 0)).unwrap();

    let err = session.commit().await.unwrap_err();
    assert_eq!(
        err,
        BatchError::InternalOverlap {
            cells: vec![(14, 0), (15, 0)]
        }
    );
    assert_eq!(session.batcher().len(), 2);
}

#[tokio::test]
async fn test_server_rejection_keeps_batch() {
    let (auth, _, session) = setup();
    auth.seed_cell(5, 5, Cell::new(2, false, 2));
    session.sync_once().await.unwrap();

    let single = Pattern::new("dot", vec![(0, 0)]);
    session.batcher().add(&single, (5, 5)).unwrap();

    let err = session.commit().await.unwrap_err();
    assert_eq!(
        err,
        BatchError::ServerRejection("Cannot place on enemy territory with coins".to_string())
    );
    assert_eq!(session.batcher().len(), 1);
    assert!(!session.batcher().is_committing());
    assert_eq!(session.store().balance(), Some(FAUCET_AMOUNT));
}

#[tokio::test]
async fn test_offline_commit_is_network_failure() {
    let (auth, _, session) = setup();
    session.sync_once().await.unwrap();
    session.batcher().add(&patterns::block(), (0, 0)).unwrap();

    auth.set_offline(true);
    let err = session.commit().await.unwrap_err();
    assert!(matches!(err, BatchError::NetworkFailure(_)));
    assert_eq!(session.batcher().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_commit_times_out() {
    let (auth, _, session) = setup();
    session.sync_once().await.unwrap();
    session.batcher().add(&patterns::block(), (0, 0)).unwrap();

    auth.set_latency(Duration::from_secs(20));
    let err = session.commit().await.unwrap_err();
    assert_eq!(err, BatchError::Timeout(COMMIT_TIMEOUT));
    assert_eq!(session.batcher().phase(), BatchPhase::Accumulating);
}

#[tokio::test(start_paused = true)]
async fn test_second_commit_refused_while_in_flight() {
    let (auth, client, session) = setup();
    session.sync_once().await.unwrap();
    session.batcher().add(&patterns::block(), (0, 0)).unwrap();
    auth.set_latency(Duration::from_millis(300));

    let batcher = session.batcher().clone();
    let store = session.store().clone();
    let first = tokio::spawn(async move {
        batcher
            .commit(&*client, &store, Duration::from_secs(5))
            .await
    });

    while !session.batcher().is_committing() {
        tokio::task::yield_now().await;
    }
    assert_eq!(session.batcher().phase(), BatchPhase::Committing);

    let err = session.commit().await.unwrap_err();
    assert_eq!(err, BatchError::CommitInFlight);

    // Added during the round trip, so it survives the first commit
    let late = session.batcher().add(&patterns::blinker(), (8, 8)).unwrap();

    let result = first.await.unwrap().unwrap();
    assert_eq!(result.placed, 4);
    let remaining = session.batcher().placements();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, late);
    assert!(!session.batcher().is_committing());
}
