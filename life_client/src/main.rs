use candid::Principal;
use life_client::{patterns, ClientConfig, LocalAuthority, Session, Stepper};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Life client demo v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}x{} grid, {} quadrants, tie-break {:?}",
        config.grid_size, config.grid_size, config.quadrants, config.tie_break
    );

    // In-process authority stepping at the same cadence as the client
    let layout = life_client::QuadrantLayout::new(config.grid_size, config.quadrants)
        .map_err(anyhow::Error::msg)?;
    let authority = Arc::new(LocalAuthority::new(
        Stepper::new(layout, config.tie_break),
        Duration::from_secs(config.wipe_period_secs),
    ));
    let ticker = authority.spawn_ticker(config.step_interval, 1);

    let me = Principal::from_slice(&[1]);
    let player_num = authority.join(me).map_err(anyhow::Error::msg)?;
    let balance = authority.faucet(me).map_err(anyhow::Error::msg)?;
    info!("Joined as player {} with {} coins", player_num, balance);

    let session = Session::new(config.clone(), Arc::new(authority.client(me)))
        .map_err(anyhow::Error::msg)?;

    // First sync fills in the balance the batcher validates against
    session.sync_once().await?;

    let center = (config.grid_size / 2) as i32;
    for (name, offset) in [("glider", (-20, -20)), ("acorn", (0, 0)), ("r-pentomino", (20, 20))] {
        if let Some(pattern) = patterns::by_name(name) {
            session
                .batcher()
                .add(&pattern, (center + offset.0, center + offset.1))?;
        }
    }
    info!(
        "Queued {} placements costing {}",
        session.batcher().len(),
        session.batcher().cost()
    );

    match session.commit().await {
        Ok(result) => info!(
            "Placed {} cells at generation {}, balance {}",
            result.placed, result.generation, result.new_balance
        ),
        Err(e) => warn!("Placement rejected: {}", e),
    }

    // Optional bounded run, otherwise until Ctrl+C
    let run_for: Option<u64> = std::env::var("LIFE_DEMO_SECS")
        .ok()
        .and_then(|s| s.parse().ok());

    let shutdown = async move {
        match run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
        info!("Shutdown signal received");
    };

    let stats = session.run(shutdown).await;
    ticker.abort();

    let frame = session.store().snapshot();
    info!(
        "Final generation {}: {} alive cells, {} local steps discarded by syncs",
        frame.generation,
        frame.grid.alive_count(),
        stats.discarded_steps
    );
    for q in session.quadrant_info() {
        if q.total_territory > 0 {
            info!(
                "Quadrant {}: territory {}, coins {}, controller {}",
                q.quadrant, q.total_territory, q.total_coins, q.controller
            );
        }
    }

    Ok(())
}
