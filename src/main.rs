use fundledger::engine::{LogEventSink, ProfitAnalyzer, SettlementEngine};
use fundledger::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let settlement = Arc::new(SettlementEngine::new(repo.clone(), Arc::new(LogEventSink)));
    let analyzer = Arc::new(ProfitAnalyzer::new(repo.clone()));

    // Optional background settlement loop
    if config.settlement_interval_secs > 0 {
        let engine = settlement.clone();
        let interval_secs = config.settlement_interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                match engine.run().await {
                    Ok(report) => tracing::info!(
                        processed = report.processed,
                        skipped = report.skipped,
                        "scheduled settlement run"
                    ),
                    Err(e) => tracing::warn!(error = %e, "scheduled settlement run failed"),
                }
            }
        });
    }

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, settlement, analyzer));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
