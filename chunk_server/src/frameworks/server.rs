// Framework bootstrap for the chunk server runtime.
//
// Startup order matters: the coordinator must answer pings, the chunk topic
// must exist, registration goes out, and the wall grid must arrive before the
// simulation starts.

use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::domain::ports::{BusConsumer, BusProducer};
use crate::domain::topics;
use crate::domain::world::ChunkWorld;
use crate::frameworks::config;
use crate::frameworks::kafka::{ensure_topic, KafkaConsumer, KafkaProducer};
use crate::interface_adapters::http::{get_map, leaderboard, ping, send_message};
use crate::interface_adapters::net::{run_snapshot_loop, ws_handler, ClientTable};
use crate::interface_adapters::state::AppState;
use crate::use_cases::bootstrap::fetch_map;
use crate::use_cases::reporter::Reporter;
use crate::use_cases::simulation::{populate_world, run_dropper_loop, run_ghost_loop};
use crate::use_cases::sync::run_main_consumer;

/// Delay between readiness probes against the coordinator.
const CENTRAL_PROBE_INTERVAL: Duration = Duration::from_secs(5);

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/map", get(get_map))
        .route("/leaderboard", get(leaderboard))
        .route("/send", post(send_message))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!(%address, "chunk server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<AppState> {
    let chunk_id = config::chunk_id();
    let coordinate = config::chunk_coordinate();
    let chunk_topic = topics::chunk_topic(&coordinate);
    tracing::info!(%chunk_id, %coordinate, %chunk_topic, "chunk identity");

    wait_for_central(&config::central_server_url()).await;

    let broker = config::kafka_bootstrap_server();
    ensure_topic(&broker, &chunk_topic)
        .await
        .map_err(std::io::Error::other)?;

    let producer: Arc<dyn BusProducer> =
        Arc::new(KafkaProducer::new(&broker).map_err(std::io::Error::other)?);
    producer
        .send(topics::CHUNK_TO_CENTRAL, &format!("REGISTER:{chunk_id}"))
        .await
        .map_err(std::io::Error::other)?;
    tracing::info!(%chunk_id, "registered with central server");

    // The bootstrap consumer gets its own group so the map response is not
    // swallowed by the main consumer.
    let map_consumer =
        KafkaConsumer::new(&broker, &format!("{chunk_id}_map"), &[chunk_topic.as_str()])
            .map_err(std::io::Error::other)?;
    let map = Arc::new(fetch_map(&coordinate, producer.as_ref(), &map_consumer).await);
    drop(map_consumer);

    let main_consumer: Arc<dyn BusConsumer> = Arc::new(
        KafkaConsumer::new(
            &broker,
            &chunk_id,
            &[chunk_topic.as_str(), topics::CENTRAL_TO_CHUNK_BROADCAST],
        )
        .map_err(std::io::Error::other)?,
    );

    let world = Arc::new(ChunkWorld::new(coordinate));
    populate_world(&world, &map).await;

    let state = AppState {
        chunk_id: Arc::from(chunk_id.as_str()),
        world: world.clone(),
        map: map.clone(),
        clients: Arc::new(ClientTable::new()),
        producer: producer.clone(),
    };

    tokio::spawn(run_main_consumer(world.clone(), main_consumer));
    tokio::spawn(run_ghost_loop(world.clone(), map.clone()));
    tokio::spawn(run_dropper_loop(world.clone(), map));
    tokio::spawn(run_snapshot_loop(state.clone()));
    tokio::spawn(Reporter::new(world, producer).run());

    Ok(state)
}

/// Block until the coordinator answers its readiness probe.
async fn wait_for_central(base_url: &str) {
    let client = reqwest::Client::new();
    loop {
        match client.get(format!("{base_url}/ping")).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(%base_url, "central server is up");
                return;
            }
            Ok(response) => {
                tracing::warn!(%base_url, status = %response.status(), "central server not ready")
            }
            Err(err) => tracing::warn!(%base_url, error = %err, "central server not reachable"),
        }
        tokio::time::sleep(CENTRAL_PROBE_INTERVAL).await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutting down chunk server");
}
