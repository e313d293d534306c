// Framework bootstrap for the coordinator runtime.

use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::domain::ports::{BusConsumer, BusProducer, ChunkStore, ClusterApi, MapStore, StorePing, UserStore};
use crate::domain::topics;
use crate::frameworks::config;
use crate::frameworks::kafka::{KafkaConsumer, KafkaProducer};
use crate::frameworks::kube::KubeCluster;
use crate::frameworks::mongo::MongoStore;
use crate::interface_adapters::handlers::{
    broadcast_message, dbconn, decommission_chunk, get_or_provision_chunk, list_chunks, ping,
    send_to_chunk,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::broadcaster::Broadcaster;
use crate::use_cases::hub::ProtocolHub;
use crate::use_cases::placement::PlacementController;

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
        .route("/dbconn", get(dbconn))
        .route("/list_chunks", get(list_chunks))
        .route("/chunks", post(get_or_provision_chunk).delete(decommission_chunk))
        .route("/broadcast", post(broadcast_message))
        .route("/send/{chunk_id}", post(send_to_chunk))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!(%address, "central server listening");

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
    let store = MongoStore::connect(&config::mongo_uri())
        .await
        .map_err(std::io::Error::other)?;

    let broker = config::kafka_bootstrap_server();
    let producer: Arc<dyn BusProducer> =
        Arc::new(KafkaProducer::new(&broker).map_err(std::io::Error::other)?);
    let consumer: Arc<dyn BusConsumer> = Arc::new(
        KafkaConsumer::new(
            &broker,
            topics::CENTRAL_CONSUMER_GROUP,
            &[topics::CHUNK_TO_CENTRAL],
        )
        .map_err(std::io::Error::other)?,
    );

    let clusters = KubeCluster::from_kubeconfigs(&config::kubeconfig_paths())
        .await
        .map_err(std::io::Error::other)?;
    let apis: Vec<Arc<dyn ClusterApi>> = clusters
        .into_iter()
        .map(|cluster| Arc::new(cluster) as Arc<dyn ClusterApi>)
        .collect();

    let chunks: Arc<dyn ChunkStore> = Arc::new(store.clone());
    let users: Arc<dyn UserStore> = Arc::new(store.clone());
    let maps: Arc<dyn MapStore> = Arc::new(store.clone());
    let db_ping: Arc<dyn StorePing> = Arc::new(store);

    let placement = Arc::new(PlacementController::new(
        apis,
        chunks,
        config::chunk_domain(),
    ));
    // Pods that survived a coordinator restart get records straight away.
    if let Err(err) = placement.seed_existing_chunks().await {
        tracing::warn!(error = %err, "startup chunk seeding failed");
    }

    let hub = Arc::new(ProtocolHub::new(users.clone(), maps, producer.clone()));
    let registered = hub.registered();

    {
        let hub = hub.clone();
        tokio::spawn(async move {
            hub.run(consumer).await;
        });
    }
    {
        let broadcaster = Broadcaster::new(users, producer);
        tokio::spawn(async move {
            broadcaster.run().await;
        });
    }

    Ok(AppState {
        placement,
        hub,
        registered,
        db_ping,
    })
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
    tracing::info!("shutting down central server");
}
