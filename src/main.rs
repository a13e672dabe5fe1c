mod config;
mod db;
mod engine;
mod models;
mod responses;
mod routes;
mod services;
mod state;
mod worker;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use config::Config;
use db::postgres_automation_repository::PostgresAutomationRepository;
use db::postgres_lead_repository::PostgresLeadRepository;
use reqwest::Client;
use responses::JsonResponse;
use routes::{
    admin::run_automations,
    automations::{
        create_automation, delete_automation, get_automation, list_automation_logs,
        list_automations, toggle_automation, update_automation,
    },
    leads::{create_lead, list_lead_logs, move_lead_stage},
    webhooks::{receive_whatsapp_webhook, verify_whatsapp_webhook},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::db::{
    automation_repository::AutomationRepository, lead_repository::LeadRepository,
};
use crate::engine::actions::ActionRegistry;
use crate::services::whatsapp::{Messenger, WhatsAppClient};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let config = Arc::new(Config::from_env());

    let pg_pool = establish_connection(&config.database_url).await;
    let automation_repo = Arc::new(PostgresAutomationRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn AutomationRepository>;

    let lead_repo = Arc::new(PostgresLeadRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn LeadRepository>;

    let messenger = Arc::new(WhatsAppClient {
        client: Client::new(),
        settings: config.whatsapp.clone(),
    }) as Arc<dyn Messenger>;

    let state = AppState {
        automation_repo,
        lead_repo,
        messenger,
        actions: Arc::new(ActionRegistry::default()),
        config: config.clone(),
    };
    let state_for_worker = state.clone();

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let business_routes = Router::new()
        .route(
            "/{business_id}/automations",
            post(create_automation).get(list_automations),
        )
        .route("/{business_id}/leads", post(create_lead));

    let automation_routes = Router::new()
        .route(
            "/{automation_id}",
            get(get_automation)
                .put(update_automation)
                .delete(delete_automation),
        )
        .route("/{automation_id}/toggle", post(toggle_automation))
        .route("/{automation_id}/logs", get(list_automation_logs));

    let lead_routes = Router::new()
        .route("/{lead_id}/stage", post(move_lead_stage))
        .route("/{lead_id}/automation-logs", get(list_lead_logs));

    // Public webhook routes (no auth; payloads are signature-checked)
    let webhook_routes = Router::new().route(
        "/whatsapp/{business_id}",
        get(verify_whatsapp_webhook).post(receive_whatsapp_webhook),
    );

    let admin_routes = Router::new().route("/automations/run", post(run_automations));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/businesses", business_routes)
        .nest("/api/automations", automation_routes)
        .nest("/api/leads", lead_routes)
        .nest("/api/webhooks", webhook_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    worker::start_background_workers(state_for_worker).await;

    let listener = TcpListener::bind(addr).await.unwrap();
    println!("Running at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Hello, Leadline!").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("✅ Successfully connected to the database");
    pool
}
