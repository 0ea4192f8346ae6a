use axum::{
    Json, Router,
    routing::{get, post, put},
};
use serde::Serialize;
use time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::Key};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerette::config::Config;
use ledgerette::constants::{SESSION_EXPIRY_DAYS, SESSION_NAME};
use ledgerette::{admin, auth, database, nav, records, reports};

#[tokio::main]
async fn main() {
    // load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerette=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    let db = database::init_db(&config.data_path)
        .await
        .expect("Failed to initialize database");

    // Seeded fixtures may carry plaintext passwords; upgrade them before
    // accepting logins.
    match auth::rehash_seed_passwords(&db).await {
        Ok(0) => {}
        Ok(upgraded) => tracing::info!(upgraded, "rehashed seeded passwords"),
        Err(err) => tracing::warn!(error = %err, "seed password rehash failed"),
    }

    let store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(false)
        .with_name(SESSION_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_signed(Key::try_from(config.session_secret.as_bytes()).expect(
            "SESSION_SECRET must be at least 64 bytes; Config::from_env enforces this",
        ));

    let app = Router::new()
        .route("/", get(root))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/records",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/records/{id}",
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        .route("/records/upload", post(records::upload_csv))
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/admin/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/admin/roles", get(admin::list_roles))
        .route(
            "/admin/nav",
            get(admin::list_nav_items).post(admin::create_nav_item),
        )
        .route(
            "/admin/nav/{id}",
            put(admin::update_nav_item).delete(admin::delete_nav_item),
        )
        .route("/api/stats", get(reports::api_stats))
        .route("/api/chart-data", get(reports::api_chart_data))
        .route("/api/records-list", get(reports::api_records_list))
        .route("/api/timeseries", get(reports::api_timeseries))
        .route("/api/nav", get(nav::api_nav))
        .layer(TraceLayer::new_for_http())
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .with_state(db);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .expect("Failed to bind server address");
    tracing::info!(address = %bind_address, "listening");

    axum::serve(listener, app).await.expect("Server error");
}

#[derive(Serialize)]
struct Liveness {
    service: &'static str,
    status: &'static str,
}

async fn root() -> Json<Liveness> {
    Json(Liveness {
        service: "ledgerette",
        status: "ok",
    })
}
