use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use backend::{
    AppState,
    config::Config,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
    storage::StorageClient,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'fieldforce_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    let http = reqwest::Client::new();
    let storage = StorageClient::new(&config, http.clone());

    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc,
        http,
        storage,
    };

    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    let public_routes = Router::new().route("/auth/login", post(routes::auth::login));

    let protected_routes = Router::new()
        // session routes
        .route("/auth/refresh-token", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        // attendance routes
        .route("/attendance/check-in", post(routes::attendance::check_in))
        .route("/attendance/check-out", post(routes::attendance::check_out))
        .route(
            "/attendance/emergency-check-out",
            post(routes::attendance::emergency_check_out),
        )
        .route("/attendance/location", post(routes::attendance::update_location))
        .route("/attendance/status", get(routes::attendance::get_status))
        .route("/attendance/records", get(routes::attendance::list_records))
        .route(
            "/attendance/records/{id}/verification",
            put(routes::attendance::update_verification),
        )
        // employee directory routes
        .route("/employees", post(routes::employee::create_employee))
        .route("/employees", get(routes::employee::list_employees))
        .route("/employees/check-email", get(routes::employee::check_email))
        .route("/employees/check-phone", get(routes::employee::check_phone))
        .route(
            "/employees/check-employee-id",
            get(routes::employee::check_employee_id),
        )
        .route("/employees/{id}", get(routes::employee::get_employee))
        .route("/employees/{id}", put(routes::employee::update_employee))
        .route(
            "/employees/{id}/status",
            put(routes::employee::change_employment_status),
        )
        .route(
            "/employees/{id}/regions",
            get(routes::employee::get_assigned_regions),
        )
        .route(
            "/employees/{id}/regions",
            put(routes::employee::replace_regions),
        )
        .route(
            "/employees/{id}/reset-password",
            post(routes::employee::reset_password),
        )
        // region routes
        .route("/regions", post(routes::region::create_region))
        .route("/regions", get(routes::region::list_regions))
        .route("/regions/{id}", get(routes::region::get_region))
        .route("/regions/{id}", put(routes::region::update_region))
        .route("/regions/{id}", delete(routes::region::delete_region))
        // dealer network routes
        .route("/dealers", post(routes::network::create_dealer))
        .route("/dealers", get(routes::network::list_dealers))
        .route("/dealers/{id}", put(routes::network::update_dealer))
        .route("/dealers/{id}", delete(routes::network::delete_dealer))
        .route("/retailers", post(routes::network::create_retailer))
        .route("/retailers", get(routes::network::list_retailers))
        .route("/retailers/{id}", put(routes::network::update_retailer))
        .route("/retailers/{id}", delete(routes::network::delete_retailer))
        .route("/farmers", post(routes::network::create_farmer))
        .route("/farmers", get(routes::network::list_farmers))
        .route("/farmers/{id}", put(routes::network::update_farmer))
        .route("/farmers/{id}", delete(routes::network::delete_farmer))
        // geocoding helpers
        .route("/geo/reverse-geocode", get(routes::geo::reverse_geocode))
        .route("/geo/geocode", get(routes::geo::geocode))
        .route("/geo/quality", get(routes::geo::location_quality))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    let app = router.with_state(state.clone());

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
