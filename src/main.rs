use std::sync::Arc;

use axum::{routing, Json, Router, Server};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::draw::picker::EntropyPicker;
use crate::store::{create_store, Store};

mod admin;
mod auth;
mod draw;
mod participant;
mod raffle;
mod stats;
mod ticket;

mod config;
mod notify;
mod store;
mod types;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), hyper::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    struct SecurityAddon;

    impl Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme(
                    "bearer_token",
                    SecurityScheme::Http(
                        HttpBuilder::new()
                            .scheme(HttpAuthScheme::Bearer)
                            .bearer_format("JWT")
                            .build(),
                    ),
                );
            }
        }
    }

    #[derive(OpenApi)]
    #[openapi(
        paths(
            auth::login,
            auth::me,
            participant::create_participant,
            participant::list_participants,
            participant::get_participant,
            raffle::create_raffle,
            raffle::list_raffles,
            raffle::get_raffle,
            raffle::complete_raffle,
            raffle::delete_raffle,
            ticket::reserve_tickets,
            ticket::confirm_payment,
            ticket::list_participant_tickets,
            ticket::list_raffle_tickets,
            ticket::list_pending_tickets,
            draw::perform_draw,
            draw::list_raffle_winners,
            draw::list_winner_links,
            draw::mark_winner_notified,
            stats::get_raffle_stats,
            stats::get_overview_stats,
            admin::create_admin,
            admin::update_admin,
            admin::delete_admin,
            admin::list_admins,
        ),
        components(
            schemas(
                types::Participant, types::Raffle, types::Ticket,
                types::TicketStatus, types::Winner, types::AdminProfile,
            ),
            schemas(auth::AuthError, auth::LoginPayload, auth::TokenResponse),
            schemas(participant::ParticipantError, participant::CreateParticipantPayload),
            schemas(raffle::RaffleError, raffle::CreateRafflePayload),
            schemas(
                ticket::TicketError, ticket::ReservePayload, ticket::ReserveResult,
                ticket::AdminAlertLink, ticket::ConfirmPaymentPayload, ticket::PendingTicket,
            ),
            schemas(
                draw::DrawError, draw::DrawPayload, draw::WinnerDetails,
                draw::WinnerLink, draw::WinnerLinksResult,
            ),
            schemas(stats::StatsError, stats::RaffleStats, stats::OverviewStats),
            schemas(admin::AdminError, admin::CreateAdminPayload, admin::UpdateAdminPayload),
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "auth", description = "Administrator authentication"),
            (name = "participant", description = "Participant registration and lookup"),
            (name = "raffle", description = "Raffle management"),
            (name = "ticket", description = "Ticket reservation and payment confirmation"),
            (name = "draw", description = "Prize draws and winners"),
            (name = "stats", description = "Sales statistics"),
            (name = "admin", description = "Administrator management")
        )
    )]
    struct ApiDoc;

    let config = Config::from_env().expect("Invalid configuration");
    let address = config.bind_address;

    let store = create_store(config, Arc::new(EntropyPicker)).await;

    let app = create_app(store)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"));

    tracing::info!(%address, "raffle server listening");
    Server::bind(&address).serve(app.into_make_service()).await
}

pub fn create_app(store: Arc<Store>) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/health", routing::get(health))
        .route("/api/auth/login", routing::post(auth::login))
        .route("/api/auth/me", routing::get(auth::me))
        .route(
            "/api/participants",
            routing::get(participant::list_participants).post(participant::create_participant),
        )
        .route(
            "/api/participants/:id",
            routing::get(participant::get_participant),
        )
        .route(
            "/api/raffles",
            routing::get(raffle::list_raffles).post(raffle::create_raffle),
        )
        .route(
            "/api/raffles/:id",
            routing::get(raffle::get_raffle).delete(raffle::delete_raffle),
        )
        .route(
            "/api/raffles/:id/complete",
            routing::put(raffle::complete_raffle),
        )
        .route("/api/tickets/reserve", routing::post(ticket::reserve_tickets))
        .route(
            "/api/tickets/confirm-payment",
            routing::post(ticket::confirm_payment),
        )
        .route(
            "/api/tickets/pending",
            routing::get(ticket::list_pending_tickets),
        )
        .route(
            "/api/tickets/participant/:id",
            routing::get(ticket::list_participant_tickets),
        )
        .route(
            "/api/tickets/raffle/:id",
            routing::get(ticket::list_raffle_tickets),
        )
        .route("/api/draw", routing::post(draw::perform_draw))
        .route(
            "/api/winners/raffle/:id",
            routing::get(draw::list_raffle_winners),
        )
        .route(
            "/api/winners/raffle/:id/links",
            routing::get(draw::list_winner_links),
        )
        .route(
            "/api/winners/:id/notified",
            routing::put(draw::mark_winner_notified),
        )
        .route("/api/stats/raffle/:id", routing::get(stats::get_raffle_stats))
        .route("/api/stats/overview", routing::get(stats::get_overview_stats))
        .route(
            "/api/admins",
            routing::get(admin::list_admins).post(admin::create_admin),
        )
        .route(
            "/api/admins/:id",
            routing::put(admin::update_admin).delete(admin::delete_admin),
        )
        .with_state(store)
}

#[derive(Serialize, Deserialize, ToSchema)]
struct ServiceInfo {
    message: String,
    docs: String,
    redoc: String,
    version: String,
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Welcome to Raffle Management API".to_string(),
        docs: "/swagger-ui".to_string(),
        redoc: "/redoc".to_string(),
        version: VERSION.to_string(),
    })
}

#[derive(Serialize, Deserialize, ToSchema)]
struct HealthStatus {
    status: String,
    timestamp: i64,
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_store() -> Arc<Store> {
        let config = Config::from_env().unwrap();
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();

        Arc::new(Store {
            db_pool,
            config,
            picker: Arc::new(EntropyPicker),
        })
    }

    #[tokio::test]
    async fn root_and_health_respond() {
        let app = create_app(test_store());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Welcome to Raffle Management API");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_token() {
        let app = create_app(test_store());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/stats/overview")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tickets/pending")
                    .method(Method::GET)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
