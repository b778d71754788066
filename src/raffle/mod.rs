use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthAdmin;
use crate::store::Store;
use crate::types::Raffle;

mod test;

/// Capacity bounds for a raffle's numbered pool.
pub const MIN_TOTAL_TICKETS: i32 = 1;
pub const MAX_TOTAL_TICKETS: i32 = 1000;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum RaffleError {
    #[schema(example = "Raffle 7 not found")]
    NotFound(String),
    #[schema(example = "total_tickets must be between 1 and 1000")]
    InvalidInput(String),
    #[schema(example = "An active raffle cannot be deleted")]
    InvalidState(String),
    Internal(String),
}

impl From<sqlx::Error> for RaffleError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure in raffle route");
        RaffleError::Internal("database failure".to_string())
    }
}

impl IntoResponse for RaffleError {
    fn into_response(self) -> Response {
        let status = match &self {
            RaffleError::NotFound(_) => StatusCode::NOT_FOUND,
            RaffleError::InvalidInput(_) | RaffleError::InvalidState(_) => StatusCode::BAD_REQUEST,
            RaffleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateRafflePayload {
    #[schema(example = "Summer raffle")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "100")]
    pub total_tickets: i32,
    #[schema(example = "5.0")]
    pub ticket_price: f64,
    #[schema(example = "Smart TV")]
    pub prize_first: String,
    #[schema(example = "Tablet")]
    pub prize_second: String,
    #[schema(example = "Headphones")]
    pub prize_third: String,
}

pub(crate) fn validate_raffle(payload: &CreateRafflePayload) -> Result<(), RaffleError> {
    if payload.title.trim().is_empty() {
        return Err(RaffleError::InvalidInput(
            "Title must not be empty".to_string(),
        ));
    }
    if payload.total_tickets < MIN_TOTAL_TICKETS || payload.total_tickets > MAX_TOTAL_TICKETS {
        return Err(RaffleError::InvalidInput(format!(
            "total_tickets must be between {MIN_TOTAL_TICKETS} and {MAX_TOTAL_TICKETS}"
        )));
    }
    if payload.ticket_price <= 0.0 {
        return Err(RaffleError::InvalidInput(
            "ticket_price must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/raffles",
    request_body = CreateRafflePayload,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "Raffle created", body = Raffle),
        (status = 400, description = "Capacity out of 1..=1000 or non-positive price", body = RaffleError)
    )
)]
pub(super) async fn create_raffle(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
    Json(payload): Json<CreateRafflePayload>,
) -> Result<(StatusCode, Json<Raffle>), RaffleError> {
    validate_raffle(&payload)?;

    let q = "--sql
        insert into raffles (title, description, total_tickets, ticket_price,
                             prize_first, prize_second, prize_third)
        values ($1, $2, $3, $4, $5, $6, $7)
        returning *;
    ";

    let raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(payload.title.trim())
        .bind(&payload.description)
        .bind(payload.total_tickets)
        .bind(payload.ticket_price)
        .bind(&payload.prize_first)
        .bind(&payload.prize_second)
        .bind(&payload.prize_third)
        .fetch_one(&store.db_pool)
        .await?;

    Ok((StatusCode::CREATED, Json(raffle)))
}

#[derive(Deserialize, IntoParams)]
pub struct ListRafflesParams {
    /// Only raffles still open for purchase. Defaults to true.
    pub active_only: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/raffles",
    params(ListRafflesParams),
    responses(
        (status = 200, description = "List raffles, newest first", body = [Raffle])
    )
)]
pub(super) async fn list_raffles(
    Query(params): Query<ListRafflesParams>,
    State(store): State<Arc<Store>>,
) -> Result<Json<Vec<Raffle>>, RaffleError> {
    let q = "--sql
        select *
        from raffles
        where is_active = true or $1 = false
        order by created_at desc;
    ";

    let raffles = sqlx::query_as::<_, Raffle>(q)
        .bind(params.active_only.unwrap_or(true))
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(raffles))
}

#[utoipa::path(
    get,
    path = "/api/raffles/{id}",
    params(("id" = i32, Path, description = "Raffle id")),
    responses(
        (status = 200, description = "Raffle found", body = Raffle),
        (status = 404, description = "No such raffle", body = RaffleError)
    )
)]
pub(super) async fn get_raffle(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
) -> Result<Json<Raffle>, RaffleError> {
    let raffle = fetch_raffle(&store, id).await?;
    Ok(Json(raffle))
}

/// Explicit administrative completion. The raffle becomes terminal: no path
/// back to active.
#[utoipa::path(
    put,
    path = "/api/raffles/{id}/complete",
    params(("id" = i32, Path, description = "Raffle id")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Raffle marked completed", body = Raffle),
        (status = 404, description = "No such raffle", body = RaffleError)
    )
)]
pub(super) async fn complete_raffle(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<Raffle>, RaffleError> {
    let q = "--sql
        update raffles
        set is_completed = true, is_active = false, draw_date = $2
        where id = $1
        returning *;
    ";

    let raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(id)
        .bind(chrono::Utc::now().naive_utc())
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| RaffleError::NotFound(format!("Raffle {id} not found")))?;

    Ok(Json(raffle))
}

#[utoipa::path(
    delete,
    path = "/api/raffles/{id}",
    params(("id" = i32, Path, description = "Raffle id")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Raffle deleted"),
        (status = 400, description = "Raffle is active or has tickets", body = RaffleError),
        (status = 404, description = "No such raffle", body = RaffleError)
    )
)]
pub(super) async fn delete_raffle(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<StatusCode, RaffleError> {
    let raffle = fetch_raffle(&store, id).await?;

    if raffle.is_active && !raffle.is_completed {
        return Err(RaffleError::InvalidState(
            "An active raffle cannot be deleted".to_string(),
        ));
    }

    let q = "--sql
        select count(*)
        from tickets
        where raffle_id = $1;
    ";

    let ticket_count: i64 = sqlx::query_scalar(q)
        .bind(id)
        .fetch_one(&store.db_pool)
        .await?;

    if ticket_count > 0 {
        return Err(RaffleError::InvalidState(
            "A raffle with tickets cannot be deleted".to_string(),
        ));
    }

    let q = "--sql
        delete from raffles
        where id = $1;
    ";

    sqlx::query(q).bind(id).execute(&store.db_pool).await?;

    Ok(StatusCode::OK)
}

pub(crate) async fn fetch_raffle(store: &Store, id: i32) -> Result<Raffle, RaffleError> {
    let q = "--sql
        select *
        from raffles
        where id = $1;
    ";

    sqlx::query_as::<_, Raffle>(q)
        .bind(id)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| RaffleError::NotFound(format!("Raffle {id} not found")))
}
