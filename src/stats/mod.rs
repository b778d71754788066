use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthAdmin;
use crate::store::Store;
use crate::types::Raffle;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum StatsError {
    #[schema(example = "Raffle 7 not found")]
    NotFound(String),
    Internal(String),
}

impl From<sqlx::Error> for StatsError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure in stats route");
        StatsError::Internal("database failure".to_string())
    }
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        let status = match &self {
            StatsError::NotFound(_) => StatusCode::NOT_FOUND,
            StatsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RaffleStats {
    pub raffle_id: i32,
    pub title: String,
    pub tickets_sold: i32,
    pub tickets_reserved: i32,
    pub tickets_available: i32,
    #[schema(example = "30.0")]
    pub completion_percentage: f64,
    pub total_sales: f64,
    pub ticket_price: f64,
    pub is_completed: bool,
}

pub(crate) fn raffle_stats(raffle: &Raffle) -> RaffleStats {
    let completion = if raffle.total_tickets > 0 {
        f64::from(raffle.tickets_sold) / f64::from(raffle.total_tickets) * 100.0
    } else {
        0.0
    };

    RaffleStats {
        raffle_id: raffle.id,
        title: raffle.title.clone(),
        tickets_sold: raffle.tickets_sold,
        tickets_reserved: raffle.tickets_reserved,
        tickets_available: raffle.remaining_capacity(),
        completion_percentage: (completion * 100.0).round() / 100.0,
        total_sales: f64::from(raffle.tickets_sold) * raffle.ticket_price,
        ticket_price: raffle.ticket_price,
        is_completed: raffle.is_completed,
    }
}

#[utoipa::path(
    get,
    path = "/api/stats/raffle/{id}",
    params(("id" = i32, Path, description = "Raffle id")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Sales statistics for one raffle", body = RaffleStats),
        (status = 404, description = "No such raffle", body = StatsError)
    )
)]
pub(super) async fn get_raffle_stats(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<RaffleStats>, StatsError> {
    let q = "--sql
        select *
        from raffles
        where id = $1;
    ";

    let raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(id)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| StatsError::NotFound(format!("Raffle {id} not found")))?;

    Ok(Json(raffle_stats(&raffle)))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OverviewStats {
    pub total_raffles: i64,
    pub active_raffles: i64,
    pub completed_raffles: i64,
    pub total_participants: i64,
    pub total_tickets: i64,
    pub total_revenue: f64,
    pub last_updated: chrono::NaiveDateTime,
}

#[utoipa::path(
    get,
    path = "/api/stats/overview",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Aggregate statistics across all raffles", body = OverviewStats)
    )
)]
pub(super) async fn get_overview_stats(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<OverviewStats>, StatsError> {
    let q = "--sql
        select count(*),
               count(*) filter (where is_active = true),
               count(*) filter (where is_completed = true),
               coalesce(sum(tickets_sold * ticket_price), 0)
        from raffles;
    ";

    let (total_raffles, active_raffles, completed_raffles, total_revenue): (i64, i64, i64, f64) =
        sqlx::query_as(q).fetch_one(&store.db_pool).await?;

    let q = "--sql
        select count(*)
        from participants;
    ";
    let total_participants: i64 = sqlx::query_scalar(q).fetch_one(&store.db_pool).await?;

    let q = "--sql
        select count(*)
        from tickets;
    ";
    let total_tickets: i64 = sqlx::query_scalar(q).fetch_one(&store.db_pool).await?;

    Ok(Json(OverviewStats {
        total_raffles,
        active_raffles,
        completed_raffles,
        total_participants,
        total_tickets,
        total_revenue: (total_revenue * 100.0).round() / 100.0,
        last_updated: chrono::Utc::now().naive_utc(),
    }))
}

#[cfg(test)]
mod tests {
    use super::raffle_stats;
    use crate::types::Raffle;

    #[test]
    fn stats_report_availability_and_revenue() {
        let raffle = Raffle {
            id: 1,
            title: "Summer raffle".to_string(),
            description: None,
            total_tickets: 10,
            tickets_sold: 3,
            tickets_reserved: 2,
            ticket_price: 5.0,
            prize_first: "A".to_string(),
            prize_second: "B".to_string(),
            prize_third: "C".to_string(),
            is_active: true,
            is_completed: false,
            draw_date: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let stats = raffle_stats(&raffle);
        assert_eq!(stats.tickets_available, 5);
        assert!((stats.completion_percentage - 30.0).abs() < f64::EPSILON);
        assert!((stats.total_sales - 15.0).abs() < f64::EPSILON);
    }
}
