use std::collections::BTreeSet;
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
use crate::notify;
use crate::store::Store;
use crate::types::{Participant, Raffle, Ticket, TicketStatus, Winner};

pub(crate) mod picker;
mod test;

/// Prize positions a raffle awards.
pub const PRIZE_POSITIONS: i32 = 3;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum DrawError {
    #[schema(example = "Raffle 7 not found")]
    NotFound(String),
    #[schema(example = "Position 1 already drawn for this raffle")]
    Conflict(String),
    #[schema(example = "Ticket 15 is not eligible for this draw")]
    InvalidInput(String),
    #[schema(example = "No eligible tickets to draw from")]
    Unavailable(String),
    Internal(String),
}

impl From<sqlx::Error> for DrawError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure in draw route");
        DrawError::Internal("database failure".to_string())
    }
}

impl IntoResponse for DrawError {
    fn into_response(self) -> Response {
        let status = match &self {
            DrawError::NotFound(_) => StatusCode::NOT_FOUND,
            DrawError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DrawError::Conflict(_) | DrawError::Unavailable(_) => StatusCode::CONFLICT,
            DrawError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DrawPayload {
    pub raffle_id: i32,
    /// Prize position to draw, 1 through 3.
    #[schema(example = "1")]
    pub prize_position: i32,
    /// Manual override: must reference an eligible ticket.
    pub winning_ticket_id: Option<i32>,
}

/// Winner record enriched with the participant and ticket fields the admin
/// screen shows.
#[derive(Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct WinnerDetails {
    pub id: i32,
    pub participant_id: i32,
    pub raffle_id: i32,
    pub ticket_id: i32,
    pub prize_position: i32,
    pub prize_description: String,
    pub notified: bool,
    pub notification_date: Option<chrono::NaiveDateTime>,
    pub whatsapp_link: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub participant_name: String,
    pub participant_phone: String,
    pub ticket_number: i32,
}

/// Eligibility set: paid tickets that have not won, excluding every
/// participant who already holds a win in this raffle. Selection is at
/// ticket granularity, so buying more paid tickets buys more odds.
pub(crate) fn eligible_tickets(
    tickets: Vec<Ticket>,
    past_winner_participants: &BTreeSet<i32>,
) -> Vec<Ticket> {
    tickets
        .into_iter()
        .filter(|t| {
            t.status == TicketStatus::Paid
                && !t.is_winner
                && !past_winner_participants.contains(&t.participant_id)
        })
        .collect()
}

/// Frozen prize snapshot for the winner row. The generic label covers
/// positions beyond the canonical three.
pub(crate) fn prize_for_position(raffle: &Raffle, position: i32) -> String {
    match position {
        1 => format!("1° Lugar - {}", raffle.prize_first),
        2 => format!("2° Lugar - {}", raffle.prize_second),
        3 => format!("3° Lugar - {}", raffle.prize_third),
        n => format!("Premio {n}° Lugar"),
    }
}

/// Draw one winner for a prize position. The third winner completes the
/// raffle.
#[utoipa::path(
    post,
    path = "/api/draw",
    request_body = DrawPayload,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "Winner drawn", body = WinnerDetails),
        (status = 400, description = "Bad prize position or ineligible override ticket", body = DrawError),
        (status = 404, description = "Raffle not found", body = DrawError),
        (status = 409, description = "Position already drawn, or no eligible tickets", body = DrawError)
    )
)]
#[axum::debug_handler]
pub(super) async fn perform_draw(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
    Json(payload): Json<DrawPayload>,
) -> Result<(StatusCode, Json<WinnerDetails>), DrawError> {
    if payload.prize_position < 1 || payload.prize_position > PRIZE_POSITIONS {
        return Err(DrawError::InvalidInput(format!(
            "prize_position must be between 1 and {PRIZE_POSITIONS}"
        )));
    }

    let mut tx = store.db_pool.begin().await?;

    let q = "--sql
        select *
        from raffles
        where id = $1
        for update;
    ";

    let raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(payload.raffle_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DrawError::NotFound(format!("Raffle {} not found", payload.raffle_id)))?;

    let q = "--sql
        select exists(
            select 1
            from winners
            where raffle_id = $1 and prize_position = $2
        );
    ";

    let position_taken: bool = sqlx::query_scalar(q)
        .bind(raffle.id)
        .bind(payload.prize_position)
        .fetch_one(&mut *tx)
        .await?;

    if position_taken {
        return Err(DrawError::Conflict(format!(
            "Position {} already drawn for this raffle",
            payload.prize_position
        )));
    }

    let q = "--sql
        select participant_id
        from winners
        where raffle_id = $1;
    ";

    let past_winners: BTreeSet<i32> = sqlx::query_scalar::<_, i32>(q)
        .bind(raffle.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

    let q = "--sql
        select *
        from tickets
        where raffle_id = $1;
    ";

    let tickets = sqlx::query_as::<_, Ticket>(q)
        .bind(raffle.id)
        .fetch_all(&mut *tx)
        .await?;

    let eligible = eligible_tickets(tickets, &past_winners);

    let winning_ticket = match payload.winning_ticket_id {
        Some(ticket_id) => eligible
            .iter()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| {
                DrawError::InvalidInput(format!("Ticket {ticket_id} is not eligible for this draw"))
            })?
            .clone(),
        None => {
            if eligible.is_empty() {
                return Err(DrawError::Unavailable(
                    "No eligible tickets to draw from".to_string(),
                ));
            }
            eligible[store.picker.pick(eligible.len())].clone()
        }
    };

    let q = "--sql
        select *
        from participants
        where id = $1;
    ";

    let participant = sqlx::query_as::<_, Participant>(q)
        .bind(winning_ticket.participant_id)
        .fetch_one(&mut *tx)
        .await?;

    let prize_description = prize_for_position(&raffle, payload.prize_position);

    let whatsapp_link = notify::winner_link(
        &notify::WinnerMessage {
            recipient_phone: participant.phone.clone(),
            recipient_name: participant.name.clone(),
            position: payload.prize_position,
            raffle_title: raffle.title.clone(),
            prize_description: prize_description.clone(),
            ticket_number: winning_ticket.ticket_number,
        },
        &store.config,
    );

    let q = "--sql
        update tickets
        set is_winner = true
        where id = $1;
    ";

    sqlx::query(q)
        .bind(winning_ticket.id)
        .execute(&mut *tx)
        .await?;

    let q = "--sql
        insert into winners (participant_id, raffle_id, ticket_id, prize_position,
                             prize_description, whatsapp_link)
        values ($1, $2, $3, $4, $5, $6)
        returning *;
    ";

    let winner = sqlx::query_as::<_, Winner>(q)
        .bind(participant.id)
        .bind(raffle.id)
        .bind(winning_ticket.id)
        .bind(payload.prize_position)
        .bind(&prize_description)
        .bind(&whatsapp_link)
        .fetch_one(&mut *tx)
        .await?;

    let q = "--sql
        select count(*)
        from winners
        where raffle_id = $1;
    ";

    let winner_count: i64 = sqlx::query_scalar(q)
        .bind(raffle.id)
        .fetch_one(&mut *tx)
        .await?;

    if winner_count >= PRIZE_POSITIONS as i64 {
        let q = "--sql
            update raffles
            set is_completed = true, is_active = false, draw_date = $2
            where id = $1;
        ";

        sqlx::query(q)
            .bind(raffle.id)
            .bind(chrono::Utc::now().naive_utc())
            .execute(&mut *tx)
            .await?;

        tracing::info!(raffle_id = raffle.id, "raffle completed by third draw");
    }

    tx.commit().await?;

    tracing::info!(
        raffle_id = raffle.id,
        position = payload.prize_position,
        ticket_number = winning_ticket.ticket_number,
        "winner drawn"
    );

    Ok((
        StatusCode::CREATED,
        Json(WinnerDetails {
            id: winner.id,
            participant_id: winner.participant_id,
            raffle_id: winner.raffle_id,
            ticket_id: winner.ticket_id,
            prize_position: winner.prize_position,
            prize_description: winner.prize_description,
            notified: winner.notified,
            notification_date: winner.notification_date,
            whatsapp_link: winner.whatsapp_link,
            created_at: winner.created_at,
            participant_name: participant.name,
            participant_phone: participant.phone,
            ticket_number: winning_ticket.ticket_number,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/winners/raffle/{id}",
    params(("id" = i32, Path, description = "Raffle id")),
    responses(
        (status = 200, description = "Winners of the raffle with participant details", body = [WinnerDetails])
    )
)]
pub(super) async fn list_raffle_winners(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
) -> Result<Json<Vec<WinnerDetails>>, DrawError> {
    let q = "--sql
        select w.id, w.participant_id, w.raffle_id, w.ticket_id, w.prize_position,
               w.prize_description, w.notified, w.notification_date, w.whatsapp_link,
               w.created_at, p.name as participant_name, p.phone as participant_phone,
               t.ticket_number
        from winners w
        join participants p on p.id = w.participant_id
        join tickets t on t.id = w.ticket_id
        where w.raffle_id = $1
        order by w.prize_position;
    ";

    let winners = sqlx::query_as::<_, WinnerDetails>(q)
        .bind(id)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(winners))
}

#[derive(Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct WinnerLink {
    pub winner_id: i32,
    pub winner_name: String,
    pub winner_phone: String,
    pub ticket_number: i32,
    pub prize_position: i32,
    pub whatsapp_link: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct WinnerLinksResult {
    pub raffle_id: i32,
    pub raffle_title: String,
    pub winners: Vec<WinnerLink>,
}

#[utoipa::path(
    get,
    path = "/api/winners/raffle/{id}/links",
    params(("id" = i32, Path, description = "Raffle id")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Stored notification links for every winner", body = WinnerLinksResult),
        (status = 404, description = "Raffle missing or has no winners yet", body = DrawError)
    )
)]
pub(super) async fn list_winner_links(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<WinnerLinksResult>, DrawError> {
    let q = "--sql
        select *
        from raffles
        where id = $1;
    ";

    let raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(id)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| DrawError::NotFound(format!("Raffle {id} not found")))?;

    let q = "--sql
        select w.id as winner_id, p.name as winner_name, p.phone as winner_phone,
               t.ticket_number, w.prize_position, w.whatsapp_link
        from winners w
        join participants p on p.id = w.participant_id
        join tickets t on t.id = w.ticket_id
        where w.raffle_id = $1
        order by w.prize_position;
    ";

    let winners = sqlx::query_as::<_, WinnerLink>(q)
        .bind(id)
        .fetch_all(&store.db_pool)
        .await?;

    if winners.is_empty() {
        return Err(DrawError::NotFound(format!(
            "Raffle {id} has no winners yet"
        )));
    }

    Ok(Json(WinnerLinksResult {
        raffle_id: raffle.id,
        raffle_title: raffle.title,
        winners,
    }))
}

#[utoipa::path(
    put,
    path = "/api/winners/{id}/notified",
    params(("id" = i32, Path, description = "Winner id")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Winner marked notified", body = Winner),
        (status = 404, description = "No such winner", body = DrawError)
    )
)]
pub(super) async fn mark_winner_notified(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<Winner>, DrawError> {
    let q = "--sql
        update winners
        set notified = true, notification_date = $2
        where id = $1
        returning *;
    ";

    let winner = sqlx::query_as::<_, Winner>(q)
        .bind(id)
        .bind(chrono::Utc::now().naive_utc())
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| DrawError::NotFound(format!("Winner {id} not found")))?;

    Ok(Json(winner))
}
