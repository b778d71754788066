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
use crate::types::{Admin, Participant, Raffle, Ticket};

pub(crate) mod alloc;
mod test;

use alloc::{check_capacity, check_confirmable, check_numbers, check_selection_shape};

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum TicketError {
    #[schema(example = "Raffle 7 not found")]
    NotFound(String),
    #[schema(example = "The raffle is not active")]
    InvalidState(String),
    #[schema(example = "Numbers out of range 1-100: 0, 101")]
    InvalidInput(String),
    #[schema(example = "Numbers already taken: 3")]
    Conflict(String),
    #[schema(example = "Only 4 tickets available")]
    CapacityExceeded(String),
    Internal(String),
}

impl From<sqlx::Error> for TicketError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure in ticket route");
        TicketError::Internal("database failure".to_string())
    }
}

impl IntoResponse for TicketError {
    fn into_response(self) -> Response {
        let status = match &self {
            TicketError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketError::InvalidState(_) | TicketError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TicketError::Conflict(_) | TicketError::CapacityExceeded(_) => StatusCode::CONFLICT,
            TicketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReservePayload {
    pub participant_id: i32,
    pub raffle_id: i32,
    #[schema(example = json!([1, 2, 3]))]
    pub ticket_numbers: Vec<i32>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AdminAlertLink {
    pub admin_name: String,
    pub phone: String,
    pub link: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReserveResult {
    pub tickets: Vec<Ticket>,
    /// Advisory: when the reservation lapses if payment is not confirmed.
    pub reserved_until: chrono::NaiveDateTime,
    /// Best-effort purchase alerts for administrators; may be empty.
    pub admin_alerts: Vec<AdminAlertLink>,
}

/// Reserve numbered tickets. All-or-nothing: any precondition failure leaves
/// zero tickets and untouched counters. Expired reservations on this raffle
/// are reclaimed first, inside the same transaction.
#[utoipa::path(
    post,
    path = "/api/tickets/reserve",
    request_body = ReservePayload,
    responses(
        (status = 201, description = "Tickets reserved", body = ReserveResult),
        (status = 400, description = "Inactive/completed raffle, empty or oversized selection, numbers out of range", body = TicketError),
        (status = 404, description = "Raffle or participant not found", body = TicketError),
        (status = 409, description = "Numbers already taken, or not enough capacity left", body = TicketError)
    )
)]
#[axum::debug_handler]
pub(super) async fn reserve_tickets(
    State(store): State<Arc<Store>>,
    Json(payload): Json<ReservePayload>,
) -> Result<(StatusCode, Json<ReserveResult>), TicketError> {
    let now = chrono::Utc::now().naive_utc();

    let mut tx = store.db_pool.begin().await?;

    // The raffle row lock serializes counter updates and occupancy checks
    // for concurrent reservations on the same raffle.
    let q = "--sql
        select *
        from raffles
        where id = $1
        for update;
    ";

    let mut raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(payload.raffle_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| TicketError::NotFound(format!("Raffle {} not found", payload.raffle_id)))?;

    if !raffle.is_active {
        return Err(TicketError::InvalidState(
            "The raffle is not active".to_string(),
        ));
    }
    if raffle.is_completed {
        return Err(TicketError::InvalidState(
            "The raffle has already been completed".to_string(),
        ));
    }

    let q = "--sql
        select *
        from participants
        where id = $1;
    ";

    let participant = sqlx::query_as::<_, Participant>(q)
        .bind(payload.participant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            TicketError::NotFound(format!("Participant {} not found", payload.participant_id))
        })?;

    raffle = reclaim_expired(&mut tx, raffle, now).await?;

    check_selection_shape(&payload.ticket_numbers, store.config.max_tickets_per_purchase)?;
    check_capacity(&raffle, payload.ticket_numbers.len())?;

    let q = "--sql
        select ticket_number
        from tickets
        where raffle_id = $1 and status in ('reserved', 'paid');
    ";

    let occupied: BTreeSet<i32> = sqlx::query_scalar::<_, i32>(q)
        .bind(raffle.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

    check_numbers(&payload.ticket_numbers, raffle.total_tickets, &occupied)?;

    let reserved_until = now + chrono::Duration::hours(store.config.reservation_hours);

    let q = "--sql
        insert into tickets (ticket_number, participant_id, raffle_id, status, reserved_until)
        values ($1, $2, $3, 'reserved', $4)
        returning *;
    ";

    let mut tickets = Vec::with_capacity(payload.ticket_numbers.len());
    for number in &payload.ticket_numbers {
        let ticket = sqlx::query_as::<_, Ticket>(q)
            .bind(number)
            .bind(participant.id)
            .bind(raffle.id)
            .bind(reserved_until)
            .fetch_one(&mut *tx)
            .await?;
        tickets.push(ticket);
    }

    let q = "--sql
        update raffles
        set tickets_reserved = tickets_reserved + $2
        where id = $1;
    ";

    sqlx::query(q)
        .bind(raffle.id)
        .bind(tickets.len() as i32)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        raffle_id = raffle.id,
        participant_id = participant.id,
        count = tickets.len(),
        "tickets reserved"
    );

    let admin_alerts =
        compose_purchase_alerts(&store, &raffle, &participant, &payload.ticket_numbers, now).await;

    Ok((
        StatusCode::CREATED,
        Json(ReserveResult {
            tickets,
            reserved_until,
            admin_alerts,
        }),
    ))
}

/// Cancels this raffle's lapsed reservations and reconciles the counter.
/// Runs under the raffle row lock held by the caller.
async fn reclaim_expired(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    raffle: Raffle,
    now: chrono::NaiveDateTime,
) -> Result<Raffle, TicketError> {
    let q = "--sql
        update tickets
        set status = 'cancelled'
        where raffle_id = $1 and status = 'reserved' and reserved_until < $2;
    ";

    let expired = sqlx::query(q)
        .bind(raffle.id)
        .bind(now)
        .execute(&mut **tx)
        .await?
        .rows_affected();

    if expired == 0 {
        return Ok(raffle);
    }

    tracing::info!(raffle_id = raffle.id, expired, "reclaimed expired reservations");

    let q = "--sql
        update raffles
        set tickets_reserved = tickets_reserved - $2
        where id = $1
        returning *;
    ";

    let raffle = sqlx::query_as::<_, Raffle>(q)
        .bind(raffle.id)
        .bind(expired as i32)
        .fetch_one(&mut **tx)
        .await?;

    Ok(raffle)
}

/// Purchase alerts for every active admin with a phone. Failures only cost
/// the links, never the reservation that already committed.
async fn compose_purchase_alerts(
    store: &Store,
    raffle: &Raffle,
    participant: &Participant,
    ticket_numbers: &[i32],
    now: chrono::NaiveDateTime,
) -> Vec<AdminAlertLink> {
    let q = "--sql
        select *
        from admins
        where phone is not null and is_active = true;
    ";

    let admins = match sqlx::query_as::<_, Admin>(q).fetch_all(&store.db_pool).await {
        Ok(admins) => admins,
        Err(err) => {
            tracing::warn!(error = %err, "could not load admins for purchase alerts");
            return Vec::new();
        }
    };

    let alert = notify::PurchaseAlert {
        raffle_title: &raffle.title,
        buyer_name: &participant.name,
        buyer_phone: &participant.phone,
        buyer_email: participant.email.as_deref(),
        ticket_numbers,
        total_due: ticket_numbers.len() as f64 * raffle.ticket_price,
        when: now,
    };

    admins
        .into_iter()
        .filter_map(|admin| {
            let phone = admin.phone?;
            let link = notify::purchase_alert_link(&phone, &alert, &store.config)?;
            Some(AdminAlertLink {
                admin_name: admin.username,
                phone,
                link,
            })
        })
        .collect()
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConfirmPaymentPayload {
    #[schema(example = json!([10, 11, 12]))]
    pub ticket_ids: Vec<i32>,
    pub participant_id: i32,
}

/// Move reserved tickets to paid and reconcile the raffle counters. Atomic
/// across the whole batch.
#[utoipa::path(
    post,
    path = "/api/tickets/confirm-payment",
    request_body = ConfirmPaymentPayload,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Payment confirmed", body = [Ticket]),
        (status = 400, description = "Already-paid or cancelled ticket, or mixed raffles", body = TicketError),
        (status = 404, description = "Missing or foreign-owned tickets", body = TicketError)
    )
)]
pub(super) async fn confirm_payment(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
    Json(payload): Json<ConfirmPaymentPayload>,
) -> Result<Json<Vec<Ticket>>, TicketError> {
    if payload.ticket_ids.is_empty() {
        return Err(TicketError::InvalidInput(
            "At least one ticket id is required".to_string(),
        ));
    }

    let mut tx = store.db_pool.begin().await?;

    let q = "--sql
        select *
        from tickets
        where id = any($1);
    ";

    let tickets = sqlx::query_as::<_, Ticket>(q)
        .bind(&payload.ticket_ids)
        .fetch_all(&mut *tx)
        .await?;

    let raffle_id = check_confirmable(&tickets, &payload.ticket_ids, payload.participant_id)?;

    // Raffle lock first, matching the order Reserve takes it in.
    let q = "--sql
        select *
        from raffles
        where id = $1
        for update;
    ";

    sqlx::query_as::<_, Raffle>(q)
        .bind(raffle_id)
        .fetch_one(&mut *tx)
        .await?;

    let now = chrono::Utc::now().naive_utc();

    let q = "--sql
        update tickets
        set status = 'paid', payment_confirmed = true, payment_date = $2
        where id = any($1) and status = 'reserved';
    ";

    let updated = sqlx::query(q)
        .bind(&payload.ticket_ids)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated as usize != payload.ticket_ids.len() {
        // A concurrent request changed one of the tickets between our read
        // and the guarded update.
        return Err(TicketError::Conflict(
            "Tickets changed concurrently, retry the confirmation".to_string(),
        ));
    }

    let q = "--sql
        update raffles
        set tickets_sold = tickets_sold + $2, tickets_reserved = tickets_reserved - $2
        where id = $1;
    ";

    sqlx::query(q)
        .bind(raffle_id)
        .bind(updated as i32)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(raffle_id, count = updated, "payment confirmed");

    let q = "--sql
        select *
        from tickets
        where id = any($1)
        order by ticket_number;
    ";

    let tickets = sqlx::query_as::<_, Ticket>(q)
        .bind(&payload.ticket_ids)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/tickets/participant/{id}",
    params(("id" = i32, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Tickets owned by the participant", body = [Ticket])
    )
)]
pub(super) async fn list_participant_tickets(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
) -> Result<Json<Vec<Ticket>>, TicketError> {
    let q = "--sql
        select *
        from tickets
        where participant_id = $1
        order by purchase_date;
    ";

    let tickets = sqlx::query_as::<_, Ticket>(q)
        .bind(id)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/tickets/raffle/{id}",
    params(("id" = i32, Path, description = "Raffle id")),
    responses(
        (status = 200, description = "Tickets in the raffle", body = [Ticket])
    )
)]
pub(super) async fn list_raffle_tickets(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
) -> Result<Json<Vec<Ticket>>, TicketError> {
    let q = "--sql
        select *
        from tickets
        where raffle_id = $1
        order by ticket_number;
    ";

    let tickets = sqlx::query_as::<_, Ticket>(q)
        .bind(id)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(tickets))
}

/// Read model for the pending-payment review screen.
#[derive(Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PendingTicket {
    pub id: i32,
    pub ticket_number: i32,
    pub raffle_id: i32,
    pub raffle_title: String,
    pub ticket_price: f64,
    pub participant_id: i32,
    pub participant_name: String,
    pub participant_phone: String,
    pub purchase_date: chrono::NaiveDateTime,
    pub reserved_until: Option<chrono::NaiveDateTime>,
}

#[utoipa::path(
    get,
    path = "/api/tickets/pending",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Reserved tickets awaiting payment confirmation", body = [PendingTicket])
    )
)]
pub(super) async fn list_pending_tickets(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<Vec<PendingTicket>>, TicketError> {
    let q = "--sql
        select t.id, t.ticket_number, t.raffle_id, r.title as raffle_title,
               r.ticket_price, t.participant_id, p.name as participant_name,
               p.phone as participant_phone, t.purchase_date, t.reserved_until
        from tickets t
        join participants p on p.id = t.participant_id
        join raffles r on r.id = t.raffle_id
        where t.status = 'reserved'
        order by t.purchase_date;
    ";

    let pending = sqlx::query_as::<_, PendingTicket>(q)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(pending))
}
