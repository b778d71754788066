use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::notify::digits_only;
use crate::store::Store;
use crate::types::Participant;

mod test;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum ParticipantError {
    #[schema(example = "Participant 42 not found")]
    NotFound(String),
    #[schema(example = "Phone must contain digits")]
    InvalidInput(String),
    Internal(String),
}

impl From<sqlx::Error> for ParticipantError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure in participant route");
        ParticipantError::Internal("database failure".to_string())
    }
}

impl IntoResponse for ParticipantError {
    fn into_response(self) -> Response {
        let status = match &self {
            ParticipantError::NotFound(_) => StatusCode::NOT_FOUND,
            ParticipantError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ParticipantError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateParticipantPayload {
    #[schema(example = "Maria Perez")]
    pub name: String,
    #[schema(example = "+53 5 123 4567")]
    pub phone: String,
    pub email: Option<String>,
}

pub(crate) fn validate_registration(
    payload: &CreateParticipantPayload,
) -> Result<String, ParticipantError> {
    if payload.name.trim().is_empty() {
        return Err(ParticipantError::InvalidInput(
            "Name must not be empty".to_string(),
        ));
    }
    let phone = digits_only(&payload.phone);
    if phone.is_empty() {
        return Err(ParticipantError::InvalidInput(
            "Phone must contain digits".to_string(),
        ));
    }
    Ok(phone)
}

/// Registration is idempotent on the normalized phone: re-registering an
/// existing phone returns the stored participant with 200 instead of 201.
#[utoipa::path(
    post,
    path = "/api/participants",
    request_body = CreateParticipantPayload,
    responses(
        (status = 201, description = "Participant created", body = Participant),
        (status = 200, description = "Participant with this phone already existed", body = Participant),
        (status = 400, description = "Empty name or phone without digits", body = ParticipantError)
    )
)]
pub(super) async fn create_participant(
    State(store): State<Arc<Store>>,
    Json(payload): Json<CreateParticipantPayload>,
) -> Result<(StatusCode, Json<Participant>), ParticipantError> {
    let phone = validate_registration(&payload)?;

    let q = "--sql
        select *
        from participants
        where phone = $1;
    ";

    if let Some(existing) = sqlx::query_as::<_, Participant>(q)
        .bind(&phone)
        .fetch_optional(&store.db_pool)
        .await?
    {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let q = "--sql
        insert into participants (name, phone, email)
        values ($1, $2, $3)
        returning *;
    ";

    let participant = sqlx::query_as::<_, Participant>(q)
        .bind(payload.name.trim())
        .bind(&phone)
        .bind(&payload.email)
        .fetch_one(&store.db_pool)
        .await?;

    Ok((StatusCode::CREATED, Json(participant)))
}

#[utoipa::path(
    get,
    path = "/api/participants",
    responses(
        (status = 200, description = "List all participants", body = [Participant])
    )
)]
pub(super) async fn list_participants(
    State(store): State<Arc<Store>>,
) -> Result<Json<Vec<Participant>>, ParticipantError> {
    let q = "--sql
        select *
        from participants
        order by created_at;
    ";

    let participants = sqlx::query_as::<_, Participant>(q)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(participants))
}

#[utoipa::path(
    get,
    path = "/api/participants/{id}",
    params(("id" = i32, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant found", body = Participant),
        (status = 404, description = "No such participant", body = ParticipantError)
    )
)]
pub(super) async fn get_participant(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
) -> Result<Json<Participant>, ParticipantError> {
    let q = "--sql
        select *
        from participants
        where id = $1;
    ";

    let participant = sqlx::query_as::<_, Participant>(q)
        .bind(id)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| ParticipantError::NotFound(format!("Participant {id} not found")))?;

    Ok(Json(participant))
}
