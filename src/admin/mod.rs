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
use crate::types::{Admin, AdminProfile};

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum AdminError {
    #[schema(example = "Administrator 5 not found")]
    NotFound(String),
    #[schema(example = "Username or email already in use")]
    Conflict(String),
    #[schema(example = "Only the main administrator may update peers")]
    Forbidden(String),
    #[schema(example = "The main administrator cannot be deleted")]
    InvalidState(String),
    Internal(String),
}

impl From<sqlx::Error> for AdminError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure in admin route");
        AdminError::Internal("database failure".to_string())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Conflict(_) => StatusCode::CONFLICT,
            AdminError::Forbidden(_) => StatusCode::FORBIDDEN,
            AdminError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn hash_password(password: &str) -> Result<String, AdminError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|err| {
        tracing::error!(error = %err, "bcrypt failure");
        AdminError::Internal("could not hash password".to_string())
    })
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateAdminPayload {
    #[schema(example = "operator")]
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/admins",
    request_body = CreateAdminPayload,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "Administrator created", body = AdminProfile),
        (status = 409, description = "Username or email already in use", body = AdminError)
    )
)]
pub(super) async fn create_admin(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
    Json(payload): Json<CreateAdminPayload>,
) -> Result<(StatusCode, Json<AdminProfile>), AdminError> {
    let q = "--sql
        select exists(
            select 1
            from admins
            where username = $1 or email = $2
        );
    ";

    let taken: bool = sqlx::query_scalar(q)
        .bind(&payload.username)
        .bind(&payload.email)
        .fetch_one(&store.db_pool)
        .await?;

    if taken {
        return Err(AdminError::Conflict(
            "Username or email already in use".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    // Peers are never created as main admin.
    let q = "--sql
        insert into admins (username, password_hash, email, phone, is_active, is_main_admin)
        values ($1, $2, $3, $4, true, false)
        returning *;
    ";

    let admin = sqlx::query_as::<_, Admin>(q)
        .bind(&payload.username)
        .bind(&password_hash)
        .bind(&payload.email)
        .bind(&payload.phone)
        .fetch_one(&store.db_pool)
        .await?;

    Ok((StatusCode::CREATED, Json(AdminProfile::from(admin))))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UpdateAdminPayload {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/admins/{id}",
    params(("id" = i32, Path, description = "Administrator id")),
    request_body = UpdateAdminPayload,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Administrator updated", body = AdminProfile),
        (status = 403, description = "Only self-updates or the main administrator", body = AdminError),
        (status = 404, description = "No such administrator", body = AdminError),
        (status = 409, description = "Email already in use", body = AdminError)
    )
)]
pub(super) async fn update_admin(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(current): AuthAdmin,
    Json(payload): Json<UpdateAdminPayload>,
) -> Result<Json<AdminProfile>, AdminError> {
    if current.id != id && !current.is_main_admin {
        return Err(AdminError::Forbidden(
            "Only the main administrator may update peers".to_string(),
        ));
    }

    let q = "--sql
        select *
        from admins
        where id = $1;
    ";

    let mut admin = sqlx::query_as::<_, Admin>(q)
        .bind(id)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("Administrator {id} not found")))?;

    if let Some(email) = &payload.email {
        let q = "--sql
            select exists(
                select 1
                from admins
                where email = $1 and id <> $2
            );
        ";

        let taken: bool = sqlx::query_scalar(q)
            .bind(email)
            .bind(id)
            .fetch_one(&store.db_pool)
            .await?;

        if taken {
            return Err(AdminError::Conflict("Email already in use".to_string()));
        }
        admin.email = email.clone();
    }

    if let Some(phone) = &payload.phone {
        admin.phone = Some(phone.clone());
    }

    if let Some(password) = &payload.password {
        admin.password_hash = hash_password(password)?;
    }

    let q = "--sql
        update admins
        set email = $2, phone = $3, password_hash = $4
        where id = $1
        returning *;
    ";

    let admin = sqlx::query_as::<_, Admin>(q)
        .bind(id)
        .bind(&admin.email)
        .bind(&admin.phone)
        .bind(&admin.password_hash)
        .fetch_one(&store.db_pool)
        .await?;

    Ok(Json(AdminProfile::from(admin)))
}

#[utoipa::path(
    delete,
    path = "/api/admins/{id}",
    params(("id" = i32, Path, description = "Administrator id")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Administrator deleted"),
        (status = 400, description = "Cannot delete yourself or the main administrator", body = AdminError),
        (status = 404, description = "No such administrator", body = AdminError)
    )
)]
pub(super) async fn delete_admin(
    Path(id): Path<i32>,
    State(store): State<Arc<Store>>,
    AuthAdmin(current): AuthAdmin,
) -> Result<StatusCode, AdminError> {
    if current.id == id {
        return Err(AdminError::InvalidState(
            "You cannot delete your own account".to_string(),
        ));
    }

    let q = "--sql
        select *
        from admins
        where id = $1;
    ";

    let admin = sqlx::query_as::<_, Admin>(q)
        .bind(id)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("Administrator {id} not found")))?;

    if admin.is_main_admin {
        return Err(AdminError::InvalidState(
            "The main administrator cannot be deleted".to_string(),
        ));
    }

    let q = "--sql
        delete from admins
        where id = $1;
    ";

    sqlx::query(q).bind(id).execute(&store.db_pool).await?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/admins",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "All administrators", body = [AdminProfile])
    )
)]
pub(super) async fn list_admins(
    State(store): State<Arc<Store>>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<Json<Vec<AdminProfile>>, AdminError> {
    let q = "--sql
        select id, username, email, phone, is_active, is_main_admin, created_at
        from admins
        order by created_at;
    ";

    let admins = sqlx::query_as::<_, AdminProfile>(q)
        .fetch_all(&store.db_pool)
        .await?;

    Ok(Json(admins))
}
