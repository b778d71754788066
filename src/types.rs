use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Participant {
    pub id: i32,
    #[schema(example = "Maria Perez")]
    pub name: String,
    /// Digits only, unique. Natural key for idempotent registration.
    #[schema(example = "53512345678")]
    pub phone: String,
    pub email: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Raffle {
    pub id: i32,
    #[schema(example = "Summer raffle")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "100")]
    pub total_tickets: i32,
    pub tickets_sold: i32,
    pub tickets_reserved: i32,
    #[schema(example = "5.0")]
    pub ticket_price: f64,
    pub prize_first: String,
    pub prize_second: String,
    pub prize_third: String,
    pub is_active: bool,
    pub is_completed: bool,
    pub draw_date: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
}

impl Raffle {
    /// Numbers still open for reservation, counting both sold and pending.
    pub fn remaining_capacity(&self) -> i32 {
        self.total_tickets - self.tickets_sold - self.tickets_reserved
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Reserved,
    Paid,
    Cancelled,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Ticket {
    pub id: i32,
    #[schema(example = "7")]
    pub ticket_number: i32,
    pub participant_id: i32,
    pub raffle_id: i32,
    pub status: TicketStatus,
    pub payment_confirmed: bool,
    pub purchase_date: chrono::NaiveDateTime,
    pub reserved_until: Option<chrono::NaiveDateTime>,
    pub payment_date: Option<chrono::NaiveDateTime>,
    pub is_winner: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Winner {
    pub id: i32,
    pub participant_id: i32,
    pub raffle_id: i32,
    pub ticket_id: i32,
    #[schema(example = "1")]
    pub prize_position: i32,
    #[schema(example = "1° Lugar - Smart TV")]
    pub prize_description: String,
    pub notified: bool,
    pub notification_date: Option<chrono::NaiveDateTime>,
    pub whatsapp_link: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

/// Row type for admins. Deliberately not serializable: the credential hash
/// must never reach a response body, use [`AdminProfile`] instead.
#[derive(Clone, FromRow)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_main_admin: bool,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct AdminProfile {
    pub id: i32,
    #[schema(example = "admin")]
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_main_admin: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<Admin> for AdminProfile {
    fn from(admin: Admin) -> Self {
        AdminProfile {
            id: admin.id,
            username: admin.username,
            email: admin.email,
            phone: admin.phone,
            is_active: admin.is_active,
            is_main_admin: admin.is_main_admin,
            created_at: admin.created_at,
        }
    }
}
