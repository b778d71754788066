use std::sync::Arc;

use sqlx::pool::Pool;
use sqlx::postgres::Postgres;

use crate::config::Config;
use crate::draw::picker::DrawPicker;
use crate::types::Admin;

pub struct Store {
    pub db_pool: Pool<Postgres>,
    pub config: Config,
    pub picker: Arc<dyn DrawPicker>,
}

pub async fn create_store(config: Config, picker: Arc<dyn DrawPicker>) -> Arc<Store> {
    let db_pool = sqlx::postgres::PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to migrate DB");

    create_default_admin(&db_pool, &config)
        .await
        .expect("Failed to bootstrap default admin");

    Arc::new(Store {
        db_pool,
        config,
        picker,
    })
}

/// Makes sure the main administrator from config exists. Runs once at
/// startup, before the server accepts requests.
async fn create_default_admin(
    db_pool: &Pool<Postgres>,
    config: &Config,
) -> Result<(), sqlx::Error> {
    let q = "--sql
        select *
        from admins
        where username = $1;
    ";

    let existing = sqlx::query_as::<_, Admin>(q)
        .bind(&config.admin_username)
        .fetch_optional(db_pool)
        .await?;

    if existing.is_some() {
        tracing::info!(username = %config.admin_username, "default admin already present");
        return Ok(());
    }

    let password_hash = bcrypt::hash(&config.admin_password, bcrypt::DEFAULT_COST)
        .expect("Failed to hash default admin password");

    let q = "--sql
        insert into admins (username, password_hash, email, phone, is_active, is_main_admin)
        values ($1, $2, $3, null, true, true);
    ";

    sqlx::query(q)
        .bind(&config.admin_username)
        .bind(&password_hash)
        .bind(&config.admin_email)
        .execute(db_pool)
        .await?;

    tracing::info!(username = %config.admin_username, "default admin created");
    Ok(())
}
