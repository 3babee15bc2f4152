use sqlx::{PgPool, postgres::PgPoolOptions};
use crate::config::Config;
use crate::api_error::ApiError;

pub type DbPool = PgPool;

/// Pool whose connections publish veto changes on the configured channel.
pub async fn create_pool(config: &Config) -> Result<DbPool, sqlx::Error> {
    let channel = config.realtime.channel.clone();
    PgPoolOptions::new()
        .max_connections(5)
        .after_connect(move |conn, _meta| {
            let channel = channel.clone();
            Box::pin(async move {
                sqlx::query("SELECT set_config('app.veto_channel', $1, false)")
                    .bind(channel)
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database.url)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub async fn health_check(pool: &DbPool) -> Result<(), ApiError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(ApiError::DatabaseError)?;
    Ok(())
}
