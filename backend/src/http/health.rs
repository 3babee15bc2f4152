use crate::api_error::ApiError;
use crate::db::DbPool;
use actix_web::{web, HttpResponse};
use redis::aio::ConnectionManager;
use tracing::warn;

/// GET /api/health
/// The database must answer; Redis only degrades the quick-match queue.
pub async fn health_check(
    db_pool: web::Data<DbPool>,
    redis: Option<web::Data<ConnectionManager>>,
) -> Result<HttpResponse, ApiError> {
    crate::db::health_check(&db_pool).await?;

    let redis_status = match redis {
        Some(manager) => {
            let mut conn = manager.get_ref().clone();
            let pong: Result<String, redis::RedisError> = redis::cmd("PING").query_async(&mut conn).await;
            match pong {
                Ok(_) => "ok",
                Err(e) => {
                    warn!(error = %e, "Redis health check failed");
                    "unavailable"
                }
            }
        }
        None => "disabled",
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "database": "ok",
        "redis": redis_status
    })))
}
