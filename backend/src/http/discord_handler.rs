use crate::api_error::ApiError;
use crate::discord::interaction::{
    Interaction, InteractionResponse, INTERACTION_APPLICATION_COMMAND, INTERACTION_PING,
};
use crate::discord::signature::{SignatureError, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::discord::DiscordBot;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::{debug, warn};

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/discord/interactions
/// Verify the request signature, then answer pings and slash commands
pub async fn interactions(
    verifier: web::Data<SignatureVerifier>,
    bot: web::Data<DiscordBot>,
    http_req: HttpRequest,
    body: web::Bytes,
) -> Result<impl Responder, ApiError> {
    let (Some(signature), Some(timestamp)) = (
        header(&http_req, SIGNATURE_HEADER),
        header(&http_req, TIMESTAMP_HEADER),
    ) else {
        warn!("Discord interaction without signature headers");
        return Err(SignatureError::MissingHeaders.into());
    };

    if let Err(e) = verifier.verify(signature, timestamp, &body) {
        warn!(error = %e, "Discord interaction signature rejected");
        return Err(e.into());
    }

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid interaction payload: {}", e)))?;

    debug!(interaction_id = %interaction.id, kind = interaction.kind, "Discord interaction");

    let response = match interaction.kind {
        INTERACTION_PING => InteractionResponse::pong(),
        INTERACTION_APPLICATION_COMMAND => bot.handle(&interaction).await,
        other => {
            return Err(ApiError::bad_request(format!(
                "Unsupported interaction type {}",
                other
            )))
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/discord/interactions", web::post().to(interactions));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::signature::test_keys::{public_key_hex, sign};
    use crate::service::player_service::PlayerService;
    use crate::service::tournament_service::TournamentService;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    const TIMESTAMP: &str = "1767225600";

    fn bot() -> DiscordBot {
        // Never connected: none of the commands below touch the database.
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/valtourney_test").unwrap();
        DiscordBot::new(
            PlayerService::new(pool.clone()),
            TournamentService::new(pool),
            None,
            vec!["1".to_string()],
            50.0,
        )
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(
                        SignatureVerifier::from_hex(&public_key_hex()).unwrap(),
                    ))
                    .app_data(web::Data::new(bot()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn signed(body: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/discord/interactions")
            .insert_header((SIGNATURE_HEADER, sign(TIMESTAMP, body.as_bytes())))
            .insert_header((TIMESTAMP_HEADER, TIMESTAMP))
            .insert_header(("content-type", "application/json"))
            .set_payload(body.to_string())
    }

    #[actix_web::test]
    async fn test_ping_gets_pong() {
        let app = app!();
        let body = r#"{"id":"1","type":1}"#;
        let resp: serde_json::Value = test::call_and_read_body_json(&app, signed(body).to_request()).await;
        assert_eq!(resp, serde_json::json!({"type": 1}));
    }

    #[actix_web::test]
    async fn test_bad_signature_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/discord/interactions")
            .insert_header((SIGNATURE_HEADER, sign(TIMESTAMP, br#"{"id":"1","type":1}"#)))
            .insert_header((TIMESTAMP_HEADER, TIMESTAMP))
            .set_payload(r#"{"id":"1","type":2}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/discord/interactions")
            .set_payload(r#"{"id":"1","type":1}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_admin_testbracket_command() {
        let app = app!();
        let body = r#"{
            "id": "2",
            "type": 2,
            "data": {"name": "testbracket", "options": [{"name": "teams", "type": 4, "value": 6}]},
            "member": {"user": {"id": "1", "username": "organizer"}}
        }"#;
        let resp: serde_json::Value = test::call_and_read_body_json(&app, signed(body).to_request()).await;
        assert_eq!(resp["type"], 4);
        assert_eq!(resp["data"]["embeds"][0]["title"], "Bracket for 6 teams");
    }

    #[actix_web::test]
    async fn test_non_admin_gets_ephemeral_refusal() {
        let app = app!();
        let body = r#"{
            "id": "3",
            "type": 2,
            "data": {"name": "testbalance"},
            "user": {"id": "77", "username": "player"}
        }"#;
        let resp: serde_json::Value = test::call_and_read_body_json(&app, signed(body).to_request()).await;
        assert_eq!(resp["data"]["flags"], 64);
    }

    #[actix_web::test]
    async fn test_quickmatch_without_redis_degrades() {
        let app = app!();
        let body = r#"{
            "id": "4",
            "type": 2,
            "data": {"name": "quickmatch"},
            "user": {"id": "77", "username": "player"}
        }"#;
        let resp: serde_json::Value = test::call_and_read_body_json(&app, signed(body).to_request()).await;
        assert_eq!(resp["data"]["flags"], 64);
        assert!(resp["data"]["content"].as_str().unwrap().contains("unavailable"));
    }
}
