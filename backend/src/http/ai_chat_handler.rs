use crate::api_error::ApiError;
use crate::auth::{AuthMiddleware, ClaimsExt, JwtService};
use crate::service::ai_chat_service::{AiChatError, AiChatService, ChatRequest};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::info;
use validator::Validate;

/// POST /api/ai/chat
/// Stream the assistant's answer back as server-sent events
pub async fn chat(
    service: web::Data<AiChatService>,
    http_req: HttpRequest,
    req: web::Json<ChatRequest>,
) -> Result<impl Responder, ApiError> {
    let user_id = http_req.user_id()?;
    req.validate()?;
    if !service.is_enabled() {
        return Err(AiChatError::Disabled.into());
    }

    info!(user_id = %user_id, messages = req.messages.len(), "AI chat request");

    let stream = service.stream(&req.messages).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, jwt: &JwtService) {
    cfg.service(
        web::scope("/api/ai")
            .wrap(AuthMiddleware::new(jwt.clone()))
            .route("/chat", web::post().to(chat)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use crate::config::AiConfig;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use uuid::Uuid;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "ai_handler_test_secret";

    fn ai_config(api_url: String, api_key: Option<&str>) -> AiConfig {
        AiConfig {
            api_url,
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
        }
    }

    fn body() -> serde_json::Value {
        serde_json::json!({ "messages": [{ "role": "user", "content": "When does the cup start?" }] })
    }

    #[actix_web::test]
    async fn test_disabled_proxy_returns_503() {
        let jwt = JwtService::new(JwtConfig::new(SECRET));
        let token = jwt.generate_access_token(Uuid::new_v4(), vec![]).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AiChatService::new(ai_config(
                    "http://127.0.0.1:9".to_string(),
                    None,
                ))))
                .configure(|cfg| configure_routes(cfg, &jwt)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/ai/chat")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_streams_upstream_body() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Friday\"}}]}\n\ndata: [DONE]\n\n";
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let jwt = JwtService::new(JwtConfig::new(SECRET));
        let token = jwt.generate_access_token(Uuid::new_v4(), vec![]).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AiChatService::new(ai_config(server.uri(), Some("sk-test")))))
                .configure(|cfg| configure_routes(cfg, &jwt)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/ai/chat")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
        let bytes = test::read_body(resp).await;
        assert_eq!(bytes, sse.as_bytes());
    }
}
