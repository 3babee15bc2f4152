use crate::api_error::ApiError;
use crate::auth::jwt_service::{Claims, JwtError, JwtService};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Authentication middleware for protecting routes
pub struct AuthMiddleware {
    jwt_service: Rc<JwtService>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self {
            jwt_service: Rc::new(jwt_service),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: Rc<JwtService>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let jwt_service = self.jwt_service.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok());

            let Some(auth_value) = auth_header else {
                warn!("Missing authorization header");
                return Err(ErrorUnauthorized("Missing authorization header"));
            };

            let Some(token) = auth_value.strip_prefix("Bearer ") else {
                warn!("Invalid authorization header format");
                return Err(ErrorUnauthorized("Invalid authorization header format"));
            };

            match jwt_service.validate_token(token) {
                Ok(claims) => {
                    debug!(user_id = %claims.sub, "Request authenticated");
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                }
                Err(JwtError::TokenExpired) => {
                    warn!("Token expired");
                    Err(ErrorUnauthorized("Token expired"))
                }
                Err(e) => {
                    warn!(error = %e, "Token validation failed");
                    Err(ErrorUnauthorized(format!("Invalid token: {}", e)))
                }
            }
        })
    }
}

/// Extract claims from request (use in route handlers)
pub trait ClaimsExt {
    fn claims(&self) -> Option<Claims>;
    fn user_id(&self) -> Result<Uuid, ApiError>;
    fn require_admin(&self) -> Result<Claims, ApiError>;
}

impl ClaimsExt for HttpRequest {
    fn claims(&self) -> Option<Claims> {
        self.extensions().get::<Claims>().cloned()
    }

    fn user_id(&self) -> Result<Uuid, ApiError> {
        self.claims()
            .ok_or(ApiError::Unauthorized)?
            .user_id()
            .map_err(|_| ApiError::Unauthorized)
    }

    fn require_admin(&self) -> Result<Claims, ApiError> {
        let claims = self.claims().ok_or(ApiError::Unauthorized)?;
        if !claims.is_admin() {
            return Err(ApiError::forbidden("Administrator role required"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt_service::JwtConfig;
    use actix_web::{test, web, App, HttpResponse};

    const SECRET: &str = "middleware_test_secret";

    async fn whoami(req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let user_id = req.user_id()?;
        Ok(HttpResponse::Ok().body(user_id.to_string()))
    }

    async fn admin_only(req: HttpRequest) -> Result<HttpResponse, ApiError> {
        req.require_admin()?;
        Ok(HttpResponse::Ok().finish())
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let jwt = JwtService::new(JwtConfig::new(SECRET));
        let user_id = Uuid::new_v4();
        let token = jwt.generate_access_token(user_id, vec![]).unwrap();

        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(jwt.clone()))
                    .route("/me", web::get().to(whoami))
                    .route("/admin", web::get().to(admin_only)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, user_id.to_string().as_bytes());

        let req = test::TestRequest::get()
            .uri("/api/admin")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_missing_header_is_rejected() {
        let jwt = JwtService::new(JwtConfig::new(SECRET));
        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(jwt))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/me").to_request();
        let resp = test::try_call_service(&app, req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
