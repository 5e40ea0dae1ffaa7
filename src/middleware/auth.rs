/// Bearer Authentication Middleware
///
/// Verifies the access token in the Authorization header, resolves the
/// calling user, and injects a `Principal` into request extensions for
/// downstream handlers. Every failure path, missing header, bad prefix,
/// invalid or expired token, unknown user, produces the same generic 401
/// body; the actual reason is only logged.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::token::{self, TokenType};
use crate::configuration::AuthSettings;
use crate::store::UserStore;

/// The authenticated identity resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub struct AuthMiddleware {
    settings: AuthSettings,
    store: Arc<UserStore>,
}

impl AuthMiddleware {
    pub fn new(settings: AuthSettings, store: Arc<UserStore>) -> Self {
        Self { settings, store }
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
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            settings: self.settings.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    settings: AuthSettings,
    store: Arc<UserStore>,
}

impl<S> AuthMiddlewareService<S> {
    /// Run the full chain: header, prefix, token, principal lookup.
    /// Returns None on any failure; the caller responds uniformly.
    fn resolve_principal(&self, req: &ServiceRequest) -> Option<Principal> {
        let header = req.headers().get("Authorization")?.to_str().ok()?;
        let raw_token = header.strip_prefix("Bearer ")?.trim();

        let claims = token::verify(
            raw_token,
            &self.settings.access_token_secret,
            TokenType::Access,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Access token verification failed");
        })
        .ok()?;

        let user_id = Uuid::parse_str(&claims.sub).ok()?;
        let user = self.store.find_by_id(user_id).ok().flatten()?;

        Some(Principal {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
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
        match self.resolve_principal(&req) {
            Some(principal) => {
                tracing::debug!(user_id = %principal.id, "Principal authenticated");
                req.extensions_mut().insert(principal);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            None => {
                // Uniform response: nothing discloses which check failed.
                let response = HttpResponse::Unauthorized().json(serde_json::json!({
                    "message": "Invalid or expired token",
                    "code": "UNAUTHORIZED"
                }));
                Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Unauthorized",
                        response,
                    )
                    .into())
                })
            }
        }
    }
}
