//! Viewer identity for feed routes.
//!
//! Authentication happens at the API gateway, which forwards the verified
//! user id in `X-User-Id`. Requests without a valid id are rejected with 401.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

impl UserId {
    fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let raw = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing user context".to_string()))?;

        Uuid::parse_str(raw.trim())
            .map(UserId)
            .map_err(|_| AppError::Authentication("Invalid user ID".to_string()))
    }
}

pub struct GatewayAuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for GatewayAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = GatewayAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GatewayAuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct GatewayAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for GatewayAuthMiddlewareService<S>
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
        let service = self.service.clone();

        Box::pin(async move {
            let user_id = UserId::from_headers(req.request())?;
            req.extensions_mut().insert(user_id);

            service.call(req).await
        })
    }
}

/// Reads the id stored by [`GatewayAuthMiddleware`], or the header itself on
/// routes mounted without the middleware.
impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let user_id = match req.extensions().get::<UserId>().copied() {
            Some(id) => Ok(id),
            None => UserId::from_headers(req),
        };
        ready(user_id.map_err(Error::from))
    }
}
