// Optional bearer-token authentication. The check is enforced only when an
// API secret is configured; health and static routes are always exempt.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

pub struct Auth {
    secret: Option<String>,
}

impl Auth {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }
}

fn is_exempt(path: &str) -> bool {
    path == "/health" || path == "/" || path.starts_with("/static")
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Option<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let enforced = match &self.secret {
            Some(secret) if !is_exempt(req.path()) => {
                let presented = req
                    .headers()
                    .get("Authorization")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.strip_prefix("Bearer "));
                presented != Some(secret.as_str())
            }
            _ => false,
        };

        if enforced {
            return Box::pin(async move {
                let response = HttpResponse::Unauthorized()
                    .json(serde_json::json!({
                        "success": false,
                        "error": "Invalid or missing authentication token"
                    }))
                    .map_into_right_body();
                Ok(req.into_response(response))
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_root_and_static_are_exempt() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/"));
        assert!(is_exempt("/static/index.html"));
        assert!(!is_exempt("/players/"));
    }
}
