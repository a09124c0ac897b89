use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::body::Body;
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode, header};
use registry::Registry;
use tower::Layer;

use super::{AuthResult, error::AuthError};
use crate::api::error_response;

/// Requires HTTP Basic credentials of the administrative user.
#[derive(Clone)]
pub struct AuthLayer(Arc<AuthLayerInner>);

struct AuthLayerInner {
    registry: Registry,
    username: String,
}

impl AuthLayer {
    pub fn new(registry: Registry, username: String) -> Self {
        Self(Arc::new(AuthLayerInner { registry, username }))
    }
}

impl AuthLayerInner {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthResult<()> {
        let (username, password) = basic_credentials(headers).ok_or(AuthError::Unauthorized)?;

        if username != self.username {
            return Err(AuthError::Unauthorized);
        }

        match self.registry.verify_admin(&username, &password).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::Unauthorized),
            Err(e) => {
                log::error!("failed to verify operator credentials: {e}");
                Err(AuthError::Internal)
            }
        }
    }
}

/// Username and password from an `Authorization: Basic` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}

impl<Service> Layer<Service> for AuthLayer
where
    Service: Send + Clone,
{
    type Service = AuthService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AuthService {
            next,
            layer: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<Service> {
    next: Service,
    layer: Arc<AuthLayerInner>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AuthService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let layer = self.layer.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            match layer.authenticate(&parts.headers).await {
                Ok(()) => next.call(Request::from_parts(parts, body)).await,
                Err(AuthError::Unauthorized) => {
                    let mut response = error_response(
                        StatusCode::UNAUTHORIZED,
                        "authentication_error",
                        AuthError::Unauthorized.to_string(),
                    );

                    response.headers_mut().insert(
                        header::WWW_AUTHENTICATE,
                        HeaderValue::from_static("Basic realm=\"vpnadmin\", charset=\"UTF-8\""),
                    );

                    Ok(response)
                }
                Err(AuthError::Internal) => Ok(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    AuthError::Internal.to_string(),
                )),
            }
        })
    }
}
