use crate::handler::RelayHandler;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::{ServiceBody, error_response, plain_response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Hyper service exposing the relay handler.
///
/// `POST /notify` serves trusted direct callers; `POST /webhook` receives
/// platform webhook deliveries. Both feed the same handler, which tells the
/// two payload shapes apart itself.
#[derive(Clone)]
pub struct RelayService {
    handler: Arc<RelayHandler>,
}

impl RelayService {
    pub fn new(handler: RelayHandler) -> Self {
        RelayService {
            handler: Arc::new(handler),
        }
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<ServiceBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();

        Box::pin(async move {
            let res = match (req.method(), req.uri().path()) {
                (&Method::POST, "/notify" | "/webhook") => {
                    let bytes = match req.into_body().collect().await {
                        Ok(collected) => collected.to_bytes(),
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to read request body");
                            return Ok(error_response(
                                StatusCode::BAD_REQUEST,
                                "invalid request: unreadable body",
                            ));
                        }
                    };

                    match std::str::from_utf8(&bytes) {
                        Ok(body) => {
                            let response = handler.handle(Some(body)).await;
                            plain_response(response.status, response.body)
                        }
                        Err(_) => error_response(
                            StatusCode::BAD_REQUEST,
                            "invalid request: body is not valid UTF-8",
                        ),
                    }
                }
                _ => error_response(StatusCode::NOT_FOUND, "not found"),
            };

            Ok(res)
        })
    }
}
