use crate::http::{ServiceBody, full_body, plain_response};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

/// Administrative endpoints served on a separate listener.
///
/// `/health` answers ok as long as the process is up; `/ready` reflects the
/// provided readiness closure, so deployments can hold traffic until the
/// relay's configuration has been resolved at least once.
#[derive(Clone)]
pub struct AdminService<F> {
    is_ready: F,
}

impl<F> AdminService<F>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self { is_ready }
    }
}

impl<F> Service<Request<Incoming>> for AdminService<F>
where
    F: Fn() -> bool + Clone + Send + 'static,
{
    type Response = Response<ServiceBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let is_ready = (self.is_ready)();

        Box::pin(async move {
            let ok = || Response::new(full_body("ok\n"));

            let res = match req.uri().path() {
                "/health" => ok(),
                "/ready" => match is_ready {
                    true => ok(),
                    false => plain_response(StatusCode::SERVICE_UNAVAILABLE, "not ready\n"),
                },
                _ => plain_response(StatusCode::NOT_FOUND, "not found\n"),
            };
            Ok(res)
        })
    }
}
