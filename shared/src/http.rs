use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::convert::Infallible;
use tokio::net::TcpListener;

/// Response body type used by all courier services.
pub type ServiceBody = BoxBody<Bytes, Infallible>;

/// Wrap raw bytes into the common boxed body type.
pub fn full_body(bytes: impl Into<Bytes>) -> ServiceBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

/// Build a response with a JSON-serialized body and `application/json`
/// content type. Serialization of the handler-owned types cannot fail; if it
/// ever does, degrade to a plain 500 rather than panic.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<ServiceBody> {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to serialize response body: {e}");
            return plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "{\"error\":\"internal error\"}",
            );
        }
    };

    plain_response(status, bytes)
}

/// Build a response carrying an already-serialized JSON body.
pub fn plain_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ServiceBody> {
    let mut response = Response::new(full_body(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// `{"message": ...}` response for successful or intentionally-no-op outcomes.
pub fn message_response(status: StatusCode, message: &str) -> Response<ServiceBody> {
    json_response(status, &MessageBody { message })
}

/// `{"error": ...}` response for client and server failures.
pub fn error_response(status: StatusCode, error: &str) -> Response<ServiceBody> {
    json_response(status, &ErrorBody { error })
}

/// Accept loop serving `service` on `host:port`.
///
/// Each accepted connection is handed to hyper on its own task; h1/h2 is
/// auto-detected per socket.
pub async fn run_http_service<S>(host: &str, port: u16, service: S) -> Result<(), std::io::Error>
where
    S: Service<Request<Incoming>, Response = Response<ServiceBody>, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;

    loop {
        let (stream, _peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service.clone();

        tokio::spawn(async move {
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!("Connection closed with error: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_string(response: Response<ServiceBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_message_response_shape() {
        let response = message_response(StatusCode::OK, "sent");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[hyper::header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_string(response).await, r#"{"message":"sent"}"#);
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = error_response(StatusCode::BAD_REQUEST, "invalid request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, r#"{"error":"invalid request"}"#);
    }
}
