use crate::store::{ParameterStore, StoreError};
use async_trait::async_trait;
use http::StatusCode;

#[derive(serde::Deserialize)]
struct ParamApiResponse {
    value: String,
}

/// HTTP client for the remote parameter store.
///
/// Parameters live under `{base_url}/params/{name}` and are always requested
/// with `decrypt=true`; the store answers `{"value": "..."}` on success.
#[derive(Clone)]
pub struct HttpParameterStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpParameterStore {
    pub fn new(base_url: String, auth_token: Option<String>) -> Self {
        HttpParameterStore {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn param_path(&self, name: &str) -> String {
        format!("/params/{}", name.trim_start_matches('/'))
    }
}

#[async_trait]
impl ParameterStore for HttpParameterStore {
    async fn fetch(&self, name: &str) -> Result<String, StoreError> {
        let path = self.param_path(name);
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.get(&url).query(&[("decrypt", "true")]);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| StoreError::Request {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

        match response.status() {
            StatusCode::OK => {
                let parsed =
                    response
                        .json::<ParamApiResponse>()
                        .await
                        .map_err(|e| StoreError::Request {
                            name: name.to_string(),
                            detail: format!("invalid response body: {e}"),
                        })?;
                Ok(parsed.value)
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                name: name.to_string(),
                path,
            }),
            StatusCode::FORBIDDEN => Err(StoreError::AccessDenied {
                name: name.to_string(),
            }),
            status => Err(StoreError::Request {
                name: name.to_string(),
                detail: format!("unexpected status {status} from {url}"),
            }),
        }
    }
}
