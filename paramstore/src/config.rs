use crate::cache::ParamNames;
use serde::Deserialize;

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Names of the three parameters the relay reads from the store.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ParameterNames {
    pub bot_token: String,
    pub admin_chat_id: String,
    pub extra_chat_ids: String,
}

impl From<ParameterNames> for ParamNames {
    fn from(names: ParameterNames) -> Self {
        ParamNames {
            bot_token: names.bot_token,
            admin_chat_id: names.admin_chat_id,
            extra_chat_ids: names.extra_chat_ids,
        }
    }
}

/// Parameter store section of the service configuration.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the remote parameter store.
    pub url: String,
    /// Bearer token for store reads, if the store requires one.
    pub auth_token: Option<String>,
    /// How long a fetched parameter may be served without re-fetching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    pub parameters: ParameterNames,
}
