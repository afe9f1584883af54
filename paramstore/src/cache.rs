use crate::metrics_defs::{PARAM_CACHE_HIT, PARAM_CACHE_MISS};
use crate::store::{ParameterStore, StoreError};
use moka::sync::Cache;
use shared::counter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const CACHE_SIZE: u64 = 100;

/// Explicit "no extra destinations" marker, as stored in the parameter store.
const NO_EXTRA_CHATS_SENTINEL: &str = "none";

/// Names of the parameters the relay needs from the store.
#[derive(Clone, Debug)]
pub struct ParamNames {
    pub bot_token: String,
    pub admin_chat_id: String,
    pub extra_chat_ids: String,
}

/// Resolved configuration snapshot for one request.
///
/// Recomputed from the cached source values on every resolution; the cache
/// holds the raw store values only, never this derived structure.
#[derive(Clone, Debug)]
pub struct RelayParams {
    pub bot_token: String,
    pub admin_chat_id: String,
    pub extra_chat_ids: HashSet<String>,
}

impl RelayParams {
    /// The authorized-destination set is the admin chat plus any extras.
    pub fn is_authorized(&self, chat_id: &str) -> bool {
        chat_id == self.admin_chat_id || self.extra_chat_ids.contains(chat_id)
    }
}

/// Read-through TTL cache in front of the remote parameter store.
///
/// The store is slow and rate-limited; a warm process serves many requests,
/// so each parameter is fetched at most once per TTL window. Expired entries
/// are evicted lazily on the next read. The cache never retries a failed
/// fetch; failures surface to the caller unchanged.
#[derive(Clone)]
pub struct ParamCache {
    store: Arc<dyn ParameterStore>,
    cache: Cache<String, String>,
    names: ParamNames,
}

impl ParamCache {
    pub fn new(store: Arc<dyn ParameterStore>, names: ParamNames, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_SIZE)
            .time_to_live(ttl)
            .build();

        ParamCache {
            store,
            cache,
            names,
        }
    }

    /// Return the named parameter, fetching from the remote store only on a
    /// miss or after expiry.
    pub async fn get(&self, name: &str) -> Result<String, StoreError> {
        if let Some(value) = self.cache.get(name) {
            counter!(PARAM_CACHE_HIT).increment(1);
            return Ok(value);
        }

        counter!(PARAM_CACHE_MISS).increment(1);
        tracing::debug!(parameter = name, "Parameter cache miss, fetching from store");

        let value = self.store.fetch(name).await?;
        self.cache.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Fetch the full configuration snapshot, failing fast on the first
    /// store error. The three reads run concurrently.
    pub async fn resolve(&self) -> Result<RelayParams, StoreError> {
        let (bot_token, admin_chat_id, extra_raw) = tokio::try_join!(
            self.get(&self.names.bot_token),
            self.get(&self.names.admin_chat_id),
            self.get(&self.names.extra_chat_ids),
        )?;

        Ok(RelayParams {
            bot_token,
            admin_chat_id,
            extra_chat_ids: parse_chat_ids(&extra_raw),
        })
    }
}

/// Parse the delimited extra-destinations parameter.
///
/// The explicit `"none"` sentinel and all-whitespace strings mean no extras;
/// otherwise the value is split on commas, each id trimmed, and ids that trim
/// to empty are dropped.
pub fn parse_chat_ids(raw: &str) -> HashSet<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_EXTRA_CHATS_SENTINEL) {
        return HashSet::new();
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
