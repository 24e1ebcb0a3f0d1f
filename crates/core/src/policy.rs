//! Cache-versus-network decision.
//!
//! [`decide`] is a pure function of the request, the scheme registry, cache
//! presence and the policy signal. [`evaluate`] wraps it with key derivation
//! and a store lookup for callers that hold a [`CacheStore`].

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, CacheStore, KeyRules, derive_key};
use crate::request::Request;
use crate::scheme::SchemeRegistry;

/// Header stamped on forwarded requests so the layer never intercepts its own traffic.
pub const INTERCEPTED_HEADER: &str = "x-offcache-intercepted";

/// Methods whose responses may be captured and replayed.
const CACHEABLE_METHODS: &[&str] = &["GET", "HEAD"];

/// Externally supplied cache preference, re-read for every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PolicySignal {
    /// Serve any stored entry; forward only on a miss.
    PreferCache,
    /// Always forward, capturing the response.
    #[default]
    PreferNetwork,
    /// Never touch the network.
    OfflineOnly,
}

impl PolicySignal {
    /// Map a plain connectivity flag onto a policy.
    pub fn from_offline(offline: bool) -> Self {
        if offline { PolicySignal::OfflineOnly } else { PolicySignal::PreferNetwork }
    }
}

/// Why the layer declined a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Scheme not registered or URL unparseable; use normal handling.
    UnsupportedScheme,
    /// The request was already forwarded by this layer.
    AlreadyIntercepted,
    /// Method is not GET or HEAD.
    UncacheableMethod,
    /// Offline and nothing cached; surface a connectivity error.
    UnavailableOffline,
}

/// Outcome of the decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    ServeFromCache,
    Forward,
    Reject(RejectReason),
}

/// Decision plus the key it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// `None` when the request was rejected before a key could be derived.
    pub key: Option<CacheKey>,
    pub decision: Decision,
}

/// Checks that do not depend on cache state.
fn eligibility(request: &Request, registry: &SchemeRegistry) -> Result<(), RejectReason> {
    let scheme = request.scheme().ok_or(RejectReason::UnsupportedScheme)?;
    if !registry.contains(&scheme) {
        return Err(RejectReason::UnsupportedScheme);
    }
    if request.header(INTERCEPTED_HEADER).is_some() {
        return Err(RejectReason::AlreadyIntercepted);
    }
    let method = request.method.trim().to_ascii_uppercase();
    if !CACHEABLE_METHODS.contains(&method.as_str()) {
        return Err(RejectReason::UncacheableMethod);
    }
    Ok(())
}

/// Whether the layer applies to `request` at all.
pub fn is_interceptable(request: &Request, registry: &SchemeRegistry) -> bool {
    eligibility(request, registry).is_ok()
}

/// Pure cache-versus-network decision.
pub fn decide(request: &Request, registry: &SchemeRegistry, cache_exists: bool, policy: PolicySignal) -> Decision {
    if let Err(reason) = eligibility(request, registry) {
        return Decision::Reject(reason);
    }

    match (policy, cache_exists) {
        (PolicySignal::OfflineOnly, true) => Decision::ServeFromCache,
        (PolicySignal::OfflineOnly, false) => Decision::Reject(RejectReason::UnavailableOffline),
        (PolicySignal::PreferCache, true) => Decision::ServeFromCache,
        _ => Decision::Forward,
    }
}

/// Derive the key, consult `store` and decide.
///
/// A store failure while checking presence counts as a miss.
pub async fn evaluate(
    request: &Request, registry: &SchemeRegistry, store: &dyn CacheStore, rules: &KeyRules, policy: PolicySignal,
) -> Evaluation {
    if let Err(reason) = eligibility(request, registry) {
        return Evaluation { key: None, decision: Decision::Reject(reason) };
    }

    let key = match derive_key(request, rules) {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!("rejecting {}: {}", request.url, e);
            return Evaluation { key: None, decision: Decision::Reject(RejectReason::UnsupportedScheme) };
        }
    };

    let exists = match store.exists(&key).await {
        Ok(exists) => exists,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "cache presence check failed; treating as miss");
            false
        }
    };

    let decision = decide(request, registry, exists, policy);
    tracing::debug!(key = %key, ?policy, exists, ?decision, "decided {}", request.url);
    Evaluation { key: Some(key), decision }
}
