use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::auth::session_id_of;
use crate::constants::{DEFAULT_POT_TTL, POT_REQUEST_TIMEOUT};
use crate::structs::VideoError;
use crate::utils::with_cancel;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct PotRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_tls_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_innertube: Option<bool>,
}

#[derive(Serialize)]
struct PotRequest<'a> {
    content_binding: &'a str,
    #[serde(flatten)]
    options: &'a PotRequestOptions,
}

#[derive(Deserialize)]
struct PotResponse {
    #[serde(rename = "poToken")]
    po_token: Option<String>,
    #[serde(rename = "contentBinding")]
    #[allow(dead_code)]
    content_binding: Option<String>,
    #[serde(rename = "expiresAt")]
    expires_at: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct PingResponse {
    #[serde(rename = "server_uptime")]
    #[allow(dead_code)]
    server_uptime: Option<f64>,
    #[allow(dead_code)]
    version: Option<String>,
}

/// HTTP client for the external proof-of-origin token oracle.
///
/// Tokens are cached per content binding and regenerated lazily once their
/// expiry passes. The oracle is expected on localhost, so requests carry a
/// hard 30 second timeout and no retry layer; a failed mint surfaces as
/// [`VideoError::TokenUnavailable`] and the caller decides the fallback.
#[derive(Debug)]
pub struct PotClient {
    http: reqwest::Client,
    base_url: String,
    options: PotRequestOptions,
    cache: RwLock<HashMap<String, CachedToken>>,
}

impl PotClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, VideoError> {
        Self::with_options(base_url, PotRequestOptions::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        options: PotRequestOptions,
    ) -> Result<Self, VideoError> {
        let http = reqwest::Client::builder()
            .timeout(POT_REQUEST_TIMEOUT)
            .build()
            .map_err(VideoError::Reqwest)?;

        Ok(PotClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `false` on any error: unreachable, non-success status, garbage body.
    pub async fn is_available(&self, cancel: &CancellationToken) -> bool {
        let url = format!("{}/ping", self.base_url);

        let ping = async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(VideoError::Reqwest)?;

            if !response.status().is_success() {
                return Err(VideoError::TokenUnavailable(format!(
                    "ping returned {}",
                    response.status()
                )));
            }

            response
                .json::<PingResponse>()
                .await
                .map_err(VideoError::Reqwest)
        };

        with_cancel(cancel, ping).await.is_ok()
    }

    /// Serve the cached token while it lives, otherwise mint a fresh one
    /// bound to `binding`.
    pub async fn get_token(
        &self,
        binding: &str,
        cancel: &CancellationToken,
    ) -> Result<String, VideoError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(binding) {
                if SystemTime::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let minted = with_cancel(cancel, self.request_token(binding)).await?;

        {
            let mut cache = self.cache.write().await;
            cache.insert(binding.to_string(), minted.clone());
        }

        Ok(minted.token)
    }

    /// Stream-server context token. Logged-in sessions bind the session id
    /// (the first `||` component of `data_sync_id`); everyone else binds the
    /// visitor id.
    pub async fn get_gvs_token(
        &self,
        visitor: &str,
        data_sync_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, VideoError> {
        let binding = if !data_sync_id.is_empty() {
            session_id_of(data_sync_id)
        } else {
            visitor
        };

        self.get_token(binding, cancel).await
    }

    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }

    pub async fn invalidate_for(&self, binding: &str) {
        self.cache.write().await.remove(binding);
    }

    async fn request_token(&self, binding: &str) -> Result<CachedToken, VideoError> {
        let url = format!("{}/get_pot", self.base_url);
        let body = PotRequest {
            content_binding: binding,
            options: &self.options,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VideoError::TokenUnavailable(format!("oracle unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VideoError::TokenUnavailable(format!(
                "oracle returned {status}"
            )));
        }

        let parsed: PotResponse = response
            .json()
            .await
            .map_err(|e| VideoError::TokenUnavailable(format!("oracle body unreadable: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(VideoError::TokenUnavailable(error));
        }

        let token = parsed
            .po_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| VideoError::TokenUnavailable("oracle returned empty token".into()))?;

        let expires_at = parsed
            .expires_at
            .as_deref()
            .and_then(parse_rfc3339_unix)
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
            .filter(|t| *t > SystemTime::now())
            .unwrap_or_else(|| SystemTime::now() + DEFAULT_POT_TTL);

        tracing::debug!(binding, "minted proof-of-origin token");

        Ok(CachedToken { token, expires_at })
    }

    #[cfg(test)]
    async fn seed(&self, binding: &str, token: &str, expires_at: SystemTime) {
        self.cache.write().await.insert(
            binding.to_string(),
            CachedToken {
                token: token.to_string(),
                expires_at,
            },
        );
    }
}

/// Minimal RFC3339 parse to unix seconds; fractional seconds are ignored.
/// Returns `None` for anything it does not understand.
fn parse_rfc3339_unix(s: &str) -> Option<u64> {
    let s = s.trim();
    let (date, rest) = s.split_at(s.find(['T', 't', ' '])?);
    let rest = &rest[1..];

    let mut date_parts = date.split('-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: u32 = date_parts.next()?.parse().ok()?;
    let day: u32 = date_parts.next()?.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    // Split the clock from the offset marker.
    let (clock, offset_secs) = if let Some(stripped) = rest.strip_suffix(['Z', 'z']) {
        (stripped, 0i64)
    } else if let Some(idx) = rest.rfind(['+', '-']).filter(|&i| i >= 8) {
        let (clock, offset) = rest.split_at(idx);
        let sign = if offset.starts_with('-') { -1i64 } else { 1i64 };
        let mut parts = offset[1..].split(':');
        let oh: i64 = parts.next()?.parse().ok()?;
        let om: i64 = parts.next().unwrap_or("0").parse().ok()?;
        (clock, sign * (oh * 3600 + om * 60))
    } else {
        (rest, 0i64)
    };

    let clock = clock.split('.').next()?;
    let mut clock_parts = clock.split(':');
    let hour: i64 = clock_parts.next()?.parse().ok()?;
    let minute: i64 = clock_parts.next()?.parse().ok()?;
    let second: i64 = clock_parts.next().unwrap_or("0").parse().ok()?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) || !(0..61).contains(&second) {
        return None;
    }

    // Civil-days-to-epoch conversion.
    let (y, m, d) = (year, month as i64, day as i64);
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146097 + doe - 719468;

    let unix = days * 86400 + hour * 3600 + minute * 60 + second - offset_secs;
    u64::try_from(unix).ok()
}

/// Where proof-of-origin tokens come from: the HTTP oracle, a token the
/// caller configured up front, or nowhere at all.
#[derive(Debug)]
pub enum TokenProvider {
    Oracle(PotClient),
    Static { token: String },
    Disabled,
}

impl TokenProvider {
    pub fn name(&self) -> &'static str {
        match self {
            TokenProvider::Oracle(_) => "oracle",
            TokenProvider::Static { .. } => "static",
            TokenProvider::Disabled => "disabled",
        }
    }

    pub async fn is_available(&self, cancel: &CancellationToken) -> bool {
        match self {
            TokenProvider::Oracle(client) => client.is_available(cancel).await,
            TokenProvider::Static { .. } => true,
            TokenProvider::Disabled => false,
        }
    }

    pub async fn get_token(
        &self,
        binding: &str,
        cancel: &CancellationToken,
    ) -> Result<String, VideoError> {
        match self {
            TokenProvider::Oracle(client) => client.get_token(binding, cancel).await,
            TokenProvider::Static { token } => Ok(token.clone()),
            TokenProvider::Disabled => Err(VideoError::TokenUnavailable(
                "no token provider configured".into(),
            )),
        }
    }

    pub async fn get_gvs_token(
        &self,
        visitor: &str,
        data_sync_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, VideoError> {
        match self {
            TokenProvider::Oracle(client) => {
                client.get_gvs_token(visitor, data_sync_id, cancel).await
            }
            TokenProvider::Static { token } => Ok(token.clone()),
            TokenProvider::Disabled => Err(VideoError::TokenUnavailable(
                "no token provider configured".into(),
            )),
        }
    }

    pub async fn invalidate(&self) {
        if let TokenProvider::Oracle(client) = self {
            client.invalidate().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens here; a cache miss that reaches the network fails fast.
    const DEAD_ORACLE: &str = "http://127.0.0.1:1";

    #[test]
    fn rfc3339_parses_utc_offsets_and_fractions() {
        // 2024-01-01T00:00:00Z
        assert_eq!(parse_rfc3339_unix("2024-01-01T00:00:00Z"), Some(1704067200));
        assert_eq!(
            parse_rfc3339_unix("2024-01-01T00:00:00.5Z"),
            Some(1704067200)
        );
        // +02:00 is two hours earlier in unix time
        assert_eq!(
            parse_rfc3339_unix("2024-01-01T02:00:00+02:00"),
            Some(1704067200)
        );
        assert_eq!(
            parse_rfc3339_unix("2023-12-31T22:00:00-02:00"),
            Some(1704067200)
        );
        assert_eq!(parse_rfc3339_unix("not a date"), None);
        assert_eq!(parse_rfc3339_unix("2024-13-01T00:00:00Z"), None);
    }

    #[tokio::test]
    async fn cache_hit_skips_the_oracle() {
        let client = PotClient::new(DEAD_ORACLE).unwrap();
        client
            .seed(
                "video-id",
                "cached-token",
                SystemTime::now() + Duration::from_secs(3600),
            )
            .await;

        let cancel = CancellationToken::new();
        // The oracle endpoint is dead, so a hit proves no POST went out.
        let token = client.get_token("video-id", &cancel).await.unwrap();
        assert_eq!(token, "cached-token");
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_absent() {
        let client = PotClient::new(DEAD_ORACLE).unwrap();
        client
            .seed(
                "video-id",
                "stale-token",
                SystemTime::now() - Duration::from_secs(1),
            )
            .await;

        let cancel = CancellationToken::new();
        let err = client.get_token("video-id", &cancel).await.unwrap_err();
        assert!(matches!(err, VideoError::TokenUnavailable(_)));
    }

    #[tokio::test]
    async fn invalidate_for_drops_one_entry() {
        let client = PotClient::new(DEAD_ORACLE).unwrap();
        let later = SystemTime::now() + Duration::from_secs(3600);
        client.seed("a", "token-a", later).await;
        client.seed("b", "token-b", later).await;

        client.invalidate_for("a").await;

        let cancel = CancellationToken::new();
        assert!(client.get_token("a", &cancel).await.is_err());
        assert_eq!(client.get_token("b", &cancel).await.unwrap(), "token-b");
    }

    #[tokio::test]
    async fn gvs_binding_prefers_session_id() {
        let client = PotClient::new(DEAD_ORACLE).unwrap();
        let later = SystemTime::now() + Duration::from_secs(3600);
        client.seed("session-a", "session-token", later).await;
        client.seed("visitor-v", "visitor-token", later).await;

        let cancel = CancellationToken::new();
        assert_eq!(
            client
                .get_gvs_token("visitor-v", "session-a||rest", &cancel)
                .await
                .unwrap(),
            "session-token"
        );
        assert_eq!(
            client
                .get_gvs_token("visitor-v", "", &cancel)
                .await
                .unwrap(),
            "visitor-token"
        );
    }

    #[tokio::test]
    async fn unreachable_oracle_is_unavailable() {
        let client = PotClient::new(DEAD_ORACLE).unwrap();
        let cancel = CancellationToken::new();
        assert!(!client.is_available(&cancel).await);
    }

    #[tokio::test]
    async fn disabled_provider_never_vends() {
        let provider = TokenProvider::Disabled;
        let cancel = CancellationToken::new();
        assert!(!provider.is_available(&cancel).await);
        assert!(provider.get_token("x", &cancel).await.is_err());
    }

    #[tokio::test]
    async fn static_provider_always_vends() {
        let provider = TokenProvider::Static {
            token: "fixed".into(),
        };
        let cancel = CancellationToken::new();
        assert!(provider.is_available(&cancel).await);
        assert_eq!(provider.get_token("x", &cancel).await.unwrap(), "fixed");
        assert_eq!(
            provider.get_gvs_token("v", "", &cancel).await.unwrap(),
            "fixed"
        );
    }
}
