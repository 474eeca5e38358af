use once_cell::sync::Lazy;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use tokio_util::sync::CancellationToken;

use crate::cipher::SignatureCipher;
use crate::constants::{
    BASE_URL, DEFAULT_HEADERS, DEFAULT_MAX_RETRIES, EMBED_URL, IFRAME_API_URL, ORIGIN_URL,
    PLAYER_PROBE_VIDEO_ID,
};
use crate::nsolver::NSolver;
use crate::structs::VideoError;
use crate::utils::{get_html, make_absolute_url, with_cancel, wrap_with_retry};

/// Immutable record of one downloaded player script and everything extracted
/// from it. Built at most once per process (see the resolver) and shared by
/// reference until explicitly invalidated.
#[derive(Debug)]
pub struct PlayerSnapshot {
    player_id: String,
    player_url: String,
    js: String,
    cipher: SignatureCipher,
    nsolver: NSolver,
}

impl PlayerSnapshot {
    pub fn from_script(player_url: impl Into<String>, js: impl Into<String>) -> Self {
        let player_url = player_url.into();
        let js = js.into();

        let cipher = SignatureCipher::from_player_js(&js);
        let nsolver = NSolver::from_player_js(&js);

        PlayerSnapshot {
            player_id: player_id_of(&player_url).unwrap_or_default(),
            player_url,
            js,
            cipher,
            nsolver,
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn player_url(&self) -> &str {
        &self.player_url
    }

    pub fn js(&self) -> &str {
        &self.js
    }

    pub fn signature_timestamp(&self) -> u64 {
        self.cipher.timestamp()
    }

    pub fn cipher(&self) -> &SignatureCipher {
        &self.cipher
    }

    pub fn nsolver(&self) -> &NSolver {
        &self.nsolver
    }
}

fn player_id_of(player_url: &str) -> Option<String> {
    static PLAYER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/s/player/([^/]+)/").unwrap());
    PLAYER_ID
        .captures(player_url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Result of one acquisition pass: the snapshot plus the visitor identifier
/// opportunistically captured from the watch page.
pub(crate) struct AcquiredPlayer {
    pub snapshot: PlayerSnapshot,
    pub visitor_data: Option<String>,
}

/// Locates and downloads the current player script.
///
/// All fetches go through a dedicated cookie-free transport: authenticated
/// requests can redirect to a consent or login page that hides the player
/// URL.
pub(crate) struct PlayerAcquirer {
    http: ClientWithMiddleware,
}

impl PlayerAcquirer {
    pub fn new() -> Result<Self, VideoError> {
        let client = reqwest::Client::builder()
            .default_headers(DEFAULT_HEADERS.clone())
            .build()
            .map_err(VideoError::Reqwest)?;

        Ok(PlayerAcquirer {
            http: wrap_with_retry(client, DEFAULT_MAX_RETRIES),
        })
    }

    /// Try the acquisition sources in order and stop on the first that yields
    /// a player URL. Fails with `PlayerUnavailable` only after all of them.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<AcquiredPlayer, VideoError> {
        let mut visitor_data = None;

        let player_url = match self.from_iframe_api(cancel).await {
            Some(url) => Some(url),
            None => match self.from_watch_page(cancel, &mut visitor_data).await {
                Some(url) => Some(url),
                None => self.from_embed_page(cancel).await,
            },
        };

        let player_url = player_url.ok_or(VideoError::PlayerUnavailable)?;

        let js = with_cancel(cancel, get_html(&self.http, &player_url, None)).await?;

        tracing::debug!(player_url, "player script downloaded ({} bytes)", js.len());

        Ok(AcquiredPlayer {
            snapshot: PlayerSnapshot::from_script(player_url, js),
            visitor_data,
        })
    }

    async fn from_iframe_api(&self, cancel: &CancellationToken) -> Option<String> {
        // The loader inlines the path with escaped slashes.
        static IFRAME_PLAYER_ID: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?:\\/|/)s(?:\\/|/)player(?:\\/|/)([0-9a-f]{8})").unwrap()
        });

        let body = with_cancel(cancel, get_html(&self.http, IFRAME_API_URL, None))
            .await
            .ok()?;

        IFRAME_PLAYER_ID
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|id| canonical_player_url(id.as_str()))
    }

    async fn from_watch_page(
        &self,
        cancel: &CancellationToken,
        visitor_data: &mut Option<String>,
    ) -> Option<String> {
        let url = format!("{BASE_URL}{PLAYER_PROBE_VIDEO_ID}");
        let body = with_cancel(cancel, get_html(&self.http, url, None))
            .await
            .ok()?;

        if visitor_data.is_none() {
            *visitor_data = crate::auth::extract_visitor_from_html(&body);
        }

        find_player_url(&body, true)
    }

    async fn from_embed_page(&self, cancel: &CancellationToken) -> Option<String> {
        let url = format!("{EMBED_URL}{PLAYER_PROBE_VIDEO_ID}");
        let body = with_cancel(cancel, get_html(&self.http, url, None))
            .await
            .ok()?;

        find_player_url(&body, false)
    }
}

fn canonical_player_url(player_id: &str) -> String {
    format!("{ORIGIN_URL}/s/player/{player_id}/player_ias.vflset/en_US/base.js")
}

/// Probe a page body for the player script URL. `full` enables the patterns
/// only the watch page carries.
fn find_player_url(body: &str, full: bool) -> Option<String> {
    static JS_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#""jsUrl"\s*:\s*"([^"]+)""#).unwrap());
    static PLAYER_JS_URL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#""PLAYER_JS_URL"\s*:\s*"([^"]+)""#).unwrap());
    static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"<script\s+src="([^"]+)"[^>]*name="player_ias/base""#).unwrap()
    });
    static RAW_PATH: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(/s/player/[a-zA-Z0-9_-]+/player_(?:ias|es6)\.vflset/[a-zA-Z_]+/base\.js)")
            .unwrap()
    });
    static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/s/player/([0-9a-f]{8})").unwrap());

    let mut candidate = JS_URL
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    if full && candidate.is_none() {
        candidate = PLAYER_JS_URL
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
    }

    if full && candidate.is_none() {
        candidate = SCRIPT_TAG
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
    }

    if candidate.is_none() {
        candidate = RAW_PATH
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
    }

    if candidate.is_none() {
        candidate = BARE_ID
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|id| canonical_player_url(id.as_str()));
    }

    candidate.and_then(|raw| {
        make_absolute_url(ORIGIN_URL, &raw)
            .map(|u| u.to_string())
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_url_field_wins_and_gets_absolutized() {
        let body = r#"{"jsUrl":"/s/player/0004de42/player_ias.vflset/en_US/base.js","other":1}"#;
        assert_eq!(
            find_player_url(body, true).as_deref(),
            Some("https://www.youtube.com/s/player/0004de42/player_ias.vflset/en_US/base.js")
        );
    }

    #[test]
    fn script_tag_fallback() {
        let body = r#"<script src="/s/player/cafe0123/player_ias.vflset/en_US/base.js" nonce="x" name="player_ias/base"></script>"#;
        assert_eq!(
            find_player_url(body, true).as_deref(),
            Some("https://www.youtube.com/s/player/cafe0123/player_ias.vflset/en_US/base.js")
        );
    }

    #[test]
    fn bare_id_builds_canonical_path() {
        let body = "nothing else but /s/player/deadbeef here";
        assert_eq!(
            find_player_url(body, false).as_deref(),
            Some("https://www.youtube.com/s/player/deadbeef/player_ias.vflset/en_US/base.js")
        );
    }

    #[test]
    fn no_pattern_means_none() {
        assert_eq!(find_player_url("<html>consent page</html>", true), None);
    }

    #[test]
    fn snapshot_records_player_id() {
        let snapshot = PlayerSnapshot::from_script(
            "https://www.youtube.com/s/player/0004de42/player_ias.vflset/en_US/base.js",
            "var x=1;",
        );
        assert_eq!(snapshot.player_id(), "0004de42");
        assert_eq!(snapshot.signature_timestamp(), 0);
        assert!(snapshot.cipher().is_empty());
    }
}
