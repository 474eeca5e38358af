use boa_engine::Context;
use serde_json::Value;
use std::collections::HashMap;

use crate::player::PlayerSnapshot;
use crate::structs::{RawFormat, VideoError};

/// How a proof-of-origin token rides along on a URL: media/segment URLs take
/// a `pot` query parameter, manifest URLs take a `/pot/<token>` path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlRole {
    Stream,
    Manifest,
}

/// Scratch state for rewriting one response worth of URLs.
///
/// The n-parameter interpreter is compiled lazily on the first URL that needs
/// it and shared (with a result cache) across the whole batch, so a response
/// with forty formats costs one compilation.
pub(crate) struct RewriteBatch<'a> {
    snapshot: &'a PlayerSnapshot,
    n_context: Option<Context>,
    n_cache: HashMap<String, String>,
}

impl<'a> RewriteBatch<'a> {
    pub fn new(snapshot: &'a PlayerSnapshot) -> Self {
        RewriteBatch {
            snapshot,
            n_context: None,
            n_cache: HashMap::new(),
        }
    }

    /// Produce the final fetchable URL for one raw format entry.
    pub fn rewrite_format(
        &mut self,
        raw: &RawFormat,
        token: Option<&str>,
    ) -> Result<String, VideoError> {
        let url = match raw.url.as_deref() {
            Some(url) => url.to_string(),
            None => {
                let blob = raw
                    .signature_cipher
                    .as_deref()
                    .or(raw.cipher.as_deref())
                    .ok_or(VideoError::CipherFailed)?;
                self.decipher_blob(blob)?
            }
        };

        Ok(self.rewrite_url(&url, UrlRole::Stream, token))
    }

    /// Rewrite a URL that is already plain (manifest URLs, pre-signed format
    /// URLs): n-parameter solve plus token attachment.
    pub fn rewrite_url(&mut self, url: &str, role: UrlRole, token: Option<&str>) -> String {
        let url = self.solve_n(url);

        match (token, role) {
            (Some(token), UrlRole::Stream) => attach_query_token(&url, token),
            (Some(token), UrlRole::Manifest) => attach_path_token(&url, token),
            (None, _) => url,
        }
    }

    /// Unfold a `signatureCipher` blob into its inner URL with the
    /// deciphered signature appended.
    fn decipher_blob(&self, blob: &str) -> Result<String, VideoError> {
        let args: serde_json::value::Map<String, Value> =
            serde_qs::from_str(blob).map_err(|_| VideoError::CipherFailed)?;

        let url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or(VideoError::CipherFailed)?;

        let Some(signature) = args.get("s").and_then(Value::as_str) else {
            return Ok(url.to_string());
        };

        let deciphered = self.snapshot.cipher().apply(signature);
        let query_name = args.get("sp").and_then(Value::as_str).unwrap_or("sig");

        let mut url = url::Url::parse(url).map_err(|_| VideoError::CipherFailed)?;
        set_query_param(&mut url, query_name, &deciphered);

        Ok(url.to_string())
    }

    fn solve_n(&mut self, url: &str) -> String {
        let Ok(mut parsed) = url::Url::parse(url) else {
            return url.to_string();
        };

        let Some(n_value) = parsed
            .query_pairs()
            .find(|(name, _)| name == "n")
            .map(|(_, value)| value.into_owned())
        else {
            return url.to_string();
        };

        let solved =
            self.snapshot
                .nsolver()
                .solve_with(&mut self.n_context, &mut self.n_cache, &n_value);

        if solved == n_value {
            return url.to_string();
        }

        set_query_param(&mut parsed, "n", &solved);
        parsed.to_string()
    }
}

/// `<url>?…&pot=<token>`; an existing `pot` is replaced, not duplicated.
fn attach_query_token(url: &str, token: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            set_query_param(&mut parsed, "pot", token);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// `<url-with-trailing-slashes-removed>/pot/<token>`
fn attach_path_token(url: &str, token: &str) -> String {
    format!("{}/pot/{token}", url.trim_end_matches('/'))
}

fn set_query_param(url: &mut url::Url, key: &str, value: &str) {
    let mut found = false;
    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, old)| {
            if name == key {
                found = true;
                (name.into_owned(), value.to_string())
            } else {
                (name.into_owned(), old.into_owned())
            }
        })
        .collect();

    if !found {
        query.push((key.to_string(), value.to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(query);
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_FIXTURE: &str = concat!(
        r#"var GxU={"#,
        r#"Dv0:function(a){a.reverse()},"#,
        r#"q8:function(a,b){a.splice(0,b)},"#,
        r#"tR:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};"#,
        "\n",
        r#"kWa=function(a){a=a.split("");GxU.Dv0(a,1);GxU.q8(a,2);return a.join("")};"#,
        "\n",
        r#"var sig=function(c){a.set("alr","yes");c&&(c=kWa(decodeURIComponent(c)))};"#,
        "\n",
        r#"var mfn=function(a){var b=a.split("");b.reverse();var c={go:function(d){d.push("Z")}};c.go(b);return b.join("")};"#,
        "\n",
        r#"e.j&&(f=e.get("n"))&&(f=mfn(f),e.set("n",f));"#,
        "\n",
        r#"var cfg={signatureTimestamp:19834};"#,
    );

    fn snapshot() -> PlayerSnapshot {
        PlayerSnapshot::from_script("https://www.youtube.com/s/player/0badcafe/base.js", PLAYER_FIXTURE)
    }

    #[test]
    fn query_token_attachment() {
        assert_eq!(
            attach_query_token("https://h/seg?foo=1", "T"),
            "https://h/seg?foo=1&pot=T"
        );
        assert_eq!(
            attach_query_token("https://h/seg?foo=1&pot=OLD", "T"),
            "https://h/seg?foo=1&pot=T"
        );
        assert_eq!(attach_query_token("https://h/seg", "T"), "https://h/seg?pot=T");
    }

    #[test]
    fn path_token_attachment_trims_trailing_slashes() {
        assert_eq!(attach_path_token("https://h/x/", "T"), "https://h/x/pot/T");
        assert_eq!(attach_path_token("https://h/x///", "T"), "https://h/x/pot/T");
        assert_eq!(attach_path_token("https://h/x", "T"), "https://h/x/pot/T");
    }

    #[test]
    fn cipher_only_format_gains_signature_query() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        // "abcdefgh" -> reverse -> "hgfedcba" -> drop 2 -> "fedcba"
        let raw = RawFormat {
            signature_cipher: Some(
                "s=abcdefgh&sp=sig&url=https%3A%2F%2Fr.example%2Fvideoplayback%3Fid%3D1"
                    .to_string(),
            ),
            ..Default::default()
        };

        let url = batch.rewrite_format(&raw, None).unwrap();
        assert!(url.starts_with("https://r.example/videoplayback?"));
        assert!(url.contains("sig=fedcba"));
        assert!(!url.contains("s=abcdefgh"));
        assert!(!url.contains("sp="));
    }

    #[test]
    fn cipher_without_sp_defaults_to_sig() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        let raw = RawFormat {
            signature_cipher: Some(
                "s=ab&url=https%3A%2F%2Fr.example%2Fv%3Fid%3D2".to_string(),
            ),
            ..Default::default()
        };

        let url = batch.rewrite_format(&raw, None).unwrap();
        assert!(url.contains("sig="));
    }

    #[test]
    fn cipher_without_url_fails() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        let raw = RawFormat {
            signature_cipher: Some("s=abcdefgh&sp=sig".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            batch.rewrite_format(&raw, None),
            Err(VideoError::CipherFailed)
        ));
    }

    #[test]
    fn format_without_url_or_cipher_fails() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        assert!(matches!(
            batch.rewrite_format(&RawFormat::default(), None),
            Err(VideoError::CipherFailed)
        ));
    }

    #[test]
    fn n_parameter_is_replaced() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        let raw = RawFormat {
            url: Some("https://r.example/videoplayback?id=1&n=abc".to_string()),
            ..Default::default()
        };

        let url = batch.rewrite_format(&raw, None).unwrap();
        assert!(url.contains("n=cbaZ"), "got {url}");
    }

    #[test]
    fn url_without_n_is_untouched() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        let raw = RawFormat {
            url: Some("https://r.example/videoplayback?id=1".to_string()),
            ..Default::default()
        };

        let url = batch.rewrite_format(&raw, None).unwrap();
        assert_eq!(url, "https://r.example/videoplayback?id=1");
    }

    #[test]
    fn token_attaches_per_role() {
        let snapshot = snapshot();
        let mut batch = RewriteBatch::new(&snapshot);

        let stream = batch.rewrite_url("https://r.example/videoplayback?id=1", UrlRole::Stream, Some("T"));
        assert!(stream.ends_with("&pot=T"));

        let manifest = batch.rewrite_url(
            "https://manifest.example/api/manifest/hls_variant/x/",
            UrlRole::Manifest,
            Some("T"),
        );
        assert!(manifest.ends_with("/pot/T"));
    }
}
