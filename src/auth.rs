use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::structs::VideoError;

/// One cookie, in the shape the Netscape file format stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    /// Unix seconds; `None` is a session cookie (an expiry of `0` in cookie
    /// files means no expiry).
    pub expiry: Option<u64>,
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let secure = name.starts_with("__Secure-");

        Cookie {
            domain: ".youtube.com".to_string(),
            host_only: false,
            path: "/".to_string(),
            secure,
            expiry: None,
            name,
            value: value.into(),
        }
    }
}

/// A cookie collection plus the request decorations the API derives from it.
#[derive(Debug, Clone, Default)]
pub struct AuthBundle {
    cookies: Vec<Cookie>,
}

impl AuthBundle {
    pub fn from_cookies(cookies: Vec<Cookie>) -> Self {
        AuthBundle { cookies }
    }

    /// Load a tab-separated Netscape cookie file. Comment lines and blanks
    /// are ignored; lines with fewer than 7 fields are skipped.
    pub fn from_cookie_file<P: AsRef<Path>>(path: P) -> Result<Self, VideoError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VideoError::DownloadError(format!("cookie file unreadable: {e}")))?;

        Ok(Self::from_netscape(&content))
    }

    pub fn from_netscape(content: &str) -> Self {
        let cookies = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .filter_map(|line| {
                let fields: Vec<&str> = line.split('\t').collect();
                if fields.len() < 7 {
                    return None;
                }

                let expiry = fields[4].parse::<u64>().ok().filter(|x| *x != 0);

                Some(Cookie {
                    domain: fields[0].to_string(),
                    host_only: fields[1].eq_ignore_ascii_case("TRUE"),
                    path: fields[2].to_string(),
                    secure: fields[3].eq_ignore_ascii_case("TRUE"),
                    expiry,
                    name: fields[5].to_string(),
                    value: fields[6].to_string(),
                })
            })
            .collect();

        AuthBundle { cookies }
    }

    /// Load a browser JSON export: an array of objects with
    /// `name`/`value`/`domain`/`path`/`secure`/`httpOnly`/`expirationDate`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, VideoError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VideoError::DownloadError(format!("cookie file unreadable: {e}")))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, VideoError> {
        #[derive(Deserialize)]
        struct JsonCookie {
            name: String,
            value: String,
            #[serde(default)]
            domain: String,
            #[serde(default = "default_path")]
            path: String,
            #[serde(default)]
            secure: bool,
            #[serde(default, rename = "httpOnly")]
            _http_only: bool,
            #[serde(rename = "expirationDate")]
            expiration_date: Option<f64>,
        }

        fn default_path() -> String {
            "/".to_string()
        }

        let parsed: Vec<JsonCookie> = serde_json::from_str(content)?;

        let cookies = parsed
            .into_iter()
            .map(|c| Cookie {
                domain: c.domain,
                host_only: false,
                path: c.path,
                secure: c.secure,
                expiry: c.expiration_date.map(|x| x as u64).filter(|x| *x != 0),
                name: c.name,
                value: c.value,
            })
            .collect();

        Ok(AuthBundle { cookies })
    }

    /// Parse a raw `Cookie` header. Cookies whose names begin with
    /// `__Secure-` are flagged secure.
    pub fn from_cookie_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|part| {
                let part = part.trim();
                let (name, value) = part.split_once('=')?;
                if name.is_empty() {
                    return None;
                }
                Some(Cookie::new(name, value))
            })
            .collect();

        AuthBundle { cookies }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// `name=value; name=value; …` in insertion order.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<String>>()
            .join("; ")
    }

    pub fn visitor_id(&self) -> Option<String> {
        self.get("VISITOR_INFO1_LIVE").map(str::to_string)
    }

    pub fn session_auth_id(&self) -> Option<&str> {
        self.get("__Secure-3PAPISID").or_else(|| self.get("SAPISID"))
    }

    pub fn is_logged_in(&self) -> bool {
        self.get("SID").is_some() || self.get("__Secure-3PSID").is_some()
    }

    /// Time-keyed authorization header for authenticated API requests, or
    /// `None` when the bundle has no session-auth cookie.
    pub fn authorization_header(&self, origin: &str) -> Option<String> {
        let session_auth_id = self.session_auth_id()?;

        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Some(sapisid_hash(now_unix, session_auth_id, origin))
    }
}

/// `SAPISIDHASH <ts>_<hex(sha1("<ts> <session-auth-id> <origin>"))>`
pub fn sapisid_hash(now_unix: u64, session_auth_id: &str, origin: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{now_unix} {session_auth_id} {origin}").as_bytes());
    let digest = hasher.finalize();

    format!("SAPISIDHASH {}_{}", now_unix, hex::encode(digest))
}

/// First `||`-separated component of a `dataSyncId`.
pub fn session_id_of(data_sync_id: &str) -> &str {
    data_sync_id.split("||").next().unwrap_or(data_sync_id)
}

pub fn extract_visitor_from_html(html: &str) -> Option<String> {
    static PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
        [
            Regex::new(r#""VISITOR_DATA"\s*:\s*"([^"]+)""#).unwrap(),
            Regex::new(r#""visitorData"\s*:\s*"([^"]+)""#).unwrap(),
        ]
    });

    PATTERNS
        .iter()
        .find_map(|p| p.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_data_sync_id_from_response(body: &str) -> Option<String> {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#""dataSyncId"\s*:\s*"([^"]+)""#).unwrap());

    PATTERN
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
