use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

/// Admission policy for one token kind on one protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    Required,
    Recommended,
    NotRequiredForPremium,
    NotRequiredWithPlayerToken,
    NotRequired,
}

impl TokenPolicy {
    pub fn is_required(&self) -> bool {
        matches!(self, TokenPolicy::Required)
    }

    /// Whether a token should be minted when one can be.
    pub fn is_wanted(&self) -> bool {
        !matches!(self, TokenPolicy::NotRequired)
    }
}

/// Per-protocol stream-server token policy matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GvsPolicies {
    pub https: TokenPolicy,
    pub dash: TokenPolicy,
    pub hls: TokenPolicy,
}

impl GvsPolicies {
    pub const fn all(policy: TokenPolicy) -> Self {
        GvsPolicies {
            https: policy,
            dash: policy,
            hls: policy,
        }
    }

    /// The client is said to require a GVS token iff any active-protocol
    /// policy requires one.
    pub fn requires_token(&self) -> bool {
        self.https.is_required() || self.dash.is_required() || self.hls.is_required()
    }

    pub fn wants_token(&self) -> bool {
        self.https.is_wanted() || self.dash.is_wanted() || self.hls.is_wanted()
    }
}

/// One impersonated API client identity with its admission rules.
///
/// Identifiers (name, version, numeric context id) mirror the origin's
/// published values for each first-party client; user agents and device
/// fields are carried verbatim.
#[derive(Debug, Clone)]
pub struct InnertubeClientConfig {
    pub name: &'static str,
    pub version: &'static str,
    pub host: &'static str,
    pub context_id: u16,
    pub user_agent: Option<&'static str>,
    pub device_make: Option<&'static str>,
    pub device_model: Option<&'static str>,
    pub os_name: Option<&'static str>,
    pub os_version: Option<&'static str>,
    pub android_sdk_version: Option<u16>,
    pub requires_js_player: bool,
    pub supports_cookies: bool,
    pub supports_ad_playback_context: bool,
    pub requires_auth: bool,
    pub third_party_embed: bool,
    pub gvs_policies: GvsPolicies,
    pub player_token_policy: TokenPolicy,
    pub subtitles_token_policy: TokenPolicy,
}

impl InnertubeClientConfig {
    pub fn requires_gvs_token(&self) -> bool {
        self.gvs_policies.requires_token()
    }

    pub fn wants_gvs_token(&self) -> bool {
        self.gvs_policies.wants_token()
    }

    pub fn wants_player_token(&self) -> bool {
        self.player_token_policy.is_wanted()
    }

    /// The `context` object of an API request body for this identity.
    pub fn context_json(&self, visitor_data: Option<&str>, accept_language: &str) -> Value {
        let mut client = Map::new();
        client.insert("clientName".into(), self.name.into());
        client.insert("clientVersion".into(), self.version.into());
        client.insert(
            "hl".into(),
            accept_language
                .split(['-', ',', ';'])
                .next()
                .unwrap_or("en")
                .into(),
        );
        client.insert("gl".into(), "US".into());

        if let Some(visitor_data) = visitor_data {
            client.insert("visitorData".into(), visitor_data.into());
        }
        if let Some(user_agent) = self.user_agent {
            client.insert("userAgent".into(), user_agent.into());
        }
        if let Some(device_make) = self.device_make {
            client.insert("deviceMake".into(), device_make.into());
        }
        if let Some(device_model) = self.device_model {
            client.insert("deviceModel".into(), device_model.into());
        }
        if let Some(os_name) = self.os_name {
            client.insert("osName".into(), os_name.into());
        }
        if let Some(os_version) = self.os_version {
            client.insert("osVersion".into(), os_version.into());
        }
        if let Some(sdk) = self.android_sdk_version {
            client.insert("androidSdkVersion".into(), sdk.into());
        }

        let mut context = Map::new();
        context.insert("client".into(), Value::Object(client));

        if self.third_party_embed {
            context.insert(
                "thirdParty".into(),
                json!({ "embedUrl": "https://www.youtube.com/" }),
            );
        }

        Value::Object(context)
    }
}

static CLIENTS: Lazy<Vec<InnertubeClientConfig>> = Lazy::new(|| {
    vec![
        InnertubeClientConfig {
            name: "ANDROID",
            version: "19.30.36",
            host: "www.youtube.com",
            context_id: 3,
            user_agent: Some("com.google.android.youtube/19.30.36 (Linux; U; Android 11) gzip"),
            device_make: Some("Google"),
            device_model: Some("Pixel 6"),
            os_name: Some("Android"),
            os_version: Some("11"),
            android_sdk_version: Some(30),
            requires_js_player: false,
            supports_cookies: false,
            supports_ad_playback_context: true,
            requires_auth: false,
            third_party_embed: false,
            gvs_policies: GvsPolicies {
                https: TokenPolicy::Recommended,
                dash: TokenPolicy::NotRequired,
                hls: TokenPolicy::NotRequired,
            },
            player_token_policy: TokenPolicy::NotRequired,
            subtitles_token_policy: TokenPolicy::NotRequired,
        },
        InnertubeClientConfig {
            name: "IOS",
            version: "19.29.1",
            host: "www.youtube.com",
            context_id: 5,
            user_agent: Some(
                "com.google.ios.youtube/19.29.1 (iPhone16,2; U; CPU iOS 17_5_1 like Mac OS X;)",
            ),
            device_make: Some("Apple"),
            device_model: Some("iPhone16,2"),
            os_name: Some("iPhone"),
            os_version: Some("17.5.1.21F90"),
            android_sdk_version: None,
            requires_js_player: false,
            supports_cookies: false,
            supports_ad_playback_context: true,
            requires_auth: false,
            third_party_embed: false,
            gvs_policies: GvsPolicies {
                https: TokenPolicy::Recommended,
                dash: TokenPolicy::NotRequired,
                hls: TokenPolicy::NotRequired,
            },
            player_token_policy: TokenPolicy::NotRequired,
            subtitles_token_policy: TokenPolicy::NotRequired,
        },
        InnertubeClientConfig {
            name: "WEB",
            version: "2.20240726.00.00",
            host: "www.youtube.com",
            context_id: 1,
            user_agent: None,
            device_make: None,
            device_model: None,
            os_name: None,
            os_version: None,
            android_sdk_version: None,
            requires_js_player: true,
            supports_cookies: true,
            supports_ad_playback_context: false,
            requires_auth: false,
            third_party_embed: false,
            gvs_policies: GvsPolicies {
                https: TokenPolicy::Required,
                dash: TokenPolicy::Required,
                hls: TokenPolicy::Recommended,
            },
            player_token_policy: TokenPolicy::Recommended,
            subtitles_token_policy: TokenPolicy::Recommended,
        },
        InnertubeClientConfig {
            name: "TVHTML5",
            version: "7.20240724.13.00",
            host: "www.youtube.com",
            context_id: 7,
            user_agent: Some(
                "Mozilla/5.0 (ChromiumStylePlatform) Cobalt/Version",
            ),
            device_make: None,
            device_model: None,
            os_name: None,
            os_version: None,
            android_sdk_version: None,
            requires_js_player: true,
            supports_cookies: true,
            supports_ad_playback_context: false,
            requires_auth: false,
            third_party_embed: false,
            gvs_policies: GvsPolicies::all(TokenPolicy::Recommended),
            player_token_policy: TokenPolicy::NotRequired,
            subtitles_token_policy: TokenPolicy::NotRequired,
        },
        InnertubeClientConfig {
            name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
            version: "2.0",
            host: "www.youtube.com",
            context_id: 85,
            user_agent: Some(
                "Mozilla/5.0 (PlayStation; PlayStation 4/12.00) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0 Safari/605.1.15",
            ),
            device_make: None,
            device_model: None,
            os_name: None,
            os_version: None,
            android_sdk_version: None,
            requires_js_player: true,
            supports_cookies: true,
            supports_ad_playback_context: false,
            requires_auth: false,
            third_party_embed: true,
            gvs_policies: GvsPolicies {
                https: TokenPolicy::NotRequiredForPremium,
                dash: TokenPolicy::NotRequiredForPremium,
                hls: TokenPolicy::NotRequired,
            },
            player_token_policy: TokenPolicy::NotRequired,
            subtitles_token_policy: TokenPolicy::NotRequired,
        },
        InnertubeClientConfig {
            name: "WEB_EMBEDDED_PLAYER",
            version: "1.20240723.01.00",
            host: "www.youtube.com",
            context_id: 56,
            user_agent: None,
            device_make: None,
            device_model: None,
            os_name: None,
            os_version: None,
            android_sdk_version: None,
            requires_js_player: true,
            supports_cookies: true,
            supports_ad_playback_context: false,
            requires_auth: false,
            third_party_embed: true,
            gvs_policies: GvsPolicies {
                https: TokenPolicy::NotRequiredWithPlayerToken,
                dash: TokenPolicy::NotRequired,
                hls: TokenPolicy::NotRequired,
            },
            player_token_policy: TokenPolicy::Recommended,
            subtitles_token_policy: TokenPolicy::NotRequired,
        },
        InnertubeClientConfig {
            name: "WEB_CREATOR",
            version: "1.20240723.03.00",
            host: "www.youtube.com",
            context_id: 62,
            user_agent: None,
            device_make: None,
            device_model: None,
            os_name: None,
            os_version: None,
            android_sdk_version: None,
            requires_js_player: true,
            supports_cookies: true,
            supports_ad_playback_context: false,
            requires_auth: true,
            third_party_embed: false,
            gvs_policies: GvsPolicies {
                https: TokenPolicy::Required,
                dash: TokenPolicy::Required,
                hls: TokenPolicy::NotRequired,
            },
            player_token_policy: TokenPolicy::Required,
            subtitles_token_policy: TokenPolicy::NotRequired,
        },
    ]
});

pub fn lookup(name: &str) -> Option<&'static InnertubeClientConfig> {
    CLIENTS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

pub fn all_clients() -> &'static [InnertubeClientConfig] {
    &CLIENTS
}

/// Logged-out order: a client that needs no proof-of-origin token first, then
/// the browser client, then the living-room client.
pub fn anonymous_order() -> Vec<&'static InnertubeClientConfig> {
    order_of(&["ANDROID", "WEB", "TVHTML5"])
}

/// Cookie-carrying order: the downgraded living-room client is the most
/// permissive for logged-in sessions.
pub fn authenticated_order() -> Vec<&'static InnertubeClientConfig> {
    order_of(&["TVHTML5_SIMPLY_EMBEDDED_PLAYER", "WEB_EMBEDDED_PLAYER", "WEB"])
}

pub fn premium_order() -> Vec<&'static InnertubeClientConfig> {
    order_of(&["TVHTML5_SIMPLY_EMBEDDED_PLAYER", "WEB_CREATOR", "WEB"])
}

fn order_of(names: &[&str]) -> Vec<&'static InnertubeClientConfig> {
    names.iter().filter_map(|name| lookup(name)).collect()
}
