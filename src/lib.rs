#![recursion_limit = "256"]

//! Resolve playable media streams for a video id and download them.
//!
//! The entry point is [`Client`]: it acquires the current player script,
//! replays its signature cipher, solves the throttling parameter, talks to
//! the innertube API under a sequence of impersonated client identities and
//! attaches proof-of-origin tokens, so that every URL in the returned
//! [`Video`] can be fetched as-is.

mod resolver;
mod rewrite;
mod structs;
mod utils;

pub mod auth;
pub mod cipher;
pub mod clients;
pub mod constants;
pub mod hls;
pub mod nsolver;
pub mod player;
pub mod pot;
pub mod stream;

pub use auth::{AuthBundle, Cookie};
pub use resolver::Client;
pub use structs::{
    ClientOptions, DownloadProgress, MimeType, RangeObject, RequestOptions,
    Thumbnail, Video, VideoError, VideoFormat, VideoOptions, VideoQuality, VideoSearchOptions,
};
pub use utils::{choose_format, get_random_v6_ip, get_video_id};
// export to access proxy feature
pub use reqwest;
