use tubestream::{choose_format, VideoFormat, VideoOptions, VideoQuality, VideoSearchOptions};

fn format_fixture(json: serde_json::Value) -> VideoFormat {
    serde_json::from_value(json).unwrap()
}

fn fixtures() -> Vec<VideoFormat> {
    vec![
        format_fixture(serde_json::json!({
            "itag": 18,
            "mimeType": "video/mp4; codecs=\"H.264, aac\"",
            "url": "https://r.example/18",
            "bitrate": 500000,
            "qualityLabel": "360p",
            "audioBitrate": 96,
            "contentLength": 1000,
            "hasVideo": true,
            "hasAudio": true,
            "isLive": false,
            "isHLS": false,
            "isDashMPD": false
        })),
        format_fixture(serde_json::json!({
            "itag": 137,
            "mimeType": "video/mp4; codecs=\"H.264\"",
            "url": "https://r.example/137",
            "bitrate": 2500000,
            "qualityLabel": "1080p",
            "contentLength": 3000,
            "hasVideo": true,
            "hasAudio": false,
            "isLive": false,
            "isHLS": false,
            "isDashMPD": false
        })),
        format_fixture(serde_json::json!({
            "itag": 251,
            "mimeType": "audio/webm; codecs=\"opus\"",
            "url": "https://r.example/251",
            "bitrate": 160000,
            "audioBitrate": 160,
            "contentLength": 2000,
            "hasVideo": false,
            "hasAudio": true,
            "isLive": false,
            "isHLS": false,
            "isDashMPD": false
        })),
        format_fixture(serde_json::json!({
            "itag": 249,
            "mimeType": "audio/webm; codecs=\"opus\"",
            "url": "https://r.example/249",
            "bitrate": 50000,
            "audioBitrate": 48,
            "contentLength": 500,
            "hasVideo": false,
            "hasAudio": true,
            "isLive": false,
            "isHLS": false,
            "isDashMPD": false
        })),
    ]
}

#[test]
fn highest_audio_picks_largest_audio_bitrate() {
    let formats = fixtures();
    let options = VideoOptions {
        quality: VideoQuality::HighestAudio,
        filter: VideoSearchOptions::Audio,
    };

    let chosen = choose_format(&formats, &options).unwrap();
    assert_eq!(chosen.itag, 251);
}

#[test]
fn lowest_audio_picks_smallest_audio_bitrate() {
    let formats = fixtures();
    let options = VideoOptions {
        quality: VideoQuality::LowestAudio,
        filter: VideoSearchOptions::Audio,
    };

    let chosen = choose_format(&formats, &options).unwrap();
    assert_eq!(chosen.itag, 249);
}

#[test]
fn video_filter_excludes_muxed_formats() {
    let formats = fixtures();
    let options = VideoOptions {
        quality: VideoQuality::HighestVideo,
        filter: VideoSearchOptions::Video,
    };

    let chosen = choose_format(&formats, &options).unwrap();
    assert_eq!(chosen.itag, 137);
}

#[test]
fn empty_candidates_error() {
    let options = VideoOptions {
        quality: VideoQuality::Highest,
        filter: VideoSearchOptions::VideoAudio,
    };

    let err = choose_format(&[], &options);
    assert!(err.is_err());
}
