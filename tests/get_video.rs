use tubestream::{Client, ClientOptions, VideoError};

// These tests talk to the real API and the local token oracle; run them with
// `cargo test -- --ignored` on a machine with network access.

#[tokio::test]
#[ignore = "requires network access"]
async fn resolve_public_video() {
    let client = Client::new(ClientOptions::default()).unwrap();

    let video = client.get_video("dQw4w9WgXcQ").await.unwrap();

    assert_eq!(video.id, "dQw4w9WgXcQ");
    assert!(!video.formats.is_empty());

    for format in &video.formats {
        assert!(!format.url.is_empty());
        assert!(!format.url.contains("&s="));
        assert!(!format.url.contains("?s="));
        assert!(!format.url.contains("&sp="));
        assert!(format.has_video || format.has_audio);
    }

    assert!(video
        .formats
        .iter()
        .any(|f| f.has_audio && !f.has_video));
    assert!(video
        .formats
        .iter()
        .any(|f| f.has_video && !f.has_audio));
}

#[tokio::test]
#[ignore = "requires network access"]
async fn resolve_works_without_token_oracle() {
    // Point the oracle at a dead port; a client whose policy does not
    // require a token must still succeed, with bare URLs.
    let client = Client::new(ClientOptions {
        pot_server_url: Some("http://127.0.0.1:1".to_string()),
        ..Default::default()
    })
    .unwrap();

    let video = client.get_video("dQw4w9WgXcQ").await.unwrap();

    for format in &video.formats {
        assert!(!format.url.contains("pot="), "{}", format.url);
    }
    if let Some(url) = &video.hls_manifest_url {
        assert!(!url.contains("/pot/"));
    }
}

#[tokio::test]
#[ignore = "requires network access"]
async fn unknown_video_fails_with_all_clients() {
    let client = Client::new(ClientOptions {
        pot_server_url: Some("http://127.0.0.1:1".to_string()),
        ..Default::default()
    })
    .unwrap();

    let err = client.get_video("00000000000").await.unwrap_err();
    assert!(matches!(err, VideoError::AllClientsFailed { .. }));
}

#[tokio::test]
#[ignore = "requires network access"]
async fn download_to_buffer() {
    use tubestream::{choose_format, VideoOptions, VideoQuality, VideoSearchOptions};

    let client = Client::new(ClientOptions {
        pot_server_url: Some("http://127.0.0.1:1".to_string()),
        ..Default::default()
    })
    .unwrap();

    let video = client.get_video("dQw4w9WgXcQ").await.unwrap();

    let options = VideoOptions {
        quality: VideoQuality::LowestAudio,
        filter: VideoSearchOptions::Audio,
    };
    let format = choose_format(&video.formats, &options).unwrap();

    let mut buffer = Vec::new();
    let written = client.download(&format, &mut buffer).await.unwrap();

    assert!(written > 0);
    assert_eq!(written as usize, buffer.len());
}
