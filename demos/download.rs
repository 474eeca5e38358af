use tubestream::*;

#[tokio::main]
async fn main() {
    let video_url = "https://www.youtube.com/watch?v=FZ8BxMU3BYc";

    let client = Client::new(ClientOptions::default()).unwrap();

    let video = client.get_video(video_url).await.unwrap();

    let options = VideoOptions {
        quality: VideoQuality::HighestAudio,
        filter: VideoSearchOptions::Audio,
    };
    let format = choose_format(&video.formats, &options).unwrap();

    let mut file = std::fs::File::create("audio.webm").unwrap();
    let written = client.download(&format, &mut file).await.unwrap();

    println!("wrote {written} bytes");
}
