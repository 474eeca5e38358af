use tubestream::*;

#[tokio::main]
async fn main() {
    let video_url = "https://www.youtube.com/watch?v=FZ8BxMU3BYc";

    let client = Client::new(ClientOptions::default()).unwrap();

    let video = client.get_video(video_url).await.unwrap();

    println!("Title: {}", video.title);
    for format in &video.formats {
        println!(
            "itag {:>3}  {}  {}",
            format.itag, format.mime_type.container, format.url
        );
    }
}
