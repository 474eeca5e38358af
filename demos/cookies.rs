use tubestream::*;

#[tokio::main]
async fn main() {
    let video_url = "https://www.youtube.com/watch?v=FZ8BxMU3BYc";

    let options = ClientOptions {
        cookie_header: Some("SID=value1; __Secure-3PAPISID=value2".to_string()),
        ..Default::default()
    };

    let client = Client::new(options).unwrap();
    assert!(client.is_authenticated());

    let video = client.get_video(video_url).await.unwrap();
    println!("Resolved {} with the authenticated client order", video.id);
}
