use tubestream::*;

#[tokio::main]
async fn main() {
    let urls = vec![
        "https://www.youtube.com/watch?v=FZ8BxMU3BYc",
        "https://www.youtube.com/watch?v=QpgevVPHI-4",
    ];

    // One client means one player snapshot and one token cache for every
    // resolve.
    let client = Client::new(ClientOptions::default()).unwrap();

    for url in urls {
        let video = client.get_video(url).await.unwrap();
        println!("Video title: {}", video.title);
    }
}
