use std::fs::File;
use std::path::PathBuf;

use anyhow::{Error, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tubestream::{choose_format, Client, VideoOptions, VideoQuality, VideoSearchOptions};

use crate::args::{client_options::ClientArgs, log::LogArgs};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Quality {
    Highest,
    Lowest,
    HighestAudio,
    LowestAudio,
    HighestVideo,
    LowestVideo,
}

impl From<Quality> for VideoQuality {
    fn from(value: Quality) -> Self {
        match value {
            Quality::Highest => VideoQuality::Highest,
            Quality::Lowest => VideoQuality::Lowest,
            Quality::HighestAudio => VideoQuality::HighestAudio,
            Quality::LowestAudio => VideoQuality::LowestAudio,
            Quality::HighestVideo => VideoQuality::HighestVideo,
            Quality::LowestVideo => VideoQuality::LowestVideo,
        }
    }
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Video id or watch URL
    pub id: String,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Format selection
    #[arg(long, value_enum, default_value = "highest")]
    pub quality: Quality,

    /// Keep only audio formats
    #[arg(long, conflicts_with = "only_video")]
    pub only_audio: bool,

    /// Keep only video formats
    #[arg(long)]
    pub only_video: bool,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

pub async fn run(args: DownloadArgs) -> Result<()> {
    args.log.init_logger();

    let client = Client::new(args.client.to_options()).map_err(Error::new)?;
    let video = client.get_video(&args.id).await.map_err(Error::new)?;

    let filter = if args.only_audio {
        VideoSearchOptions::Audio
    } else if args.only_video {
        VideoSearchOptions::Video
    } else {
        VideoSearchOptions::VideoAudio
    };

    let options = VideoOptions {
        quality: args.quality.into(),
        filter,
    };

    let format = choose_format(&video.formats, &options).map_err(Error::new)?;

    log::info!(
        "downloading itag {} ({}) to {}",
        format.itag,
        format.mime_type.container,
        args.output.display()
    );

    let bar = match format.content_length {
        Some(total) => ProgressBar::new(total).with_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec})",
            )?,
        ),
        None => ProgressBar::new_spinner(),
    };

    let mut file = File::create(&args.output)?;

    let written = client
        .download_with_progress(&format, &mut file, |progress| {
            bar.set_position(progress.downloaded);
        })
        .await
        .map_err(Error::new)?;

    bar.finish();
    log::info!("wrote {written} bytes");

    Ok(())
}
