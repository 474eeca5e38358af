pub mod download;
pub mod resolve;

use clap::Parser;

use download::DownloadArgs;
use resolve::ResolveArgs;

#[derive(Parser, Debug)]
#[command(name = "tubestream", version, about = "Resolve and download media streams")]
pub enum Commands {
    /// Resolve a video and print its metadata and stream URLs as JSON
    Resolve(ResolveArgs),
    /// Resolve a video and download one of its formats
    Download(DownloadArgs),
}
