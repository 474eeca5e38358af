use anyhow::{Error, Result};
use clap::Args;
use tubestream::Client;

use crate::args::{client_options::ClientArgs, log::LogArgs};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Video id or watch URL
    pub id: String,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

pub async fn run(args: ResolveArgs) -> Result<()> {
    args.log.init_logger();

    let client = Client::new(args.client.to_options()).map_err(Error::new)?;
    let video = client.get_video(&args.id).await.map_err(Error::new)?;

    println!("{}", serde_json::to_string_pretty(&video)?);

    Ok(())
}
