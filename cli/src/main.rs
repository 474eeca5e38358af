pub mod args;
pub mod commands;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

#[tokio::main]
async fn main() -> Result<()> {
    let commands = Commands::parse();

    let res = match commands {
        Commands::Resolve(args) => commands::resolve::run(args).await,
        Commands::Download(args) => commands::download::run(args).await,
    };

    if let Err(ref err) = res {
        log::error!("{}\n", err);
        eprintln!(
            "\
            If the error is caused by a change to the YouTube API, it would be great if you could \
            report this. Common indicators of an API change are:\n\n\
            1. Repeated HTTP 403 status\n\
            2. Unexpected response errors\n\
            3. Deserialization errors\n\
            "
        );
    }

    res
}
