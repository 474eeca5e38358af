use std::path::PathBuf;

use clap::Args;
use tubestream::ClientOptions;

#[derive(Args, Clone, Debug)]
pub struct ClientArgs {
    /// Proof-of-origin token oracle endpoint
    #[arg(long, default_value = "http://127.0.0.1:4416")]
    pub pot_server: String,

    /// Disable the token oracle entirely
    #[arg(long)]
    pub no_pot: bool,

    /// Netscape cookie file for authenticated resolves
    #[arg(long)]
    pub cookie_file: Option<PathBuf>,

    /// Browser JSON cookie export for authenticated resolves
    #[arg(long, conflicts_with = "cookie_file")]
    pub cookie_json: Option<PathBuf>,

    /// Use the premium client order
    #[arg(long)]
    pub premium: bool,

    /// Comma separated innertube client order override, e.g. "ANDROID,WEB"
    #[arg(long, value_delimiter = ',')]
    pub clients: Option<Vec<String>>,

    /// Log every intermediate admission failure
    #[arg(long)]
    pub debug: bool,
}

impl ClientArgs {
    pub fn to_options(&self) -> ClientOptions {
        ClientOptions {
            pot_server_url: if self.no_pot {
                None
            } else {
                Some(self.pot_server.clone())
            },
            cookie_file: self.cookie_file.clone(),
            cookie_json_file: self.cookie_json.clone(),
            premium: self.premium,
            client_order: self.clients.clone(),
            debug: self.debug,
            ..Default::default()
        }
    }
}
