use clap::Parser;

mod command_def;
mod command_handler;
mod config;
mod formatting;
mod import_file;
mod parcel_client;

use crate::{
    command_def::Arguments,
    command_handler::handle_command,
    config::ClientConfig,
    parcel_client::ParcelServerClient,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();
    let cli = Arguments::parse();
    let client = match ClientConfig::new_from_env_or_default(cli.server, cli.admin).and_then(ParcelServerClient::new) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    };
    if let Err(e) = handle_command(&client, cli.command).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
