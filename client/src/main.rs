use clap::Parser;
use client::error::ClientError;
use client::game::GameRunner;
use client::network::Client;
use client::transfer::LocalFiles;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session server to connect to (7002 for players, 7001 for developers)
    #[arg(short = 's', long, default_value = "127.0.0.1:7002")]
    server: String,

    /// Directory that saved, uploaded and launched paths are relative to
    #[arg(short = 'r', long, default_value = ".")]
    root: PathBuf,

    /// Command prefix used to run game client programs
    #[arg(long, num_args = 1.., allow_hyphen_values = true, default_value = "python3")]
    launcher: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    info!("Connecting to: {}", args.server);

    let mut client = match Client::connect(
        &args.server,
        LocalFiles::new(args.root),
        GameRunner::new(args.launcher),
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("[Client] Server not available: {}", e);
            return Err(e.into());
        }
    };

    match client.run().await {
        Ok(()) => Ok(()),
        Err(ClientError::InputClosed) => {
            info!("Input closed, exiting");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
