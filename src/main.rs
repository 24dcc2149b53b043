use std::process::ExitCode;

use tracing::{error, info};

use talktagger_client::client::{logging, Config, GameClient};

fn main() -> ExitCode {
    let config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("talktagger: {}, using defaults", e);
            Config::default()
        }
    };

    logging::init_from_settings(&config.logging, config.log_file_path());
    info!("TalkTagger client starting...");

    match GameClient::new(config) {
        Ok(mut client) => {
            client.run();
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to start client");
            eprintln!("talktagger: {}", e);
            ExitCode::FAILURE
        }
    }
}
