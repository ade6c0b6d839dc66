//! play_publish - upload an Android App Bundle to Google Play.

use play_bundle_publisher::cli;
use play_bundle_publisher::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            OutputManager::new(false, false).failure(&e);
            process::exit(e.exit_code());
        }
    }
}
