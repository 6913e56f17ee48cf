use std::sync::Arc;

use jsonds::{api, demo, logging, Config, RegistryBuilder};
use tracing::error;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Unable to read config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logger(&config.log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "jsonds exited with an error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> jsonds::Result<()> {
    let builder = demo::register(RegistryBuilder::new(), &config.demo).apply_paths(&config.endpoints)?;
    let registry = Arc::new(builder.configure());
    tracing::info!(name = %config.name, "Registry configured");
    api::serve(&config.http, registry).await
}
