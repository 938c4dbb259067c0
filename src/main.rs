use std::process::ExitCode;

use tracing::{error, info};

use stowage::web::WebServer;
use stowage::{Config, FolderStore, UploadPipeline};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = stowage::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        stowage::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Stowage upload server");

    let store = match FolderStore::from_config(&config.storage) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open storage root {}: {}", config.storage.root, e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = store.initialize_folders() {
        error!("Failed to initialize folders: {}", e);
        return ExitCode::FAILURE;
    }

    let pipeline = UploadPipeline::new(store, config.upload.limits());
    info!(
        max_file_size_mb = config.upload.max_file_size_mb,
        max_files = config.upload.max_files_per_upload,
        "Upload limits configured"
    );

    let server = match WebServer::new(&config.server, pipeline) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
