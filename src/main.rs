use std::sync::Arc;

use groundtrack::api::server::{run_server, AppState};
use groundtrack::core::service::PropagationService;
use groundtrack::utils::{config::Config, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };
    logging::init(&config.log_filter);
    info!(addr = %config.addr, max_samples = config.max_samples, "groundtrack initialized");

    let state = AppState {
        service: Arc::new(PropagationService::new()),
        max_samples: config.max_samples,
        max_resonant_offset_days: config.max_resonant_offset_days,
    };
    if let Err(e) = run_server(state, config.addr).await {
        error!(error = %e, "API server stopped");
        std::process::exit(1);
    }
}
