use std::sync::Arc;

use orchestrator::{Config, Services};
use web::WebState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let services = Services::connect(config)
        .await
        .expect("could not connect to dependencies.");
    let services = Arc::new(services);

    orchestrator::sweepers::spawn_timeout_sweeper(services.clone());
    orchestrator::sweepers::spawn_pause_sweeper(services.clone());

    let web_future = web::start_web_server(WebState { services });
    let _ = web_future.await;
}
