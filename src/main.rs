use parkfinder::config::Config;
use parkfinder::engine::Engine;
use parkfinder::server::serve;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let engine = match Engine::from_config(&config) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(%err, "failed to start engine");
            std::process::exit(1);
        }
    };

    serve(engine, config.listen_addr).await;
}
