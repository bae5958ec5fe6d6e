use mirrorgate_api::{setup, telemetry};
use mirrorgate_core::GatewayConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    let config = GatewayConfig::from_env()?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
