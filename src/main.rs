use auth_service::configuration::get_configuration;
use auth_service::startup::Application;
use auth_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting auth service");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read configuration");
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let application = Application::build(configuration).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    tracing::info!(port = application.port(), "Server started");
    application.run_until_stopped().await
}
