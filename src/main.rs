use entru_waitlist::config::get_configuration;
use entru_waitlist::startup::Application;
use entru_waitlist::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        String::from("entru_waitlist"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config = get_configuration().map_err(std::io::Error::other)?;
    let application = Application::build(config).await?;

    tracing::info!("Server listening on port {}", application.get_port());

    application.run_until_stop().await
}
