use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use secrecy::Secret;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::{GoogleSheetsSettings, Settings};
use crate::google_auth::GoogleAuthClient;
use crate::routes::{handle_subscribe, handle_subscribe_method_not_allowed, health_check};
use crate::sheets_client::SheetsClient;

/// Static bearer token subscribe requests must present, if any.
pub struct ApiToken(pub Option<Secret<String>>);

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let sheets_settings = config.google_sheets.clone();
        let timeout = Some(sheets_settings.get_timeout());
        let auth_client = GoogleAuthClient::new(sheets_settings.token_url.clone(), timeout)
            .map_err(std::io::Error::other)?;
        let sheets_client = SheetsClient::new(sheets_settings.api_base_url.clone(), timeout)
            .map_err(std::io::Error::other)?;

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            sheets_settings,
            ApiToken(config.get_api_token()),
            auth_client,
            sheets_client,
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    sheets_settings: GoogleSheetsSettings,
    api_token: ApiToken,
    auth_client: GoogleAuthClient,
    sheets_client: SheetsClient,
) -> Result<Server, std::io::Error> {
    let sheets_settings = web::Data::new(sheets_settings);
    let api_token = web::Data::new(api_token);
    let auth_client = web::Data::new(auth_client);
    let sheets_client = web::Data::new(sheets_client);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/api/subscribe")
                    .route(web::post().to(handle_subscribe))
                    .default_service(web::to(handle_subscribe_method_not_allowed)),
            )
            .app_data(sheets_settings.clone())
            .app_data(api_token.clone())
            .app_data(auth_client.clone())
            .app_data(sheets_client.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
