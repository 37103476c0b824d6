pub mod config;
pub mod domain;
pub mod errors;
pub mod google_auth;
pub mod routes;
pub mod sheets_client;
pub mod signup;
pub mod startup;
pub mod telemetry;
