// Power BI Gateway - Library root

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http_client;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod tools;

pub use gateway::PowerBiGateway;
pub use models::Envelope;
