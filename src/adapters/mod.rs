pub mod axum_server;
pub mod http_handler;
pub mod hyper_server;

/// Re-export commonly used types from adapters
pub use axum_server::AxumServer;
pub use http_handler::HttpHandler;
pub use hyper_server::HyperServer;
