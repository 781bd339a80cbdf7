// Adapters layer: concrete implementations for the outside world (environment, filesystem, HTTP).

pub mod env;
pub mod fs;
pub mod http_client;
pub mod http_server;
pub mod router;
