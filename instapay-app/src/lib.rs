pub mod card;
pub mod client;
pub mod config_path;
pub mod error;
pub mod http;
pub mod localstore;
pub mod session;
pub mod share;
