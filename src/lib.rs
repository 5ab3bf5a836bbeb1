pub mod api;
pub mod auth;
pub mod client;
pub mod engine;
pub mod entities;
pub mod error;
pub mod protocol;
pub mod server;
