pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod listing;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod proxy;
pub mod routes;
pub mod validators;
pub mod webhook;

pub use app::build_app;
pub use models::AppState;
