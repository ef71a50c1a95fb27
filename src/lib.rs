pub mod client;
pub mod config;
pub mod errors;
pub mod grading;
pub mod models;
pub mod names;
pub mod navigation;
pub mod services;
pub mod views;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use errors::{ClientError, ClientResult};
