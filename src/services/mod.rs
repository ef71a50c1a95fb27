pub mod auth;
pub mod lobby;
pub mod play;
pub mod poller;
pub mod repository;
pub mod results;
