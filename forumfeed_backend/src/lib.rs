pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod posts;
pub mod telemetry;
pub mod users;
pub mod utils;
pub mod votes;
