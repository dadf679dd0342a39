pub mod auth;
pub mod compactor;
pub mod config;
pub mod http;
pub mod limits;
pub mod model;
pub mod observability;
pub mod scoreboard;
pub mod service;
pub mod store;
pub mod wal;
