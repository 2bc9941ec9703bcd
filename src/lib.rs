pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;
