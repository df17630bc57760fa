pub mod backend;
pub mod config;
pub mod database;
pub mod forecast;
