pub mod admin;
pub mod analysis;
pub mod auth;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod forms;
pub mod models;
pub mod nav;
pub mod records;
pub mod reports;
