pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod scanner;
