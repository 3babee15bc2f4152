pub mod api_error;
pub mod auth;
pub mod config;
pub mod db;
pub mod discord;
pub mod http;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod service;
pub mod telemetry;
