pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod http;
pub mod messaging;
pub mod metrics;
pub mod service;
pub mod utils;
