pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod harness;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pricing;
pub mod server;
pub mod service;
pub mod store;
