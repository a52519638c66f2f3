pub mod cli;
pub mod configuration;
pub mod controller;
pub mod error;
pub mod model;
pub mod server;
