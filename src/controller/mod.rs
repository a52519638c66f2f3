//! API Controller modules

pub mod version;
