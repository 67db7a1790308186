// Library for tests to access modules

pub mod aggregator;
pub mod collectors;
pub mod config;
pub mod exec;
pub mod export;
pub mod models;
pub mod platform;
pub mod version;
pub mod worker;
