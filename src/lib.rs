// Library for tests to access modules

pub mod aggregator;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod locator;
pub mod models;
pub mod routes;
pub mod version;
