// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod filter;
pub mod gpu;
pub mod models;
pub mod netdev;
pub mod normalize;
pub mod routes;
pub mod version;
pub mod worker;
