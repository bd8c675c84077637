pub mod config;
pub mod env;
pub mod http;
pub mod model;
pub mod printer;
pub mod recorder;
pub mod report;
pub mod runner;
pub mod scenario;
