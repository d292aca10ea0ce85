pub mod assemble;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fleet;
pub mod models;
pub mod pipeline;
pub mod population;
pub mod telemetry;
