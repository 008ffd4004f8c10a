pub mod analyzers;
pub mod config;
pub mod correct;
pub mod deltas;
pub mod median;
pub mod output;
pub mod parser;
pub mod readings;
pub mod stats;
