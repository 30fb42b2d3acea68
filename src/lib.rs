pub mod artwork;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod identifier;
pub mod math;
pub mod metadata;
pub mod patcher;
pub mod upload;
