pub mod add_mod;
pub mod build;
pub mod cache;
pub mod config;
