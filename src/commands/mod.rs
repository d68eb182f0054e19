// Command handlers module
pub mod config;
pub mod run;
