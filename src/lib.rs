pub mod commands;
pub mod core;
pub mod host;
pub mod models;
pub mod storage;
