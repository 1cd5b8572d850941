// Library root for the invitation vault

pub mod config;
pub mod core;
pub mod services;
pub mod state;
