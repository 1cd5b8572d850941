// Core domain: errors, models, encryption, validation

pub mod constants;
pub mod crypto;
pub mod errors;
pub mod models;
pub mod validation;
