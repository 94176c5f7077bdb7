//! Business logic services

pub mod agent;
pub mod synthesis;
