//! Integration test modules for horst

pub mod connection;
pub mod reconfigure;
