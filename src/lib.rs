pub mod config;
pub mod error;
pub mod interval;
pub mod myenergi;
pub mod report;
