//! Configuration module for solver settings

pub mod settings;

pub use settings::Settings;
