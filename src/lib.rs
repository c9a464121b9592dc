pub mod cli;
pub mod companion;
pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod geocode;
pub mod geolocate;
pub mod location;
pub mod notify;
pub mod schedule;
pub mod scheduler;
pub mod settings;
pub mod timings;

pub use error::{Result, TaqwaError};
