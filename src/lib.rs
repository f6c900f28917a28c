pub mod api;
pub mod booking;
pub mod config;
pub mod error;
pub mod guard;
pub mod hotel;
pub mod identity;
pub mod lock;
pub mod room;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod user;
pub mod utils;

pub use error::{Error, ForbiddenReason, Result};
