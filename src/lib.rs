pub mod analytics;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod plans;
pub mod profile;
pub mod repository;
pub mod session;
pub mod sharing;
pub mod telemetry;
pub mod validation;

pub use error::{AppError, ErrorKind, ServiceError};
