pub mod app;
pub mod classifier;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod nlp;
pub mod pipeline;
pub mod routes;
pub mod validators;

pub use error::{Error, Result};
