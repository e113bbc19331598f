//! Survey backend: survey storage plus one-answer-per-participant result
//! recording with live vote distributions.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod results;
pub mod store;
