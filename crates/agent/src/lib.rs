//! Classifier agent: an HTTP host for a shared model registry

pub mod api;
pub mod config;
pub mod health;
