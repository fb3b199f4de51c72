//! Command implementations.

pub mod auth;
pub mod config;
pub mod form;
pub mod submit;
