//! stockwatch engine library.
//!
//! This crate primarily ships the `stockwatch` binary, but exposes its
//! components to enable integration testing and reuse.

pub mod api;
pub mod config;
pub mod db;
pub mod notify;
pub mod scheduler;
pub mod service;
pub mod state;
