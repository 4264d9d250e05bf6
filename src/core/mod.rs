//! Core modules for schema bootstrap and inspection.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod migration;
pub mod output;
pub mod schemas;
