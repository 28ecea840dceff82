pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod mail;
pub mod pipeline;
pub mod store;
pub mod terminal;
