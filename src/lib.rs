pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod flatten;
pub mod images;
pub mod manifest;
pub mod output;
pub mod registry;
pub mod store;
pub mod tui;
pub mod view;
