pub mod api;
pub mod app;
pub mod search;
pub mod state;
pub mod types;
pub mod ui;
