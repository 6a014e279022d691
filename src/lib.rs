pub mod app;
pub mod metadata;
pub mod models;
pub mod paths;
pub mod scanner;
pub mod transcript;
pub mod ui;
