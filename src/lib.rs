pub mod app;
pub mod catalog;
pub mod config;
pub mod models;
pub mod navigation;
pub mod session;
pub mod slideshow;
pub mod store;
pub mod view;
