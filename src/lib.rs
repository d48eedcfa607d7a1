pub mod config;
pub mod error;
pub mod game;
pub mod history;
pub mod i18n;
pub mod navigation;
pub mod profile;
pub mod quiz;
pub mod stage;
pub mod topics;
