pub mod error_handler;
pub mod event_manager;
pub mod help;
pub mod localization;
pub mod status;
