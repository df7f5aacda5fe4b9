pub mod bot;
pub mod chat;
pub mod config;
pub mod dedup;
pub mod discord;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod i18n;
pub mod metrics;
pub mod preferences;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod statistics;
pub mod store;
pub mod translator;
