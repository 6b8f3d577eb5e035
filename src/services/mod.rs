pub mod ai;
pub mod auth;
pub mod db;
pub mod error;
pub mod scraper;
pub mod tts;
