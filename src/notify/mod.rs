// src/notify/mod.rs
pub mod discord;
pub mod email;
pub mod file;

/// Rendered report pair handed to the delivery channels.
#[derive(Debug, Clone)]
pub struct ReportSet {
    pub subject: String,
    pub html: String,
    pub markdown: String,
}
