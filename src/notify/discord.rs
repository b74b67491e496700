// src/notify/discord.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Discord hard-caps message content at 2000 chars; leave headroom for the
/// code fence and the truncation notice.
const CONTENT_BUDGET: usize = 1900;
const TRUNCATION_NOTICE: &str = "\n\n[report truncated]";

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Serialize)]
struct WebhookPayload {
    content: String,
}

/// Fence the Markdown report for Discord, truncating to the content budget.
pub fn fence_markdown(markdown: &str) -> String {
    let body: String = if markdown.chars().count() > CONTENT_BUDGET {
        let mut cut: String = markdown
            .chars()
            .take(CONTENT_BUDGET - TRUNCATION_NOTICE.chars().count())
            .collect();
        cut.push_str(TRUNCATION_NOTICE);
        cut
    } else {
        markdown.to_string()
    };
    format!("```markdown\n{body}\n```")
}

impl DiscordNotifier {
    /// Built from DISCORD_WEBHOOK; None when unset so delivery is skipped.
    pub fn from_env() -> Option<Self> {
        let webhook = std::env::var("DISCORD_WEBHOOK").ok()?;
        if webhook.trim().is_empty() {
            return None;
        }
        Some(Self::new(webhook))
    }

    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub async fn send_markdown(&self, markdown: &str) -> Result<()> {
        let payload = WebhookPayload {
            content: fence_markdown(markdown),
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("Discord webhook HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("Discord webhook request failed: {e}"));
                }
            }
        }
    }
}
