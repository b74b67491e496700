// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::ReportSet;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// Build from SMTP_HOST / SMTP_USER / SMTP_PASS / NOTIFY_EMAIL_FROM /
    /// NOTIFY_EMAIL_TO. Returns Ok(None) when any of them is unset, so the
    /// caller can skip email delivery instead of failing the run.
    pub fn from_env() -> Result<Option<Self>> {
        fn var(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }
        let (host, user, pass, from_addr, to_addr) = match (
            var("SMTP_HOST"),
            var("SMTP_USER"),
            var("SMTP_PASS"),
            var("NOTIFY_EMAIL_FROM"),
            var("NOTIFY_EMAIL_TO"),
        ) {
            (Some(h), Some(u), Some(p), Some(f), Some(t)) => (h, u, p, f, t),
            _ => return Ok(None),
        };

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Some(Self { mailer, from, to }))
    }

    /// Multipart/alternative: plain Markdown body plus the HTML rendering.
    pub async fn send_report(&self, report: &ReportSet) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                report.markdown.clone(),
                report.html.clone(),
            ))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
