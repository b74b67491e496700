//! Optimization Digest — Binary Entrypoint
//! Runs one collection pass, renders the report, and delivers it over the
//! configured channels (files, email, Discord). Exits zero even on partial
//! source failures; an empty report is a valid outcome.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use optimization_digest::config::CollectorConfig;
use optimization_digest::notify::{discord::DiscordNotifier, email::EmailSender, file::ReportWriter, ReportSet};
use optimization_digest::pipeline::CollectionPipeline;
use optimization_digest::report;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("optimization_digest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Machine-readable run summary printed to stdout (consumed by CI).
#[derive(Serialize)]
struct RunSummary {
    papers_count: usize,
    news_count: usize,
    email_sent: bool,
    discord_sent: bool,
    files_written: bool,
    execution_time: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = CollectorConfig::load_default()?;
    let pipeline = CollectionPipeline::from_config(&cfg);

    let out = pipeline.run().await;

    let report = ReportSet {
        subject: format!(
            "🔬 Optimization digest — {}",
            out.generated_at.format("%Y/%m/%d")
        ),
        html: report::render_html(&out),
        markdown: report::render_markdown(&out),
    };

    let files_written = match ReportWriter::new(&cfg.run.output_dir).write(&report, out.generated_at)
    {
        Ok(_) => true,
        Err(e) => {
            warn!(target: "notify", error = %e, "failed to write report files");
            false
        }
    };

    let email_sent = match EmailSender::from_env() {
        Ok(Some(sender)) => match sender.send_report(&report).await {
            Ok(()) => {
                info!(target: "notify", "email report sent");
                true
            }
            Err(e) => {
                warn!(target: "notify", error = %e, "email delivery failed");
                false
            }
        },
        Ok(None) => {
            info!(target: "notify", "email not configured, skipping");
            false
        }
        Err(e) => {
            warn!(target: "notify", error = %e, "email configuration invalid, skipping");
            false
        }
    };

    let discord_sent = match DiscordNotifier::from_env() {
        Some(notifier) => match notifier.send_markdown(&report.markdown).await {
            Ok(()) => {
                info!(target: "notify", "discord report sent");
                true
            }
            Err(e) => {
                warn!(target: "notify", error = %e, "discord delivery failed");
                false
            }
        },
        None => {
            info!(target: "notify", "discord webhook not configured, skipping");
            false
        }
    };

    let summary = RunSummary {
        papers_count: out.papers.len(),
        news_count: out.news.len(),
        email_sent,
        discord_sent,
        files_written,
        execution_time: out.generated_at.to_rfc3339(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
