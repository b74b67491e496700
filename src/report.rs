// src/report.rs
//! Report rendering over the pipeline's ranked output: an HTML document for
//! email, a Markdown document for webhooks and file drops. Pure string
//! building, no templating engine.

use crate::pipeline::{NewsItem, Paper, RunOutput};

const REPORT_TITLE: &str = "Mathematical Optimization Daily Digest";

fn stars(score: f32) -> String {
    "⭐".repeat((score.max(0.0).round() as usize).clamp(1, 10))
}

fn authors_line(paper: &Paper) -> String {
    let mut s = paper.authors.join(", ");
    if paper.more_authors {
        s.push_str(" et al.");
    }
    s
}

fn categories_line(paper: &Paper) -> String {
    paper.categories.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
}

fn escape(s: &str) -> String {
    html_escape::encode_text(s).to_string()
}

pub fn render_markdown(out: &RunOutput) -> String {
    let when = out.generated_at.format("%Y-%m-%d %H:%M %:z");
    let mut md = format!(
        "# 🔬 {REPORT_TITLE}\n**Generated**: {when}\n\n---\n\n## 📚 New papers ({})\n\n",
        out.papers.len()
    );

    if out.papers.is_empty() {
        md.push_str("No new papers today.\n\n---\n");
    } else {
        for (i, paper) in out.papers.iter().enumerate() {
            md.push_str(&format!(
                "### {}. {}\n\n- **Authors**: {}\n- **Categories**: {}\n- **Published**: {}\n- **Abstract**: {}\n- **URL**: {}\n\n---\n",
                i + 1,
                paper.title,
                authors_line(paper),
                categories_line(paper),
                paper.published,
                paper.summary,
                paper.url
            ));
        }
    }

    md.push_str(&format!("\n## 📰 Related news ({})\n\n", out.news.len()));
    if out.news.is_empty() {
        md.push_str("No related news today.\n\n---\n");
    } else {
        for (i, news) in out.news.iter().enumerate() {
            md.push_str(&format!(
                "### {}. {}\n\n- **Summary**: {}\n- **Relevance**: {}\n- **Link**: {}\n- **Published**: {}\n\n---\n",
                i + 1,
                news.title,
                news.summary,
                stars(news.relevance_score),
                news.link,
                news.published
            ));
        }
    }

    md.push_str(&format!(
        "\n## 📊 Collection stats\n- Papers: {}\n- News: {}\n- Generated: {}\n\n*This report was generated automatically.*\n",
        out.papers.len(),
        out.news.len(),
        when
    ));
    md
}

fn paper_html(i: usize, paper: &Paper) -> String {
    format!(
        r#"<div class="item">
  <div class="item-title">{}. {}</div>
  <div class="item-meta">👥 {} &nbsp; 🏷️ {} &nbsp; 📅 {}</div>
  <div class="abstract">{}</div>
  <a href="{}" class="link">Read the paper</a>
</div>
"#,
        i + 1,
        escape(&paper.title),
        escape(&authors_line(paper)),
        escape(&categories_line(paper)),
        escape(&paper.published),
        escape(&paper.summary),
        escape(&paper.url)
    )
}

fn news_html(i: usize, news: &NewsItem) -> String {
    format!(
        r#"<div class="item">
  <div class="item-title">{}. {}</div>
  <div class="item-meta">🎯 <span class="stars">{}</span> &nbsp; 📅 {}</div>
  <div class="abstract">{}</div>
  <a href="{}" class="link news-link">Read the article</a>
</div>
"#,
        i + 1,
        escape(&news.title),
        stars(news.relevance_score),
        escape(&news.published),
        escape(&news.summary),
        escape(&news.link)
    )
}

pub fn render_html(out: &RunOutput) -> String {
    let when = out.generated_at.format("%Y-%m-%d %H:%M %:z");

    let papers_section = if out.papers.is_empty() {
        r#"<div class="no-content">No new papers today.</div>"#.to_string()
    } else {
        out.papers
            .iter()
            .enumerate()
            .map(|(i, p)| paper_html(i, p))
            .collect::<String>()
    };

    let news_section = if out.news.is_empty() {
        r#"<div class="no-content">No related news today.</div>"#.to_string()
    } else {
        out.news
            .iter()
            .enumerate()
            .map(|(i, n)| news_html(i, n))
            .collect::<String>()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; margin: 0; padding: 20px; background-color: #f5f5f5; color: #333; }}
.container {{ max-width: 800px; margin: 0 auto; background-color: white; border-radius: 10px; box-shadow: 0 4px 6px rgba(0,0,0,0.1); overflow: hidden; }}
.header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; text-align: center; }}
.header h1 {{ margin: 0; font-size: 28px; font-weight: 300; }}
.section {{ margin: 20px; }}
.section-title {{ font-size: 22px; font-weight: 600; margin: 30px 0 20px 0; padding: 15px; border-radius: 8px; }}
.section-title.papers {{ background-color: #e3f2fd; border-left: 5px solid #2196f3; color: #1976d2; }}
.section-title.news {{ background-color: #fff8e1; border-left: 5px solid #ff9800; color: #f57c00; }}
.item {{ background-color: white; border: 1px solid #e0e0e0; border-radius: 8px; margin: 15px 0; padding: 20px; }}
.item-title {{ font-size: 18px; font-weight: 600; margin-bottom: 12px; color: #2c3e50; }}
.item-meta {{ margin-bottom: 12px; font-size: 14px; color: #666; }}
.abstract {{ color: #555; margin-bottom: 15px; }}
.link {{ display: inline-block; background-color: #4CAF50; color: white; padding: 8px 16px; text-decoration: none; border-radius: 4px; font-size: 14px; }}
.news-link {{ background-color: #ff9800; }}
.stars {{ color: #ffc107; }}
.stats {{ background-color: #f8f9fa; border-radius: 8px; padding: 20px; margin: 30px 20px; text-align: center; }}
.footer {{ text-align: center; padding: 20px; color: #999; font-size: 12px; border-top: 1px solid #eee; }}
.no-content {{ text-align: center; padding: 40px; color: #999; font-style: italic; }}
</style>
</head>
<body>
<div class="container">
  <div class="header"><h1>🔬 {title}</h1><div class="date">{when}</div></div>
  <div class="section">
    <div class="section-title papers">📚 New papers ({paper_count})</div>
    {papers_section}
  </div>
  <div class="section">
    <div class="section-title news">📰 Related news ({news_count})</div>
    {news_section}
  </div>
  <div class="stats">
    <h3>📊 Collection stats</h3>
    Papers: {paper_count} &nbsp;·&nbsp; News: {news_count} &nbsp;·&nbsp; Generated: {when}
  </div>
  <div class="footer">This report was generated automatically.</div>
</div>
</body>
</html>
"#,
        title = REPORT_TITLE,
        when = when,
        paper_count = out.papers.len(),
        news_count = out.news.len(),
        papers_section = papers_section,
        news_section = news_section,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunStats;
    use chrono::{FixedOffset, TimeZone};

    fn output(papers: Vec<Paper>, news: Vec<NewsItem>) -> RunOutput {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        RunOutput {
            papers,
            news,
            stats: RunStats::default(),
            generated_at: tz.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        }
    }

    fn paper() -> Paper {
        Paper {
            title: "Interior point methods".into(),
            authors: vec!["A".into(), "B".into(), "C".into()],
            more_authors: true,
            summary: "A survey.".into(),
            url: "http://arxiv.org/abs/1".into(),
            published: "2024-01-09".into(),
            categories: vec!["math.OC".into(), "cs.DM".into(), "stat.ML".into()],
        }
    }

    fn news() -> NewsItem {
        NewsItem {
            title: "Solver <news>".into(),
            link: "https://example.test/a".into(),
            published: "2024-01-09 10:00 +09:00".into(),
            summary: "optimization everywhere".into(),
            relevance_score: 3.0,
        }
    }

    #[test]
    fn empty_sections_render_placeholders() {
        let out = output(vec![], vec![]);
        let md = render_markdown(&out);
        assert!(md.contains("No new papers today."));
        assert!(md.contains("No related news today."));
        let html = render_html(&out);
        assert!(html.contains("No new papers today."));
    }

    #[test]
    fn truncated_author_list_is_marked() {
        let out = output(vec![paper()], vec![]);
        let md = render_markdown(&out);
        assert!(md.contains("A, B, C et al."));
        // only the first two categories are shown
        assert!(md.contains("math.OC, cs.DM"));
        assert!(!md.contains("stat.ML"));
    }

    #[test]
    fn relevance_renders_as_stars() {
        let out = output(vec![], vec![news()]);
        let md = render_markdown(&out);
        assert!(md.contains("⭐⭐⭐"));
        assert!(!md.contains("⭐⭐⭐⭐"));
    }

    #[test]
    fn html_escapes_item_text() {
        let out = output(vec![], vec![news()]);
        let html = render_html(&out);
        assert!(html.contains("Solver &lt;news&gt;"));
    }
}
