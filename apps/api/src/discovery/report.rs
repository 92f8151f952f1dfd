//! Report assembly and HTML rendering.
//!
//! Section order is fixed: summary, platforms, takeaways, recommendations,
//! stories, next steps. A profile header precedes them when present. Empty
//! inputs render placeholder lines; nothing here can fail.

use std::fmt::Write;

use serde::Serialize;

use crate::discovery::analyzer::{AnalysisResult, AnalysisStatus, BriefOutcome, StrategyBrief};
use crate::discovery::insights::{competitive_profile, CompetitiveProfile, POSITIONED_PLATFORMS};
use crate::discovery::platforms::{is_unknown, Platform};
use crate::discovery::stories::ReferenceStory;
use crate::intake::models::CustomerProfile;

pub const NO_SUMMARY: &str = "No summary available.";
pub const NO_PLATFORMS: &str =
    "Unable to identify a specific ML platform from the provided information.";
pub const NO_TAKEAWAYS: &str = "No key takeaways identified.";
pub const NO_RECOMMENDATIONS: &str = "No recommendations available.";
pub const NO_STORIES: &str = "No reference stories available.";
pub const NO_NEXT_STEPS: &str = "No next steps identified.";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum Section {
    Summary {
        summary: String,
        narrative: Option<String>,
    },
    Platforms {
        platforms: Vec<Platform>,
        positioning: Vec<CompetitiveProfile>,
        limitation: Option<String>,
        workload_categories: Vec<String>,
    },
    Takeaways {
        items: Vec<String>,
    },
    Recommendations {
        text: String,
        strategy_brief: Option<BriefOutcome>,
    },
    Stories {
        stories: Vec<ReferenceStory>,
    },
    NextSteps {
        items: Vec<String>,
    },
}

impl Section {
    pub fn anchor(&self) -> &'static str {
        match self {
            Section::Summary { .. } => "summary",
            Section::Platforms { .. } => "platforms",
            Section::Takeaways { .. } => "takeaways",
            Section::Recommendations { .. } => "recommendations",
            Section::Stories { .. } => "stories",
            Section::NextSteps { .. } => "next-steps",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Summary { .. } => "Executive Summary",
            Section::Platforms { .. } => "Detected ML Platforms",
            Section::Takeaways { .. } => "Key Takeaways",
            Section::Recommendations { .. } => "Strategic Recommendations",
            Section::Stories { .. } => "Relevant Customer Success Stories",
            Section::NextSteps { .. } => "Recommended Next Steps",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub profile: Option<CustomerProfile>,
    pub status: AnalysisStatus,
    pub notes: Vec<String>,
    pub sections: Vec<Section>,
}

/// Note shown when platforms outside the positioned set were detected.
fn limitation_note(platforms: &[Platform]) -> Option<String> {
    let others: Vec<&str> = platforms
        .iter()
        .copied()
        .filter(|p| !POSITIONED_PLATFORMS.contains(p) && *p != Platform::Unknown)
        .map(Platform::label)
        .collect();
    if others.is_empty() {
        return None;
    }
    Some(format!(
        "Detailed competitive analysis currently supports AWS SageMaker, Databricks, and Azure ML. \
         Other platforms detected ({}) will receive general recommendations.",
        others.join(", ")
    ))
}

pub fn build_report(
    profile: Option<&CustomerProfile>,
    result: &AnalysisResult,
    stories: Vec<ReferenceStory>,
) -> Report {
    let platforms: Vec<Platform> = if is_unknown(&result.platforms) {
        Vec::new()
    } else {
        result.platforms.iter().copied().collect()
    };
    let positioning = platforms
        .iter()
        .filter_map(|p| competitive_profile(*p))
        .collect();

    let sections = vec![
        Section::Summary {
            summary: result.summary.clone(),
            narrative: result.narrative.clone(),
        },
        Section::Platforms {
            limitation: limitation_note(&platforms),
            platforms,
            positioning,
            workload_categories: result.workload_categories.clone(),
        },
        Section::Takeaways {
            items: result.takeaways.clone(),
        },
        Section::Recommendations {
            text: result.recommendations.clone(),
            strategy_brief: result.strategy_brief.clone(),
        },
        Section::Stories { stories },
        Section::NextSteps {
            items: result.next_steps.clone(),
        },
    ];

    Report {
        profile: profile.cloned(),
        status: result.status,
        notes: result.notes.clone(),
        sections,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTML
// ────────────────────────────────────────────────────────────────────────────

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub const PAGE_STYLE: &str = "body{font-family:sans-serif;max-width:860px;margin:2rem auto;padding:0 1rem;line-height:1.5}\
section{margin-bottom:1.5rem}.note{background:#fff4e5;padding:.5rem 1rem;border-left:4px solid #f0a020}\
.story{border-left:4px solid #29b5e8;padding-left:1rem;margin:.75rem 0}.placeholder{color:#777;font-style:italic}";

/// Wraps a body fragment in a minimal standalone page.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        PAGE_STYLE,
        body
    )
}

fn placeholder(text: &str) -> String {
    format!("<p class=\"placeholder\">{}</p>\n", escape_html(text))
}

fn list(items: &[String], ordered: bool, empty: &str) -> String {
    if items.is_empty() {
        return placeholder(empty);
    }
    let tag = if ordered { "ol" } else { "ul" };
    let mut html = format!("<{tag}>\n");
    for item in items {
        let _ = writeln!(html, "<li>{}</li>", escape_html(item));
    }
    let _ = writeln!(html, "</{tag}>");
    html
}

fn static_list(items: &[&str]) -> String {
    let owned: Vec<String> = items.iter().map(|s| s.to_string()).collect();
    list(&owned, false, "")
}

fn paragraphs(text: &str, empty: &str) -> String {
    if text.trim().is_empty() {
        return placeholder(empty);
    }
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>\n", escape_html(p).replace('\n', "<br>\n")))
        .collect()
}

fn render_profile(profile: &CustomerProfile) -> String {
    let join = |labels: Vec<&str>| {
        if labels.is_empty() {
            "None specified".to_string()
        } else {
            labels.join(", ")
        }
    };
    let rows = [
        ("Industry", profile.industry.label().to_string()),
        ("Company size", profile.company_size.label().to_string()),
        ("ML maturity", profile.ml_maturity.label().to_string()),
        (
            "Current platforms",
            join(profile.current_platforms.iter().map(|p| p.label()).collect()),
        ),
        (
            "Use cases",
            join(profile.use_cases.iter().map(|u| u.label()).collect()),
        ),
    ];

    let mut html = format!(
        "<header id=\"profile\">\n<h1>{}</h1>\n<dl>\n",
        escape_html(&profile.company_name)
    );
    for (label, value) in rows {
        let _ = writeln!(html, "<dt>{label}</dt><dd>{}</dd>", escape_html(&value));
    }
    html.push_str("</dl>\n</header>\n");
    html
}

fn render_brief(brief: &StrategyBrief) -> String {
    let mut html = String::from("<h3>Account Strategy</h3>\n");
    if !brief.executive_summary.is_empty() {
        html.push_str(&paragraphs(&brief.executive_summary, ""));
    }
    let blocks: [(&str, &[String]); 8] = [
        ("Snowflake advantages", brief.competitive_analysis.snowflake_advantages.as_slice()),
        ("Competitive risks", brief.competitive_analysis.competitive_risks.as_slice()),
        ("Short-term plan (30-90 days)", brief.strategy.short_term.as_slice()),
        ("Long-term plan (6-12 months)", brief.strategy.long_term.as_slice()),
        ("Discovery questions", brief.discovery_questions.as_slice()),
        ("Proof-of-concept ideas", brief.poc_recommendations.as_slice()),
        ("Risks to avoid", brief.risks_to_avoid.as_slice()),
        ("Competing platforms", brief.competitive_analysis.current_platforms.as_slice()),
    ];
    for (heading, items) in blocks {
        if !items.is_empty() {
            let _ = writeln!(html, "<h4>{heading}</h4>");
            html.push_str(&list(items, false, ""));
        }
    }
    let upside = &brief.compute_upside;
    for (heading, value) in [
        ("Estimated workloads", &upside.estimated_workloads),
        ("Potential compute increase", &upside.potential_compute_increase),
        ("Revenue opportunity", &upside.revenue_opportunity),
    ] {
        if !value.is_empty() {
            let _ = writeln!(html, "<p><strong>{heading}:</strong> {}</p>", escape_html(value));
        }
    }
    html
}

fn render_section(section: &Section) -> String {
    let mut html = format!(
        "<section id=\"{}\">\n<h2>{}</h2>\n",
        section.anchor(),
        section.title()
    );
    match section {
        Section::Summary { summary, narrative } => {
            html.push_str(&paragraphs(summary, NO_SUMMARY));
            if let Some(narrative) = narrative {
                html.push_str("<h3>Detailed Analysis</h3>\n");
                html.push_str(&paragraphs(narrative, NO_SUMMARY));
            }
        }
        Section::Platforms {
            platforms,
            positioning,
            limitation,
            workload_categories,
        } => {
            let labels: Vec<String> = platforms.iter().map(|p| p.label().to_string()).collect();
            html.push_str(&list(&labels, false, NO_PLATFORMS));
            for profile in positioning {
                let _ = writeln!(html, "<h3>Positioning against {}</h3>", profile.platform);
                html.push_str("<h4>Strengths</h4>\n");
                html.push_str(&static_list(profile.strengths));
                html.push_str("<h4>Weaknesses</h4>\n");
                html.push_str(&static_list(profile.weaknesses));
                html.push_str("<h4>How to win</h4>\n");
                html.push_str(&static_list(profile.win_themes));
            }
            if let Some(note) = limitation {
                let _ = writeln!(html, "<p class=\"note\">{}</p>", escape_html(note));
            }
            if !workload_categories.is_empty() {
                html.push_str("<h3>Workload categories</h3>\n");
                html.push_str(&list(workload_categories, false, ""));
            }
        }
        Section::Takeaways { items } => html.push_str(&list(items, false, NO_TAKEAWAYS)),
        Section::Recommendations {
            text,
            strategy_brief,
        } => {
            html.push_str(&paragraphs(text, NO_RECOMMENDATIONS));
            match strategy_brief {
                Some(BriefOutcome::Structured(brief)) => html.push_str(&render_brief(brief)),
                Some(BriefOutcome::Raw(raw)) => {
                    html.push_str("<h3>Account Strategy</h3>\n");
                    let _ = writeln!(html, "<pre>{}</pre>", escape_html(raw));
                }
                None => {}
            }
        }
        Section::Stories { stories } => {
            if stories.is_empty() {
                html.push_str(&placeholder(NO_STORIES));
            }
            for story in stories {
                let _ = write!(
                    html,
                    "<div class=\"story\">\n<h3>{}</h3>\n<p>{}</p>\n<p><strong>Results:</strong> {}</p>\n<blockquote>{}</blockquote>\n</div>\n",
                    escape_html(story.title),
                    escape_html(story.summary),
                    escape_html(story.metrics),
                    escape_html(story.quote)
                );
            }
        }
        Section::NextSteps { items } => html.push_str(&list(items, true, NO_NEXT_STEPS)),
    }
    html.push_str("</section>\n");
    html
}

/// Renders the report as a full HTML page. All dynamic text is escaped.
pub fn render_html(report: &Report) -> String {
    let mut body = String::new();
    match &report.profile {
        Some(profile) => body.push_str(&render_profile(profile)),
        None => body.push_str("<h1>ML Workload Discovery Report</h1>\n"),
    }
    for note in &report.notes {
        let _ = writeln!(body, "<p class=\"note\">{}</p>", escape_html(note));
    }
    for section in &report.sections {
        body.push_str(&render_section(section));
    }
    body.push_str("<p><a href=\"/\">Analyze more notes</a></p>");
    page("ML Workload Discovery Report", &body)
}
