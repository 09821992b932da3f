//! Plain-text rendering of command results.

use std::fmt::Write;

use metrics_core::formatting::{
    format_currency, format_first_open, format_impressions, format_number, percentage,
};
use metrics_core::models::{EngagementTag, FeaturedItem};
use metrics_core::revenue::EpisodeEstimate;
use metrics_data::aggregator::CatalogReport;
use metrics_data::analysis::{EngagementReport, UNTAGGED_KEY};

const TAG_ORDER: [EngagementTag; 5] = [
    EngagementTag::HotLead,
    EngagementTag::Interested,
    EngagementTag::Forwarded,
    EngagementTag::Cold,
    EngagementTag::PossibleSpamFolder,
];

pub fn render_engagement(report: &EngagementReport) -> String {
    let mut out = String::new();
    let total = report.metadata.messages_analyzed;

    let _ = writeln!(
        out,
        "{:<24} {:>6} {:>6} {:>7} {:>10} {:>5} {:<20}",
        "MESSAGE", "OPENS", "CLICKS", "BOUNCES", "FIRST OPEN", "IPS", "TAG"
    );
    for m in &report.messages {
        let _ = writeln!(
            out,
            "{:<24} {:>6} {:>6} {:>7} {:>10} {:>5} {:<20}",
            truncate(&m.id, 24),
            m.stats.opens,
            m.stats.clicks,
            m.stats.bounces,
            format_first_open(m.stats.first_open_minutes),
            m.stats.ip_count(),
            m.tag.map(|t| t.label()).unwrap_or("-"),
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{} messages, {} events", total, report.metadata.events_processed);
    for tag in TAG_ORDER {
        let count = report.count(Some(tag));
        let _ = writeln!(
            out,
            "  {:<22} {:>6}  ({}%)",
            tag.label(),
            count,
            format_number(percentage(count as f64, total as f64), 1)
        );
    }
    let untagged = report.tag_counts.get(UNTAGGED_KEY).copied().unwrap_or(0);
    let _ = writeln!(
        out,
        "  {:<22} {:>6}  ({}%)",
        "No tag",
        untagged,
        format_number(percentage(untagged as f64, total as f64), 1)
    );
    out
}

pub fn render_estimate(estimate: &EpisodeEstimate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Episode age:     {} days", estimate.age_days);
    let _ = writeln!(out, "Ad reads:        {}", estimate.ad_read_count);
    let _ = writeln!(
        out,
        "Certified voice: {}",
        if estimate.certified_voice { "yes" } else { "no" }
    );
    let _ = writeln!(
        out,
        "Impressions:     {} ({})",
        format_number(estimate.impressions as f64, 0),
        format_impressions(estimate.impressions)
    );
    let _ = writeln!(out, "Revenue:         {}", format_currency(estimate.revenue));
    let _ = writeln!(out, "  Platform:      {}", format_currency(estimate.split.platform));
    let _ = writeln!(out, "  Creator:       {}", format_currency(estimate.split.creator));
    out
}

pub fn render_catalog(report: &CatalogReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<28} {:>5} {:>4} {:>12} {:>12} {:>12}",
        "EPISODE", "AGE", "ADS", "IMPRESSIONS", "REVENUE", "CREATOR"
    );
    for e in &report.estimates {
        let name = if e.title.is_empty() { &e.episode_id } else { &e.title };
        let _ = writeln!(
            out,
            "{:<28} {:>5} {:>4} {:>12} {:>12} {:>12}",
            truncate(name, 28),
            e.age_days,
            e.ad_read_count,
            format_impressions(e.impressions),
            format_currency(e.revenue),
            format_currency(e.split.creator),
        );
    }

    let _ = writeln!(out);
    for (month, totals) in &report.monthly {
        let _ = writeln!(
            out,
            "{:<8} {:>3} episodes {:>12} {:>12}",
            month,
            totals.episodes,
            format_impressions(totals.impressions),
            format_currency(totals.revenue),
        );
    }
    let t = &report.totals;
    let _ = writeln!(
        out,
        "Total: {} episodes, {} impressions, {} revenue ({} platform / {} creator)",
        t.episodes,
        format_number(t.impressions as f64, 0),
        format_currency(t.revenue),
        format_currency(t.platform_revenue),
        format_currency(t.creator_revenue),
    );
    out
}

pub fn render_featured(items: &[FeaturedItem]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}", i + 1, item.title());
        let _ = writeln!(out, "     {}", item.image_url());
    }
    let _ = writeln!(out, "{} featured items", items.len());
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
    t.push('…');
    t
}
