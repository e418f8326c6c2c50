//! Squad report rendering.
//!
//! Renders a finalized `SquadReport` as Markdown, as the plain console
//! layout, or as JSON. Undefined ratios are shown as `N/A`.

use crate::analysis::members_by_completion;
use crate::classify::Taxonomy;
use crate::models::{format_decimal, Hours, MemberFailure, Period, SquadReport, User};
use crate::report::metrics::{ReportMetrics, Share};
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

const RULE: &str = "======================";

fn days(hours: Hours, period: &Period) -> String {
    format_decimal(hours.as_days(period.hours_per_day))
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(
    report: &SquadReport,
    taxonomy: &Taxonomy,
    include_members: bool,
) -> String {
    let metrics = ReportMetrics::compute(&report.hours, taxonomy);
    let mut output = String::new();

    output.push_str(&format!("# Worklog Report: {}\n\n", report.squad));

    output.push_str(&generate_metadata_section(report));

    if report.is_partial() {
        output.push_str(&format!(
            "> ⚠️ **Partial report:** {} member(s) could not be computed and are not counted below. See [Missing Members](#missing-members).\n\n",
            report.missing.len()
        ));
    }

    output.push_str(&generate_summary_section(&metrics, &report.period));
    output.push_str(&generate_breakdown_section(&metrics, &report.period));
    output.push_str(&generate_not_in_squad_section(&metrics));

    if include_members {
        output.push_str(&generate_members_section(report, taxonomy));
    }

    output.push_str(&generate_missing_section(&report.missing));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &SquadReport) -> String {
    let mut section = String::new();
    let period = &report.period;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Squad:** {}\n", report.squad));
    section.push_str(&format!(
        "- **Period:** {} ({} to {}, {} working days)\n",
        report.period_name, period.start, period.end, period.working_days
    ));
    section.push_str(&format!("- **Members Reported:** {}\n", report.members.len()));
    if report.is_partial() {
        section.push_str(&format!("- **Members Missing:** {}\n", report.missing.len()));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

fn generate_summary_section(metrics: &ReportMetrics, period: &Period) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Completion | Logged | Expected | Missing |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | {}h | {}h | {}h |\n\n",
        metrics.completion, metrics.logged, metrics.expected, metrics.missing
    ));

    section.push_str(&format!(
        "- **Worked:** {}h = {}j/h\n",
        metrics.worked,
        days(metrics.worked, period)
    ));
    for excluded in &metrics.excluded {
        section.push_str(&format!("- **{}:** {}h\n", excluded.label, excluded.hours));
    }
    section.push('\n');

    section
}

fn generate_breakdown_section(metrics: &ReportMetrics, period: &Period) -> String {
    let mut section = String::new();

    section.push_str("## Breakdown\n\n");
    section.push_str("| Category | Hours | Days | Share of Worked |\n");
    section.push_str("|:---|---:|---:|---:|\n");

    for share in metrics.work_types.iter().chain(&metrics.worked_categories) {
        section.push_str(&format!(
            "| {} | {}h | {} | {} |\n",
            share.label,
            share.hours,
            days(share.hours, period),
            share.share
        ));
    }
    section.push('\n');

    section
}

fn generate_not_in_squad_section(metrics: &ReportMetrics) -> String {
    let mut section = String::new();

    section.push_str("## Not in Squad\n\n");
    section.push_str(&format!(
        "**Total:** {}h ({} of worked)\n\n",
        metrics.not_in_squad, metrics.not_in_squad_share
    ));

    section.push_str("| Category | Hours |\n");
    section.push_str("|:---|---:|\n");
    for share in &metrics.not_in_squad_categories {
        section.push_str(&format!("| {} | {}h |\n", share.label, share.hours));
    }
    section.push_str(&format!("| Other squads | {}h |\n", metrics.other_squad));
    for share in &metrics.other_squad_work_types {
        section.push_str(&format!("| ↳ {} | {}h |\n", share.label, share.hours));
    }
    section.push('\n');

    if !metrics.other_issues.is_empty() {
        section.push_str("### Other Squad Issues\n\n");
        for issue in &metrics.other_issues {
            section.push_str(&format!("- {}\n", issue));
        }
        section.push('\n');
    }

    section
}

fn generate_members_section(report: &SquadReport, taxonomy: &Taxonomy) -> String {
    let mut section = String::new();

    section.push_str("## Members\n\n");
    if report.members.is_empty() {
        section.push_str("No member report was computed.\n\n");
        return section;
    }

    section.push_str("| Member | Completion | Logged | Expected | Worked | Not in Squad |\n");
    section.push_str("|:---|:---:|---:|---:|---:|---:|\n");

    for (member, completion) in members_by_completion(&report.members) {
        let metrics = ReportMetrics::compute(&member.hours, taxonomy);
        section.push_str(&format!(
            "| {} | {} | {}h | {}h | {}h | {}h ({}) |\n",
            member.user.id,
            completion,
            metrics.logged,
            metrics.expected,
            metrics.worked,
            metrics.not_in_squad,
            metrics.not_in_squad_share
        ));
    }
    section.push('\n');

    section
}

fn generate_missing_section(missing: &[MemberFailure]) -> String {
    if missing.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Missing Members\n\n");
    section.push_str("These members are **not** included in any figure above.\n\n");
    section.push_str("| Member | Reason |\n");
    section.push_str("|:---|:---|\n");
    for failure in missing {
        section.push_str(&format!(
            "| {} | {} |\n",
            failure.user_id,
            failure.reason.replace('|', "\\|")
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by squadlog v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate the plain console report.
pub fn generate_text_report(
    report: &SquadReport,
    taxonomy: &Taxonomy,
    include_members: bool,
) -> String {
    let metrics = ReportMetrics::compute(&report.hours, taxonomy);
    let period = &report.period;
    let line = |share: &Share| {
        format!(
            "-- {}: {}h = {}j/h ({})\n",
            share.label,
            share.hours,
            days(share.hours, period),
            share.share
        )
    };

    let mut output = String::new();

    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!(
        "Worklog report: {} {} ({} to {})\n",
        report.squad, report.period_name, period.start, period.end
    ));
    output.push_str(&format!(
        "Completed at {}, {}h (missing {}h)\n",
        metrics.completion, metrics.logged, metrics.missing
    ));
    output.push_str(&format!(
        "Worked: {}h = {}j/h\n",
        metrics.worked,
        days(metrics.worked, period)
    ));
    for excluded in &metrics.excluded {
        output.push_str(&format!("{}: {}h\n", excluded.label, excluded.hours));
    }
    output.push_str(RULE);
    output.push('\n');

    for share in metrics.work_types.iter().chain(&metrics.worked_categories) {
        output.push_str(&line(share));
    }

    output.push_str("\nIncluding:\n");
    output.push_str(&format!(
        "-- not in squad: {}h ({})\n",
        metrics.not_in_squad, metrics.not_in_squad_share
    ));
    for share in &metrics.not_in_squad_categories {
        output.push_str(&format!("---- {}: {}h\n", share.label, share.hours));
    }
    output.push_str(&format!("---- other: {}h\n", metrics.other_squad));
    for share in &metrics.other_squad_work_types {
        output.push_str(&format!("------ {}: {}h\n", share.label, share.hours));
    }
    for issue in &metrics.other_issues {
        output.push_str(&format!("        {}\n", issue));
    }

    if include_members && !report.members.is_empty() {
        output.push_str("\nMembers:\n");
        for (member, completion) in members_by_completion(&report.members) {
            output.push_str(&format!(
                "-- {}: {} ({}h / {}h)\n",
                member.user.id, completion, member.hours.logged, member.hours.expected
            ));
        }
    }

    if report.is_partial() {
        output.push_str("\nWARNING: partial report, these members are not counted:\n");
        for failure in &report.missing {
            output.push_str(&format!("-- {}: {}\n", failure.user_id, failure.reason));
        }
    }

    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    squad: &'a str,
    period_name: &'a str,
    period: &'a Period,
    partial: bool,
    #[serde(flatten)]
    metrics: ReportMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<Vec<JsonMember<'a>>>,
    missing: &'a [MemberFailure],
}

#[derive(Serialize)]
struct JsonMember<'a> {
    #[serde(flatten)]
    user: &'a User,
    #[serde(flatten)]
    metrics: ReportMetrics,
}

/// Generate a JSON report.
pub fn generate_json_report(
    report: &SquadReport,
    taxonomy: &Taxonomy,
    include_members: bool,
) -> Result<String> {
    let members: Option<Vec<JsonMember>> = include_members.then(|| {
        report
            .members
            .iter()
            .map(|member| JsonMember {
                user: &member.user,
                metrics: ReportMetrics::compute(&member.hours, taxonomy),
            })
            .collect()
    });

    let view = JsonReport {
        squad: &report.squad,
        period_name: &report.period_name,
        period: &report.period,
        partial: report.is_partial(),
        metrics: ReportMetrics::compute(&report.hours, taxonomy),
        members,
        missing: &report.missing,
    };

    serde_json::to_string_pretty(&view).map_err(Into::into)
}
