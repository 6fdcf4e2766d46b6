//! Rendering and persistence for grade reports.
//!
//! Supports a plain-text summary, pretty JSON, and a standalone HTML page.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::grading::types::{Category, GradeReport, StudentGrade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Html,
}

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &GradeReport) {
    debug!("{:#?}", report);
}

pub fn render(report: &GradeReport, format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(render_text(report)),
        Format::Json => render_json(report),
        Format::Html => Ok(render_html(report)),
    }
}

/// Serializes any report-like value as pretty JSON with a trailing newline.
pub fn render_json(value: &impl Serialize) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Writes `content` to `path`, or to stdout when no path is given.
pub fn emit(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)?;
            info!(path = %path.display(), bytes = content.len(), "Report written");
        }
        None => print!("{content}"),
    }
    Ok(())
}

pub fn render_text(report: &GradeReport) -> String {
    let mut output = String::new();
    let averages = &report.averages;
    let cohort = &report.cohort;

    let _ = writeln!(output, "Policy: {}", report.policy);
    let _ = writeln!(
        output,
        "Cohort: {} students, max available group grade {:.2}",
        report.students.len(),
        cohort.total
    );
    let _ = writeln!(
        output,
        "  Task close rate {:.3} ({:.2}), PR merge rate {:.3} ({:.2}){}",
        cohort.task_rate,
        cohort.task_score,
        cohort.pr_rate,
        cohort.pr_score,
        match cohort.test_rate {
            Some(rate) => format!(", test pass rate {:.3} ({:.2})", rate, cohort.test_score),
            None => String::new(),
        }
    );
    let _ = writeln!(
        output,
        "  Avg task points {:.2}{}, avg PRs {:.2}, avg reviews {:.2}",
        averages.mean(Category::Tasks),
        if averages.minimum_load_applied {
            format!(" (minimum load {:.0} used)", averages.effective_tasks)
        } else {
            String::new()
        },
        averages.mean(Category::Prs),
        averages.mean(Category::Reviews)
    );

    for (name, student) in &report.students {
        let scores = &student.scores;
        let record = &student.record;

        let _ = writeln!(output);
        let _ = writeln!(output, "{name}");
        let _ = writeln!(output, "Individual Grade: {:.2}", scores.individual.total_score);
        let _ = writeln!(output, "Group Grade: {:.2}", scores.group.group_score);
        let _ = writeln!(output, "Breakdown:");
        let _ = writeln!(output, "  Tasks:");
        let _ = writeln!(output, "    Total Points: {}", record.total(Category::Tasks));
        let _ = writeln!(
            output,
            "    Closed Points: {}",
            record.value(Category::Tasks, "closed")
        );
        let _ = writeln!(output, "    Close Rate: {:.3}", scores.individual.close_rate);
        let _ = writeln!(output, "    Multiplier: {:.3}", scores.individual.task_multiplier);
        let _ = writeln!(output, "    Task Value: {:.2}", scores.individual.task_score);
        let _ = writeln!(output, "  PRs:");
        let _ = writeln!(output, "    Total PRs: {}", record.total(Category::Prs));
        let _ = writeln!(output, "    Merged PRs: {}", record.value(Category::Prs, "merged"));
        let _ = writeln!(output, "    PR Value: {:.2}", scores.individual.pr_score);
        let _ = writeln!(output, "  Participation:");
        let _ = writeln!(output, "    Reviews: {}", record.total(Category::Reviews));
        let _ = writeln!(output, "    Participation Value: {:.2}", scores.individual.participation_score);
        let _ = writeln!(output, "  Group:");
        let _ = writeln!(output, "    Band: {}", band_label(student));
        let _ = writeln!(output, "    Multiplier: {:.2}", scores.group.group_multiplier);

        for note in record.notes() {
            let _ = writeln!(output, "  Note: {note}");
        }
    }

    output
}

pub fn render_html(report: &GradeReport) -> String {
    let mut output = String::new();
    let averages = &report.averages;
    let cohort = &report.cohort;

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\">");
    let _ = writeln!(output, "<title>Cohort grades ({})</title>", escape(&report.policy));
    let _ = writeln!(
        output,
        "<style>table{{border-collapse:collapse}}td,th{{border:1px solid #999;padding:2px 6px;text-align:right}}th:first-child,td:first-child{{text-align:left}}</style>"
    );
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");
    let _ = writeln!(output, "<h1>Cohort grades</h1>");
    let _ = writeln!(output, "<p>Policy: <code>{}</code></p>", escape(&report.policy));

    let _ = writeln!(output, "<h2>Cohort</h2>");
    let _ = writeln!(output, "<table>");
    let _ = writeln!(output, "<tr><th>Metric</th><th>Rate</th><th>Score</th></tr>");
    let _ = writeln!(
        output,
        "<tr><td>Tasks closed</td><td>{:.3}</td><td>{:.2}</td></tr>",
        cohort.task_rate, cohort.task_score
    );
    let _ = writeln!(
        output,
        "<tr><td>PRs merged</td><td>{:.3}</td><td>{:.2}</td></tr>",
        cohort.pr_rate, cohort.pr_score
    );
    if let Some(rate) = cohort.test_rate {
        let _ = writeln!(
            output,
            "<tr><td>Tests passing</td><td>{:.3}</td><td>{:.2}</td></tr>",
            rate, cohort.test_score
        );
    }
    let _ = writeln!(
        output,
        "<tr><th>Maximum available</th><td></td><td>{:.2}</td></tr>",
        cohort.total
    );
    let _ = writeln!(output, "</table>");

    let _ = writeln!(output, "<h2>Averages</h2>");
    let _ = writeln!(output, "<ul>");
    for category in Category::ALL {
        let _ = writeln!(
            output,
            "<li>{}: {:.2}</li>",
            category,
            averages.mean(category)
        );
    }
    if averages.minimum_load_applied {
        let _ = writeln!(
            output,
            "<li>Task average below minimum load; {:.0} used instead.</li>",
            averages.effective_tasks
        );
    }
    let _ = writeln!(output, "</ul>");

    let _ = writeln!(output, "<h2>Students</h2>");
    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        "<tr><th>Student</th><th>Task points</th><th>Closed</th><th>Close rate</th><th>Multiplier</th><th>Task</th>\
         <th>PRs</th><th>Merged</th><th>Merge rate</th><th>PR</th>\
         <th>Reviews</th><th>Attendance</th><th>Discussion</th><th>RC&amp;P</th><th>Sprint</th><th>Participation</th>\
         <th>Individual</th><th>Band</th><th>Group multiplier</th><th>Group</th></tr>"
    );
    for (name, student) in &report.students {
        let record = &student.record;
        let individual = &student.scores.individual;
        let group = &student.scores.group;
        let _ = writeln!(
            output,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td><td>{:.3}</td><td>{:.2}</td>\
             <td>{}</td><td>{}</td><td>{:.3}</td><td>{:.2}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td>\
             <td>{:.2}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            escape(name),
            record.total(Category::Tasks),
            record.value(Category::Tasks, "closed"),
            individual.close_rate,
            individual.task_multiplier,
            individual.task_score,
            record.total(Category::Prs),
            record.value(Category::Prs, "merged"),
            individual.merge_rate,
            individual.pr_score,
            record.total(Category::Reviews),
            record.total(Category::Attendance),
            record.total(Category::Discussion),
            record.value(Category::Participation, "rc_and_p"),
            record.value(Category::Participation, "sprint_value"),
            individual.participation_score,
            individual.total_score,
            band_label(student),
            group.group_multiplier,
            group.group_score,
        );
    }
    let _ = writeln!(output, "</table>");

    let noted: Vec<_> = report
        .students
        .iter()
        .filter(|(_, s)| !s.record.notes().is_empty())
        .collect();
    if !noted.is_empty() {
        let _ = writeln!(output, "<h2>Notes</h2>");
        let _ = writeln!(output, "<dl>");
        for (name, student) in noted {
            let _ = writeln!(output, "<dt>{}</dt>", escape(name));
            for note in student.record.notes() {
                let _ = writeln!(output, "<dd>{}</dd>", escape(note));
            }
        }
        let _ = writeln!(output, "</dl>");
    }

    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");
    output
}

fn band_label(student: &StudentGrade) -> String {
    match student.scores.group.band {
        Some(band) => format!("{band:.0}"),
        None => "full".to_string(),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
