use serde::{Deserialize, Serialize};

/// Sentinel person name for rows with no assignee, creator, or student.
pub const UNCLAIMED: &str = "Unclaimed";

/// Identifier assigned to tasks and pull requests whose ID cannot be parsed.
pub const UNPARSABLE_ID: u64 = 99_999_999;

/// A single raw row from any of the three activity logs.
///
/// Which fields are populated decides what kind of row it is; see
/// [`ActivityRow::kind`]. Field order is also the column order of the joined CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub task_id: Option<String>,
    pub pr_id: Option<String>,
    pub assignee: Option<String>,
    pub state: Option<String>,
    pub task_points: Option<String>,
    pub reviewers: Option<String>,

    // participation log, attendance schema
    pub attendance: Option<String>,
    pub discussion: Option<String>,

    // participation log, engagement schema
    pub rc_and_p: Option<String>,
    pub sprint_value: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Task,
    PullRequest,
    Participation,
    Unrecognized,
}

impl ActivityRow {
    pub fn kind(&self) -> RowKind {
        if present(&self.task_id).is_some() {
            RowKind::Task
        } else if present(&self.reviewers).is_some() || present(&self.pr_id).is_some() {
            RowKind::PullRequest
        } else if (present(&self.attendance).is_some() && present(&self.discussion).is_some())
            || present(&self.rc_and_p).is_some()
            || present(&self.sprint_value).is_some()
        {
            RowKind::Participation
        } else {
            RowKind::Unrecognized
        }
    }

    /// The person this row is about, falling back to [`UNCLAIMED`].
    pub fn person(&self) -> &str {
        present(&self.assignee).unwrap_or(UNCLAIMED)
    }

    /// Lowercased status label; rows without one are tallied as `unknown`.
    pub fn status(&self) -> String {
        present(&self.state)
            .map(str::to_lowercase)
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Distinct, non-empty reviewer names in first-seen order.
    pub fn reviewer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in present(&self.reviewers).unwrap_or_default().split(',') {
            let name = name.trim();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn task(task_id: &str, assignee: &str, points: &str, state: &str) -> Self {
        ActivityRow {
            task_id: Some(task_id.to_string()),
            assignee: Some(assignee.to_string()),
            task_points: Some(points.to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    pub fn pull_request(creator: &str, pr_id: &str, state: &str, reviewers: &str) -> Self {
        ActivityRow {
            pr_id: Some(pr_id.to_string()),
            assignee: Some(creator.to_string()),
            state: Some(state.to_string()),
            reviewers: Some(reviewers.to_string()),
            ..Default::default()
        }
    }

    pub fn engagement(student: &str, rc_and_p: &str, sprint_value: &str, comments: &str) -> Self {
        ActivityRow {
            assignee: Some(student.to_string()),
            rc_and_p: Some(rc_and_p.to_string()),
            sprint_value: Some(sprint_value.to_string()),
            comments: Some(comments.to_string()),
            ..Default::default()
        }
    }

    pub fn attendance(student: &str, attendance: &str, discussion: &str) -> Self {
        ActivityRow {
            assignee: Some(student.to_string()),
            attendance: Some(attendance.to_string()),
            discussion: Some(discussion.to_string()),
            ..Default::default()
        }
    }
}

/// Returns the trimmed value when the field is populated and non-blank.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
