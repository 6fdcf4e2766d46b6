//! Data types shared by the grading pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status key holding the sum of every other status in a [`StatusTally`].
pub const TOTAL: &str = "total";

/// Activity category a status tally belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tasks,
    Prs,
    Participation,
    Reviews,
    Attendance,
    Discussion,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Tasks,
        Category::Prs,
        Category::Participation,
        Category::Reviews,
        Category::Attendance,
        Category::Discussion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tasks => "tasks",
            Category::Prs => "prs",
            Category::Participation => "participation",
            Category::Reviews => "reviews",
            Category::Attendance => "attendance",
            Category::Discussion => "discussion",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status label to accumulated value, with a derived [`TOTAL`] entry.
///
/// The total is recomputed on every write, so it always equals the sum of the
/// other entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatusTally {
    entries: BTreeMap<String, f64>,
}

impl StatusTally {
    /// Value recorded for `status`, or 0.0 when absent.
    pub fn get(&self, status: &str) -> f64 {
        self.entries.get(status).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.get(TOTAL)
    }

    pub fn contains(&self, status: &str) -> bool {
        self.entries.contains_key(status)
    }

    pub(crate) fn add(&mut self, status: &str, value: f64) {
        *self.entries.entry(status.to_string()).or_insert(0.0) += value;
        self.recompute_total();
    }

    pub(crate) fn set(&mut self, status: &str, value: f64) {
        self.entries.insert(status.to_string(), value);
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        let sum = self
            .entries
            .iter()
            .filter(|(status, _)| status.as_str() != TOTAL)
            .map(|(_, value)| *value)
            .sum();
        self.entries.insert(TOTAL.to_string(), sum);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Everything recorded about one person across the three logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonRecord {
    pub(crate) name: String,
    pub(crate) categories: BTreeMap<Category, StatusTally>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) notes: Vec<String>,
}

impl PersonRecord {
    pub(crate) fn new(name: &str) -> Self {
        PersonRecord {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn tally(&self, category: Category) -> Option<&StatusTally> {
        self.categories.get(&category)
    }

    /// Value for `status` in `category`; 0.0 if either is missing.
    pub fn value(&self, category: Category, status: &str) -> f64 {
        self.tally(category).map_or(0.0, |t| t.get(status))
    }

    pub fn total(&self, category: Category) -> f64 {
        self.value(category, TOTAL)
    }

    pub(crate) fn tally_mut(&mut self, category: Category) -> &mut StatusTally {
        self.categories.entry(category).or_default()
    }
}

/// Every person seen in the input, keyed and ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cohort {
    pub(crate) people: BTreeMap<String, PersonRecord>,
}

impl Cohort {
    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PersonRecord> {
        self.people.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonRecord> {
        self.people.values()
    }

    /// Sum of `category` totals over the whole cohort.
    pub fn sum_total(&self, category: Category) -> f64 {
        self.iter().map(|p| p.total(category)).sum()
    }

    /// Sum of one status value over the whole cohort.
    pub fn sum_value(&self, category: Category, status: &str) -> f64 {
        self.iter().map(|p| p.value(category, status)).sum()
    }
}

/// Per-category mean of each person's total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortAverages {
    pub means: BTreeMap<Category, f64>,
    /// Task mean after flooring at the policy's minimum load.
    pub effective_tasks: f64,
    pub minimum_load_applied: bool,
}

impl CohortAverages {
    pub fn mean(&self, category: Category) -> f64 {
        self.means.get(&category).copied().unwrap_or(0.0)
    }
}

/// Scores derived from one person's own activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndividualScore {
    pub close_rate: f64,
    pub task_multiplier: f64,
    pub task_score: f64,
    pub merge_rate: f64,
    pub pr_score: f64,
    pub participation_score: f64,
    pub total_score: f64,
}

/// A person's share of the cohort base score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroupShare {
    /// Banded individual grade, or `None` when full credit bypassed banding.
    pub band: Option<f64>,
    pub group_multiplier: f64,
    pub group_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    #[serde(flatten)]
    pub individual: IndividualScore,
    #[serde(flatten)]
    pub group: GroupShare,
}

/// Cohort-wide rates and the maximum group credit they unlock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CohortScore {
    pub task_rate: f64,
    pub pr_rate: f64,
    pub test_rate: Option<f64>,
    pub task_score: f64,
    pub pr_score: f64,
    pub test_score: f64,
    /// `maximum_available_cohort_grade`
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentGrade {
    #[serde(flatten)]
    pub record: PersonRecord,
    pub scores: ScoreBreakdown,
}

/// Complete result of one grading run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub policy: String,
    pub averages: CohortAverages,
    pub cohort: CohortScore,
    pub students: BTreeMap<String, StudentGrade>,
}
