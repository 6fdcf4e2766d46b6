use crate::grading::error::GradeError;
use crate::grading::types::{Category, Cohort, CohortAverages, PersonRecord};
use std::collections::BTreeMap;

/// Ratio of `part` to `total`, or 0.0 when `total` is zero.
pub fn rate(part: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { part / total }
}

pub fn closed_task_points(person: &PersonRecord) -> f64 {
    person.value(Category::Tasks, "closed")
}

pub fn merged_prs(person: &PersonRecord) -> f64 {
    person.value(Category::Prs, "merged")
}

/// Closed task points over total task points.
pub fn close_rate(person: &PersonRecord) -> f64 {
    rate(closed_task_points(person), person.total(Category::Tasks))
}

/// Merged pull requests over all pull requests opened.
pub fn merge_rate(person: &PersonRecord) -> f64 {
    rate(merged_prs(person), person.total(Category::Prs))
}

/// Mean of every person's `category` total.
pub fn category_mean(cohort: &Cohort, category: Category) -> Result<f64, GradeError> {
    if cohort.is_empty() {
        return Err(GradeError::EmptyCohort);
    }
    Ok(cohort.sum_total(category) / cohort.len() as f64)
}

/// Floors the cohort task average so a light cohort cannot inflate the
/// task multiplier.
pub fn effective_task_average(avg_tasks: f64, minimum_load: f64) -> f64 {
    avg_tasks.max(minimum_load)
}

pub fn cohort_averages(cohort: &Cohort, minimum_load: f64) -> Result<CohortAverages, GradeError> {
    let mut means = BTreeMap::new();
    for category in Category::ALL {
        means.insert(category, category_mean(cohort, category)?);
    }

    let avg_tasks = means[&Category::Tasks];
    Ok(CohortAverages {
        means,
        effective_tasks: effective_task_average(avg_tasks, minimum_load),
        minimum_load_applied: avg_tasks < minimum_load,
    })
}
