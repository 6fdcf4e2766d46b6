use crate::grading::error::GradeError;
use crate::grading::metrics::{category_mean, close_rate, closed_task_points, effective_task_average};
use crate::grading::types::{Category, Cohort, StatusTally};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLoad {
    pub statuses: StatusTally,
    pub total_points: f64,
    pub closed_points: f64,
    pub close_rate: f64,
}

/// Task-only view of a cohort: who holds how many points, and how the
/// cohort average compares with the minimum load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Burndown {
    pub average_load: f64,
    pub effective_load: f64,
    pub minimum_load_applied: bool,
    pub people: BTreeMap<String, TaskLoad>,
}

pub fn burndown(cohort: &Cohort, minimum_load: f64) -> Result<Burndown, GradeError> {
    let average_load = category_mean(cohort, Category::Tasks)?;

    let people = cohort
        .iter()
        .filter_map(|person| {
            let statuses = person.tally(Category::Tasks)?.clone();
            Some((
                person.name().to_string(),
                TaskLoad {
                    total_points: statuses.total(),
                    statuses,
                    closed_points: closed_task_points(person),
                    close_rate: close_rate(person),
                },
            ))
        })
        .collect();

    Ok(Burndown {
        average_load,
        effective_load: effective_task_average(average_load, minimum_load),
        minimum_load_applied: average_load < minimum_load,
        people,
    })
}
