use crate::grading::cohort::{TestResults, base_cohort_score, group_share};
use crate::grading::error::GradeError;
use crate::grading::individual::score_individual;
use crate::grading::metrics::cohort_averages;
use crate::grading::policy::GradingPolicy;
use crate::grading::reduce::reduce;
use crate::grading::types::{GradeReport, ScoreBreakdown, StudentGrade};
use crate::records::ActivityRow;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Runs the full grading pipeline over already-loaded rows.
///
/// Rows are reduced into a cohort, averaged, scored individually, and then
/// given their banded share of the cohort base score. The result contains no
/// clock or random state, so the same rows always produce the same report.
#[tracing::instrument(skip(rows, policy), fields(rows = rows.len(), policy = %policy.name))]
pub fn grade_cohort(
    rows: &[ActivityRow],
    policy: &GradingPolicy,
    tests: Option<TestResults>,
) -> Result<GradeReport, GradeError> {
    policy.validate()?;

    let cohort = reduce(rows);
    let averages = cohort_averages(&cohort, policy.minimum_load)?;
    if averages.minimum_load_applied {
        info!(
            effective_tasks = averages.effective_tasks,
            "Cohort task average below minimum load, using the floor"
        );
    }

    let cohort_score = base_cohort_score(&cohort, policy, tests)?;
    info!(
        students = cohort.len(),
        maximum_available = cohort_score.total,
        "Cohort base score computed"
    );

    let mut students = BTreeMap::new();
    for person in cohort.iter() {
        let individual = score_individual(person, &averages, policy);
        let group = group_share(individual.total_score, cohort_score.total);
        debug!(
            student = person.name(),
            individual = individual.total_score,
            group = group.group_score,
            "Student graded"
        );

        students.insert(
            person.name().to_string(),
            StudentGrade {
                record: person.clone(),
                scores: ScoreBreakdown { individual, group },
            },
        );
    }

    Ok(GradeReport {
        policy: policy.name.clone(),
        averages,
        cohort: cohort_score,
        students,
    })
}
