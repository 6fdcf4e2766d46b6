use crate::grading::error::GradeError;
use crate::grading::metrics::rate;
use crate::grading::policy::{FULL_CREDIT_THRESHOLD, GradingPolicy};
use crate::grading::types::{Category, Cohort, CohortScore, GroupShare};

/// Passing and expected test counts for the cohort's project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestResults {
    pub passed: u32,
    pub expected: u32,
}

/// Cohort-wide close and merge rates (and test pass rate when the policy
/// weighs it) combined into `maximum_available_cohort_grade`.
///
/// # Errors
///
/// Fails when the cohort has no task points or no pull requests at all, or
/// when the policy weighs tests and no usable test counts were given.
pub fn base_cohort_score(
    cohort: &Cohort,
    policy: &GradingPolicy,
    tests: Option<TestResults>,
) -> Result<CohortScore, GradeError> {
    let total_tasks = cohort.sum_total(Category::Tasks);
    if total_tasks == 0.0 {
        return Err(GradeError::ZeroDenominator {
            metric: "task close rate",
            denominator: "total task points",
        });
    }
    let total_prs = cohort.sum_total(Category::Prs);
    if total_prs == 0.0 {
        return Err(GradeError::ZeroDenominator {
            metric: "pull request merge rate",
            denominator: "total pull requests",
        });
    }

    let task_rate = cohort.sum_value(Category::Tasks, "closed") / total_tasks;
    let pr_rate = cohort.sum_value(Category::Prs, "merged") / total_prs;

    let test_rate = if policy.cohort_test_weight > 0.0 {
        let tests = tests.ok_or_else(|| GradeError::MissingTestResults {
            policy: policy.name.clone(),
        })?;
        if tests.expected == 0 {
            return Err(GradeError::ZeroDenominator {
                metric: "test pass rate",
                denominator: "expected tests",
            });
        }
        Some(rate(tests.passed as f64, tests.expected as f64))
    } else {
        None
    };

    let task_score = task_rate * policy.cohort_task_weight;
    let pr_score = pr_rate * policy.cohort_pr_weight;
    let test_score = test_rate.unwrap_or(0.0) * policy.cohort_test_weight;

    Ok(CohortScore {
        task_rate,
        pr_rate,
        test_rate,
        task_score,
        pr_score,
        test_score,
        total: task_score + pr_score + test_score,
    })
}

/// Rounds to a multiple of ten, half up: 44 → 40, 45 → 50.
pub fn round_to_nearest_ten(value: f64) -> f64 {
    let remainder = value % 10.0;
    if remainder < 5.0 {
        (value / 10.0).trunc() * 10.0
    } else {
        ((value + 10.0) / 10.0).trunc() * 10.0
    }
}

/// A person's cut of the cohort base score.
///
/// | Individual grade | Share                               |
/// |------------------|-------------------------------------|
/// | >= 90            | the whole base score                |
/// | < 90             | base × round_to_nearest_ten(grade)% |
///
/// The band is kept within 0..=100, so a share never goes below zero.
pub fn group_share(individual_grade: f64, maximum_available: f64) -> GroupShare {
    if individual_grade >= FULL_CREDIT_THRESHOLD {
        return GroupShare {
            band: None,
            group_multiplier: 1.0,
            group_score: maximum_available,
        };
    }

    let band = round_to_nearest_ten(individual_grade).clamp(0.0, 100.0);
    let group_multiplier = band / 100.0;
    GroupShare {
        band: Some(band),
        group_multiplier,
        group_score: maximum_available * group_multiplier,
    }
}
