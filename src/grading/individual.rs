use crate::grading::metrics::{close_rate, closed_task_points, merge_rate, rate};
use crate::grading::policy::{GradingPolicy, ParticipationModel, RC_AND_P_SHARE, SPRINT_SHARE};
use crate::grading::types::{Category, CohortAverages, IndividualScore, PersonRecord};

/// Weighted task, pull-request, and participation score for one person.
///
/// ```text
/// task          = close_rate × (closed_points / effective_avg_tasks) × task_weight
/// pr            = merge_rate × pr_weight
/// participation = see `participation_score`
/// total         = task + pr + participation
/// ```
///
/// Not clamped: a heavy closer can exceed the task weight.
pub fn score_individual(
    person: &PersonRecord,
    averages: &CohortAverages,
    policy: &GradingPolicy,
) -> IndividualScore {
    let close_rate = close_rate(person);
    let task_multiplier = closed_task_points(person) / averages.effective_tasks;
    let task_score = close_rate * task_multiplier * policy.task_weight;

    let merge_rate = merge_rate(person);
    let pr_score = merge_rate * policy.pr_weight;

    let participation_score = participation_score(person, averages, policy);

    IndividualScore {
        close_rate,
        task_multiplier,
        task_score,
        merge_rate,
        pr_score,
        participation_score,
        total_score: task_score + pr_score + participation_score,
    }
}

pub fn participation_score(
    person: &PersonRecord,
    averages: &CohortAverages,
    policy: &GradingPolicy,
) -> f64 {
    match &policy.participation_model {
        ParticipationModel::Engagement => {
            let rc_and_p = person.value(Category::Participation, "rc_and_p");
            let sprint = person.value(Category::Participation, "sprint_value");

            let rc_and_p_index = rc_and_p / policy.expected_rc_and_p * 100.0;
            let blended = rc_and_p_index * RC_AND_P_SHARE + sprint * SPRINT_SHARE;
            blended / 100.0 * policy.participation_weight
        }
        ParticipationModel::Attendance {
            expected_attendance,
            expected_discussion,
            attendance_share,
            discussion_share,
            review_share,
        } => {
            let attendance = person.total(Category::Attendance) / expected_attendance;
            let discussion = person.total(Category::Discussion) / expected_discussion;
            let reviews = rate(person.total(Category::Reviews), averages.mean(Category::Reviews));

            attendance * attendance_share + discussion * discussion_share + reviews * review_share
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::metrics::cohort_averages;
    use crate::grading::reduce::reduce;
    use crate::records::ActivityRow;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_full_engagement_student() {
        let rows = vec![
            ActivityRow::task("1", "ada", "1000", "closed"),
            ActivityRow::task("2", "bob", "0", "open"),
            ActivityRow::pull_request("ada", "1", "merged", ""),
            ActivityRow::engagement("ada", "8", "100", ""),
        ];
        let cohort = reduce(&rows);
        let policy = GradingPolicy::engagement();
        let averages = cohort_averages(&cohort, policy.minimum_load).unwrap();

        let score = score_individual(cohort.get("ada").unwrap(), &averages, &policy);

        assert_eq!(averages.effective_tasks, 720.0);
        assert!(approx(score.task_multiplier, 1000.0 / 720.0));
        assert!(approx(score.task_score, 1000.0 / 720.0 * 34.0));
        assert!(approx(score.pr_score, 33.0));
        assert!(approx(score.participation_score, 33.0));
        assert!(approx(
            score.total_score,
            score.task_score + score.pr_score + score.participation_score
        ));
    }

    #[test]
    fn test_small_load_scores_below_average_load() {
        // Same close rate, different absolute throughput.
        let rows = vec![
            ActivityRow::task("1", "ada", "60", "closed"),
            ActivityRow::task("2", "bob", "720", "closed"),
        ];
        let cohort = reduce(&rows);
        let policy = GradingPolicy::engagement();
        let averages = cohort_averages(&cohort, policy.minimum_load).unwrap();

        let ada = score_individual(cohort.get("ada").unwrap(), &averages, &policy);
        let bob = score_individual(cohort.get("bob").unwrap(), &averages, &policy);

        assert_eq!(ada.close_rate, bob.close_rate);
        assert!(ada.task_score < bob.task_score);
        assert!(approx(bob.task_score, 34.0));
    }

    #[test]
    fn test_person_missing_from_other_logs_scores_zero_there() {
        let rows = vec![
            ActivityRow::task("1", "ada", "300", "closed"),
            ActivityRow::pull_request("bob", "2", "merged", ""),
        ];
        let cohort = reduce(&rows);
        let policy = GradingPolicy::engagement();
        let averages = cohort_averages(&cohort, policy.minimum_load).unwrap();

        let ada = score_individual(cohort.get("ada").unwrap(), &averages, &policy);
        assert_eq!(ada.pr_score, 0.0);
        assert_eq!(ada.participation_score, 0.0);
        assert!(approx(ada.task_score, 300.0 / 720.0 * 34.0));
    }

    #[test]
    fn test_attendance_model_blends_reviews_against_cohort_average() {
        let rows = vec![
            ActivityRow::pull_request("bob", "1", "merged", "ada"),
            ActivityRow::pull_request("bob", "2", "merged", "ada"),
            ActivityRow::attendance("ada", "4", "2"),
        ];
        let cohort = reduce(&rows);
        let policy = GradingPolicy::attendance();
        let averages = cohort_averages(&cohort, policy.minimum_load).unwrap();

        // ada has 2 reviews, the cohort of two averages 1.
        let ada = participation_score(cohort.get("ada").unwrap(), &averages, &policy);
        assert!(approx(ada, 7.0 + 3.5 + 40.0));

        let bob = participation_score(cohort.get("bob").unwrap(), &averages, &policy);
        assert_eq!(bob, 0.0);
    }

    #[test]
    fn test_attendance_model_without_reviews_skips_review_term() {
        let rows = vec![ActivityRow::attendance("ada", "4", "4")];
        let cohort = reduce(&rows);
        let policy = GradingPolicy::attendance();
        let averages = cohort_averages(&cohort, policy.minimum_load).unwrap();

        let ada = participation_score(cohort.get("ada").unwrap(), &averages, &policy);
        assert!(approx(ada, 14.0));
    }
}
