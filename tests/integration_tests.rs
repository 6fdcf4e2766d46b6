use cohort_grader::grading::types::Category;
use cohort_grader::grading::{GradeError, GradingPolicy, TestResults, grade_cohort};
use cohort_grader::loader::{self, LogPaths, ParticipationSchema};
use cohort_grader::output::{Format, render};
use cohort_grader::records::{ActivityRow, UNCLAIMED};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn engagement_rows() -> Vec<ActivityRow> {
    let tasks = fixture("tasks.tsv");
    let prs = fixture("prs.csv");
    let participation = fixture("participation.csv");
    let paths = LogPaths {
        tasks: Some(tasks.as_path()),
        prs: Some(prs.as_path()),
        participation: Some(participation.as_path()),
    };
    loader::load_logs(&paths, ParticipationSchema::Engagement).expect("Failed to load fixtures")
}

#[test]
fn test_full_pipeline() {
    let report = grade_cohort(&engagement_rows(), &GradingPolicy::engagement(), None)
        .expect("Failed to grade cohort");

    assert_eq!(report.students.len(), 4);
    assert!(report.students.contains_key(UNCLAIMED));
    assert!(report.averages.minimum_load_applied);
    assert_eq!(report.averages.mean(Category::Tasks), 375.0);
    assert!(approx(report.cohort.total, 0.76 * 50.0 + 0.6 * 50.0));

    let ada = &report.students["ada"].scores;
    assert!(approx(ada.individual.total_score, 100.0));
    assert_eq!(ada.group.group_score, report.cohort.total);

    let bob = &report.students["bob"].scores;
    assert!(approx(bob.individual.task_score, 0.6 * 0.5 * 34.0));
    assert!(approx(bob.individual.pr_score, 16.5));
    assert!(approx(bob.individual.participation_score, 0.7875 * 33.0));
    assert_eq!(bob.group.band, Some(50.0));
    assert!(approx(bob.group.group_score, report.cohort.total * 0.5));
}

#[test]
fn test_malformed_values_are_recovered() {
    let report = grade_cohort(&engagement_rows(), &GradingPolicy::engagement(), None).unwrap();
    let carol = &report.students["carol"];

    // "soon" points count as 0; the task with ID "T-7" still counts.
    assert_eq!(carol.record.total(Category::Tasks), 60.0);
    assert_eq!(carol.record.value(Category::Tasks, "closed"), 60.0);
}

#[test]
fn test_open_pr_and_no_participation_score_zero() {
    let report = grade_cohort(&engagement_rows(), &GradingPolicy::engagement(), None).unwrap();
    let carol = &report.students["carol"].scores.individual;

    assert_eq!(carol.participation_score, 0.0);
    assert_eq!(carol.pr_score, 0.0);

    let unclaimed = &report.students[UNCLAIMED].scores;
    assert_eq!(unclaimed.individual.total_score, 0.0);
    assert_eq!(unclaimed.group.group_score, 0.0);
}

#[test]
fn test_person_only_in_task_log_scores_zero_elsewhere() {
    let mut rows = engagement_rows();
    rows.push(ActivityRow::task("108", "dave", "480", "closed"));

    let report = grade_cohort(&rows, &GradingPolicy::engagement(), None).unwrap();
    let dave = &report.students["dave"];

    assert_eq!(dave.record.total(Category::Prs), 0.0);
    assert_eq!(dave.record.total(Category::Participation), 0.0);
    assert_eq!(dave.scores.individual.pr_score, 0.0);
    assert_eq!(dave.scores.individual.participation_score, 0.0);
    assert!(dave.scores.individual.task_score > 0.0);
}

#[test]
fn test_reviews_are_credited_to_reviewers() {
    let report = grade_cohort(&engagement_rows(), &GradingPolicy::engagement(), None).unwrap();
    for name in ["ada", "bob", "carol"] {
        assert_eq!(report.students[name].record.total(Category::Reviews), 2.0, "{name}");
    }
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let policy = GradingPolicy::engagement();
    for format in [Format::Text, Format::Json, Format::Html] {
        let first = render(&grade_cohort(&engagement_rows(), &policy, None).unwrap(), format).unwrap();
        let second = render(&grade_cohort(&engagement_rows(), &policy, None).unwrap(), format).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_attendance_policy_with_tests() {
    let tasks = fixture("tasks.tsv");
    let prs = fixture("prs.csv");
    let attendance = fixture("attendance.csv");
    let paths = LogPaths {
        tasks: Some(tasks.as_path()),
        prs: Some(prs.as_path()),
        participation: Some(attendance.as_path()),
    };
    let rows = loader::load_logs(&paths, ParticipationSchema::Attendance).unwrap();
    let policy = GradingPolicy::attendance();

    let err = grade_cohort(&rows, &policy, None).unwrap_err();
    assert!(matches!(err, GradeError::MissingTestResults { .. }));

    let tests = TestResults {
        passed: 8,
        expected: 10,
    };
    let report = grade_cohort(&rows, &policy, Some(tests)).unwrap();

    assert_eq!(report.cohort.test_rate, Some(0.8));
    let expected = 0.76 * 34.0 + 0.6 * 33.0 + 0.8 * 33.0;
    assert!(approx(report.cohort.total, expected));

    // Two reviews against a cohort average of 1.5.
    let ada = &report.students["ada"].scores.individual;
    assert!(approx(ada.participation_score, 7.0 + 7.0 + 2.0 / 1.5 * 20.0));
}

#[test]
fn test_joined_csv_grades_like_separate_logs() {
    let path = std::env::temp_dir().join("cohort_grader_integration_joined.csv");
    let _ = std::fs::remove_file(&path);

    let rows = engagement_rows();
    loader::write_joined(&path, &rows).unwrap();
    let joined = loader::load_joined(&path).unwrap();

    let policy = GradingPolicy::engagement();
    assert_eq!(
        grade_cohort(&joined, &policy, None).unwrap(),
        grade_cohort(&rows, &policy, None).unwrap()
    );

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_legacy_joined_file_is_graded() {
    let path = std::env::temp_dir().join("cohort_grader_integration_legacy.csv");
    std::fs::write(
        &path,
        "101,,ada,Closed,600,,,\n102,,bob,open,300,,,\n,1,ada,merged,,bob,,\n,2,bob,open,,ada,,\n,,ada,,,,4,4\n",
    )
    .unwrap();

    let rows = loader::load_joined(&path).unwrap();
    let tests = TestResults {
        passed: 1,
        expected: 1,
    };
    let report = grade_cohort(&rows, &GradingPolicy::attendance(), Some(tests)).unwrap();

    assert_eq!(report.students.len(), 2);
    assert_eq!(report.students["ada"].record.value(Category::Attendance, "attendance"), 4.0);
    assert!(approx(report.cohort.task_rate, 600.0 / 900.0));
    assert_eq!(report.cohort.pr_rate, 0.5);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_pull_request_log_is_fatal() {
    let tasks = fixture("tasks.tsv");
    let paths = LogPaths {
        tasks: Some(tasks.as_path()),
        ..Default::default()
    };
    let rows = loader::load_logs(&paths, ParticipationSchema::Engagement).unwrap();

    let err = grade_cohort(&rows, &GradingPolicy::engagement(), None).unwrap_err();
    assert!(matches!(err, GradeError::ZeroDenominator { .. }));
}
