use crate::grading::types::{Category, Cohort, PersonRecord, TOTAL};
use crate::records::{ActivityRow, RowKind, UNPARSABLE_ID, present};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Groups raw rows by person and category into a fresh [`Cohort`].
///
/// Task rows add their points to `tasks[state]`, pull-request rows count one
/// `prs[state]` for the creator and one `reviews["reviews"]` per distinct
/// reviewer, and participation rows set (not add) their values, so the last
/// row for a person wins.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn reduce(rows: &[ActivityRow]) -> Cohort {
    let mut people: BTreeMap<String, PersonRecord> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        match row.kind() {
            RowKind::Task => {
                let task_id = parse_id(row.task_id.as_deref(), "task_id", index);
                let points = parse_number(row.task_points.as_deref(), "task_points", index);
                let status = row.status();
                if skip_reserved_status(&status, index) {
                    continue;
                }
                debug!(task_id, person = row.person(), %status, points, "Task row");
                person_entry(&mut people, row.person())
                    .tally_mut(Category::Tasks)
                    .add(&status, points);
            }
            RowKind::PullRequest => {
                let pr_id = parse_id(row.pr_id.as_deref(), "pr_id", index);
                let status = row.status();
                if skip_reserved_status(&status, index) {
                    continue;
                }
                debug!(pr_id, person = row.person(), %status, "Pull request row");
                person_entry(&mut people, row.person())
                    .tally_mut(Category::Prs)
                    .add(&status, 1.0);

                for reviewer in row.reviewer_names() {
                    person_entry(&mut people, reviewer)
                        .tally_mut(Category::Reviews)
                        .add("reviews", 1.0);
                }
            }
            RowKind::Participation => {
                let person = person_entry(&mut people, row.person());

                if present(&row.attendance).is_some() && present(&row.discussion).is_some() {
                    let attendance = parse_integer(row.attendance.as_deref(), "attendance", index);
                    let discussion = parse_integer(row.discussion.as_deref(), "discussion", index);
                    assign(person, Category::Attendance, "attendance", attendance);
                    assign(person, Category::Discussion, "discussion", discussion);
                }

                if present(&row.rc_and_p).is_some() || present(&row.sprint_value).is_some() {
                    let rc_and_p = parse_integer(row.rc_and_p.as_deref(), "rc_and_p", index);
                    let sprint = parse_integer(row.sprint_value.as_deref(), "sprint_value", index);
                    assign(person, Category::Participation, "rc_and_p", rc_and_p);
                    assign(person, Category::Participation, "sprint_value", sprint);
                }

                if let Some(comment) = present(&row.comments) {
                    person.notes.push(comment.to_string());
                }
            }
            RowKind::Unrecognized => {
                debug!(row = index, "Skipping row with no task, pull request, or participation fields");
            }
        }
    }

    Cohort { people }
}

fn person_entry<'a>(people: &'a mut BTreeMap<String, PersonRecord>, name: &str) -> &'a mut PersonRecord {
    people
        .entry(name.to_string())
        .or_insert_with(|| PersonRecord::new(name))
}

fn assign(person: &mut PersonRecord, category: Category, status: &str, value: f64) {
    if let Some(previous) = person
        .tally(category)
        .filter(|t| t.contains(status))
        .map(|t| t.get(status))
    {
        warn!(
            person = %person.name,
            %category,
            status,
            previous,
            value,
            "Participation value repeated, keeping the last one"
        );
    }
    person.tally_mut(category).set(status, value);
}

fn skip_reserved_status(status: &str, index: usize) -> bool {
    if status == TOTAL {
        warn!(row = index, "Ignoring row whose status is the reserved label `total`");
        return true;
    }
    false
}

/// Parses a task or pull-request ID, substituting [`UNPARSABLE_ID`] on failure.
pub fn parse_id(raw: Option<&str>, field: &str, index: usize) -> u64 {
    let raw = raw.map(str::trim).unwrap_or_default();
    match raw.parse::<u64>() {
        Ok(id) => id,
        Err(e) => {
            error!(row = index, field, value = raw, error = %e, "Could not parse identifier");
            UNPARSABLE_ID
        }
    }
}

/// Parses a point value; empty fields are 0, and unparsable or negative ones
/// are logged and read as 0.
pub fn parse_number(raw: Option<&str>, field: &str, index: usize) -> f64 {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return 0.0;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        Ok(_) => {
            error!(row = index, field, value = raw, "Negative or non-finite number, using 0");
            0.0
        }
        Err(e) => {
            error!(row = index, field, value = raw, error = %e, "Could not parse number, using 0");
            0.0
        }
    }
}

/// Like [`parse_number`] but for whole-number participation fields.
pub fn parse_integer(raw: Option<&str>, field: &str, index: usize) -> f64 {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return 0.0;
    }
    match raw.parse::<u32>() {
        Ok(value) => f64::from(value),
        Err(e) => {
            error!(row = index, field, value = raw, error = %e, "Could not parse integer, using 0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::UNCLAIMED;

    #[test]
    fn test_task_points_accumulate_by_status() {
        let rows = vec![
            ActivityRow::task("1", "ada", "60", "Closed"),
            ActivityRow::task("2", "ada", "30", "closed"),
            ActivityRow::task("3", "ada", "45", "open"),
        ];
        let cohort = reduce(&rows);
        let ada = cohort.get("ada").unwrap();

        assert_eq!(ada.value(Category::Tasks, "closed"), 90.0);
        assert_eq!(ada.value(Category::Tasks, "open"), 45.0);
        assert_eq!(ada.total(Category::Tasks), 135.0);
    }

    #[test]
    fn test_unassigned_task_goes_to_unclaimed() {
        let rows = vec![ActivityRow::task("1", "", "15", "open")];
        let cohort = reduce(&rows);
        assert_eq!(cohort.get(UNCLAIMED).unwrap().total(Category::Tasks), 15.0);
    }

    #[test]
    fn test_malformed_points_default_to_zero() {
        let rows = vec![
            ActivityRow::task("1", "ada", "", "closed"),
            ActivityRow::task("2", "ada", "lots", "closed"),
            ActivityRow::task("3", "ada", "20", "closed"),
        ];
        let cohort = reduce(&rows);
        assert_eq!(cohort.get("ada").unwrap().total(Category::Tasks), 20.0);
    }

    #[test]
    fn test_negative_values_read_as_zero() {
        assert_eq!(parse_number(Some("-240"), "task_points", 0), 0.0);
        assert_eq!(parse_number(Some("-inf"), "task_points", 0), 0.0);
        assert_eq!(parse_number(Some(" 12.5 "), "task_points", 0), 12.5);
        assert_eq!(parse_integer(Some("-3"), "attendance", 0), 0.0);
        assert_eq!(parse_integer(Some("4"), "attendance", 0), 4.0);

        let rows = vec![
            ActivityRow::task("1", "ada", "-500", "closed"),
            ActivityRow::task("2", "ada", "60", "open"),
            ActivityRow::engagement("ada", "-8", "-100", ""),
        ];
        let cohort = reduce(&rows);
        let ada = cohort.get("ada").unwrap();

        assert_eq!(ada.value(Category::Tasks, "closed"), 0.0);
        assert_eq!(ada.total(Category::Tasks), 60.0);
        assert_eq!(ada.value(Category::Participation, "rc_and_p"), 0.0);
        assert_eq!(ada.value(Category::Participation, "sprint_value"), 0.0);
    }

    #[test]
    fn test_pull_requests_count_reviews_per_distinct_reviewer() {
        let rows = vec![
            ActivityRow::pull_request("ada", "10", "merged", "bob,carol,bob"),
            ActivityRow::pull_request("ada", "11", "open", "bob"),
        ];
        let cohort = reduce(&rows);

        let ada = cohort.get("ada").unwrap();
        assert_eq!(ada.value(Category::Prs, "merged"), 1.0);
        assert_eq!(ada.total(Category::Prs), 2.0);
        assert_eq!(cohort.get("bob").unwrap().total(Category::Reviews), 2.0);
        assert_eq!(cohort.get("carol").unwrap().total(Category::Reviews), 1.0);
    }

    #[test]
    fn test_attendance_is_set_and_last_row_wins() {
        let rows = vec![
            ActivityRow::attendance("ada", "2", "1"),
            ActivityRow::attendance("ada", "4", "3"),
        ];
        let cohort = reduce(&rows);
        let ada = cohort.get("ada").unwrap();

        assert_eq!(ada.total(Category::Attendance), 4.0);
        assert_eq!(ada.total(Category::Discussion), 3.0);
    }

    #[test]
    fn test_engagement_row_sets_participation_and_notes() {
        let rows = vec![ActivityRow::engagement("ada", "6", "90", "great demo")];
        let cohort = reduce(&rows);
        let ada = cohort.get("ada").unwrap();

        assert_eq!(ada.value(Category::Participation, "rc_and_p"), 6.0);
        assert_eq!(ada.value(Category::Participation, "sprint_value"), 90.0);
        assert_eq!(ada.notes().to_vec(), vec!["great demo".to_string()]);
    }

    #[test]
    fn test_totals_equal_sum_of_statuses_for_every_person() {
        let rows = vec![
            ActivityRow::task("1", "ada", "60", "closed"),
            ActivityRow::task("2", "bob", "30", "open"),
            ActivityRow::task("3", "bob", "10", "closed"),
            ActivityRow::pull_request("bob", "4", "merged", "ada"),
            ActivityRow::attendance("ada", "3", "2"),
        ];
        let cohort = reduce(&rows);

        for person in cohort.iter() {
            for category in Category::ALL {
                if let Some(tally) = person.tally(category) {
                    let sum: f64 = tally.iter().filter(|(k, _)| *k != TOTAL).map(|(_, v)| v).sum();
                    assert_eq!(tally.total(), sum, "{} {}", person.name(), category);
                }
            }
        }
    }

    #[test]
    fn test_reserved_total_status_is_ignored() {
        let rows = vec![ActivityRow::task("1", "ada", "60", "total")];
        let cohort = reduce(&rows);
        assert!(cohort.get("ada").is_none());
    }

    #[test]
    fn test_unrecognized_rows_are_skipped() {
        let rows = vec![ActivityRow::default()];
        assert!(reduce(&rows).is_empty());
    }

    #[test]
    fn test_parse_id_uses_sentinel() {
        assert_eq!(parse_id(Some("42"), "task_id", 0), 42);
        assert_eq!(parse_id(Some("T-42"), "task_id", 0), UNPARSABLE_ID);
        assert_eq!(parse_id(None, "pr_id", 0), UNPARSABLE_ID);
    }

    #[test]
    fn test_parse_integer_rejects_fractions() {
        assert_eq!(parse_integer(Some(" 7 "), "attendance", 0), 7.0);
        assert_eq!(parse_integer(Some("3.5"), "attendance", 0), 0.0);
    }
}
