//! Hour aggregation.
//!
//! Folds classified entries into member reports and merges member reports
//! into a squad report. Both operations are order-independent: every
//! numeric field is an exact sum and the issue list is a set union.

use crate::models::{Category, HoursReport, Period, User, UserReport, WorklogEntry};
use crate::report::Percent;

impl HoursReport {
    /// Add one classified entry.
    pub fn record(&mut self, entry: &WorklogEntry, category: &Category) {
        self.logged += entry.hours;
        *self.buckets.entry(category.clone()).or_default() += entry.hours;

        if matches!(category, Category::OtherSquad(_)) {
            self.other_issues.insert(entry.issue_reference());
        }
    }

    /// Field-wise sum with another report.
    pub fn merge(&mut self, other: &HoursReport) {
        self.logged += other.logged;
        self.expected += other.expected;
        for (category, hours) in &other.buckets {
            *self.buckets.entry(category.clone()).or_default() += *hours;
        }
        self.other_issues.extend(other.other_issues.iter().cloned());
    }
}

/// Build a member report from its classified entries.
pub fn fold_user(entries: &[(WorklogEntry, Category)], period: &Period, user: &User) -> UserReport {
    let mut hours = HoursReport {
        expected: period.expected_hours(user.hours_per_day),
        ..HoursReport::default()
    };

    for (entry, category) in entries {
        hours.record(entry, category);
    }

    UserReport {
        user: user.clone(),
        hours,
    }
}

/// Merge member reports into a squad total.
pub fn merge_squad<'a>(reports: impl IntoIterator<Item = &'a HoursReport>) -> HoursReport {
    reports
        .into_iter()
        .fold(HoursReport::default(), |mut squad, report| {
            squad.merge(report);
            squad
        })
}

/// Members sorted by completion, least complete first.
///
/// Members with no expected hours sort last.
pub fn members_by_completion(members: &[UserReport]) -> Vec<(&UserReport, Percent)> {
    let mut ranked: Vec<_> = members
        .iter()
        .map(|m| (m, Percent::of(m.hours.logged, m.hours.expected)))
        .collect();

    ranked.sort_by(|a, b| match (a.1.value(), b.1.value()) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.user.id.cmp(&b.0.user.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.user.id.cmp(&b.0.user.id),
    });

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BucketKind, Hours, WorkType};
    use crate::testutil::{entry, period, user};

    fn cp_rtt() -> Category {
        Category::rule("cp_rtt", BucketKind::Excluded)
    }

    fn grooming() -> Category {
        Category::Squad(WorkType::Grooming)
    }

    fn dev() -> Category {
        Category::Squad(WorkType::Development)
    }

    fn other_dev() -> Category {
        Category::OtherSquad(WorkType::Development)
    }

    fn report_of(id: &str, entries: &[(WorklogEntry, Category)]) -> UserReport {
        fold_user(entries, &period(), &user(id, "Rocket"))
    }

    #[test]
    fn test_fold_excluded_only() {
        let report = report_of("jdoe", &[(entry("TEMPO-3", 5.0), cp_rtt())]);

        assert_eq!(report.hours.logged, Hours::from_hours(5.0));
        assert_eq!(report.hours.hours(&cp_rtt()), Hours::from_hours(5.0));
        assert_eq!(report.hours.worked(), Hours::ZERO);
        assert_eq!(report.hours.expected, Hours::from_hours(80.0));
    }

    #[test]
    fn test_fold_in_squad_work() {
        let report = report_of(
            "jdoe",
            &[(entry("SQ-1", 3.0), grooming()), (entry("SQ-2", 5.0), dev())],
        );
        let hours = &report.hours;

        assert_eq!(hours.logged, Hours::from_hours(8.0));
        assert_eq!(hours.hours(&grooming()), Hours::from_hours(3.0));
        assert_eq!(hours.hours(&dev()), Hours::from_hours(5.0));
        assert_eq!(hours.worked(), Hours::from_hours(8.0));
        assert_eq!(Percent::of(hours.logged, hours.expected).value(), Some(10.0));
    }

    #[test]
    fn test_fold_buckets_sum_to_logged() {
        let report = report_of(
            "jdoe",
            &[
                (entry("TEMPO-3", 7.0), cp_rtt()),
                (entry("TEMPO-2", 1.25), Category::rule("cse", BucketKind::NotInSquad)),
                (entry("SQ-1", 2.5), grooming()),
                (entry("OT-1", 1.0 / 3.0), other_dev()),
                (entry("SQ-2", 4.0), dev()),
            ],
        );
        let hours = &report.hours;

        assert_eq!(hours.bucket_total(), hours.logged);
        assert_eq!(hours.worked(), hours.logged - hours.excluded());
        assert_eq!(
            hours.not_in_squad(),
            Hours::from_hours(1.25) + Hours::from_hours(1.0 / 3.0)
        );
    }

    #[test]
    fn test_fold_deduplicates_other_issues() {
        let report = report_of(
            "jdoe",
            &[
                (entry("OT-1", 2.0), other_dev()),
                (entry("OT-1", 3.0), other_dev()),
                (entry("OT-2", 1.0), other_dev()),
            ],
        );

        assert_eq!(report.hours.other_squad(), Hours::from_hours(6.0));
        let issues: Vec<_> = report.hours.other_issues.iter().cloned().collect();
        assert_eq!(issues, vec!["OT-1 Summary of OT-1", "OT-2 Summary of OT-2"]);
    }

    #[test]
    fn test_fold_same_key_different_summary_kept_apart() {
        let mut renamed = entry("OT-1", 1.0);
        renamed.issue_summary = "Renamed".to_string();
        let report = report_of(
            "jdoe",
            &[(entry("OT-1", 1.0), other_dev()), (renamed, other_dev())],
        );

        assert_eq!(report.hours.other_issues.len(), 2);
    }

    #[test]
    fn test_fold_is_order_independent() {
        let entries = vec![
            (entry("TEMPO-3", 7.0), cp_rtt()),
            (entry("SQ-1", 0.1), grooming()),
            (entry("OT-1", 0.2), other_dev()),
            (entry("SQ-2", 0.7), dev()),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        assert_eq!(report_of("a", &entries).hours, report_of("a", &reversed).hours);
    }

    #[test]
    fn test_merge_sums_fields() {
        let a = report_of("a", &[(entry("SQ-1", 3.0), grooming())]);
        let b = report_of("b", &[(entry("SQ-2", 5.0), grooming())]);

        let squad = merge_squad([&a.hours, &b.hours]);

        assert_eq!(squad.hours(&grooming()), Hours::from_hours(8.0));
        assert_eq!(squad.logged, Hours::from_hours(8.0));
        assert_eq!(squad.expected, Hours::from_hours(160.0));
    }

    #[test]
    fn test_merge_empty() {
        let squad = merge_squad(std::iter::empty());

        assert_eq!(squad.logged, Hours::ZERO);
        assert_eq!(squad.expected, Hours::ZERO);
        assert_eq!(squad.worked(), Hours::ZERO);
        assert!(squad.buckets.is_empty());
        assert!(squad.other_issues.is_empty());
        assert_eq!(Percent::of(squad.logged, squad.expected).value(), None);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let reports = vec![
            report_of(
                "a",
                &[(entry("OT-1", 0.1), other_dev()), (entry("SQ-1", 0.2), dev())],
            ),
            report_of(
                "b",
                &[(entry("OT-2", 0.3), other_dev()), (entry("OT-1", 0.7), other_dev())],
            ),
            report_of("c", &[(entry("TEMPO-3", 7.3), cp_rtt())]),
        ];

        let forward = merge_squad(reports.iter().map(|r| &r.hours));
        let backward = merge_squad(reports.iter().rev().map(|r| &r.hours));

        assert_eq!(forward.logged, backward.logged);
        assert_eq!(forward.expected, backward.expected);
        assert_eq!(forward.buckets, backward.buckets);
        assert_eq!(forward.other_issues, backward.other_issues);
        assert_eq!(forward.other_issues.len(), 2);
    }

    #[test]
    fn test_merge_issue_set_only_grows() {
        let a = report_of("a", &[(entry("OT-1", 1.0), other_dev())]);
        let b = report_of("b", &[(entry("OT-1", 1.0), other_dev())]);
        let c = report_of("c", &[(entry("OT-2", 1.0), other_dev())]);

        let mut squad = HoursReport::default();
        let mut sizes = Vec::new();
        for report in [&a, &b, &c] {
            squad.merge(&report.hours);
            sizes.push(squad.other_issues.len());
        }

        assert_eq!(sizes, vec![1, 1, 2]);
    }

    #[test]
    fn test_members_by_completion() {
        let full = report_of("full", &[(entry("SQ-1", 80.0), dev())]);
        let half = report_of("half", &[(entry("SQ-1", 40.0), dev())]);
        let mut idle = report_of("idle", &[]);
        idle.hours.expected = Hours::ZERO;

        let members = vec![full, idle, half];
        let ranked = members_by_completion(&members);
        let order: Vec<_> = ranked.iter().map(|(m, _)| m.user.id.as_str()).collect();

        assert_eq!(order, vec!["half", "full", "idle"]);
        assert_eq!(ranked[2].1.value(), None);
    }
}
