//! Worklog classification.
//!
//! Fixed rules are tried first; entries matching none of them are checked
//! against Jira to tell squad work from work done for other squads.

pub mod rules;

use crate::client::IssueLookup;
use crate::error::{ReportError, Result};
use crate::models::{Category, WorklogEntry};
use tracing::debug;

pub use rules::Taxonomy;

/// Assigns each worklog entry to exactly one category.
pub struct Classifier<L> {
    taxonomy: Taxonomy,
    lookup: L,
}

impl<L: IssueLookup> Classifier<L> {
    pub fn new(taxonomy: Taxonomy, lookup: L) -> Self {
        Self { taxonomy, lookup }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Classify an entry logged by a member of `squad_name`.
    pub async fn classify(&self, entry: &WorklogEntry, squad_name: &str) -> Result<Category> {
        if let Some(rule) = self.taxonomy.first_match(entry) {
            debug!("{} matched rule {}", entry.issue_key, rule.category);
            return Ok(rule.to_category());
        }

        let work_type = self.taxonomy.work_type(entry.issue_type_id);
        if self.is_in_squad(squad_name, &entry.issue_key).await? {
            Ok(Category::Squad(work_type))
        } else {
            debug!("{} is not affiliated with {}", entry.issue_key, squad_name);
            Ok(Category::OtherSquad(work_type))
        }
    }

    /// Whether the issue's squad field names `squad_name`.
    pub async fn is_in_squad(&self, squad_name: &str, issue_key: &str) -> Result<bool> {
        let issue = self
            .lookup
            .issue(issue_key)
            .await
            .map_err(|source| ReportError::Lookup {
                issue_key: issue_key.to_string(),
                source,
            })?;
        debug!(
            "{} (project {}) squad: {:?}",
            issue.key, issue.project_key, issue.squad_affiliation
        );
        Ok(issue.belongs_to(squad_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::{BucketKind, WorkType};
    use crate::testutil::{entry, typed_entry, FakeLookup};

    fn classifier(lookup: FakeLookup) -> Classifier<FakeLookup> {
        Classifier::new(Taxonomy::default(), lookup)
    }

    #[test]
    fn test_fixed_key_skips_lookup() {
        let lookup = FakeLookup::new();
        let calls = lookup.calls();
        let classifier = classifier(lookup);

        let category = tokio_test::block_on(classifier.classify(&entry("TEMPO-3", 5.0), "Rocket"))
            .unwrap();

        assert_eq!(category, Category::rule("cp_rtt", BucketKind::Excluded));
        assert_eq!(calls.total(), 0);
    }

    #[test]
    fn test_fixed_key_beats_project_rule() {
        // TEMPO-2 is in project DA here; the issue-key rule comes first.
        let mut e = entry("TEMPO-2", 1.0);
        e.project_key = "DA".to_string();

        let category =
            tokio_test::block_on(classifier(FakeLookup::new()).classify(&e, "Rocket")).unwrap();

        assert_eq!(category, Category::rule("cse", BucketKind::NotInSquad));
    }

    #[test]
    fn test_project_and_billing_rules() {
        let classifier = classifier(FakeLookup::new());

        let da = tokio_test::block_on(classifier.classify(&entry("DA-7", 1.0), "Rocket")).unwrap();
        assert_eq!(da, Category::rule("da", BucketKind::NotInSquad));

        let mut sot = entry("SQ-3", 1.0);
        sot.billing_key = Some("OVERKIZ-SOT".to_string());
        let sot = tokio_test::block_on(classifier.classify(&sot, "Rocket")).unwrap();
        assert_eq!(sot, Category::rule("sot", BucketKind::Worked));
    }

    #[tokio::test]
    async fn test_in_squad_work_types() {
        let lookup = FakeLookup::new()
            .with_issue("SQ-1", Some("Rocket"))
            .with_issue("SQ-2", Some("Rocket"))
            .with_issue("SQ-3", Some("Rocket"));
        let classifier = classifier(lookup);

        let grooming = classifier
            .classify(&typed_entry("SQ-1", 3.0, 10402), "Rocket")
            .await
            .unwrap();
        let maintenance = classifier
            .classify(&typed_entry("SQ-2", 1.0, 10102), "Rocket")
            .await
            .unwrap();
        let dev = classifier
            .classify(&typed_entry("SQ-3", 5.0, 3), "Rocket")
            .await
            .unwrap();

        assert_eq!(grooming, Category::Squad(WorkType::Grooming));
        assert_eq!(maintenance, Category::Squad(WorkType::Maintenance));
        assert_eq!(dev, Category::Squad(WorkType::Development));
    }

    #[tokio::test]
    async fn test_other_squad_and_unaffiliated() {
        let lookup = FakeLookup::new()
            .with_issue("OT-1", Some("Comet"))
            .with_issue("OT-2", None);
        let classifier = classifier(lookup);

        let other = classifier
            .classify(&typed_entry("OT-1", 2.0, 10402), "Rocket")
            .await
            .unwrap();
        let unaffiliated = classifier
            .classify(&entry("OT-2", 2.0), "Rocket")
            .await
            .unwrap();

        assert_eq!(other, Category::OtherSquad(WorkType::Grooming));
        assert_eq!(unaffiliated, Category::OtherSquad(WorkType::Development));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_surfaced() {
        let lookup = FakeLookup::new().with_failure("SQ-9", ClientError::Unauthorized { status: 401 });
        let classifier = classifier(lookup);

        let err = classifier
            .classify(&entry("SQ-9", 1.0), "Rocket")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ReportError::Lookup {
                issue_key: "SQ-9".to_string(),
                source: ClientError::Unauthorized { status: 401 },
            }
        );
    }
}
