//! Query engine: check a batch of `(package, version)` items

use crate::handle::DatabaseHandle;
use secscan_events::{CheckEvent, EventEmitter, EventSender};
use secscan_types::{AdvisorySummary, CheckItem, CheckReport, PackageFinding, SkippedItem};
use std::time::Instant;

/// Answers checks against whatever database the handle currently serves
#[derive(Debug, Clone)]
pub struct QueryEngine {
    handle: DatabaseHandle,
    event_sender: Option<EventSender>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(handle: DatabaseHandle) -> Self {
        Self {
            handle,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn handle(&self) -> &DatabaseHandle {
        &self.handle
    }

    /// Check every item against one snapshot of the current database.
    ///
    /// Items whose version does not parse are left out of the verdict and
    /// listed under `skipped`; the rest of the batch is still checked.
    pub fn check<I>(&self, items: I) -> CheckReport
    where
        I: IntoIterator<Item = CheckItem>,
    {
        let started = Instant::now();
        let snapshot = self.handle.current();
        let database = snapshot.database();

        let mut total = 0usize;
        let mut vulnerabilities = Vec::new();
        let mut skipped = Vec::new();

        for item in items {
            total += 1;
            match database.lookup(item.package.as_str(), &item.version) {
                Ok(matched) if matched.is_empty() => {}
                Ok(matched) => vulnerabilities.push(PackageFinding {
                    advisories: matched
                        .iter()
                        .map(|advisory| AdvisorySummary::from(advisory.as_ref()))
                        .collect(),
                    package: item.package,
                    version: item.version,
                    vulnerable: true,
                }),
                Err(error) => {
                    tracing::warn!(
                        package = %item.package,
                        version = %item.version,
                        %error,
                        "skipping item with unparseable version"
                    );
                    let reason = error.to_string();
                    self.emit_check(CheckEvent::ItemSkipped {
                        package: item.package.to_string(),
                        version: item.version.clone(),
                        reason: reason.clone(),
                    });
                    skipped.push(SkippedItem {
                        package: item.package,
                        version: item.version,
                        reason,
                    });
                }
            }
        }

        let report = CheckReport {
            vulnerable: !vulnerabilities.is_empty(),
            fingerprint: snapshot.fingerprint().cloned(),
            vulnerabilities,
            skipped,
        };

        self.emit_check(CheckEvent::Completed {
            items: total,
            vulnerable_items: report.vulnerabilities.len(),
            skipped: report.skipped.len(),
            vulnerable: report.vulnerable,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        });

        report
    }
}

impl EventEmitter for QueryEngine {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::handle::DatabaseSnapshot;
    use secscan_events::AppEvent;
    use secscan_types::{Advisory, Branch, Fingerprint, VersionSpec};

    fn guzzle() -> Advisory {
        Advisory {
            title: "HTTP Proxy header vulnerability".into(),
            link: "https://github.com/guzzle/guzzle/releases/tag/6.2.1".into(),
            cve: "CVE-2016-5385".into(),
            branches: vec![Branch::new(
                "master",
                ">=6,<6.2.1".parse::<VersionSpec>().unwrap(),
            )],
            reference: "composer://guzzlehttp/guzzle".into(),
        }
    }

    fn engine() -> QueryEngine {
        let handle = DatabaseHandle::new();
        let built = build(vec![Ok(guzzle())]).unwrap();
        handle.publish(DatabaseSnapshot::new(
            built.database,
            Fingerprint::new("0123456789abcdef"),
            built.records,
        ));
        QueryEngine::new(handle)
    }

    #[test]
    fn test_vulnerable_item() {
        let report = engine().check([CheckItem::new("guzzlehttp/guzzle", "6.1.0")]);
        assert!(report.vulnerable);
        assert_eq!(report.fingerprint, Some(Fingerprint::new("0123456789abcdef")));
        assert_eq!(report.vulnerabilities.len(), 1);
        assert_eq!(report.vulnerabilities[0].advisories[0].id, "CVE-2016-5385");
    }

    #[test]
    fn test_fixed_version_not_vulnerable() {
        let report = engine().check([CheckItem::new("guzzlehttp/guzzle", "6.2.1")]);
        assert!(!report.vulnerable);
        assert!(report.vulnerabilities.is_empty());
    }

    #[test]
    fn test_unparseable_version_is_skipped_not_fatal() {
        let report = engine().check([
            CheckItem::new("guzzlehttp/guzzle", "dev-master"),
            CheckItem::new("guzzlehttp/guzzle", "6.0.0"),
        ]);
        assert!(report.vulnerable);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].version, "dev-master");
        assert_eq!(report.vulnerabilities[0].version, "6.0.0");
    }

    #[test]
    fn test_empty_handle_reports_no_fingerprint() {
        let report = QueryEngine::new(DatabaseHandle::new())
            .check([CheckItem::new("guzzlehttp/guzzle", "6.1.0")]);
        assert!(!report.vulnerable);
        assert!(report.fingerprint.is_none());
    }

    #[tokio::test]
    async fn test_emits_skip_and_completion_events() {
        let (tx, mut rx) = secscan_events::channel();
        let engine = engine().with_events(tx);
        engine.check([
            CheckItem::new("guzzlehttp/guzzle", "not-a-version"),
            CheckItem::new("guzzlehttp/guzzle", "6.1.0"),
        ]);
        drop(engine);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(
            events[0],
            AppEvent::Check(CheckEvent::ItemSkipped { .. })
        ));
        assert!(matches!(
            events[1],
            AppEvent::Check(CheckEvent::Completed {
                items: 2,
                vulnerable_items: 1,
                skipped: 1,
                vulnerable: true,
                ..
            })
        ));
    }
}
