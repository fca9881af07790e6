// ABOUTME: Integration tests for the update cycle against a recording fake client.
// ABOUTME: Covers ordering, propagation, self-protection, fail-fast, and failure isolation.

mod support;

use async_trait::async_trait;
use lookout::runtime::ContainerError;
use lookout::types::{ContainerId, ImageId, ImageRef};
use lookout::update::{
    ClientError, Container, DEPENDS_ON_LABEL, EligibilityFilter, FailureKind, SELF_LABEL,
    SortError, UpdateClient, UpdateError, UpdateErrorKind, UpdateParams, run_update_cycle,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Check(String),
    Stop(String),
    Start(String),
    RemoveImage(String),
}

/// Records every call and answers from fixed tables.
#[derive(Default)]
struct FakeClient {
    containers: Vec<Container>,
    stale: HashSet<String>,
    failing_checks: HashSet<String>,
    failing_stops: HashSet<String>,
    failing_starts: HashSet<String>,
    failing_removals: HashSet<String>,
    /// List without applying the filter, like a client that gets it wrong.
    ignore_filter: bool,
    fail_listing: bool,
    calls: Mutex<Vec<Call>>,
    cache_clears: Mutex<usize>,
}

impl FakeClient {
    fn new(containers: Vec<Container>) -> Self {
        Self {
            containers,
            ..Default::default()
        }
    }

    fn stale(mut self, names: &[&str]) -> Self {
        self.stale.extend(names.iter().map(|n| n.to_string()));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn stops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Stop(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn starts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn touched_anything(&self) -> bool {
        self.calls()
            .iter()
            .any(|c| !matches!(c, Call::Check(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn outcome(failing: &HashSet<String>, name: &str) -> Result<(), ClientError> {
        if failing.contains(name) {
            Err(ContainerError::Runtime(format!("{name} refused")).into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UpdateClient for FakeClient {
    async fn list_containers(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<Container>, ClientError> {
        if self.fail_listing {
            return Err(ContainerError::Runtime("daemon unreachable".into()).into());
        }
        Ok(self
            .containers
            .iter()
            .filter(|c| self.ignore_filter || filter.admits(c))
            .cloned()
            .collect())
    }

    async fn is_stale(&self, container: &Container) -> Result<bool, ClientError> {
        let name = container.short_name().to_string();
        self.record(Call::Check(name.clone()));
        if self.failing_checks.contains(&name) {
            return Err(ClientError::ImageMissing(container.image().to_string()));
        }
        Ok(self.stale.contains(&name))
    }

    async fn stop(&self, container: &Container, _timeout: Duration) -> Result<(), ClientError> {
        let name = container.short_name();
        self.record(Call::Stop(name.to_string()));
        Self::outcome(&self.failing_stops, name)
    }

    async fn start(&self, container: &Container) -> Result<(), ClientError> {
        let name = container.short_name();
        self.record(Call::Start(name.to_string()));
        Self::outcome(&self.failing_starts, name)
    }

    async fn remove_image(&self, container: &Container) -> Result<(), ClientError> {
        let name = container.short_name();
        self.record(Call::RemoveImage(name.to_string()));
        Self::outcome(&self.failing_removals, name)
    }

    fn clear_cache(&self) {
        *self.cache_clears.lock() += 1;
    }
}

/// A container named `/{name}` depending on `deps` through the label.
fn container(name: &str, deps: &[&str]) -> Container {
    let c = Container::new(
        ContainerId::new(format!("{name}0123456789")),
        format!("/{name}"),
        ImageRef::parse(&format!("example/{name}:latest")).unwrap(),
        ImageId::new(format!("sha256:{name}")),
    );
    if deps.is_empty() {
        c
    } else {
        c.with_label(DEPENDS_ON_LABEL, &deps.join(","))
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

async fn run(client: &FakeClient) -> Result<lookout::update::CycleReport, UpdateError> {
    support::init_tracing();
    run_update_cycle(client, &UpdateParams::default()).await
}

mod ordering {
    use super::*;

    #[tokio::test]
    async fn dependents_of_a_stale_container_restart_with_it() {
        // Listed out of order; the cycle sorts them to a, b, c.
        let client = FakeClient::new(vec![
            container("c", &["b"]),
            container("a", &[]),
            container("b", &["a"]),
        ])
        .stale(&["b"]);

        let report = run(&client).await.unwrap();

        assert_eq!(report.stale, names(&["b", "c"]));
        assert_eq!(report.propagated, 1);
        assert_eq!(client.stops(), names(&["c", "b"]));
        assert_eq!(client.starts(), names(&["b", "c"]));
    }

    #[tokio::test]
    async fn all_stops_happen_before_any_start() {
        let client = FakeClient::new(vec![container("a", &[]), container("b", &["a"])])
            .stale(&["a"]);

        run(&client).await.unwrap();

        let calls = client.calls();
        let last_stop = calls
            .iter()
            .rposition(|c| matches!(c, Call::Stop(_)))
            .unwrap();
        let first_start = calls
            .iter()
            .position(|c| matches!(c, Call::Start(_)))
            .unwrap();
        assert!(last_stop < first_start);
    }

    #[tokio::test]
    async fn stop_order_is_the_reverse_of_start_order() {
        let client = FakeClient::new(vec![
            container("proxy", &["web", "api"]),
            container("web", &["api"]),
            container("api", &["db", "cache"]),
            container("cache", &[]),
            container("db", &[]),
            container("metrics", &[]),
        ])
        .stale(&["db", "metrics"]);

        run(&client).await.unwrap();

        let mut stops = client.stops();
        stops.reverse();
        assert_eq!(stops, client.starts());
        assert_eq!(
            client.starts(),
            names(&["db", "api", "web", "proxy", "metrics"])
        );
    }

    #[tokio::test]
    async fn transitive_chain_is_fully_marked() {
        let client = FakeClient::new(vec![
            container("c", &[]),
            container("b", &["c"]),
            container("a", &["b"]),
        ])
        .stale(&["c"]);

        let report = run(&client).await.unwrap();

        assert_eq!(report.stale, names(&["c", "b", "a"]));
        assert_eq!(report.propagated, 2);
    }

    #[tokio::test]
    async fn links_and_shared_namespaces_count_as_dependencies() {
        let db = container("db", &[]);
        let web = container("web", &[]).with_links(["db"]);
        let sidecar = container("sidecar", &[]).with_network_mode("container:web");
        let client = FakeClient::new(vec![sidecar, web, db]).stale(&["db"]);

        run(&client).await.unwrap();

        assert_eq!(client.starts(), names(&["db", "web", "sidecar"]));
    }

    #[tokio::test]
    async fn nothing_stale_touches_nothing() {
        let client = FakeClient::new(vec![container("a", &[]), container("b", &["a"])]);

        let report = run(&client).await.unwrap();

        assert!(report.stale.is_empty());
        assert!(!client.touched_anything());
        assert_eq!(*client.cache_clears.lock(), 1);
    }
}

mod eligibility {
    use super::*;

    #[tokio::test]
    async fn own_container_is_never_stopped() {
        let own = container("lookout", &[]).with_label(SELF_LABEL, "true");
        let mut client = FakeClient::new(vec![own, container("web", &[])])
            .stale(&["lookout", "web"]);
        client.ignore_filter = true;

        run(&client).await.unwrap();

        assert_eq!(client.stops(), names(&["web"]));
    }

    #[tokio::test]
    async fn own_container_is_filtered_out_of_the_cycle() {
        let own = container("lookout", &[]).as_updater();
        let client =
            FakeClient::new(vec![own, container("web", &[])]).stale(&["lookout", "web"]);

        let report = run(&client).await.unwrap();

        assert_eq!(report.scanned, 1);
        assert!(!client.calls().contains(&Call::Check("lookout".into())));
    }

    #[tokio::test]
    async fn exclusion_strips_one_leading_character() {
        let plain = |name: &str| {
            Container::new(
                ContainerId::new(format!("{name}0123456789")),
                name,
                ImageRef::parse("example/app:latest").unwrap(),
                ImageId::new("sha256:app"),
            )
        };
        let client = FakeClient::new(vec![plain("foo"), plain("xfoo"), plain("bar")])
            .stale(&["foo", "xfoo", "bar"]);
        let params = UpdateParams {
            excluded: names(&["foo"]),
            ..Default::default()
        };

        let report = run_update_cycle(&client, &params).await.unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(client.starts(), names(&["bar"]));
    }

    #[tokio::test]
    async fn excluded_dependency_imposes_no_order_and_is_not_restarted() {
        let client = FakeClient::new(vec![container("web", &["db"]), container("db", &[])])
            .stale(&["db", "web"]);
        let params = UpdateParams {
            excluded: names(&["db"]),
            ..Default::default()
        };

        run_update_cycle(&client, &params).await.unwrap();

        assert_eq!(client.starts(), names(&["web"]));
    }
}

mod aborts {
    use super::*;

    #[tokio::test]
    async fn failed_check_aborts_before_touching_anything() {
        let mut client = FakeClient::new(vec![
            container("a", &[]),
            container("b", &["a"]),
            container("d", &[]),
        ])
        .stale(&["a"]);
        client.failing_checks.insert("d".into());

        let err = run(&client).await.unwrap_err();

        assert!(matches!(
            &err,
            UpdateError::StalenessCheck { container, .. } if container == "d"
        ));
        assert_eq!(err.kind(), UpdateErrorKind::StalenessCheck);
        assert!(!client.touched_anything());
        assert_eq!(*client.cache_clears.lock(), 1);
    }

    #[tokio::test]
    async fn failed_listing_aborts() {
        let mut client = FakeClient::new(vec![container("a", &[])]);
        client.fail_listing = true;

        let err = run(&client).await.unwrap_err();

        assert_eq!(err.kind(), UpdateErrorKind::Discovery);
        assert!(client.calls().is_empty());
        assert_eq!(*client.cache_clears.lock(), 1);
    }

    #[tokio::test]
    async fn dependency_cycle_aborts() {
        let client = FakeClient::new(vec![
            container("a", &["b"]),
            container("b", &["a"]),
            container("c", &[]),
        ])
        .stale(&["a", "c"]);

        let err = run(&client).await.unwrap_err();

        let UpdateError::Sort(SortError::Cycle(cycle)) = &err else {
            panic!("expected a cycle error, got {err:?}");
        };
        assert!(cycle.iter().any(|n| n == "a"));
        assert!(cycle.iter().any(|n| n == "b"));
        assert!(!client.touched_anything());
    }
}

mod isolation {
    use super::*;

    #[tokio::test]
    async fn failed_stop_does_not_block_the_rest() {
        let mut client = FakeClient::new(vec![
            container("a", &[]),
            container("b", &[]),
            container("c", &[]),
        ])
        .stale(&["a", "b", "c"]);
        client.failing_stops.insert("b".into());

        let report = run(&client).await.unwrap();

        assert_eq!(client.stops(), names(&["c", "b", "a"]));
        assert_eq!(client.starts(), names(&["a", "b", "c"]));
        assert_eq!(report.stopped, names(&["c", "a"]));
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].kind, FailureKind::Stop);
        assert_eq!(report.failures()[0].container, "b");
    }

    #[tokio::test]
    async fn failed_start_does_not_block_the_rest() {
        let mut client = FakeClient::new(vec![container("a", &[]), container("b", &["a"])])
            .stale(&["a"]);
        client.failing_starts.insert("a".into());

        let report = run(&client).await.unwrap();

        assert_eq!(client.starts(), names(&["a", "b"]));
        assert_eq!(report.started, names(&["b"]));
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn cleanup_follows_every_start_attempt() {
        let mut client = FakeClient::new(vec![container("a", &[]), container("b", &[])])
            .stale(&["a", "b"]);
        client.failing_starts.insert("a".into());
        client.failing_removals.insert("b".into());
        let params = UpdateParams {
            cleanup: true,
            ..Default::default()
        };

        let report = run_update_cycle(&client, &params).await.unwrap();

        let after_stops: Vec<_> = client
            .calls()
            .into_iter()
            .skip_while(|c| !matches!(c, Call::Start(_)))
            .collect();
        assert_eq!(
            after_stops,
            vec![
                Call::Start("a".into()),
                Call::RemoveImage("a".into()),
                Call::Start("b".into()),
                Call::RemoveImage("b".into()),
            ]
        );
        assert_eq!(report.images_removed.len(), 1);
        let kinds: Vec<_> = report.failures().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FailureKind::Start, FailureKind::RemoveImage]);
    }

    #[tokio::test]
    async fn no_cleanup_unless_enabled() {
        let client = FakeClient::new(vec![container("a", &[])]).stale(&["a"]);

        run(&client).await.unwrap();

        assert!(
            !client
                .calls()
                .iter()
                .any(|c| matches!(c, Call::RemoveImage(_)))
        );
    }
}
