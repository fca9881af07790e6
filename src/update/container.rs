// ABOUTME: The per-cycle view of a running container.
// ABOUTME: Carries the staleness flag and answers the depends-on relation.

use crate::types::{ContainerId, ImageId, ImageRef};
use std::collections::HashMap;

/// Label marking the updater's own container.
pub const SELF_LABEL: &str = "lookout.self";

/// Label listing containers this one depends on, comma separated.
pub const DEPENDS_ON_LABEL: &str = "lookout.depends-on";

/// A container taking part in one update cycle.
///
/// Built fresh from the daemon every cycle. The only state that changes
/// during a cycle is the staleness flag, and it only ever goes from fresh
/// to stale.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    name: String,
    image: ImageRef,
    image_id: ImageId,
    labels: HashMap<String, String>,
    links: Vec<String>,
    network_mode: Option<String>,
    updater: bool,
    stale: bool,
}

impl Container {
    pub fn new(
        id: ContainerId,
        name: impl Into<String>,
        image: ImageRef,
        image_id: ImageId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            image,
            image_id,
            labels: HashMap::new(),
            links: Vec::new(),
            network_mode: None,
            updater: false,
            stale: false,
        }
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_network_mode(mut self, mode: impl Into<String>) -> Self {
        self.network_mode = Some(mode.into());
        self
    }

    /// Mark this container as the updater's own instance.
    pub fn as_updater(mut self) -> Self {
        self.updater = true;
        self
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Name as the daemon reports it, usually with a leading slash.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the daemon's leading slash.
    pub fn short_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    /// True if this is the updater's own container.
    pub fn is_self(&self) -> bool {
        self.updater || self.labels.get(SELF_LABEL).is_some_and(|v| v == "true")
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Flag this container for restart. There is deliberately no way back.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Whether this container needs `other` to be available.
    ///
    /// Holds when this container links to `other`, shares its network
    /// namespace (`container:<name or id>`), or names it in the
    /// `lookout.depends-on` label.
    pub fn depends_on(&self, other: &Container) -> bool {
        let other_name = other.short_name();

        if self
            .links
            .iter()
            .any(|link| link.trim_start_matches('/') == other_name)
        {
            return true;
        }

        if let Some(target) = self
            .network_mode
            .as_deref()
            .and_then(|mode| mode.strip_prefix("container:"))
        {
            let target = target.trim_start_matches('/');
            if target == other_name || other.id.matches_prefix(target) {
                return true;
            }
        }

        self.declared_dependencies().any(|dep| dep == other_name)
    }

    fn declared_dependencies(&self) -> impl Iterator<Item = &str> {
        self.labels
            .get(DEPENDS_ON_LABEL)
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(|dep| dep.trim().trim_start_matches('/'))
            .filter(|dep| !dep.is_empty())
    }
}
