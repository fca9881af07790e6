// ABOUTME: Eligibility filter deciding which containers an update cycle may touch.
// ABOUTME: Always rejects the updater itself, plus explicitly excluded names.

use super::container::Container;

/// Selects the containers that take part in an update cycle.
#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter {
    excluded: Vec<String>,
}

impl EligibilityFilter {
    /// Blank names are dropped; everything else is matched verbatim.
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded
                .into_iter()
                .map(Into::into)
                .filter(|name| !name.trim().is_empty())
                .collect(),
        }
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// True if `container` is a candidate for update checks.
    ///
    /// A name is excluded if it equals an excluded name as-is, or once its
    /// first character is dropped. Daemon names carry a leading `/`, so
    /// `web` excludes `/web`; any other single leading character is dropped
    /// the same way.
    pub fn admits(&self, container: &Container) -> bool {
        if container.is_self() {
            return false;
        }

        let name = container.name();
        let rest = without_first_char(name);
        !self
            .excluded
            .iter()
            .any(|excluded| excluded == name || Some(excluded.as_str()) == rest)
    }
}

fn without_first_char(s: &str) -> Option<&str> {
    let mut chars = s.chars();
    chars.next().map(|_| chars.as_str())
}
