// ABOUTME: Staleness propagation from containers to their dependents.
// ABOUTME: Single forward pass over a dependency-ordered sequence.

use super::container::Container;

/// Mark every container that depends on a stale container as stale too.
///
/// `containers` must already be in dependency order (see
/// [`by_dependencies`](super::sort::by_dependencies)): a container is only
/// considered as a parent when the scan reaches it, so a dependent marked
/// earlier in the same pass passes staleness on to its own dependents.
/// With that order one pass reaches the full transitive closure.
///
/// On an unordered sequence one pass can stop short. Callers without the
/// ordering guarantee must repeat the call until it returns zero.
///
/// Returns how many containers were newly marked.
pub fn propagate_staleness(containers: &mut [Container]) -> usize {
    let mut marked = 0;

    for parent in 0..containers.len() {
        if !containers[parent].is_stale() {
            continue;
        }

        for child in 0..containers.len() {
            if child == parent || containers[child].is_stale() {
                continue;
            }
            if containers[child].depends_on(&containers[parent]) {
                tracing::debug!(
                    container = containers[child].short_name(),
                    dependency = containers[parent].short_name(),
                    "marking dependent stale"
                );
                containers[child].mark_stale();
                marked += 1;
            }
        }
    }

    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerId, ImageId, ImageRef};

    fn container(name: &str, links: &[&str], stale: bool) -> Container {
        let mut c = Container::new(
            ContainerId::new(format!("id-{name}")),
            format!("/{name}"),
            ImageRef::parse("alpine").unwrap(),
            ImageId::new("sha256:aaa"),
        )
        .with_links(links.iter().copied());
        if stale {
            c.mark_stale();
        }
        c
    }

    fn flags(containers: &[Container]) -> Vec<bool> {
        containers.iter().map(Container::is_stale).collect()
    }

    #[test]
    fn chain_in_dependency_order_closes_in_one_pass() {
        let mut chain = vec![
            container("c", &[], true),
            container("b", &["c"], false),
            container("a", &["b"], false),
        ];
        assert_eq!(propagate_staleness(&mut chain), 2);
        assert_eq!(flags(&chain), [true, true, true]);
    }

    #[test]
    fn dependencies_of_stale_containers_stay_fresh() {
        let mut set = vec![
            container("a", &[], false),
            container("b", &["a"], true),
            container("c", &["b"], false),
        ];
        propagate_staleness(&mut set);
        assert_eq!(flags(&set), [false, true, true]);
    }

    #[test]
    fn unordered_chain_needs_another_pass() {
        let mut chain = vec![
            container("a", &["b"], false),
            container("b", &["c"], false),
            container("c", &[], true),
        ];
        assert_eq!(propagate_staleness(&mut chain), 1);
        assert_eq!(flags(&chain), [false, true, true]);

        assert_eq!(propagate_staleness(&mut chain), 1);
        assert_eq!(propagate_staleness(&mut chain), 0);
        assert_eq!(flags(&chain), [true, true, true]);
    }

    #[test]
    fn nothing_stale_nothing_marked() {
        let mut set = vec![container("a", &[], false), container("b", &["a"], false)];
        assert_eq!(propagate_staleness(&mut set), 0);
        assert_eq!(flags(&set), [false, false]);
    }
}
