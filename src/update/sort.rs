// ABOUTME: Dependency ordering of the containers in an update cycle.
// ABOUTME: Depth-first topological sort that reports dependency cycles.

use super::container::Container;
use nonempty::NonEmpty;

/// The containers could not be put in dependency order.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("dependency cycle detected: {}", .0.iter().cloned().collect::<Vec<_>>().join(" -> "))]
    Cycle(NonEmpty<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order `containers` so each one comes after everything it depends on.
///
/// Dependencies on containers outside the set impose no constraint, and a
/// container naming itself is ignored. Otherwise input order is kept where
/// the dependencies allow it.
pub fn by_dependencies(containers: Vec<Container>) -> Result<Vec<Container>, SortError> {
    let deps: Vec<Vec<usize>> = containers
        .iter()
        .enumerate()
        .map(|(i, c)| {
            containers
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && c.depends_on(other))
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; containers.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(containers.len());

    for i in 0..containers.len() {
        visit(i, &deps, &mut marks, &mut path, &mut order)
            .map_err(|cycle| SortError::Cycle(cycle.map(|j| containers[j].short_name().to_string())))?;
    }

    let mut slots: Vec<Option<Container>> = containers.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

fn visit(
    i: usize,
    deps: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), NonEmpty<usize>> {
    match marks[i] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let start = path.iter().position(|&p| p == i).unwrap_or(0);
            let mut cycle = NonEmpty::new(i);
            for &p in &path[start + 1..] {
                cycle.push(p);
            }
            cycle.push(i);
            return Err(cycle);
        }
        Mark::Unvisited => {}
    }

    marks[i] = Mark::InProgress;
    path.push(i);
    for &dep in &deps[i] {
        visit(dep, deps, marks, path, order)?;
    }
    path.pop();
    marks[i] = Mark::Done;
    order.push(i);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerId, ImageId, ImageRef};

    fn container(name: &str, links: &[&str]) -> Container {
        Container::new(
            ContainerId::new(format!("id-{name}")),
            format!("/{name}"),
            ImageRef::parse("alpine").unwrap(),
            ImageId::new("sha256:aaa"),
        )
        .with_links(links.iter().copied())
    }

    fn names(containers: &[Container]) -> Vec<&str> {
        containers.iter().map(|c| c.short_name()).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let sorted = by_dependencies(vec![
            container("web", &["api"]),
            container("api", &["db"]),
            container("db", &[]),
        ])
        .unwrap();
        assert_eq!(names(&sorted), ["db", "api", "web"]);
    }

    #[test]
    fn independent_containers_keep_input_order() {
        let sorted = by_dependencies(vec![
            container("c", &[]),
            container("a", &[]),
            container("b", &[]),
        ])
        .unwrap();
        assert_eq!(names(&sorted), ["c", "a", "b"]);
    }

    #[test]
    fn dependency_outside_the_set_is_ignored() {
        let sorted = by_dependencies(vec![container("web", &["missing"])]).unwrap();
        assert_eq!(names(&sorted), ["web"]);
    }

    #[test]
    fn self_link_is_not_a_cycle() {
        let sorted = by_dependencies(vec![container("loop", &["loop"])]).unwrap();
        assert_eq!(names(&sorted), ["loop"]);
    }

    #[test]
    fn cycle_is_reported_with_its_members() {
        let err = by_dependencies(vec![
            container("solo", &[]),
            container("a", &["b"]),
            container("b", &["c"]),
            container("c", &["a"]),
        ])
        .unwrap_err();

        let SortError::Cycle(cycle) = &err;
        assert_eq!(cycle.head, "a");
        assert_eq!(cycle.last(), "a");
        assert_eq!(cycle.len(), 4);
        assert!(err.to_string().contains("a -> b -> c -> a"));
    }

    #[test]
    fn empty_input() {
        assert!(by_dependencies(Vec::new()).unwrap().is_empty());
    }
}
