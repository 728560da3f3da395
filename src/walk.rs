//! Reachability closure over the object dependency graph.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::object::{kind_name, Object, ObjectId};

/// One level of the explicit traversal stack.
struct Frame {
    dependencies: Vec<ObjectId>,
    next: usize,
}

/// Collect every object reachable from `start`, stopping at ids for which
/// `boundary` returns true.
///
/// Each id is checked against the boundary and loaded at most once, so
/// shared subtrees are only expanded a single time and the result holds no
/// duplicates. Ids are emitted in post-order: every id comes after all of
/// its own dependencies, and `start` comes last. Writing objects in this
/// order means a receiver never holds an object whose dependencies are
/// missing, even when a transfer stops partway.
///
/// The traversal is iterative. A dependency that points back onto the
/// current path, or a path longer than `max_depth`, fails with
/// [`Error::CycleDetected`].
pub fn reachable<B, L>(
    start: &ObjectId,
    mut boundary: B,
    mut load: L,
    max_depth: usize,
) -> Result<Vec<ObjectId>>
where
    B: FnMut(&ObjectId) -> Result<bool>,
    L: FnMut(&ObjectId) -> Result<Object>,
{
    let mut found = Vec::new();
    if boundary(start)? {
        return Ok(found);
    }

    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut path: Vec<ObjectId> = Vec::new();
    let mut on_path: HashSet<ObjectId> = HashSet::new();
    let mut stack: Vec<Frame> = Vec::new();

    let root = load(start)?;
    visited.insert(start.clone());
    path.push(start.clone());
    on_path.insert(start.clone());
    stack.push(Frame {
        dependencies: root.dependencies,
        next: 0,
    });

    while let Some(frame) = stack.last_mut() {
        let Some(dep) = frame.dependencies.get(frame.next).cloned() else {
            stack.pop();
            if let Some(done) = path.pop() {
                on_path.remove(&done);
                found.push(done);
            }
            continue;
        };
        frame.next += 1;

        if on_path.contains(&dep) {
            return Err(Error::CycleDetected(format!(
                "{} depends on its own ancestor {}",
                path.last().map(ObjectId::as_str).unwrap_or_default(),
                dep
            )));
        }
        if !visited.insert(dep.clone()) {
            continue;
        }
        if boundary(&dep)? {
            continue;
        }
        if path.len() >= max_depth {
            return Err(Error::CycleDetected(format!(
                "walk from {start} exceeded depth {max_depth}"
            )));
        }

        let object = load(&dep)?;
        tracing::trace!(
            "walk: {} {} ({} bytes, {} deps)",
            kind_name(object.kind),
            object.id,
            object.payload.len(),
            object.dependencies.len()
        );
        path.push(dep.clone());
        on_path.insert(dep);
        stack.push(Frame {
            dependencies: object.dependencies,
            next: 0,
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::object::Kind;

    fn oid(fill: u8) -> ObjectId {
        ObjectId::from_raw(&[fill; 20]).unwrap()
    }

    /// Graph given as `(node, deps)` pairs over single-byte ids.
    struct Graph {
        edges: HashMap<ObjectId, Vec<ObjectId>>,
        loads: RefCell<Vec<ObjectId>>,
    }

    impl Graph {
        fn new(edges: &[(u8, Vec<u8>)]) -> Self {
            Graph {
                edges: edges
                    .iter()
                    .map(|(n, deps)| (oid(*n), deps.iter().map(|d| oid(*d)).collect()))
                    .collect(),
                loads: RefCell::new(Vec::new()),
            }
        }

        fn load(&self, id: &ObjectId) -> Result<Object> {
            self.loads.borrow_mut().push(id.clone());
            let deps = self
                .edges
                .get(id)
                .ok_or_else(|| Error::ObjectNotFound(id.to_string()))?;
            Ok(Object {
                id: id.clone(),
                kind: Kind::Tree,
                payload: Vec::new(),
                dependencies: deps.clone(),
            })
        }
    }

    fn sorted(mut ids: Vec<ObjectId>) -> Vec<ObjectId> {
        ids.sort();
        ids
    }

    #[test]
    fn test_diamond_visits_shared_node_once() {
        // A -> {B, C}, B -> D, C -> D
        let graph = Graph::new(&[(1, vec![2, 3]), (2, vec![4]), (3, vec![4]), (4, vec![])]);
        let ids = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 100).unwrap();

        assert_eq!(ids.len(), 4);
        assert_eq!(sorted(ids), vec![oid(1), oid(2), oid(3), oid(4)]);
        assert_eq!(graph.loads.borrow().iter().filter(|id| **id == oid(4)).count(), 1);
    }

    #[test]
    fn test_dependencies_come_before_dependents() {
        // A -> {B, C}, B -> D, C -> {D, E}
        let graph = Graph::new(&[
            (1, vec![2, 3]),
            (2, vec![4]),
            (3, vec![4, 5]),
            (4, vec![]),
            (5, vec![]),
        ]);
        let ids = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 100).unwrap();

        let position = |n: u8| ids.iter().position(|id| *id == oid(n)).unwrap();
        for (node, deps) in [(1, vec![2, 3]), (2, vec![4]), (3, vec![4, 5])] {
            for dep in deps {
                assert!(position(dep) < position(node), "{dep} emitted after {node}");
            }
        }
        assert_eq!(ids.last(), Some(&oid(1)));
    }

    #[test]
    fn test_boundary_excludes_subgraph() {
        // A -> {B, C}, B -> D, C -> D, D -> E
        let graph = Graph::new(&[(1, vec![2, 3]), (2, vec![4]), (3, vec![4]), (4, vec![5]), (5, vec![])]);
        let ids = reachable(&oid(1), |id| Ok(*id == oid(4)), |id| graph.load(id), 100).unwrap();

        assert_eq!(sorted(ids), vec![oid(1), oid(2), oid(3)]);
        assert!(!graph.loads.borrow().contains(&oid(4)));
        assert!(!graph.loads.borrow().contains(&oid(5)));
    }

    #[test]
    fn test_start_inside_boundary() {
        let graph = Graph::new(&[(1, vec![])]);
        let ids = reachable(&oid(1), |_| Ok(true), |id| graph.load(id), 100).unwrap();
        assert!(ids.is_empty());
        assert!(graph.loads.borrow().is_empty());
    }

    #[test]
    fn test_missing_dependency() {
        let graph = Graph::new(&[(1, vec![2])]);
        let result = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 100);
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[test]
    fn test_cycle_detected() {
        let graph = Graph::new(&[(1, vec![2]), (2, vec![3]), (3, vec![1])]);
        let result = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 100);
        assert!(matches!(result, Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_depth_bound() {
        let graph = Graph::new(&[(1, vec![2]), (2, vec![3]), (3, vec![4]), (4, vec![])]);
        let result = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 2);
        assert!(matches!(result, Err(Error::CycleDetected(_))));

        let ids = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 4).unwrap();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_wide_sharing_stays_linear() {
        // Chain of 64 commits, each pointing at the same tree and its parent.
        let mut edges: Vec<(u8, Vec<u8>)> = (1..=64u8).map(|n| (n, vec![200, n + 1])).collect();
        edges.push((65, vec![200]));
        edges.push((200, vec![201]));
        edges.push((201, vec![]));
        let graph = Graph::new(&edges);

        let ids = reachable(&oid(1), |_| Ok(false), |id| graph.load(id), 1000).unwrap();
        assert_eq!(ids.len(), 67);
        assert_eq!(graph.loads.borrow().len(), 67);
    }
}
