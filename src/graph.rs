//! # Key Compatibility Graph
//!
//! Static graph over the 24 [`KeyNode`]s. Every key has three kinds of
//! compatible step:
//!
//! - **same**: the key itself (a self loop, used for BPM-only moves)
//! - **neighbor**: pitch class one semitone down or up, same mode, wrapping
//! - **relative**: same pitch class, other mode
//!
//! Both `neighbor` and `relative` are symmetric. The longest shortest path
//! between two keys is six semitone steps plus one mode change, so
//! [`DIAMETER`] bounds every chain.

use crate::key::KeyNode;
use serde::Serialize;

/// Longest shortest path between any two keys
pub const DIAMETER: usize = 7;

/// Kind of compatible step between two keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Same,
    Neighbor,
    Relative,
}

/// Keys one compatible step away from a key, grouped by edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub same: KeyNode,
    /// One semitone down, then one semitone up
    pub neighbor: [KeyNode; 2],
    pub relative: KeyNode,
}

impl Neighbors {
    /// Every reachable key with its edge, in the order same, down, up, relative
    pub fn iter(&self) -> impl Iterator<Item = (KeyNode, Edge)> {
        [
            (self.same, Edge::Same),
            (self.neighbor[0], Edge::Neighbor),
            (self.neighbor[1], Edge::Neighbor),
            (self.relative, Edge::Relative),
        ]
        .into_iter()
    }

    #[must_use]
    pub fn contains(&self, key: KeyNode) -> bool {
        self.iter().any(|(k, _)| k == key)
    }
}

/// Keys reachable from `key` in exactly one compatible step
#[must_use]
pub fn neighbors(key: KeyNode) -> Neighbors {
    Neighbors {
        same: key,
        neighbor: [key.transpose(-1), key.transpose(1)],
        relative: key.relative(),
    }
}

/// Edge joining two keys, if they are one step apart
#[must_use]
pub fn edge_between(from: KeyNode, to: KeyNode) -> Option<Edge> {
    neighbors(from).iter().find(|(k, _)| *k == to).map(|(_, edge)| edge)
}

/// All minimal-length key paths from `source` to `target`.
///
/// Nothing is computed until the sequence is iterated, and every call to
/// [`KeyPaths::iter`] restarts the traversal from scratch, so the value can
/// be held and replayed. Paths longer than `max_len` edges are never produced;
/// `max_len` is capped at [`DIAMETER`].
#[must_use]
pub fn shortest_paths(source: KeyNode, target: KeyNode, max_len: usize) -> KeyPaths {
    KeyPaths {
        source,
        target,
        max_len: max_len.min(DIAMETER),
    }
}

/// Restartable description of a shortest-path enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPaths {
    source: KeyNode,
    target: KeyNode,
    max_len: usize,
}

impl KeyPaths {
    /// Fresh iterator over the paths, each a `Vec` of keys from source to target
    #[must_use]
    pub fn iter(&self) -> PathIter {
        PathIter {
            paths: *self,
            found: None,
        }
    }

    /// Number of edges in each path, `None` if the target is out of reach
    #[must_use]
    pub fn min_length(&self) -> Option<usize> {
        self.iter().next().map(|path| path.len() - 1)
    }
}

impl IntoIterator for &KeyPaths {
    type Item = Vec<KeyNode>;
    type IntoIter = PathIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the paths of a [`KeyPaths`]
#[derive(Debug)]
pub struct PathIter {
    paths: KeyPaths,
    found: Option<std::vec::IntoIter<Vec<KeyNode>>>,
}

impl Iterator for PathIter {
    type Item = Vec<KeyNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let paths = self.paths;
        self.found
            .get_or_insert_with(|| enumerate(paths.source, paths.target, paths.max_len).into_iter())
            .next()
    }
}

/// Breadth-first search keeping every path that reaches a key at its best
/// depth. A key is never re-entered deeper than the first level that reached
/// it, which bounds the frontier and makes the first level containing the
/// target hold exactly the shortest paths.
fn enumerate(source: KeyNode, target: KeyNode, max_len: usize) -> Vec<Vec<KeyNode>> {
    if source == target {
        return vec![vec![source]];
    }

    let mut best_depth: [Option<usize>; 24] = [None; 24];
    best_depth[usize::from(source.index())] = Some(0);
    let mut frontier = vec![vec![source]];

    for depth in 1..=max_len {
        let mut next = Vec::new();
        let mut reached = Vec::new();

        for path in &frontier {
            let Some(&last) = path.last() else { continue };
            for (key, edge) in neighbors(last).iter() {
                if edge == Edge::Same {
                    continue;
                }
                let slot = &mut best_depth[usize::from(key.index())];
                if matches!(*slot, Some(d) if d < depth) {
                    continue;
                }
                *slot = Some(depth);

                let mut extended = path.clone();
                extended.push(key);
                if key == target {
                    reached.push(extended);
                } else {
                    next.push(extended);
                }
            }
        }

        if !reached.is_empty() {
            log::trace!("{} shortest key paths {source} -> {target} at depth {depth}", reached.len());
            return reached;
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Mode;

    fn key(pitch: u8, mode: Mode) -> KeyNode {
        KeyNode::from_parts(pitch, mode)
    }

    #[test]
    fn test_three_relations_four_distinct_keys() {
        for k in KeyNode::all() {
            let n = neighbors(k);
            let distinct: std::collections::HashSet<_> = n.iter().map(|(k, _)| k).collect();
            assert_eq!(distinct.len(), 4, "key {k} should have four distinct compatible keys");
            assert!(n.contains(k));
            assert_eq!(n.same, k);
        }
    }

    #[test]
    fn test_neighbor_and_relative_are_symmetric() {
        for k in KeyNode::all() {
            let n = neighbors(k);
            for j in n.neighbor {
                assert_eq!(edge_between(j, k), Some(Edge::Neighbor));
            }
            assert_eq!(edge_between(n.relative, k), Some(Edge::Relative));
        }
    }

    #[test]
    fn test_relative_is_involution() {
        for k in KeyNode::all() {
            assert_eq!(k.relative().relative(), k);
            assert_ne!(k.relative(), k);
        }
    }

    #[test]
    fn test_neighbor_wraps_around() {
        let b_major = key(11, Mode::Major);
        let n = neighbors(b_major);
        assert_eq!(n.neighbor[1], key(0, Mode::Major));
        assert_eq!(neighbors(key(0, Mode::Minor)).neighbor[0], key(11, Mode::Minor));
    }

    #[test]
    fn test_edge_between_unrelated_keys() {
        assert_eq!(edge_between(key(0, Mode::Major), key(2, Mode::Major)), None);
        assert_eq!(edge_between(key(0, Mode::Major), key(0, Mode::Major)), Some(Edge::Same));
    }

    #[test]
    fn test_same_key_yields_zero_length_path() {
        let k = key(5, Mode::Minor);
        let paths: Vec<_> = shortest_paths(k, k, DIAMETER).iter().collect();
        assert_eq!(paths, vec![vec![k]]);
    }

    #[test]
    fn test_all_shortest_paths_enumerated() {
        // C major to C# minor: via C# major or via C minor
        let source = key(0, Mode::Major);
        let target = key(1, Mode::Minor);
        let paths: Vec<_> = shortest_paths(source, target, DIAMETER).iter().collect();

        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&vec![source, key(1, Mode::Major), target]));
        assert!(paths.contains(&vec![source, key(0, Mode::Minor), target]));
    }

    #[test]
    fn test_tritone_uses_both_directions() {
        let source = key(0, Mode::Major);
        let target = key(6, Mode::Major);
        let paths: Vec<_> = shortest_paths(source, target, DIAMETER).iter().collect();

        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.len() == 7));
    }

    #[test]
    fn test_every_pair_reachable_within_diameter() {
        for a in KeyNode::all() {
            for b in KeyNode::all() {
                let len = shortest_paths(a, b, DIAMETER).min_length();
                assert!(matches!(len, Some(l) if l <= DIAMETER), "{a} -> {b} unreachable");
            }
        }
        let far = shortest_paths(key(0, Mode::Major), key(6, Mode::Minor), DIAMETER);
        assert_eq!(far.min_length(), Some(DIAMETER));
    }

    #[test]
    fn test_paths_are_valid_walks() {
        let paths = shortest_paths(key(3, Mode::Minor), key(9, Mode::Major), DIAMETER);
        for path in &paths {
            for pair in path.windows(2) {
                assert!(matches!(
                    edge_between(pair[0], pair[1]),
                    Some(Edge::Neighbor | Edge::Relative)
                ));
            }
        }
    }

    #[test]
    fn test_max_len_limits_search() {
        let paths = shortest_paths(key(0, Mode::Major), key(3, Mode::Major), 2);
        assert_eq!(paths.iter().count(), 0);
        assert_eq!(paths.min_length(), None);
    }

    #[test]
    fn test_iteration_is_restartable_and_deterministic() {
        let paths = shortest_paths(key(2, Mode::Minor), key(8, Mode::Minor), DIAMETER);
        let first: Vec<_> = paths.iter().collect();
        let second: Vec<_> = paths.iter().collect();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
