//! Reply trees over flat comment lists.
//!
//! Comments are stored flat with an optional parent key. The tree is a view:
//! an index from each comment to its direct replies, computed on demand and
//! never written back. A comment whose parent is missing from the list, or
//! that sits on a parent cycle, is shown as a root.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

/// A record that can be placed in a reply tree.
pub trait Threaded {
    type Key: Copy + Eq + Hash;

    fn key(&self) -> Self::Key;
    fn parent_key(&self) -> Option<Self::Key>;
}

/// Parent/child positions for one flat list, by index into that list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadIndex {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

impl ThreadIndex {
    pub fn build<T: Threaded>(items: &[T]) -> Self {
        let mut position = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            position.entry(item.key()).or_insert(i);
        }

        let parent: Vec<Option<usize>> = items
            .iter()
            .map(|item| item.parent_key().and_then(|k| position.get(&k).copied()))
            .collect();
        let broken = cycle_members(&parent);

        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); items.len()];
        for (i, p) in parent.iter().enumerate() {
            match p {
                Some(p) if !broken[i] => children[*p].push(i),
                _ => roots.push(i),
            }
        }

        Self { roots, children }
    }

    /// Indices in depth-first display order.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.children.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.children[i].iter().rev());
        }
        order
    }
}

/// Marks every node that lies on a parent cycle. Each node has at most one
/// parent, so every walk either ends at a root or re-enters its own path.
fn cycle_members(parent: &[Option<usize>]) -> Vec<bool> {
    let mut state = vec![Visit::Unvisited; parent.len()];
    let mut on_cycle = vec![false; parent.len()];
    let mut path = Vec::new();

    for start in 0..parent.len() {
        let mut cursor = Some(start);
        while let Some(node) = cursor {
            match state[node] {
                Visit::Unvisited => {
                    state[node] = Visit::OnPath;
                    path.push(node);
                    cursor = parent[node];
                }
                Visit::OnPath => {
                    if let Some(pos) = path.iter().position(|&n| n == node) {
                        for &member in &path[pos..] {
                            on_cycle[member] = true;
                        }
                    }
                    break;
                }
                Visit::Done => break,
            }
        }
        for node in path.drain(..) {
            state[node] = Visit::Done;
        }
    }

    on_cycle
}

/// Folds `items` into a forest bottom-up: `f` receives each comment together
/// with its already-built replies (in input order) and returns the view for
/// it. Returns the views of the roots, in input order.
pub fn assemble<T, V, F>(items: &[T], mut f: F) -> Vec<V>
where
    T: Threaded,
    F: FnMut(&T, Vec<V>) -> V,
{
    let index = ThreadIndex::build(items);
    let mut built: Vec<Option<V>> = items.iter().map(|_| None).collect();

    // Replies follow their parent in preorder, so walking it backwards
    // always finds them built.
    for i in index.preorder().into_iter().rev() {
        let replies = index.children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(f(&items[i], replies));
    }

    index.roots.iter().filter_map(|&r| built[r].take()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode<T> {
    pub comment: T,
    pub replies: Vec<CommentNode<T>>,
}

pub fn build_tree<T: Threaded + Clone>(items: &[T]) -> Vec<CommentNode<T>> {
    assemble(items, |comment, replies| CommentNode {
        comment: comment.clone(),
        replies,
    })
}

/// Walks a forest depth-first and returns the comments flat, parents before
/// their replies.
pub fn flatten<T: Clone>(forest: &[CommentNode<T>]) -> Vec<T> {
    let mut out = Vec::new();
    let mut stack: Vec<&CommentNode<T>> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.comment.clone());
        stack.extend(node.replies.iter().rev());
    }
    out
}

/// Like [`flatten`], for view types that carry their own reply list.
/// `take_replies` detaches the replies from a node.
pub fn flatten_by<V, F>(forest: Vec<V>, mut take_replies: F) -> Vec<V>
where
    F: FnMut(&mut V) -> Vec<V>,
{
    let mut out = Vec::new();
    let mut stack: Vec<V> = forest.into_iter().rev().collect();
    while let Some(mut node) = stack.pop() {
        let replies = take_replies(&mut node);
        out.push(node);
        stack.extend(replies.into_iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Rec {
        id: u32,
        parent: Option<u32>,
    }

    impl Threaded for Rec {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }

        fn parent_key(&self) -> Option<u32> {
            self.parent
        }
    }

    fn rec(id: u32, parent: Option<u32>) -> Rec {
        Rec { id, parent }
    }

    fn shape(forest: &[CommentNode<Rec>]) -> Vec<(u32, Vec<u32>)> {
        forest
            .iter()
            .map(|n| (n.comment.id, n.replies.iter().map(|r| r.comment.id).collect()))
            .collect()
    }

    #[test]
    fn test_dangling_parent_becomes_root() {
        let comments = vec![
            rec(1, None),
            rec(2, Some(1)),
            rec(3, Some(1)),
            rec(4, Some(99)),
        ];
        let tree = build_tree(&comments);
        assert_eq!(shape(&tree), vec![(1, vec![2, 3]), (4, vec![])]);
    }

    #[test]
    fn test_reply_listed_before_parent() {
        let comments = vec![rec(5, Some(1)), rec(1, None), rec(3, Some(1))];
        let tree = build_tree(&comments);
        assert_eq!(shape(&tree), vec![(1, vec![5, 3])]);
    }

    #[test]
    fn test_nested_replies() {
        let comments = vec![rec(1, None), rec(2, Some(1)), rec(3, Some(2)), rec(4, Some(3))];
        let tree = build_tree(&comments);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies[0].replies[0].replies[0].comment.id, 4);
    }

    #[test]
    fn test_self_parent_is_root() {
        let tree = build_tree(&[rec(7, Some(7)), rec(8, Some(7))]);
        assert_eq!(shape(&tree), vec![(7, vec![8])]);
    }

    #[test]
    fn test_cycle_members_become_roots() {
        let comments = vec![
            rec(1, Some(2)),
            rec(2, Some(1)),
            rec(3, Some(1)),
            rec(4, None),
            rec(5, Some(6)),
            rec(6, Some(7)),
            rec(7, Some(5)),
        ];
        let tree = build_tree(&comments);
        assert_eq!(
            shape(&tree),
            vec![
                (1, vec![3]),
                (2, vec![]),
                (4, vec![]),
                (5, vec![]),
                (6, vec![]),
                (7, vec![]),
            ]
        );
        assert_eq!(flatten(&tree).len(), comments.len());
    }

    #[test]
    fn test_rebuild_from_flattened_tree_is_identical() {
        let inputs = vec![
            vec![],
            vec![rec(1, None), rec(2, Some(1)), rec(3, Some(1)), rec(4, Some(99))],
            vec![rec(3, Some(2)), rec(1, None), rec(2, Some(1)), rec(4, Some(1)), rec(5, Some(3))],
            vec![rec(1, Some(2)), rec(2, Some(1)), rec(3, Some(1)), rec(9, Some(9))],
        ];
        for comments in inputs {
            let tree = build_tree(&comments);
            assert_eq!(build_tree(&flatten(&tree)), tree);
            assert_eq!(build_tree(&comments), tree);
        }
    }

    #[test]
    fn test_long_chain_builds_without_recursion() {
        let n = 50_000u32;
        let comments: Vec<Rec> = (0..n)
            .map(|i| rec(i, i.checked_sub(1)))
            .collect();
        let sizes = assemble(&comments, |_, replies: Vec<usize>| 1 + replies.iter().sum::<usize>());
        assert_eq!(sizes, vec![n as usize]);
    }

    #[test]
    fn test_flatten_by_detaches_replies() {
        #[derive(Debug)]
        struct View {
            id: u32,
            replies: Vec<View>,
        }
        let forest = assemble(
            &[rec(1, None), rec(2, Some(1)), rec(3, None)],
            |c, replies| View { id: c.id, replies },
        );
        let flat = flatten_by(forest, |v| std::mem::take(&mut v.replies));
        let ids: Vec<u32> = flat.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(flat.iter().all(|v| v.replies.is_empty()));
    }

    #[test]
    fn test_index_links_children_in_preorder() {
        let index = ThreadIndex::build(&[rec(1, None), rec(2, Some(1)), rec(3, Some(2))]);
        assert_eq!(index.roots, vec![0]);
        assert_eq!(index.children[1], vec![2]);
        assert_eq!(index.preorder(), vec![0, 1, 2]);
    }
}
