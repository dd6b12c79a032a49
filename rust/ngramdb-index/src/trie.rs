//! Byte-keyed trie with per-node operation logs.
//!
//! The trie is a strict ownership tree: every node exclusively owns its children,
//! there are no parent links and nodes are never removed. Logical deletion is a
//! [`OpKind::Remove`] record in the node's [`OpLog`].
//!
//! # Fan-out representation
//!
//! Most nodes have one or two children, so a node starts with a compact pair of
//! parallel vectors searched linearly. Once a node needs more than
//! [`COMPACT_FANOUT_MAX`] distinct children it is upgraded, once and for good, to
//! a direct-indexed table of 256 slots. The choice is invisible to callers.

use crate::op_log::{OpIndex, OpKind, OpLog};

/// Maximum number of children held in the compact (linear scan) representation.
pub const COMPACT_FANOUT_MAX: usize = 4;

const DIRECT_FANOUT: usize = 256;

/// A single trie node: its children and its operation log.
#[derive(Debug)]
pub struct TrieNode {
    fanout: Fanout,
    log: OpLog,
}

#[derive(Debug)]
enum Fanout {
    Compact {
        keys: Vec<u8>,
        children: Vec<TrieNode>,
    },
    Direct(Box<[Option<Box<TrieNode>>]>),
}

/// Outcome of [`TrieNode::child_or_insert`], used for trie statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Growth {
    Existing,
    Created,
    CreatedAfterUpgrade,
}

impl TrieNode {
    fn new() -> TrieNode {
        TrieNode {
            fanout: Fanout::Compact {
                keys: Vec::new(),
                children: Vec::new(),
            },
            log: OpLog::new(),
        }
    }

    /// Returns the child reached through `byte`, if any.
    #[inline]
    pub fn child(&self, byte: u8) -> Option<&TrieNode> {
        match &self.fanout {
            Fanout::Compact { keys, children } => keys
                .iter()
                .position(|&key| key == byte)
                .map(|pos| &children[pos]),
            Fanout::Direct(slots) => slots[byte as usize].as_deref(),
        }
    }

    fn child_mut(&mut self, byte: u8) -> Option<&mut TrieNode> {
        match &mut self.fanout {
            Fanout::Compact { keys, children } => {
                match keys.iter().position(|&key| key == byte) {
                    Some(pos) => Some(&mut children[pos]),
                    None => None,
                }
            }
            Fanout::Direct(slots) => slots[byte as usize].as_deref_mut(),
        }
    }

    /// Appends a mutation record to this node's log.
    pub fn append(&mut self, kind: OpKind, op_index: OpIndex) {
        self.log.append(kind, op_index);
    }

    /// Returns `true` if the path ending at this node is a member as of
    /// `op_index`.
    #[inline]
    pub fn is_visible_at(&self, op_index: OpIndex) -> bool {
        self.log.is_visible_at(op_index)
    }

    pub fn log(&self) -> &OpLog {
        &self.log
    }

    pub fn child_count(&self) -> usize {
        match &self.fanout {
            Fanout::Compact { keys, .. } => keys.len(),
            Fanout::Direct(slots) => slots.iter().filter(|slot| slot.is_some()).count(),
        }
    }

    /// Returns `true` once the node uses the direct-indexed representation.
    pub fn is_direct(&self) -> bool {
        matches!(self.fanout, Fanout::Direct(_))
    }

    fn child_or_insert(&mut self, byte: u8) -> (&mut TrieNode, Growth) {
        let upgraded = matches!(
            &self.fanout,
            Fanout::Compact { keys, .. } if keys.len() == COMPACT_FANOUT_MAX && !keys.contains(&byte)
        );
        if upgraded {
            self.upgrade();
        }

        match &mut self.fanout {
            Fanout::Compact { keys, children } => {
                match keys.iter().position(|&key| key == byte) {
                    Some(pos) => (&mut children[pos], Growth::Existing),
                    None => {
                        let pos = children.len();
                        keys.push(byte);
                        children.push(TrieNode::new());
                        (&mut children[pos], Growth::Created)
                    }
                }
            }
            Fanout::Direct(slots) => {
                let slot = &mut slots[byte as usize];
                let growth = match (slot.is_some(), upgraded) {
                    (true, _) => Growth::Existing,
                    (false, true) => Growth::CreatedAfterUpgrade,
                    (false, false) => Growth::Created,
                };
                let child = slot.get_or_insert_with(|| Box::new(TrieNode::new()));
                (&mut **child, growth)
            }
        }
    }

    fn upgrade(&mut self) {
        if let Fanout::Compact { keys, children } = &mut self.fanout {
            let mut slots = (0..DIRECT_FANOUT)
                .map(|_| None)
                .collect::<Box<[Option<Box<TrieNode>>]>>();
            for (key, child) in keys.drain(..).zip(children.drain(..)) {
                slots[key as usize] = Some(Box::new(child));
            }
            self.fanout = Fanout::Direct(slots);
        }
    }
}

/// Node counters maintained by [`Trie::insert`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrieStats {
    /// Total number of nodes, including the root.
    pub nodes: usize,
    /// Number of nodes upgraded to the direct-indexed representation.
    pub direct_nodes: usize,
}

/// The trie root together with its growth statistics.
#[derive(Debug)]
pub struct Trie {
    root: TrieNode,
    stats: TrieStats,
}

impl Trie {
    pub fn new() -> Trie {
        Trie {
            root: TrieNode::new(),
            stats: TrieStats {
                nodes: 1,
                direct_nodes: 0,
            },
        }
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Walks the byte path, creating missing nodes, and returns the terminal
    /// node.
    ///
    /// Inserting the same path again creates nothing and returns the same node.
    pub fn insert(&mut self, path: impl IntoIterator<Item = u8>) -> &mut TrieNode {
        let mut node = &mut self.root;
        for byte in path {
            let (child, growth) = node.child_or_insert(byte);
            match growth {
                Growth::Existing => (),
                Growth::Created => self.stats.nodes += 1,
                Growth::CreatedAfterUpgrade => {
                    self.stats.nodes += 1;
                    self.stats.direct_nodes += 1;
                }
            }
            node = child;
        }
        node
    }

    /// Walks the byte path without creating nodes.
    ///
    /// Returns `None` as soon as a byte has no matching child.
    pub fn lookup(&self, path: impl IntoIterator<Item = u8>) -> Option<&TrieNode> {
        path.into_iter()
            .try_fold(&self.root, |node, byte| node.child(byte))
    }

    /// Mutable counterpart of [`lookup`](Self::lookup); never creates nodes.
    pub fn lookup_mut(&mut self, path: impl IntoIterator<Item = u8>) -> Option<&mut TrieNode> {
        let mut node = &mut self.root;
        for byte in path {
            node = node.child_mut(byte)?;
        }
        Some(node)
    }

    pub fn stats(&self) -> TrieStats {
        self.stats
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}
