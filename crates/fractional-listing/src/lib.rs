//! Fractional Listing - the listing registry
//!
//! A doubly linked list of canonical uids currently for sale, stored as a
//! node map plus a head pointer. The shape is deliberate for a storage model
//! where compacting a growable array is expensive:
//!
//! - `insert` is an O(1) prepend at head
//! - `remove` is an O(1) splice from any position (head, middle, or tail)
//! - `iter` walks head to tail without mutating anything
//!
//! The registry exclusively owns the link pointers; the custody ledger owns
//! the business fields. Enumeration order is most-recently-listed first.

use fractional_types::{FractionalError, Result, TokenUid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Link pointers for one listed uid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ListingNode {
    prev: Option<TokenUid>,
    next: Option<TokenUid>,
}

/// The listing registry
#[derive(Debug, Default)]
pub struct ListingRegistry {
    nodes: HashMap<TokenUid, ListingNode>,
    head: Option<TokenUid>,
}

impl ListingRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            head: None,
        }
    }

    /// Prepend a uid at the head. O(1).
    pub fn insert(&mut self, uid: TokenUid) -> Result<()> {
        if self.nodes.contains_key(&uid) {
            return Err(FractionalError::AlreadyForSale { token_uid: uid });
        }

        let node = ListingNode {
            prev: None,
            next: self.head,
        };
        if let Some(old_head) = self.head {
            // Old head gains a predecessor
            if let Some(old) = self.nodes.get_mut(&old_head) {
                old.prev = Some(uid);
            }
        }
        self.nodes.insert(uid, node);
        self.head = Some(uid);
        Ok(())
    }

    /// Splice a uid out of the list, wherever it sits. O(1).
    ///
    /// Returns true if the uid was listed. Removing an absent uid is not an
    /// error: sold-out and buy-back paths both call this unconditionally.
    pub fn remove(&mut self, uid: &TokenUid) -> bool {
        let node = match self.nodes.remove(uid) {
            Some(node) => node,
            None => return false,
        };

        match node.prev {
            Some(prev) => {
                if let Some(p) = self.nodes.get_mut(&prev) {
                    p.next = node.next;
                }
            }
            None => {
                // Removed the head; advance it
                self.head = node.next;
            }
        }
        if let Some(next) = node.next {
            if let Some(n) = self.nodes.get_mut(&next) {
                n.prev = node.prev;
            }
        }
        true
    }

    /// Whether a uid is currently listed
    pub fn contains(&self, uid: &TokenUid) -> bool {
        self.nodes.contains_key(uid)
    }

    /// Number of listed uids
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is listed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk the list head to tail. Non-mutating and restartable.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            registry: self,
            cursor: self.head,
        }
    }
}

/// Head-to-tail iterator over listed uids
pub struct Iter<'a> {
    registry: &'a ListingRegistry,
    cursor: Option<TokenUid>,
}

impl Iterator for Iter<'_> {
    type Item = TokenUid;

    fn next(&mut self) -> Option<Self::Item> {
        let uid = self.cursor?;
        self.cursor = self.registry.nodes.get(&uid).and_then(|n| n.next);
        Some(uid)
    }
}
