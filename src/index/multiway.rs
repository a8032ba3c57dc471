//! B-tree and B*-tree
//!
//! One multi-way tree, two balancing policies. Every node stores
//! `(id, address)` pairs; order `m` is the maximum number of children.
//!
//! ```text
//!                 Classic (B-tree)        Star (B*-tree)
//! max keys        m-1                     m-1
//! min keys        ⌈m/2⌉-1                 ⌊2(m-1)/3⌋
//! root max keys   m-1                     2·min
//! overflow        split 1→2               shift into a sibling with room,
//!                                         else split 2→3
//! underflow       borrow, else merge 2→1  borrow, else merge 3→2
//!                                         (2→1 under a two-child root)
//! ```
//!
//! All reshaping goes through [`redistribute`]: take `c` adjacent children
//! of a parent plus the `c-1` separators between them, and deal the pooled
//! keys (and grandchildren) back out evenly over `t` new children.

use crate::store::Address;

use super::KeyIndex;

type Entry = (u32, Address);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    Classic,
    Star,
}

#[derive(Debug, Clone, Default)]
struct Node {
    keys: Vec<Entry>,
    children: Vec<Box<Node>>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn search(&self, id: u32) -> Result<usize, usize> {
        self.keys.binary_search_by_key(&id, |&(k, _)| k)
    }
}

#[derive(Debug, Clone)]
pub struct MultiwayTree {
    root: Box<Node>,
    policy: SplitPolicy,
    max_keys: usize,
    min_keys: usize,
    root_max_keys: usize,
    len: usize,
}

impl MultiwayTree {
    /// Empty tree of order `order` (clamped to at least 4)
    pub fn new(order: usize, policy: SplitPolicy) -> Self {
        let order = order.max(4);
        let max_keys = order - 1;
        let (min_keys, root_max_keys) = match policy {
            SplitPolicy::Classic => (order.div_ceil(2) - 1, max_keys),
            SplitPolicy::Star => {
                let min = 2 * max_keys / 3;
                (min, 2 * min)
            }
        };
        Self {
            root: Box::default(),
            policy,
            max_keys,
            min_keys,
            root_max_keys,
            len: 0,
        }
    }

    pub fn policy(&self) -> SplitPolicy {
        self.policy
    }

    pub fn min_keys(&self) -> usize {
        self.min_keys
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Number of levels (1 for a lone root)
    pub fn height(&self) -> usize {
        let mut h = 1;
        let mut node = &self.root;
        while let Some(child) = node.children.first() {
            h += 1;
            node = child;
        }
        h
    }

    /// All entries in key order
    pub fn entries(&self) -> Vec<Entry> {
        let mut out = Vec::with_capacity(self.len);
        collect(&self.root, &mut out);
        out
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Entry> {
        let mut node = &mut self.root;
        loop {
            match node.search(id) {
                Ok(i) => return Some(&mut node.keys[i]),
                Err(i) if !node.is_leaf() => node = &mut node.children[i],
                Err(_) => return None,
            }
        }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    fn insert_into(&self, node: &mut Node, entry: Entry) {
        let i = match node.search(entry.0) {
            Ok(i) => {
                node.keys[i] = entry;
                return;
            }
            Err(i) => i,
        };
        if node.is_leaf() {
            node.keys.insert(i, entry);
            return;
        }
        self.insert_into(&mut node.children[i], entry);
        if node.children[i].keys.len() > self.max_keys {
            self.fix_overflow(node, i);
        }
    }

    fn fix_overflow(&self, parent: &mut Node, i: usize) {
        match self.policy {
            SplitPolicy::Classic => redistribute(parent, i, 1, 2),
            SplitPolicy::Star => {
                let has_room = |j: usize| parent.children[j].keys.len() < self.max_keys;
                let last = parent.children.len() - 1;
                if i > 0 && has_room(i - 1) {
                    redistribute(parent, i - 1, 2, 2);
                } else if i < last && has_room(i + 1) {
                    redistribute(parent, i, 2, 2);
                } else if i < last {
                    redistribute(parent, i, 2, 3);
                } else if i > 0 {
                    redistribute(parent, i - 1, 2, 3);
                } else {
                    redistribute(parent, i, 1, 2);
                }
            }
        }
    }

    // =========================================================================
    // Delete
    // =========================================================================

    fn remove_from(&self, node: &mut Node, id: u32) -> Option<Entry> {
        match node.search(id) {
            Ok(i) if node.is_leaf() => Some(node.keys.remove(i)),
            Err(_) if node.is_leaf() => None,
            Ok(i) => {
                // swap in the in-order predecessor, then delete it below
                let pred = self.pop_max(&mut node.children[i]);
                let removed = std::mem::replace(&mut node.keys[i], pred);
                self.fix_underflow(node, i);
                Some(removed)
            }
            Err(i) => {
                let removed = self.remove_from(&mut node.children[i], id);
                if removed.is_some() {
                    self.fix_underflow(node, i);
                }
                removed
            }
        }
    }

    fn pop_max(&self, node: &mut Node) -> Entry {
        if node.is_leaf() {
            // non-empty: every non-root node holds at least one key
            return node.keys.pop().unwrap_or_default();
        }
        let last = node.children.len() - 1;
        let max = self.pop_max(&mut node.children[last]);
        self.fix_underflow(node, last);
        max
    }

    fn fix_underflow(&self, parent: &mut Node, i: usize) {
        if parent.children[i].keys.len() >= self.min_keys {
            return;
        }
        let last = parent.children.len() - 1;
        let can_lend = |j: usize| parent.children[j].keys.len() > self.min_keys;

        if i > 0 && can_lend(i - 1) {
            return redistribute(parent, i - 1, 2, 2);
        }
        if i < last && can_lend(i + 1) {
            return redistribute(parent, i, 2, 2);
        }

        match self.policy {
            SplitPolicy::Classic => {
                let start = if i > 0 { i - 1 } else { i };
                redistribute(parent, start, 2, 1);
            }
            SplitPolicy::Star if parent.children.len() >= 3 => {
                let start = match i {
                    0 => 0,
                    _ if i == last => i - 2,
                    _ => i - 1,
                };
                let pooled: usize = parent.children[start..start + 3]
                    .iter()
                    .map(|c| c.keys.len())
                    .sum::<usize>()
                    + 2;
                // two nodes if the pool fits, otherwise even out over three
                let targets = if pooled - 1 <= 2 * self.max_keys { 2 } else { 3 };
                redistribute(parent, start, 3, targets);
            }
            SplitPolicy::Star => {
                // two children under the root: fold them into one
                redistribute(parent, 0, 2, 1);
            }
        }
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Structural self-check used by tests
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.root.keys.len() > self.root_max_keys {
            return Err(format!("root holds {} keys", self.root.keys.len()));
        }
        if !self.root.is_leaf() && self.root.keys.is_empty() {
            return Err("internal root without keys".into());
        }
        let mut leaf_depth = None;
        self.check_node(&self.root, 0, true, None, None, &mut leaf_depth)?;

        let entries = self.entries();
        if entries.len() != self.len {
            return Err(format!("len {} but {} entries", self.len, entries.len()));
        }
        if entries.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err("in-order traversal is not strictly ascending".into());
        }
        Ok(())
    }

    fn check_node(
        &self,
        node: &Node,
        depth: usize,
        is_root: bool,
        lo: Option<u32>,
        hi: Option<u32>,
        leaf_depth: &mut Option<usize>,
    ) -> Result<(), String> {
        let n = node.keys.len();
        if !is_root && (n < self.min_keys || n > self.max_keys) {
            return Err(format!(
                "node at depth {} holds {} keys (allowed {}..={})",
                depth, n, self.min_keys, self.max_keys
            ));
        }
        for &(k, _) in &node.keys {
            if lo.is_some_and(|l| k <= l) || hi.is_some_and(|h| k >= h) {
                return Err(format!("key {} outside its separator bounds", k));
            }
        }
        if node.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(d) if d != depth => return Err("leaves at different depths".into()),
                _ => {}
            }
            return Ok(());
        }
        if node.children.len() != n + 1 {
            return Err(format!("{} keys but {} children", n, node.children.len()));
        }
        for (j, child) in node.children.iter().enumerate() {
            let clo = if j == 0 { lo } else { Some(node.keys[j - 1].0) };
            let chi = if j == n { hi } else { Some(node.keys[j].0) };
            self.check_node(child, depth + 1, false, clo, chi, leaf_depth)?;
        }
        Ok(())
    }
}

impl KeyIndex for MultiwayTree {
    fn insert(&mut self, id: u32, addr: Address) {
        if let Some(entry) = self.get_mut(id) {
            entry.1 = addr;
            return;
        }

        let mut root = std::mem::take(&mut self.root);
        self.insert_into(&mut root, (id, addr));
        if root.keys.len() > self.root_max_keys {
            let mut new_root = Box::new(Node::default());
            new_root.children.push(root);
            redistribute(&mut new_root, 0, 1, 2);
            root = new_root;
        }
        self.root = root;
        self.len += 1;
    }

    fn remove(&mut self, id: u32) -> Option<Address> {
        let mut root = std::mem::take(&mut self.root);
        let removed = self.remove_from(&mut root, id);
        if root.keys.is_empty() && !root.is_leaf() {
            root = root.children.pop().unwrap_or_default();
        }
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed.map(|(_, a)| a)
    }

    fn get(&self, id: u32) -> Option<Address> {
        let mut node = &self.root;
        loop {
            match node.search(id) {
                Ok(i) => return Some(node.keys[i].1),
                Err(i) if !node.is_leaf() => node = &node.children[i],
                Err(_) => return None,
            }
        }
    }

    fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)> {
        let mut out = Vec::new();
        if lo <= hi {
            collect_range(&self.root, lo, hi, &mut out);
        }
        out
    }

    fn len(&self) -> usize {
        self.len
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Pool `c` children starting at `start` (plus their separators) and
/// rebuild them as `t` children with evenly spread keys.
fn redistribute(parent: &mut Node, start: usize, c: usize, t: usize) {
    let group: Vec<Box<Node>> = parent.children.drain(start..start + c).collect();
    let mut separators = parent.keys.drain(start..start + c - 1);

    let mut keys = Vec::new();
    let mut kids = Vec::new();
    for node in group {
        let Node { keys: k, children: ch } = *node;
        keys.extend(k);
        kids.extend(ch);
        if let Some(sep) = separators.next() {
            keys.push(sep);
        }
    }
    drop(separators);

    let leaf = kids.is_empty();
    let spread = keys.len() - (t - 1);
    let (base, extra) = (spread / t, spread % t);

    let mut keys = keys.into_iter();
    let mut kids = kids.into_iter();
    let mut new_nodes = Vec::with_capacity(t);
    let mut new_seps = Vec::with_capacity(t - 1);
    for j in 0..t {
        let n = base + usize::from(j < extra);
        let node_keys: Vec<Entry> = keys.by_ref().take(n).collect();
        let node_kids: Vec<Box<Node>> = if leaf {
            Vec::new()
        } else {
            kids.by_ref().take(n + 1).collect()
        };
        new_nodes.push(Box::new(Node {
            keys: node_keys,
            children: node_kids,
        }));
        if j + 1 < t {
            if let Some(sep) = keys.next() {
                new_seps.push(sep);
            }
        }
    }

    parent.keys.splice(start..start, new_seps);
    parent.children.splice(start..start, new_nodes);
}

fn collect(node: &Node, out: &mut Vec<Entry>) {
    if node.is_leaf() {
        out.extend_from_slice(&node.keys);
        return;
    }
    for (j, child) in node.children.iter().enumerate() {
        collect(child, out);
        if let Some(&entry) = node.keys.get(j) {
            out.push(entry);
        }
    }
}

fn collect_range(node: &Node, lo: u32, hi: u32, out: &mut Vec<Entry>) {
    // first key >= lo
    let start = node.keys.partition_point(|&(k, _)| k < lo);
    if node.is_leaf() {
        out.extend(node.keys[start..].iter().take_while(|&&(k, _)| k <= hi));
        return;
    }
    for j in start..node.children.len() {
        collect_range(&node.children[j], lo, hi, out);
        match node.keys.get(j) {
            Some(&entry) if entry.0 <= hi => out.push(entry),
            _ => return,
        }
    }
}
