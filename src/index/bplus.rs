//! B+-tree
//!
//! Internal nodes hold separators only; leaves hold `(id, address)` and
//! are chained left to right for range scans.
//!
//! ```text
//!                [ 20 | 40 ]
//!               /     |     \
//!   [5 10 15] → [20 25 30] → [40 45]
//! ```
//!
//! Nodes live in an arena indexed by `NodeId`, which is what lets leaves
//! point at their right neighbour. Freed slots are reused.
//!
//! Occupancy (order `m`, root excepted):
//! - leaves: `⌈(m-1)/2⌉ ..= m-1` entries
//! - internal: `⌈m/2⌉ ..= m` children

use crate::store::Address;

use super::KeyIndex;

type NodeId = usize;

#[derive(Debug, Clone)]
enum BpNode {
    Leaf {
        keys: Vec<u32>,
        addrs: Vec<Address>,
        next: Option<NodeId>,
    },
    Internal {
        keys: Vec<u32>,
        children: Vec<NodeId>,
    },
    Free,
}

#[derive(Debug, Clone)]
pub struct BPlusTree {
    nodes: Vec<BpNode>,
    free: Vec<NodeId>,
    root: NodeId,
    leaf_max: usize,
    leaf_min: usize,
    inner_max_keys: usize,
    inner_min_keys: usize,
    len: usize,
}

impl BPlusTree {
    /// Empty tree of order `order` (clamped to at least 4)
    pub fn new(order: usize) -> Self {
        let order = order.max(4);
        Self {
            nodes: vec![BpNode::Leaf {
                keys: Vec::new(),
                addrs: Vec::new(),
                next: None,
            }],
            free: Vec::new(),
            root: 0,
            leaf_max: order - 1,
            leaf_min: (order - 1).div_ceil(2),
            inner_max_keys: order - 1,
            inner_min_keys: order.div_ceil(2) - 1,
            len: 0,
        }
    }

    fn alloc(&mut self, node: BpNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = BpNode::Free;
        self.free.push(id);
    }

    fn take(&mut self, id: NodeId) -> BpNode {
        std::mem::replace(&mut self.nodes[id], BpNode::Free)
    }

    fn key_count(&self, id: NodeId) -> usize {
        match &self.nodes[id] {
            BpNode::Leaf { keys, .. } | BpNode::Internal { keys, .. } => keys.len(),
            BpNode::Free => 0,
        }
    }

    fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.nodes[id], BpNode::Leaf { .. })
    }

    /// Path of (internal node, child slot) pairs from the root, plus the leaf for `id`
    fn descend(&self, id: u32) -> (Vec<(NodeId, usize)>, NodeId) {
        let mut path = Vec::new();
        let mut cur = self.root;
        while let BpNode::Internal { keys, children } = &self.nodes[cur] {
            let slot = keys.partition_point(|&k| k <= id);
            path.push((cur, slot));
            cur = children[slot];
        }
        (path, cur)
    }

    fn underflows(&self, id: NodeId) -> bool {
        if self.is_leaf(id) {
            self.key_count(id) < self.leaf_min
        } else {
            self.key_count(id) < self.inner_min_keys
        }
    }

    fn can_lend(&self, id: NodeId) -> bool {
        if self.is_leaf(id) {
            self.key_count(id) > self.leaf_min
        } else {
            self.key_count(id) > self.inner_min_keys
        }
    }

    pub fn height(&self) -> usize {
        let (path, _) = self.descend(0);
        path.len() + 1
    }

    /// Walk the leaf chain from the leftmost leaf
    pub fn leaf_chain(&self) -> Vec<u32> {
        let mut cur = self.root;
        while let BpNode::Internal { children, .. } = &self.nodes[cur] {
            cur = children[0];
        }
        let mut out = Vec::with_capacity(self.len);
        let mut next = Some(cur);
        while let Some(id) = next {
            match &self.nodes[id] {
                BpNode::Leaf { keys, next: n, .. } => {
                    out.extend_from_slice(keys);
                    next = *n;
                }
                _ => break,
            }
        }
        out
    }

    // =========================================================================
    // Insert
    // =========================================================================

    fn split_leaf(&mut self, leaf: NodeId) -> (u32, NodeId) {
        let BpNode::Leaf { keys, addrs, next } = &mut self.nodes[leaf] else {
            unreachable!("split_leaf on a non-leaf");
        };
        let mid = keys.len() / 2;
        let right_keys = keys.split_off(mid);
        let right_addrs = addrs.split_off(mid);
        let right_next = next.take();
        let sep = right_keys[0];

        let right = self.alloc(BpNode::Leaf {
            keys: right_keys,
            addrs: right_addrs,
            next: right_next,
        });
        if let BpNode::Leaf { next, .. } = &mut self.nodes[leaf] {
            *next = Some(right);
        }
        (sep, right)
    }

    fn split_internal(&mut self, node: NodeId) -> (u32, NodeId) {
        let BpNode::Internal { keys, children } = &mut self.nodes[node] else {
            unreachable!("split_internal on a leaf");
        };
        let mid = keys.len() / 2;
        let mut right_keys = keys.split_off(mid);
        let sep = right_keys.remove(0);
        let right_children = children.split_off(mid + 1);

        let right = self.alloc(BpNode::Internal {
            keys: right_keys,
            children: right_children,
        });
        (sep, right)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Repair an underfull child at `slot` of `parent`
    fn rebalance(&mut self, parent: NodeId, slot: usize) {
        let (child, left, right) = match &self.nodes[parent] {
            BpNode::Internal { children, .. } => (
                children[slot],
                slot.checked_sub(1).map(|s| children[s]),
                children.get(slot + 1).copied(),
            ),
            _ => return,
        };

        if let Some(l) = left.filter(|&l| self.can_lend(l)) {
            self.borrow_from_left(parent, slot, l, child);
        } else if let Some(r) = right.filter(|&r| self.can_lend(r)) {
            self.borrow_from_right(parent, slot, child, r);
        } else if let Some(l) = left {
            self.merge(parent, slot - 1, l, child);
        } else if let Some(r) = right {
            self.merge(parent, slot, child, r);
        }
    }

    fn borrow_from_left(&mut self, parent: NodeId, slot: usize, left: NodeId, child: NodeId) {
        let mut l = self.take(left);
        let mut c = self.take(child);
        let mut p = self.take(parent);
        if let BpNode::Internal { keys: pkeys, .. } = &mut p {
            match (&mut l, &mut c) {
                (
                    BpNode::Leaf { keys: lk, addrs: la, .. },
                    BpNode::Leaf { keys: ck, addrs: ca, .. },
                ) => {
                    if let (Some(k), Some(a)) = (lk.pop(), la.pop()) {
                        ck.insert(0, k);
                        ca.insert(0, a);
                        pkeys[slot - 1] = k;
                    }
                }
                (
                    BpNode::Internal { keys: lk, children: lc },
                    BpNode::Internal { keys: ck, children: cc },
                ) => {
                    if let (Some(k), Some(ch)) = (lk.pop(), lc.pop()) {
                        ck.insert(0, pkeys[slot - 1]);
                        cc.insert(0, ch);
                        pkeys[slot - 1] = k;
                    }
                }
                _ => {}
            }
        }
        self.nodes[left] = l;
        self.nodes[child] = c;
        self.nodes[parent] = p;
    }

    fn borrow_from_right(&mut self, parent: NodeId, slot: usize, child: NodeId, right: NodeId) {
        let mut c = self.take(child);
        let mut r = self.take(right);
        let mut p = self.take(parent);
        if let BpNode::Internal { keys: pkeys, .. } = &mut p {
            match (&mut c, &mut r) {
                (
                    BpNode::Leaf { keys: ck, addrs: ca, .. },
                    BpNode::Leaf { keys: rk, addrs: ra, .. },
                ) => {
                    if !rk.is_empty() {
                        ck.push(rk.remove(0));
                        ca.push(ra.remove(0));
                        if let Some(&first) = rk.first() {
                            pkeys[slot] = first;
                        }
                    }
                }
                (
                    BpNode::Internal { keys: ck, children: cc },
                    BpNode::Internal { keys: rk, children: rc },
                ) => {
                    if !rk.is_empty() {
                        ck.push(pkeys[slot]);
                        cc.push(rc.remove(0));
                        pkeys[slot] = rk.remove(0);
                    }
                }
                _ => {}
            }
        }
        self.nodes[child] = c;
        self.nodes[right] = r;
        self.nodes[parent] = p;
    }

    /// Fold `right` into `left`; they sit at `sep` and `sep + 1` under `parent`
    fn merge(&mut self, parent: NodeId, sep: usize, left: NodeId, right: NodeId) {
        let r = self.take(right);
        let mut p = self.take(parent);
        if let BpNode::Internal { keys: pkeys, children } = &mut p {
            let separator = pkeys.remove(sep);
            children.remove(sep + 1);
            match (&mut self.nodes[left], r) {
                (
                    BpNode::Leaf { keys, addrs, next },
                    BpNode::Leaf { keys: rk, addrs: ra, next: rn },
                ) => {
                    keys.extend(rk);
                    addrs.extend(ra);
                    *next = rn;
                }
                (
                    BpNode::Internal { keys, children },
                    BpNode::Internal { keys: rk, children: rc },
                ) => {
                    keys.push(separator);
                    keys.extend(rk);
                    children.extend(rc);
                }
                _ => {}
            }
        }
        self.nodes[parent] = p;
        self.release(right);
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Structural self-check used by tests
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut leaf_depth = None;
        self.check_node(self.root, 0, None, None, &mut leaf_depth)?;

        let chain = self.leaf_chain();
        if chain.len() != self.len {
            return Err(format!("len {} but leaf chain has {}", self.len, chain.len()));
        }
        if chain.windows(2).any(|w| w[0] >= w[1]) {
            return Err("leaf chain is not strictly ascending".into());
        }
        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        depth: usize,
        lo: Option<u32>,
        hi: Option<u32>,
        leaf_depth: &mut Option<usize>,
    ) -> Result<(), String> {
        let is_root = id == self.root;
        let (keys, children) = match &self.nodes[id] {
            BpNode::Leaf { keys, addrs, .. } => {
                if keys.len() != addrs.len() {
                    return Err("leaf keys and addresses differ in length".into());
                }
                if !is_root && (keys.len() < self.leaf_min || keys.len() > self.leaf_max) {
                    return Err(format!("leaf holds {} entries", keys.len()));
                }
                (keys, None)
            }
            BpNode::Internal { keys, children } => {
                if children.len() != keys.len() + 1 {
                    return Err("internal node children != keys + 1".into());
                }
                let too_few = if is_root {
                    keys.is_empty()
                } else {
                    keys.len() < self.inner_min_keys
                };
                if too_few || keys.len() > self.inner_max_keys {
                    return Err(format!("internal node holds {} keys", keys.len()));
                }
                (keys, Some(children))
            }
            BpNode::Free => return Err(format!("node {} is freed but reachable", id)),
        };

        // children: lo <= k < hi
        if keys.iter().any(|&k| lo.is_some_and(|l| k < l) || hi.is_some_and(|h| k >= h)) {
            return Err("key outside its separator bounds".into());
        }

        match children {
            None => match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(d) if d != depth => return Err("leaves at different depths".into()),
                _ => {}
            },
            Some(children) => {
                for (j, &child) in children.iter().enumerate() {
                    let clo = if j == 0 { lo } else { Some(keys[j - 1]) };
                    let chi = if j == keys.len() { hi } else { Some(keys[j]) };
                    self.check_node(child, depth + 1, clo, chi, leaf_depth)?;
                }
            }
        }
        Ok(())
    }
}

impl KeyIndex for BPlusTree {
    fn insert(&mut self, id: u32, addr: Address) {
        let (mut path, leaf) = self.descend(id);

        let overfull = match &mut self.nodes[leaf] {
            BpNode::Leaf { keys, addrs, .. } => match keys.binary_search(&id) {
                Ok(i) => {
                    addrs[i] = addr;
                    return;
                }
                Err(i) => {
                    keys.insert(i, id);
                    addrs.insert(i, addr);
                    keys.len() > self.leaf_max
                }
            },
            _ => return,
        };
        self.len += 1;
        if !overfull {
            return;
        }

        let (mut sep, mut right) = self.split_leaf(leaf);
        let mut left = leaf;
        loop {
            let Some((parent, slot)) = path.pop() else {
                // the root split: grow a level
                self.root = self.alloc(BpNode::Internal {
                    keys: vec![sep],
                    children: vec![left, right],
                });
                return;
            };
            let overfull = match &mut self.nodes[parent] {
                BpNode::Internal { keys, children } => {
                    keys.insert(slot, sep);
                    children.insert(slot + 1, right);
                    keys.len() > self.inner_max_keys
                }
                _ => return,
            };
            if !overfull {
                return;
            }
            (sep, right) = self.split_internal(parent);
            left = parent;
        }
    }

    fn remove(&mut self, id: u32) -> Option<Address> {
        let (mut path, leaf) = self.descend(id);
        let removed = match &mut self.nodes[leaf] {
            BpNode::Leaf { keys, addrs, .. } => {
                let i = keys.binary_search(&id).ok()?;
                keys.remove(i);
                Some(addrs.remove(i))
            }
            _ => None,
        }?;
        self.len -= 1;

        let mut node = leaf;
        while node != self.root && self.underflows(node) {
            let Some((parent, slot)) = path.pop() else {
                break;
            };
            self.rebalance(parent, slot);
            node = parent;
        }

        // collapse an emptied internal root
        let only_child = match &self.nodes[self.root] {
            BpNode::Internal { keys, children } if keys.is_empty() => Some(children[0]),
            _ => None,
        };
        if let Some(only) = only_child {
            let old = self.root;
            self.root = only;
            self.release(old);
        }
        Some(removed)
    }

    fn get(&self, id: u32) -> Option<Address> {
        let (_, leaf) = self.descend(id);
        match &self.nodes[leaf] {
            BpNode::Leaf { keys, addrs, .. } => keys.binary_search(&id).ok().map(|i| addrs[i]),
            _ => None,
        }
    }

    fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)> {
        let mut out = Vec::new();
        if lo > hi {
            return out;
        }
        let (_, mut cur) = self.descend(lo);
        loop {
            let BpNode::Leaf { keys, addrs, next } = &self.nodes[cur] else {
                break;
            };
            let start = keys.partition_point(|&k| k < lo);
            for (k, a) in keys[start..].iter().zip(&addrs[start..]) {
                if *k > hi {
                    return out;
                }
                out.push((*k, *a));
            }
            match next {
                Some(n) => cur = *n,
                None => break,
            }
        }
        out
    }

    fn len(&self) -> usize {
        self.len
    }
}
