
use crate::{
    error::{TreeError, TreeResult},
    nodes::RootNode,
    BehaviorNode, NodeKind, Value,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::{self, Debug, Display, Formatter},
};
use tracing::debug;

const HASH_LEN: usize = 3;
const HASH_ATTEMPTS: usize = 10000;

/// Identity of a node within a tree, and the key of its blackboard record.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHash(String);

impl NodeHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeHash {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl Debug for NodeHash {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "{:?}", self.0)
    }
}

impl From<&str> for NodeHash {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) hash: NodeHash,
    pub(crate) parent: Option<NodeHash>,
    pub(crate) children: Vec<NodeHash>,
    pub(crate) behavior: Box<dyn BehaviorNode>,
    /// Values seeded into the node's blackboard record at setup, e.g. `weight`.
    pub(crate) defaults: BTreeMap<String, Value>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> &NodeHash {
        &self.hash
    }

    pub fn parent(&self) -> Option<&NodeHash> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeHash] {
        &self.children
    }

    /// The only child of a root or decorator node.
    pub fn child(&self) -> Option<&NodeHash> {
        self.children.first()
    }

    pub fn kind(&self) -> NodeKind {
        self.behavior.kind()
    }

    pub fn type_name(&self) -> &'static str {
        self.behavior.type_name()
    }

    pub fn behavior(&self) -> &dyn BehaviorNode {
        self.behavior.as_ref()
    }

    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }
}

impl Debug for Node {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("Node")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("type", &self.type_name())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

/// A behavior tree: a registry of nodes keyed by hash, with one root.
#[derive(Clone)]
pub struct Tree {
    name: String,
    root: NodeHash,
    nodes: HashMap<NodeHash, Node>,
}

impl Debug for Tree {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("Tree")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Tree {
    pub fn new(name: impl Into<String>) -> Self {
        let mut ret = Self {
            name: name.into(),
            root: NodeHash::from(""),
            nodes: HashMap::new(),
        };
        let root = ret.fresh_hash(&HashSet::new());
        ret.nodes.insert(
            root.clone(),
            Node {
                name: "Root node".to_owned(),
                hash: root.clone(),
                parent: None,
                children: vec![],
                behavior: Box::new(RootNode),
                defaults: BTreeMap::new(),
            },
        );
        ret.root = root;
        ret
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn root(&self) -> &NodeHash {
        &self.root
    }

    pub fn get(&self, hash: &NodeHash) -> Option<&Node> {
        self.nodes.get(hash)
    }

    pub fn contains(&self, hash: &NodeHash) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Finds the first node with the given display name, in depth-first order from the root.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.preorder(&self.root)
            .into_iter()
            .filter_map(|hash| self.nodes.get(&hash))
            .find(|node| node.name == name)
    }

    /// Hashes of `top` and all of its descendants, parents before children.
    pub fn preorder(&self, top: &NodeHash) -> Vec<NodeHash> {
        let mut ret = vec![];
        let mut stack = vec![top.clone()];
        while let Some(hash) = stack.pop() {
            if let Some(node) = self.nodes.get(&hash) {
                stack.extend(node.children.iter().rev().cloned());
                ret.push(hash);
            }
        }
        ret
    }

    /// Whether `ancestor` lies strictly above `node`.
    pub fn is_ancestor(&self, ancestor: &NodeHash, node: &NodeHash) -> bool {
        let mut cur = self.nodes.get(node).and_then(|n| n.parent.as_ref());
        while let Some(parent) = cur {
            if parent == ancestor {
                return true;
            }
            cur = self.nodes.get(parent).and_then(|n| n.parent.as_ref());
        }
        false
    }

    fn fresh_hash(&self, reserved: &HashSet<NodeHash>) -> NodeHash {
        let mut rng = rand::thread_rng();
        let mut len = HASH_LEN;
        loop {
            for _ in 0..HASH_ATTEMPTS {
                let hash = NodeHash(
                    (&mut rng)
                        .sample_iter(&Alphanumeric)
                        .take(len)
                        .map(char::from)
                        .collect(),
                );
                if !self.nodes.contains_key(&hash) && !reserved.contains(&hash) {
                    return hash;
                }
            }
            len += 1;
        }
    }

    fn node(&self, hash: &NodeHash) -> TreeResult<&Node> {
        self.nodes
            .get(hash)
            .ok_or_else(|| TreeError::InvalidNode(hash.clone()))
    }

    /// Checks that `destination` has a free slot for `node`. `vacating` is a current child of
    /// `destination` that will be gone by the time `node` is attached.
    fn check_slot(
        &self,
        node: &NodeHash,
        destination: &Node,
        vacating: Option<&NodeHash>,
    ) -> TreeResult {
        let occupied = destination
            .children
            .iter()
            .filter(|child| Some(*child) != vacating)
            .count();
        let reason = match destination.kind().max_children() {
            Some(0) => "leaf nodes cannot have children",
            Some(max) if max <= occupied => "a non-composite node that already has a child",
            _ => return Ok(()),
        };
        Err(TreeError::InvalidDestination {
            node: node.clone(),
            destination: destination.hash.clone(),
            reason,
        })
    }

    /// Creates a node under `parent` with a fresh hash.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        behavior: impl BehaviorNode + 'static,
        parent: &NodeHash,
        position: Option<usize>,
    ) -> TreeResult<NodeHash> {
        self.create_boxed(name, Box::new(behavior), parent, position)
    }

    pub fn create_boxed(
        &mut self,
        name: impl Into<String>,
        behavior: Box<dyn BehaviorNode>,
        parent: &NodeHash,
        position: Option<usize>,
    ) -> TreeResult<NodeHash> {
        let hash = self.fresh_hash(&HashSet::new());
        if behavior.kind() == NodeKind::Root {
            return Err(TreeError::RootNode(
                hash,
                "it may not be added as the child of any node",
            ));
        }
        self.check_slot(&hash, self.node(parent)?, None)?;
        let name = name.into();
        debug!("tree {:?}: created node {} {:?} under {}", self.name, hash, name, parent);
        self.nodes.insert(
            hash.clone(),
            Node {
                name,
                hash: hash.clone(),
                parent: None,
                children: vec![],
                behavior,
                defaults: BTreeMap::new(),
            },
        );
        self.attach(&hash, parent, position);
        Ok(hash)
    }

    pub fn rename(&mut self, hash: &NodeHash, name: impl Into<String>) -> TreeResult {
        let node = self
            .nodes
            .get_mut(hash)
            .ok_or_else(|| TreeError::InvalidNode(hash.clone()))?;
        node.name = name.into();
        Ok(())
    }

    /// Sets a value that blackboard setup seeds into the node's record.
    pub fn set_default(
        &mut self,
        hash: &NodeHash,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> TreeResult {
        let node = self
            .nodes
            .get_mut(hash)
            .ok_or_else(|| TreeError::InvalidNode(hash.clone()))?;
        node.defaults.insert(key.into(), value.into());
        Ok(())
    }

    /// Removes `hash` from its parent's child list, returning the former parent and index.
    fn detach(&mut self, hash: &NodeHash) -> Option<(NodeHash, usize)> {
        let parent = self.nodes.get_mut(hash)?.parent.take()?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let index = siblings.iter().position(|child| child == hash)?;
        siblings.remove(index);
        Some((parent, index))
    }

    fn attach(&mut self, hash: &NodeHash, parent: &NodeHash, position: Option<usize>) {
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            if parent_node.kind() == NodeKind::Composite {
                let len = parent_node.children.len();
                parent_node
                    .children
                    .insert(position.unwrap_or(len).min(len), hash.clone());
            } else {
                parent_node.children = vec![hash.clone()];
            }
        }
        if let Some(node) = self.nodes.get_mut(hash) {
            node.parent = Some(parent.clone());
        }
    }

    /// Parent and index of `hash` in its parent's child list.
    fn slot_of(&self, hash: &NodeHash) -> Option<(NodeHash, usize)> {
        let parent = self.nodes.get(hash)?.parent.clone()?;
        let index = self
            .nodes
            .get(&parent)?
            .children
            .iter()
            .position(|child| child == hash)?;
        Some((parent, index))
    }

    fn replace_slot(&mut self, (parent, index): (NodeHash, usize), hash: &NodeHash) {
        if let Some(slot) = self
            .nodes
            .get_mut(&parent)
            .and_then(|node| node.children.get_mut(index))
        {
            *slot = hash.clone();
        }
        if let Some(node) = self.nodes.get_mut(hash) {
            node.parent = Some(parent);
        }
    }

    /// Removes `top` and its descendants from the registry without touching the parent's
    /// child list.
    fn take_subtree(&mut self, top: &NodeHash) -> Vec<Node> {
        self.preorder(top)
            .into_iter()
            .filter_map(|hash| self.nodes.remove(&hash))
            .collect()
    }

    fn clone_subtree(&self, top: &NodeHash) -> Vec<Node> {
        self.preorder(top)
            .into_iter()
            .filter_map(|hash| self.nodes.get(&hash).cloned())
            .collect()
    }

    /// Inserts a detached subtree (top node first) into the registry, giving fresh hashes to
    /// nodes whose hash is already taken. Returns the hash of the top node, which is left
    /// without a parent.
    fn graft(&mut self, mut nodes: Vec<Node>) -> NodeHash {
        let mut reserved: HashSet<NodeHash> = nodes.iter().map(|node| node.hash.clone()).collect();
        let mut remap = HashMap::new();
        for node in &nodes {
            if self.nodes.contains_key(&node.hash) {
                let fresh = self.fresh_hash(&reserved);
                reserved.insert(fresh.clone());
                remap.insert(node.hash.clone(), fresh);
            }
        }
        let rename = |hash: &mut NodeHash| {
            if let Some(fresh) = remap.get(hash) {
                *hash = fresh.clone();
            }
        };
        for node in &mut nodes {
            rename(&mut node.hash);
            if let Some(parent) = node.parent.as_mut() {
                rename(parent);
            }
            node.children.iter_mut().for_each(rename);
        }
        let top = nodes.first().map(|node| node.hash.clone());
        for mut node in nodes {
            if Some(&node.hash) == top.as_ref() {
                node.parent = None;
            }
            self.nodes.insert(node.hash.clone(), node);
        }
        top.unwrap_or_else(|| self.root.clone())
    }

    fn check_add(
        &self,
        source: &Tree,
        same_tree: bool,
        node: &NodeHash,
        destination: &NodeHash,
        copying: bool,
    ) -> TreeResult {
        let dest = self.node(destination)?;
        let subject = source.nodes.get(node).ok_or_else(|| {
            if same_tree {
                TreeError::InvalidNode(node.clone())
            } else {
                TreeError::WrongTree(node.clone())
            }
        })?;
        if subject.kind() == NodeKind::Root {
            return Err(TreeError::RootNode(
                node.clone(),
                "it may not be added as the child of any node",
            ));
        }
        let moving_here = same_tree && !copying;
        if same_tree && node == destination {
            return Err(TreeError::SameNode(node.clone()));
        }
        if moving_here && self.is_ancestor(node, destination) {
            return Err(TreeError::InvalidDestination {
                node: node.clone(),
                destination: destination.clone(),
                reason: "the destination is a descendant of the node",
            });
        }
        let vacating = (moving_here && subject.parent.as_ref() == Some(destination)).then(|| node);
        self.check_slot(node, dest, vacating)
    }

    /// Adds `node` (a node of this tree) under `destination`, copying its subtree or moving
    /// it. Returns the hash of the added node, which differs from `node` for copies.
    pub fn add(
        &mut self,
        node: &NodeHash,
        destination: &NodeHash,
        position: Option<usize>,
        copying: bool,
    ) -> TreeResult<NodeHash> {
        self.check_add(self, true, node, destination, copying)?;
        if !copying {
            let old_slot = self.detach(node);
            let position = match (old_slot, position) {
                (Some((parent, index)), Some(p)) if &parent == destination && p > index => {
                    Some(p - 1)
                }
                (_, p) => p,
            };
            self.attach(node, destination, position);
            debug!("tree {:?}: moved node {} under {}", self.name, node, destination);
            return Ok(node.clone());
        }
        let clone = self.clone_subtree(node);
        let hash = self.graft(clone);
        self.attach(&hash, destination, position);
        debug!("tree {:?}: copied node {} to {} under {}", self.name, node, hash, destination);
        Ok(hash)
    }

    /// Adds `node`, which belongs to `source`, under `destination` in this tree. Moved nodes
    /// keep their hashes unless they collide with a node of this tree.
    pub fn add_from(
        &mut self,
        source: &mut Tree,
        node: &NodeHash,
        destination: &NodeHash,
        position: Option<usize>,
        copying: bool,
    ) -> TreeResult<NodeHash> {
        self.check_add(source, false, node, destination, copying)?;
        let nodes = if copying {
            source.clone_subtree(node)
        } else {
            source.detach(node);
            source.take_subtree(node)
        };
        let hash = self.graft(nodes);
        self.attach(&hash, destination, position);
        debug!(
            "tree {:?}: {} node {} from tree {:?} as {} under {}",
            self.name,
            if copying { "copied" } else { "moved" },
            node,
            source.name,
            hash,
            destination
        );
        Ok(hash)
    }

    /// Removes `node` and its whole subtree. Returns the removed hashes.
    pub fn remove(&mut self, node: &NodeHash) -> TreeResult<Vec<NodeHash>> {
        if self.node(node)?.kind() == NodeKind::Root {
            return Err(TreeError::RootNode(
                node.clone(),
                "it cannot be removed from its tree",
            ));
        }
        self.detach(node);
        let removed: Vec<_> = self
            .take_subtree(node)
            .into_iter()
            .map(|node| node.hash)
            .collect();
        debug!("tree {:?}: removed {} node(s) under {}", self.name, removed.len(), node);
        Ok(removed)
    }

    /// Moves `node` within its composite parent so that it ends up before the child that was
    /// at `position`, or last if `position` is `None`.
    pub fn shift(&mut self, node: &NodeHash, position: Option<usize>) -> TreeResult {
        let parent = match &self.node(node)?.parent {
            Some(parent) => parent.clone(),
            None => {
                return Err(TreeError::RootNode(
                    node.clone(),
                    "it may not be shifted as it has no parent",
                ))
            }
        };
        if self.node(&parent)?.kind() != NodeKind::Composite {
            return Err(TreeError::NotComposite(node.clone()));
        }
        if let Some((_, index)) = self.detach(node) {
            let position = position.map(|p| if p > index { p - 1 } else { p });
            self.attach(node, &parent, position);
        }
        Ok(())
    }

    fn check_swap(&self, node: &Node, target: &Node) -> TreeResult {
        for n in [node, target] {
            if n.parent.is_none() {
                return Err(TreeError::RootNode(
                    n.hash.clone(),
                    "it has no parent to swap with",
                ));
            }
        }
        Ok(())
    }

    /// Exchanges the places of two nodes of this tree, along with their subtrees.
    pub fn swap(&mut self, node: &NodeHash, target: &NodeHash) -> TreeResult {
        let (a, b) = (self.node(node)?, self.node(target)?);
        self.check_swap(a, b)?;
        if node == target {
            return Ok(());
        }
        if self.is_ancestor(node, target) || self.is_ancestor(target, node) {
            return Err(TreeError::InvalidDestination {
                node: node.clone(),
                destination: target.clone(),
                reason: "a node cannot be swapped with its own ancestor or descendant",
            });
        }
        let (slot_a, slot_b) = match (self.slot_of(node), self.slot_of(target)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(TreeError::InvalidNode(node.clone())),
        };
        self.replace_slot(slot_a, target);
        self.replace_slot(slot_b, node);
        debug!("tree {:?}: swapped {} and {}", self.name, node, target);
        Ok(())
    }

    /// Exchanges `node` of `source` with `target` of this tree. Returns the hashes the two
    /// nodes have in their new trees.
    pub fn swap_from(
        &mut self,
        source: &mut Tree,
        node: &NodeHash,
        target: &NodeHash,
    ) -> TreeResult<(NodeHash, NodeHash)> {
        let a = source
            .nodes
            .get(node)
            .ok_or_else(|| TreeError::WrongTree(node.clone()))?;
        let b = self.node(target)?;
        self.check_swap(a, b)?;
        let (slot_a, slot_b) = match (source.slot_of(node), self.slot_of(target)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(TreeError::WrongTree(node.clone())),
        };
        let nodes_a = source.take_subtree(node);
        let nodes_b = self.take_subtree(target);
        let new_a = self.graft(nodes_a);
        self.replace_slot(slot_b, &new_a);
        let new_b = source.graft(nodes_b);
        source.replace_slot(slot_a, &new_b);
        debug!(
            "tree {:?}: swapped {} of tree {:?} with {}",
            self.name, node, source.name, target
        );
        Ok((new_a, new_b))
    }

    fn check_interpose(
        &self,
        source: &Tree,
        same_tree: bool,
        node: &NodeHash,
        target: &NodeHash,
        copying: bool,
    ) -> TreeResult {
        let t = self.node(target)?;
        let n = source.nodes.get(node).ok_or_else(|| {
            if same_tree {
                TreeError::InvalidNode(node.clone())
            } else {
                TreeError::WrongTree(node.clone())
            }
        })?;
        if same_tree && node == target {
            return Err(TreeError::SameNode(node.clone()));
        }
        if n.kind() == NodeKind::Root {
            return Err(TreeError::RootNode(
                node.clone(),
                "cannot interpose it over any other node",
            ));
        }
        if t.parent.is_none() {
            return Err(TreeError::RootNode(target.clone(), "cannot interpose over it"));
        }
        if same_tree && !copying && source.is_ancestor(node, target) {
            return Err(TreeError::InvalidDestination {
                node: target.clone(),
                destination: node.clone(),
                reason: "the node is an ancestor of the target",
            });
        }
        self.check_slot(target, n, None)
    }

    fn interpose_top(&mut self, top: &NodeHash, target: &NodeHash, position: Option<usize>) {
        if let Some(slot) = self.slot_of(target) {
            self.replace_slot(slot, top);
        }
        self.attach(target, top, position);
    }

    /// Places `node` (or a copy of it) between `target` and its parent. `position` is where
    /// `target` goes among the children of a composite `node`.
    pub fn interpose(
        &mut self,
        node: &NodeHash,
        target: &NodeHash,
        position: Option<usize>,
        copying: bool,
    ) -> TreeResult<NodeHash> {
        self.check_interpose(self, true, node, target, copying)?;
        let top = if copying {
            let clone = self.clone_subtree(node);
            self.graft(clone)
        } else {
            self.detach(node);
            node.clone()
        };
        self.interpose_top(&top, target, position);
        debug!("tree {:?}: interposed {} over {}", self.name, top, target);
        Ok(top)
    }

    /// Interposes `node` of `source` over `target` of this tree.
    pub fn interpose_from(
        &mut self,
        source: &mut Tree,
        node: &NodeHash,
        target: &NodeHash,
        position: Option<usize>,
        copying: bool,
    ) -> TreeResult<NodeHash> {
        self.check_interpose(source, false, node, target, copying)?;
        let nodes = if copying {
            source.clone_subtree(node)
        } else {
            source.detach(node);
            source.take_subtree(node)
        };
        let top = self.graft(nodes);
        self.interpose_top(&top, target, position);
        debug!(
            "tree {:?}: interposed {} from tree {:?} over {}",
            self.name, top, source.name, target
        );
        Ok(top)
    }

    /// Checks every structural invariant: a single root, consistent parent and child links,
    /// child counts allowed by each node kind, and every node reachable from the root.
    pub fn validate(&self) -> TreeResult {
        let err = |reason: String| TreeError::Inconsistent {
            tree: self.name.clone(),
            reason,
        };
        let root = self
            .nodes
            .get(&self.root)
            .ok_or_else(|| err(format!("root {} is not registered", self.root)))?;
        if root.kind() != NodeKind::Root || root.parent.is_some() {
            return Err(err(format!("root {} is not a parentless root node", self.root)));
        }
        for (hash, node) in &self.nodes {
            if &node.hash != hash {
                return Err(err(format!("node {} is registered as {}", node.hash, hash)));
            }
            if hash != &self.root {
                if node.kind() == NodeKind::Root {
                    return Err(err(format!("second root node {}", hash)));
                }
                let parent = node
                    .parent
                    .as_ref()
                    .and_then(|parent| self.nodes.get(parent))
                    .ok_or_else(|| err(format!("node {} has no parent in the tree", hash)))?;
                if parent.children.iter().filter(|c| *c == hash).count() != 1 {
                    return Err(err(format!(
                        "node {} is not listed exactly once by its parent {}",
                        hash, parent.hash
                    )));
                }
            }
            if let Some(max) = node.kind().max_children() {
                if node.children.len() > max {
                    return Err(err(format!("node {} has too many children", hash)));
                }
            }
            for child in &node.children {
                match self.nodes.get(child) {
                    Some(c) if c.parent.as_ref() == Some(hash) => (),
                    _ => {
                        return Err(err(format!(
                            "child {} of node {} does not point back to it",
                            child, hash
                        )))
                    }
                }
            }
        }
        let mut visited = HashSet::new();
        let mut stack = vec![&self.root];
        while let Some(hash) = stack.pop() {
            if !visited.insert(hash) {
                return Err(err(format!("node {} is reachable twice", hash)));
            }
            if let Some(node) = self.nodes.get(hash) {
                stack.extend(node.children.iter());
            }
        }
        if visited.len() != self.nodes.len() {
            return Err(err(format!(
                "{} node(s) are not reachable from the root",
                self.nodes.len() - visited.len()
            )));
        }
        Ok(())
    }
}
