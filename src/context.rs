use crate::{
    handler::{SharedTree, TreeLibrary},
    Agent, BehaviorResult, Blackboard, NodeHash, NodeRecord, Tree,
};
use rand::RngCore;
use std::{any::Any, collections::HashSet, rc::Rc};
use tracing::{trace, warn};

/// How deep transitions may nest within a single tick.
pub const MAX_TRANSITION_DEPTH: usize = 16;

/// Everything a node can reach while it is being ticked.
pub struct Context<'a> {
    tree: &'a Tree,
    blackboard: &'a mut Blackboard,
    agent: &'a mut dyn Agent,
    library: Option<&'a TreeLibrary>,
    rng: &'a mut dyn RngCore,
    depth: usize,
}

impl<'a> Context<'a> {
    pub fn new(
        tree: &'a Tree,
        blackboard: &'a mut Blackboard,
        agent: &'a mut dyn Agent,
        library: Option<&'a TreeLibrary>,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            tree,
            blackboard,
            agent,
            library,
            rng,
            depth: 0,
        }
    }

    /// The tree currently being ticked. Differs from the agent's tree inside a transition.
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn blackboard(&self) -> &Blackboard {
        &*self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut *self.blackboard
    }

    pub fn record(&self, hash: &NodeHash) -> Option<&NodeRecord> {
        self.blackboard.record(hash)
    }

    pub fn record_mut(&mut self, hash: &NodeHash) -> &mut NodeRecord {
        self.blackboard.record_mut(hash)
    }

    pub fn agent(&self) -> &dyn Agent {
        &*self.agent
    }

    pub fn agent_mut(&mut self) -> &mut dyn Agent {
        &mut *self.agent
    }

    /// Downcasts the agent to the host's concrete type.
    pub fn agent_as<T: Any>(&mut self) -> Option<&mut T> {
        self.agent.as_any_mut().downcast_mut()
    }

    pub fn library(&self) -> Option<&'a TreeLibrary> {
        self.library
    }

    /// Random source scoped to the current tick.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for ticking nodes of another tree against the same agent and blackboard.
    pub(crate) fn nested<'b>(&'b mut self, tree: &'b Tree) -> Context<'b> {
        Context {
            tree,
            blackboard: &mut *self.blackboard,
            agent: &mut *self.agent,
            library: self.library,
            rng: &mut *self.rng,
            depth: self.depth + 1,
        }
    }

    /// Ticks a node of the current tree: opens it if it was not running, updates it, then
    /// either marks it running or closes it.
    pub fn tick(&mut self, hash: &NodeHash) -> BehaviorResult {
        let tree = self.tree;
        let Some(node) = tree.get(hash) else {
            warn!("node {} is not in tree {:?}", hash, tree.name());
            return BehaviorResult::Error;
        };
        let running = self.blackboard.record(hash).map_or(false, |r| r.running);
        if !running {
            node.behavior.open(node, self);
        }
        let res = node.behavior.update(node, self);
        trace!(
            "tick {} {:?} ({}) -> {:?}",
            hash,
            node.name(),
            node.type_name(),
            res
        );
        if res == BehaviorResult::Running {
            self.blackboard.mark_running(hash);
        } else {
            node.behavior.close(node, self);
            self.blackboard.record_mut(hash).running = false;
        }
        res
    }

    /// Closes a node that was running in the previous tick and was not reached in this one.
    pub(crate) fn close_interrupted(&mut self, hash: &NodeHash) {
        let tree = self.tree;
        if let Some(node) = tree.get(hash) {
            node.behavior.close(node, self);
        } else if let Some(shared) = self
            .transition_tree_of(hash)
            .or_else(|| self.library.and_then(|lib| lib.tree_of(hash)))
        {
            if let Ok(other) = shared.try_borrow() {
                if let Some(node) = other.get(hash) {
                    let mut ctx = self.nested(&other);
                    node.behavior.close(node, &mut ctx);
                }
            }
        }
        self.blackboard.record_mut(hash).running = false;
        trace!("closed interrupted node {}", hash);
    }

    /// The tree holding `hash` among those reachable through transitions from the current
    /// tree.
    fn transition_tree_of(&self, hash: &NodeHash) -> Option<SharedTree> {
        let mut pending = self.transition_targets(self.tree);
        let mut seen = HashSet::new();
        while let Some(shared) = pending.pop() {
            if !seen.insert(Rc::as_ptr(&shared)) {
                continue;
            }
            let Ok(tree) = shared.try_borrow() else {
                continue;
            };
            if tree.contains(hash) {
                drop(tree);
                return Some(shared);
            }
            pending.extend(self.transition_targets(&tree));
        }
        None
    }

    fn transition_targets(&self, tree: &Tree) -> Vec<SharedTree> {
        tree.preorder(tree.root())
            .iter()
            .filter_map(|hash| tree.get(hash))
            .filter_map(|node| node.behavior.transition_target())
            .filter_map(|target| target.resolve(self.library))
            .collect()
    }
}
