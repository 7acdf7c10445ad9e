use crate::{handler::TreeLibrary, NodeHash, Tree, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Scratch data of a single node for a single agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub running: bool,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

impl NodeRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Sets `key` only if it is absent, or unconditionally when `override_defaults` is set.
    pub fn seed(&mut self, key: impl Into<String>, value: impl Into<Value>, override_defaults: bool) {
        let key = key.into();
        if override_defaults || !self.data.contains_key(&key) {
            self.data.insert(key, value.into());
        }
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}

/// Data shared by all nodes of a blackboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Globals {
    /// Resource keys marked as taken, consulted by allocator nodes.
    #[serde(default)]
    pub resources: BTreeMap<String, Value>,
    /// Errors reported by nodes during the most recent tick, keyed by node hash.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    #[serde(flatten)]
    pub data: BTreeMap<String, Value>,
}

/// Per-agent state of a behavior tree, keyed by node hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    nodes: HashMap<NodeHash, NodeRecord>,
    globals: Globals,
    running_now: Vec<NodeHash>,
    running_pre: Vec<NodeHash>,
}

impl Blackboard {
    pub fn record(&self, hash: &NodeHash) -> Option<&NodeRecord> {
        self.nodes.get(hash)
    }

    pub fn record_mut(&mut self, hash: &NodeHash) -> &mut NodeRecord {
        self.nodes.entry(hash.clone()).or_default()
    }

    pub fn records(&self) -> impl Iterator<Item = (&NodeHash, &NodeRecord)> {
        self.nodes.iter()
    }

    /// Drops the records of nodes that were removed from the tree.
    pub fn forget<'a>(&mut self, hashes: impl IntoIterator<Item = &'a NodeHash>) {
        for hash in hashes {
            self.nodes.remove(hash);
        }
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    pub fn is_resource_taken(&self, key: &str) -> bool {
        self.globals
            .resources
            .get(key)
            .map_or(false, Value::is_truthy)
    }

    pub fn take_resource(&mut self, key: impl Into<String>) {
        self.globals.resources.insert(key.into(), Value::Bool(true));
    }

    pub fn release_resource(&mut self, key: &str) {
        self.globals.resources.remove(key);
    }

    pub fn error(&self, hash: &NodeHash) -> Option<&str> {
        self.globals.errors.get(hash.as_str()).map(String::as_str)
    }

    pub fn record_error(&mut self, hash: &NodeHash, msg: impl Into<String>) {
        self.globals.errors.insert(hash.to_string(), msg.into());
    }

    pub fn running_now(&self) -> &[NodeHash] {
        &self.running_now
    }

    pub fn running_pre(&self) -> &[NodeHash] {
        &self.running_pre
    }

    pub(crate) fn mark_running(&mut self, hash: &NodeHash) {
        self.record_mut(hash).running = true;
        if !self.running_now.contains(hash) {
            self.running_now.push(hash.clone());
        }
    }

    pub(crate) fn begin_tick(&mut self) {
        self.running_pre = std::mem::take(&mut self.running_now);
        self.globals.errors.clear();
    }

    /// Nodes that were running in the previous tick but were not reached in this one.
    pub(crate) fn interrupted(&self) -> Vec<NodeHash> {
        self.running_pre
            .iter()
            .filter(|hash| !self.running_now.contains(hash))
            .cloned()
            .collect()
    }

    /// Initializes the records of every node of `tree`, following transitions into other
    /// trees of `library`. Existing values are kept unless `override_defaults` is set.
    pub fn setup(&mut self, tree: &Tree, library: Option<&TreeLibrary>, override_defaults: bool) {
        if override_defaults {
            self.running_now.clear();
            self.running_pre.clear();
        }
        let mut visited = HashSet::new();
        self.setup_tree(tree, library, override_defaults, &mut visited);
    }

    fn setup_tree(
        &mut self,
        tree: &Tree,
        library: Option<&TreeLibrary>,
        override_defaults: bool,
        visited: &mut HashSet<*const Tree>,
    ) {
        if !visited.insert(tree as *const Tree) {
            return;
        }
        debug!(
            "setting up blackboard for tree {:?} ({} nodes, override: {})",
            tree.name(),
            tree.len(),
            override_defaults
        );
        for hash in tree.preorder(tree.root()) {
            let Some(node) = tree.get(&hash) else {
                continue;
            };
            let record = self.nodes.entry(hash.clone()).or_default();
            if override_defaults {
                *record = NodeRecord::default();
            }
            for (key, value) in node.defaults() {
                record.seed(key.clone(), value.clone(), override_defaults);
            }
            node.behavior.on_blackboard_setup(node, record, override_defaults);

            let target = node
                .behavior
                .transition_target()
                .and_then(|target| target.resolve(library));
            if let Some(target) = target {
                match target.try_borrow() {
                    Ok(target) => self.setup_tree(&target, library, override_defaults, visited),
                    Err(_) => debug!("tree behind node {} is being edited, skipping", hash),
                }
            }
        }
    }
}
