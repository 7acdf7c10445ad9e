//! # agent-behavior (Rust crate)
//!
//! Behavior trees for non-player agents, plus a small `$func(args)` text macro parser.
//!
//!
//! ## Overview
//!
//! A [`Tree`] owns a registry of nodes keyed by short random hashes ([`NodeHash`]).
//! Nodes refer to their parent and children by hash, so a tree can be restructured freely
//! with [`Tree::add`], [`Tree::remove`], [`Tree::shift`], [`Tree::swap`] and
//! [`Tree::interpose`], and subtrees can be copied or moved between trees.
//! Every operation checks everything up front and either succeeds or leaves the tree
//! exactly as it was.
//!
//! State that must survive between ticks does not live in the nodes. It lives in a
//! per-agent [`Blackboard`], keyed by node hash, so many agents can share one tree.
//!
//!
//! ## How it looks like
//!
//! First, build a tree. A tree always starts with a root node, which takes exactly one child.
//!
//! ```rust
//! use agent_behavior::*;
//!
//! let mut tree = Tree::new("guard");
//! let root = tree.root().clone();
//! let seq = tree.create("patrol", SequenceNode, &root, None).unwrap();
//! tree.create("look around", CommandNode::new(|ctx, _| {
//!     ctx.agent_mut().msg("You look around.");
//!     BehaviorResult::Success
//! }), &seq, None).unwrap();
//! assert_eq!(tree.len(), 3);
//! ```
//!
//! Then hand it to an [`AiHandler`], which owns the agent's blackboard, and tick it.
//!
//! ```rust
//! # use agent_behavior::*;
//! # let mut tree = Tree::new("guard");
//! # let root = tree.root().clone();
//! # tree.create("yes", CommandNode::new(|_, _| BehaviorResult::Success), &root, None).unwrap();
//! let tree = shared_tree(tree);
//! let mut agent = NullAgent;
//! let mut handler = AiHandler::default();
//! handler.setup(&agent, Some(tree.into()), false).unwrap();
//! assert_eq!(handler.tick(&mut agent), Some(BehaviorResult::Success));
//! ```
//!
//!
//! ## How to define your own node
//!
//! Implement [`BehaviorNode`]. The node receives its own [`Node`] (name, hash, children)
//! and a [`Context`] giving access to the blackboard, the agent and child ticking.
//!
//! ```rust
//! use agent_behavior::*;
//!
//! #[derive(Clone)]
//! struct CountTicks;
//!
//! impl BehaviorNode for CountTicks {
//!     fn kind(&self) -> NodeKind {
//!         NodeKind::Leaf
//!     }
//!
//!     fn type_name(&self) -> &'static str {
//!         "CountTicks"
//!     }
//!
//!     fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
//!         let record = ctx.record_mut(node.hash());
//!         let ticks = record.get_i64("ticks").unwrap_or(0);
//!         record.set("ticks", ticks + 1);
//!         BehaviorResult::Success
//!     }
//!
//!     fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
//!         record.seed("ticks", 0, override_defaults);
//!     }
//! }
//! ```
//!
//! Composite and decorator nodes call [`Context::tick`] on the hashes in `node.children()`,
//! which runs the open/update/close lifecycle of the child and keeps track of which nodes
//! are running.
//!
//!
//! ### Loading trees from a yaml file
//!
//! ```yaml
//! behavior_tree:
//!   guard:
//!     type: Selector
//!     children:
//!     - type: EnemyInSight
//!     - type: Repeater
//!       repeats: 3
//!       children:
//!       - type: EchoLeaf
//!         msg: "All quiet."
//! ```
//!
//! Built-in node types are registered by default. Host-defined leaves, like `EnemyInSight`
//! above, are registered by name on a [`Registry`] before calling [`load_yaml`].
//!
//! ```rust
//! use agent_behavior::*;
//!
//! let mut reg = Registry::default();
//! reg.register("EnemyInSight", boxify(|| ConditionNode::new(|_, _| Ok(false))));
//! let trees = load_yaml("behavior_tree:\n  guard:\n    type: EnemyInSight\n", &reg).unwrap();
//! assert_eq!(trees[0].name(), "guard");
//! ```
//!
//!
//! ## The macro parser
//!
//! [`FuncParser`] expands `$name(args)` calls embedded in free text using a table of
//! callables. Calls nest, arguments may be quoted, and `\$` or `$$` escape a call.
//!
//! ```rust
//! use agent_behavior::funcparser::{FuncParser, Value};
//!
//! let parser = FuncParser::with_defaults().callable("double", |args, _| {
//!     let n = args.first().and_then(|v| v.to_string().trim().parse::<i64>().ok()).unwrap_or(0);
//!     Ok(Value::Int(n * 2))
//! });
//! assert_eq!(parser.parse("Test $double(4)").unwrap(), "Test 8");
//! assert_eq!(parser.parse("$$double(4)").unwrap(), "$double(4)");
//! assert_eq!(parser.parse_to_any("$lit(123)").unwrap(), Value::Int(123));
//! ```

mod blackboard;
mod context;
pub mod error;
pub mod funcparser;
mod handler;
mod nodes;
pub mod parser;
mod registry;
mod tree;
mod value;

pub use crate::blackboard::{Blackboard, Globals, NodeRecord};
pub use crate::context::Context;
pub use crate::funcparser::FuncParser;
pub use crate::handler::{
    shared_tree, Agent, AiHandler, NullAgent, SharedTree, TreeLibrary, TreeRef,
};
pub use crate::nodes::{
    AllocatorNode, CommandFn, CommandNode, ConditionFn, ConditionNode, EchoDecoratorNode,
    EchoLeafNode, FailerNode, InverterNode, LimiterNode, MemSelectorNode, MemSequenceNode,
    ParallelNode, ProbSelectorNode, ProbSequenceNode, RepeaterNode, RootNode, SelectorNode,
    SequenceNode, SucceederNode, TransitionNode, VerifierNode,
};
pub use crate::parser::load_yaml;
pub use crate::registry::{boxify, with_params, Constructor, Registry};
pub use crate::tree::{Node, NodeHash, Tree};
pub use crate::value::Value;

use serde::{Deserialize, Serialize};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BehaviorResult {
    Success,
    Fail,
    /// The node should keep running in the next tick
    Running,
    /// An unrecoverable fault in a node. Propagates to the root untouched.
    Error,
}

impl BehaviorResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Running => "running",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "success" => Self::Success,
            "fail" => Self::Fail,
            "running" => Self::Running,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

/// The structural role of a node, which decides how many children it may hold.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum NodeKind {
    /// The single entry node of a tree. At most one child.
    Root,
    /// An ordered list of children.
    Composite,
    /// At most one child.
    Decorator,
    /// No children.
    Leaf,
}

impl NodeKind {
    pub fn max_children(&self) -> Option<usize> {
        match self {
            Self::Composite => None,
            Self::Root | Self::Decorator => Some(1),
            Self::Leaf => Some(0),
        }
    }
}

pub trait BehaviorNode: BehaviorNodeClone {
    fn kind(&self) -> NodeKind;

    /// Name the node type is registered under.
    fn type_name(&self) -> &'static str;

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult;

    /// Called before `update` when the node was not running in the previous tick.
    fn open(&self, _node: &Node, _ctx: &mut Context) {}

    /// Called when the node stops running, either by returning a non-running result or by
    /// not being ticked again after returning `Running`.
    fn close(&self, _node: &Node, _ctx: &mut Context) {}

    /// Initializes the node's record. Must leave existing values alone unless
    /// `override_defaults` is set.
    fn on_blackboard_setup(&self, _node: &Node, _record: &mut NodeRecord, _override_defaults: bool) {
    }

    /// Tree this node jumps to, if any. Blackboard setup follows it.
    fn transition_target(&self) -> Option<&TreeRef> {
        None
    }
}

pub trait BehaviorNodeClone {
    fn box_clone(&self) -> Box<dyn BehaviorNode>;
}

impl<T> BehaviorNodeClone for T
where
    T: BehaviorNode + Clone + 'static,
{
    fn box_clone(&self) -> Box<dyn BehaviorNode> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn BehaviorNode> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
