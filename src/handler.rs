use crate::{error::TreeResult, BehaviorResult, Blackboard, Context, NodeHash, Tree};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::{
    any::Any,
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};
use tracing::{debug, warn};

pub type SharedTree = Rc<RefCell<Tree>>;

pub fn shared_tree(tree: Tree) -> SharedTree {
    Rc::new(RefCell::new(tree))
}

/// A tree given either directly or by its name in a [`TreeLibrary`].
#[derive(Clone)]
pub enum TreeRef {
    Shared(SharedTree),
    Named(String),
}

impl TreeRef {
    pub fn resolve(&self, library: Option<&TreeLibrary>) -> Option<SharedTree> {
        match self {
            Self::Shared(tree) => Some(tree.clone()),
            Self::Named(name) => library.and_then(|library| library.get(name)),
        }
    }
}

impl Debug for TreeRef {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Shared(tree) => match tree.try_borrow() {
                Ok(tree) => write!(fmt, "Shared({:?})", tree.name()),
                Err(_) => write!(fmt, "Shared(<borrowed>)"),
            },
            Self::Named(name) => write!(fmt, "Named({:?})", name),
        }
    }
}

impl From<SharedTree> for TreeRef {
    fn from(tree: SharedTree) -> Self {
        Self::Shared(tree)
    }
}

impl From<&str> for TreeRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for TreeRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Trees addressable by name. Clones share the same set of trees.
#[derive(Clone, Default)]
pub struct TreeLibrary {
    trees: Rc<RefCell<HashMap<String, SharedTree>>>,
}

impl TreeLibrary {
    pub fn insert(&self, tree: Tree) -> SharedTree {
        let shared = shared_tree(tree);
        self.insert_shared(shared.clone());
        shared
    }

    /// Registers a shared tree under its current name.
    pub fn insert_shared(&self, tree: SharedTree) {
        let name = tree.borrow().name().to_owned();
        self.trees.borrow_mut().insert(name, tree);
    }

    pub fn get(&self, name: &str) -> Option<SharedTree> {
        self.trees.borrow().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<SharedTree> {
        self.trees.borrow_mut().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut ret: Vec<_> = self.trees.borrow().keys().cloned().collect();
        ret.sort();
        ret
    }

    /// The tree containing a node with this hash, if any.
    pub fn tree_of(&self, hash: &NodeHash) -> Option<SharedTree> {
        self.trees
            .borrow()
            .values()
            .find(|tree| tree.try_borrow().map_or(false, |tree| tree.contains(hash)))
            .cloned()
    }
}

impl Debug for TreeLibrary {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_list().entries(self.names()).finish()
    }
}

/// The entity a behavior tree acts on behalf of.
pub trait Agent: Any {
    fn key(&self) -> &str;

    /// Tree assigned to the agent's class, used when no tree is given to
    /// [`AiHandler::setup`].
    fn ai_tree(&self) -> Option<TreeRef> {
        None
    }

    /// Delivers a message to the agent, e.g. from echo nodes.
    fn msg(&mut self, _text: &str) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An agent with no state that ignores messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAgent;

impl Agent for NullAgent {
    fn key(&self) -> &str {
        "null"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Drives one agent's behavior tree and owns its blackboard.
#[derive(Debug, Default)]
pub struct AiHandler {
    tree: Option<TreeRef>,
    blackboard: Option<Blackboard>,
    library: TreeLibrary,
}

impl AiHandler {
    pub fn new(library: TreeLibrary) -> Self {
        Self {
            tree: None,
            blackboard: None,
            library,
        }
    }

    pub fn tree(&self) -> Option<&TreeRef> {
        self.tree.as_ref()
    }

    pub fn library(&self) -> &TreeLibrary {
        &self.library
    }

    pub fn blackboard(&self) -> Option<&Blackboard> {
        self.blackboard.as_ref()
    }

    pub fn blackboard_mut(&mut self) -> Option<&mut Blackboard> {
        self.blackboard.as_mut()
    }

    /// Assigns a tree and initializes the blackboard for it. The tree is taken from `tree`,
    /// then from the agent, then from an earlier setup. Returns `Ok(false)` without creating
    /// any state when there is no tree to run.
    pub fn setup(
        &mut self,
        agent: &dyn Agent,
        tree: Option<TreeRef>,
        override_defaults: bool,
    ) -> TreeResult<bool> {
        let Some(tree_ref) = tree.or_else(|| agent.ai_tree()).or_else(|| self.tree.clone()) else {
            debug!("agent {:?} has no behavior tree", agent.key());
            return Ok(false);
        };
        let Some(shared) = tree_ref.resolve(Some(&self.library)) else {
            debug!("agent {:?}: tree {:?} not found", agent.key(), tree_ref);
            return Ok(false);
        };
        let tree = shared.borrow();
        tree.validate()?;
        self.blackboard
            .get_or_insert_with(Blackboard::default)
            .setup(&tree, Some(&self.library), override_defaults);
        drop(tree);
        self.tree = Some(tree_ref);
        Ok(true)
    }

    /// Ticks the tree once with a fresh random source. Returns `None` if the handler has not
    /// been set up.
    pub fn tick(&mut self, agent: &mut dyn Agent) -> Option<BehaviorResult> {
        let mut rng = StdRng::from_entropy();
        self.tick_with_rng(agent, &mut rng)
    }

    pub fn tick_with_rng(
        &mut self,
        agent: &mut dyn Agent,
        rng: &mut dyn RngCore,
    ) -> Option<BehaviorResult> {
        let shared = self.tree.as_ref()?.resolve(Some(&self.library))?;
        let blackboard = self.blackboard.as_mut()?;
        let Ok(tree) = shared.try_borrow() else {
            warn!("tree {:?} is borrowed mutably, skipping tick", self.tree);
            return None;
        };
        blackboard.begin_tick();
        let mut ctx = Context::new(&tree, blackboard, agent, Some(&self.library), rng);
        let res = ctx.tick(tree.root());
        for hash in ctx.blackboard().interrupted() {
            ctx.close_interrupted(&hash);
        }
        Some(res)
    }
}
