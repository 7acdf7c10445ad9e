#[cfg(test)]
mod test;

use crate::{
    context::MAX_TRANSITION_DEPTH, handler::TreeRef, BehaviorNode, BehaviorResult, Context, Node,
    NodeHash, NodeKind, NodeRecord, Value,
};
use rand::Rng;
use serde::Deserialize;
use std::rc::Rc;
use tracing::warn;

pub type ConditionFn = Rc<dyn Fn(&mut Context, &Node) -> Result<bool, String>>;
pub type CommandFn = Rc<dyn Fn(&mut Context, &Node) -> BehaviorResult>;

const RUNNING_CHILD: &str = "running_child";
const AVAIL: &str = "avail";
const WEIGHT: &str = "weight";
const STATES: &str = "states";
const PRIMARY_CHILD: &str = "primary_child";
const REQ_SUCCESSES: &str = "req_successes";
const REQ_FAILURES: &str = "req_failures";
const DEFAULT_SUCCESS: &str = "default_success";
const REPEATS: &str = "repeats";
const COUNT: &str = "count";
const RESOURCES: &str = "resources";
const MSG: &str = "msg";

/// Ticks the only child of a decorator, failing if there is none.
fn tick_child(node: &Node, ctx: &mut Context) -> BehaviorResult {
    match node.child() {
        Some(child) => ctx.tick(child),
        None => BehaviorResult::Fail,
    }
}

fn param_usize(ctx: &Context, hash: &NodeHash, key: &str, fallback: Option<usize>) -> Option<usize> {
    match ctx.record(hash).and_then(|r| r.get(key)) {
        Some(v) => v.as_i64().and_then(|i| usize::try_from(i).ok()),
        None => fallback,
    }
}

fn report_error(ctx: &mut Context, node: &Node, msg: String) -> BehaviorResult {
    warn!("node {} {:?}: {}", node.hash(), node.name(), msg);
    ctx.blackboard_mut().record_error(node.hash(), msg);
    BehaviorResult::Error
}

#[derive(Clone, Copy, Default, Debug)]
pub struct RootNode;

impl BehaviorNode for RootNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Root
    }

    fn type_name(&self) -> &'static str {
        "Root"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        tick_child(node, ctx)
    }
}

/// Runs children in order until one does not fail.
#[derive(Clone, Copy, Default, Debug)]
pub struct SelectorNode;

impl BehaviorNode for SelectorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "Selector"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        for child in node.children() {
            match ctx.tick(child) {
                BehaviorResult::Fail => (),
                res => return res,
            }
        }
        BehaviorResult::Fail
    }
}

/// Runs children in order until one does not succeed.
#[derive(Clone, Copy, Default, Debug)]
pub struct SequenceNode;

impl BehaviorNode for SequenceNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "Sequence"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        for child in node.children() {
            match ctx.tick(child) {
                BehaviorResult::Success => (),
                res => return res,
            }
        }
        BehaviorResult::Success
    }
}

fn mem_update(
    node: &Node,
    ctx: &mut Context,
    keep_going: BehaviorResult,
    exhausted: BehaviorResult,
) -> BehaviorResult {
    let from = param_usize(ctx, node.hash(), RUNNING_CHILD, None).unwrap_or(0);
    for (i, child) in node.children().iter().enumerate().skip(from) {
        match ctx.tick(child) {
            res if res == keep_going => (),
            BehaviorResult::Running => {
                ctx.record_mut(node.hash()).set(RUNNING_CHILD, i);
                return BehaviorResult::Running;
            }
            res => return res,
        }
    }
    exhausted
}

fn mem_reset(node: &Node, ctx: &mut Context) {
    ctx.record_mut(node.hash()).set(RUNNING_CHILD, 0);
}

/// A selector that resumes from the child that was running in the previous tick.
#[derive(Clone, Copy, Default, Debug)]
pub struct MemSelectorNode;

impl BehaviorNode for MemSelectorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "MemSelector"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        mem_update(node, ctx, BehaviorResult::Fail, BehaviorResult::Fail)
    }

    fn open(&self, node: &Node, ctx: &mut Context) {
        mem_reset(node, ctx)
    }

    fn close(&self, node: &Node, ctx: &mut Context) {
        mem_reset(node, ctx)
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(RUNNING_CHILD, 0, override_defaults);
    }
}

/// A sequence that resumes from the child that was running in the previous tick.
#[derive(Clone, Copy, Default, Debug)]
pub struct MemSequenceNode;

impl BehaviorNode for MemSequenceNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "MemSequence"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        mem_update(node, ctx, BehaviorResult::Success, BehaviorResult::Success)
    }

    fn open(&self, node: &Node, ctx: &mut Context) {
        mem_reset(node, ctx)
    }

    fn close(&self, node: &Node, ctx: &mut Context) {
        mem_reset(node, ctx)
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(RUNNING_CHILD, 0, override_defaults);
    }
}

/// Removes and returns a random entry of the node's availability list, weighted by each
/// child's `weight`. Zero-weight children are only drawn once no positive weight is left.
fn pick_weighted(node: &Node, ctx: &mut Context) -> Option<usize> {
    let children = node.children();
    let mut avail: Vec<usize> = ctx
        .record(node.hash())
        .and_then(|r| r.get(AVAIL))
        .and_then(Value::as_list)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_i64)
                .filter_map(|i| usize::try_from(i).ok())
                .filter(|i| *i < children.len())
                .collect()
        })
        .unwrap_or_default();
    if avail.is_empty() {
        return None;
    }
    let weights: Vec<f64> = avail
        .iter()
        .map(|i| {
            ctx.record(&children[*i])
                .and_then(|r| r.get_f64(WEIGHT))
                .unwrap_or(1.)
                .max(0.)
        })
        .collect();
    let total: f64 = weights.iter().sum();
    let pos = if total > 0. {
        let mut x = ctx.rng().gen_range(0.0..total);
        let mut chosen = None;
        for (pos, weight) in weights.iter().enumerate() {
            if *weight <= 0. {
                continue;
            }
            if x < *weight {
                chosen = Some(pos);
                break;
            }
            x -= weight;
        }
        chosen
            .or_else(|| weights.iter().rposition(|w| *w > 0.))
            .unwrap_or(0)
    } else {
        ctx.rng().gen_range(0..avail.len())
    };
    let picked = avail.remove(pos);
    ctx.record_mut(node.hash()).set(AVAIL, avail);
    Some(picked)
}

fn prob_update(
    node: &Node,
    ctx: &mut Context,
    keep_going: BehaviorResult,
    exhausted: BehaviorResult,
) -> BehaviorResult {
    let children = node.children();
    let mut resume = param_usize(ctx, node.hash(), RUNNING_CHILD, None).filter(|i| *i < children.len());
    ctx.record_mut(node.hash()).set(RUNNING_CHILD, Value::Null);
    loop {
        let Some(i) = resume.take().or_else(|| pick_weighted(node, ctx)) else {
            return exhausted;
        };
        match ctx.tick(&children[i]) {
            res if res == keep_going => (),
            BehaviorResult::Running => {
                ctx.record_mut(node.hash()).set(RUNNING_CHILD, i);
                return BehaviorResult::Running;
            }
            res => return res,
        }
    }
}

fn prob_reset(node: &Node, ctx: &mut Context) {
    let all: Vec<usize> = (0..node.children().len()).collect();
    let record = ctx.record_mut(node.hash());
    record.set(AVAIL, all);
    record.set(RUNNING_CHILD, Value::Null);
}

/// A selector visiting its children in weighted random order.
#[derive(Clone, Copy, Default, Debug)]
pub struct ProbSelectorNode;

impl BehaviorNode for ProbSelectorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "ProbSelector"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        prob_update(node, ctx, BehaviorResult::Fail, BehaviorResult::Fail)
    }

    fn open(&self, node: &Node, ctx: &mut Context) {
        prob_reset(node, ctx)
    }

    fn close(&self, node: &Node, ctx: &mut Context) {
        prob_reset(node, ctx)
    }
}

/// A sequence visiting its children in weighted random order.
#[derive(Clone, Copy, Default, Debug)]
pub struct ProbSequenceNode;

impl BehaviorNode for ProbSequenceNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "ProbSequence"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        prob_update(node, ctx, BehaviorResult::Success, BehaviorResult::Success)
    }

    fn open(&self, node: &Node, ctx: &mut Context) {
        prob_reset(node, ctx)
    }

    fn close(&self, node: &Node, ctx: &mut Context) {
        prob_reset(node, ctx)
    }
}

/// Ticks all children and decides from their results according to its policy.
///
/// Children that finished earlier in the same running iteration are not ticked again.
/// An error from any child is returned immediately. Otherwise the primary child's result
/// decides if it finished, then the success and failure thresholds, then whether any child
/// is still running, and finally `default_success`.
///
/// The policy is copied into the node's record at setup and read from there, so it can be
/// changed per agent.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ParallelNode {
    pub primary_child: Option<usize>,
    pub req_successes: Option<usize>,
    pub req_failures: Option<usize>,
    pub default_success: bool,
}

impl Default for ParallelNode {
    fn default() -> Self {
        Self {
            primary_child: None,
            req_successes: None,
            req_failures: None,
            default_success: true,
        }
    }
}

impl ParallelNode {
    fn states(node: &Node, ctx: &Context) -> Vec<Option<BehaviorResult>> {
        let mut states: Vec<_> = ctx
            .record(node.hash())
            .and_then(|r| r.get(STATES))
            .and_then(Value::as_list)
            .map(|list| {
                list.iter()
                    .map(|v| v.as_str().and_then(BehaviorResult::from_str))
                    .collect()
            })
            .unwrap_or_default();
        states.resize(node.children().len(), None);
        states
    }

    fn store_states(node: &Node, ctx: &mut Context, states: &[Option<BehaviorResult>]) {
        let list: Vec<Value> = states
            .iter()
            .map(|s| s.map_or(Value::Null, |s| Value::from(s.as_str())))
            .collect();
        ctx.record_mut(node.hash()).set(STATES, list);
    }
}

impl BehaviorNode for ParallelNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn type_name(&self) -> &'static str {
        "Parallel"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        use BehaviorResult::*;
        let mut states = Self::states(node, ctx);
        for (i, child) in node.children().iter().enumerate() {
            if matches!(states[i], Some(Success | Fail)) {
                continue;
            }
            let res = ctx.tick(child);
            states[i] = Some(res);
            if res == Error {
                Self::store_states(node, ctx, &states);
                return Error;
            }
        }
        Self::store_states(node, ctx, &states);

        let hash = node.hash();
        let primary_child = param_usize(ctx, hash, PRIMARY_CHILD, self.primary_child);
        if let Some(Some(res @ (Success | Fail))) = primary_child.and_then(|i| states.get(i)) {
            return *res;
        }
        let count = |target| states.iter().filter(|s| **s == Some(target)).count();
        let req_successes = param_usize(ctx, hash, REQ_SUCCESSES, self.req_successes);
        if req_successes.map_or(false, |req| count(Success) >= req) {
            return Success;
        }
        let req_failures = param_usize(ctx, hash, REQ_FAILURES, self.req_failures);
        if req_failures.map_or(false, |req| count(Fail) >= req) {
            return Fail;
        }
        if count(Running) > 0 {
            return Running;
        }
        let default_success = ctx
            .record(hash)
            .and_then(|r| r.get_bool(DEFAULT_SUCCESS))
            .unwrap_or(self.default_success);
        if default_success {
            Success
        } else {
            Fail
        }
    }

    fn open(&self, node: &Node, ctx: &mut Context) {
        Self::store_states(node, ctx, &vec![None; node.children().len()]);
    }

    fn close(&self, node: &Node, ctx: &mut Context) {
        ctx.record_mut(node.hash()).remove(STATES);
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(PRIMARY_CHILD, self.primary_child, override_defaults);
        record.seed(REQ_SUCCESSES, self.req_successes, override_defaults);
        record.seed(REQ_FAILURES, self.req_failures, override_defaults);
        record.seed(DEFAULT_SUCCESS, self.default_success, override_defaults);
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct InverterNode;

impl BehaviorNode for InverterNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Inverter"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        match tick_child(node, ctx) {
            BehaviorResult::Success => BehaviorResult::Fail,
            BehaviorResult::Fail => BehaviorResult::Success,
            res => res,
        }
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct SucceederNode;

impl BehaviorNode for SucceederNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Succeeder"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        match tick_child(node, ctx) {
            BehaviorResult::Fail => BehaviorResult::Success,
            res => res,
        }
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct FailerNode;

impl BehaviorNode for FailerNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Failer"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        match tick_child(node, ctx) {
            BehaviorResult::Success => BehaviorResult::Fail,
            res => res,
        }
    }
}

/// Lets its child run only while the condition holds.
#[derive(Clone)]
pub struct VerifierNode {
    condition: ConditionFn,
}

impl VerifierNode {
    pub fn new(condition: impl Fn(&mut Context, &Node) -> Result<bool, String> + 'static) -> Self {
        Self {
            condition: Rc::new(condition),
        }
    }
}

impl BehaviorNode for VerifierNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Verifier"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        match (self.condition)(ctx, node) {
            Ok(true) => tick_child(node, ctx),
            Ok(false) => BehaviorResult::Fail,
            Err(e) => report_error(ctx, node, e),
        }
    }
}

/// Ticks its child `repeats` times within one tick and returns the last result. Stops early
/// on `Running` or `Error`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RepeaterNode {
    pub repeats: usize,
}

impl Default for RepeaterNode {
    fn default() -> Self {
        Self { repeats: 1 }
    }
}

impl BehaviorNode for RepeaterNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Repeater"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        if node.child().is_none() {
            return BehaviorResult::Fail;
        }
        let repeats = param_usize(ctx, node.hash(), REPEATS, Some(self.repeats)).unwrap_or(0);
        let mut res = BehaviorResult::Success;
        for _ in 0..repeats {
            res = tick_child(node, ctx);
            if matches!(res, BehaviorResult::Running | BehaviorResult::Error) {
                break;
            }
        }
        res
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(REPEATS, self.repeats, override_defaults);
    }
}

/// Lets its child be dispatched at most `repeats` times, then fails. The counter lives in
/// the node's record and can be reset by the host.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LimiterNode {
    pub repeats: usize,
}

impl Default for LimiterNode {
    fn default() -> Self {
        Self { repeats: 1 }
    }
}

impl BehaviorNode for LimiterNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Limiter"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        let hash = node.hash();
        let continuing = ctx.record(hash).map_or(false, |r| r.running);
        if !continuing {
            let repeats = param_usize(ctx, hash, REPEATS, Some(self.repeats)).unwrap_or(0);
            let count = param_usize(ctx, hash, COUNT, None).unwrap_or(0);
            if count >= repeats {
                return BehaviorResult::Fail;
            }
            ctx.record_mut(hash).set(COUNT, count + 1);
        }
        tick_child(node, ctx)
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(REPEATS, self.repeats, override_defaults);
        record.seed(COUNT, 0, override_defaults);
    }
}

/// Waits while any of its resources is marked taken in the blackboard globals, then runs
/// its child. Taking and releasing resources is up to the host and other nodes.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AllocatorNode {
    pub resources: Vec<String>,
}

impl BehaviorNode for AllocatorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "Allocator"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        let resources: Vec<String> = match ctx.record(node.hash()).and_then(|r| r.get(RESOURCES)) {
            Some(Value::List(list)) => list.iter().map(|v| v.to_string()).collect(),
            _ => self.resources.clone(),
        };
        let blackboard = ctx.blackboard();
        if resources.iter().any(|key| blackboard.is_resource_taken(key)) {
            return BehaviorResult::Running;
        }
        tick_child(node, ctx)
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(RESOURCES, self.resources.clone(), override_defaults);
    }
}

fn send_msg(node: &Node, ctx: &mut Context, fallback: &str) -> bool {
    let msg = ctx
        .record(node.hash())
        .and_then(|r| r.get_str(MSG))
        .unwrap_or(fallback)
        .to_owned();
    if msg.is_empty() {
        return false;
    }
    ctx.agent_mut().msg(&msg);
    true
}

/// Sends its message to the agent, then runs its child. Fails without a message.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EchoDecoratorNode {
    pub msg: String,
}

impl BehaviorNode for EchoDecoratorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn type_name(&self) -> &'static str {
        "EchoDecorator"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        if !send_msg(node, ctx, &self.msg) {
            return BehaviorResult::Fail;
        }
        tick_child(node, ctx)
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(MSG, self.msg.as_str(), override_defaults);
    }
}

/// Sends its message to the agent and succeeds. Fails without a message.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EchoLeafNode {
    pub msg: String,
}

impl BehaviorNode for EchoLeafNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn type_name(&self) -> &'static str {
        "EchoLeaf"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        if send_msg(node, ctx, &self.msg) {
            BehaviorResult::Success
        } else {
            BehaviorResult::Fail
        }
    }

    fn on_blackboard_setup(&self, _node: &Node, record: &mut NodeRecord, override_defaults: bool) {
        record.seed(MSG, self.msg.as_str(), override_defaults);
    }
}

#[derive(Clone)]
pub struct ConditionNode {
    condition: ConditionFn,
}

impl ConditionNode {
    pub fn new(condition: impl Fn(&mut Context, &Node) -> Result<bool, String> + 'static) -> Self {
        Self {
            condition: Rc::new(condition),
        }
    }
}

impl BehaviorNode for ConditionNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn type_name(&self) -> &'static str {
        "Condition"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        match (self.condition)(ctx, node) {
            Ok(true) => BehaviorResult::Success,
            Ok(false) => BehaviorResult::Fail,
            Err(e) => report_error(ctx, node, e),
        }
    }
}

/// Runs a host action against the agent.
#[derive(Clone)]
pub struct CommandNode {
    command: CommandFn,
}

impl CommandNode {
    pub fn new(command: impl Fn(&mut Context, &Node) -> BehaviorResult + 'static) -> Self {
        Self {
            command: Rc::new(command),
        }
    }
}

impl BehaviorNode for CommandNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn type_name(&self) -> &'static str {
        "Command"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        (self.command)(ctx, node)
    }
}

/// Ticks the root of another tree for this tick only, against the same agent and
/// blackboard.
#[derive(Clone, Debug)]
pub struct TransitionNode {
    target: TreeRef,
}

impl TransitionNode {
    pub fn new(target: impl Into<TreeRef>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &TreeRef {
        &self.target
    }
}

impl BehaviorNode for TransitionNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn type_name(&self) -> &'static str {
        "Transition"
    }

    fn update(&self, node: &Node, ctx: &mut Context) -> BehaviorResult {
        if ctx.depth() >= MAX_TRANSITION_DEPTH {
            return report_error(
                ctx,
                node,
                format!("transitions nested deeper than {}", MAX_TRANSITION_DEPTH),
            );
        }
        let library = ctx.library();
        let Some(shared) = self.target.resolve(library) else {
            return report_error(ctx, node, format!("cannot resolve tree {:?}", self.target));
        };
        let Ok(tree) = shared.try_borrow() else {
            return report_error(ctx, node, format!("tree {:?} is being edited", self.target));
        };
        ctx.blackboard_mut().setup(&tree, library, false);
        let res = ctx.nested(&tree).tick(tree.root());
        res
    }

    fn transition_target(&self) -> Option<&TreeRef> {
        Some(&self.target)
    }
}
