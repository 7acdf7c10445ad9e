use super::*;
use crate::{shared_tree, Agent, AiHandler, NullAgent, Tree, TreeLibrary};
use rand::{rngs::StdRng, SeedableRng};
use std::{any::Any, cell::Cell, cell::RefCell};

type Log = Rc<RefCell<Vec<&'static str>>>;

/// A leaf that logs its name and returns a fixed result.
fn logged(log: &Log, name: &'static str, res: BehaviorResult) -> CommandNode {
    let log = log.clone();
    CommandNode::new(move |_, _| {
        log.borrow_mut().push(name);
        res
    })
}

/// A leaf that returns `Running` once, then `Success`, then `Running` again and so on.
fn run_toggle(log: &Log, name: &'static str) -> CommandNode {
    let log = log.clone();
    let running = Rc::new(Cell::new(false));
    CommandNode::new(move |_, _| {
        log.borrow_mut().push(name);
        running.set(!running.get());
        if running.get() {
            BehaviorResult::Running
        } else {
            BehaviorResult::Success
        }
    })
}

fn handler(tree: Tree) -> AiHandler {
    let mut handler = AiHandler::default();
    assert_eq!(
        handler.setup(&NullAgent, Some(shared_tree(tree).into()), false),
        Ok(true)
    );
    handler
}

fn tick(handler: &mut AiHandler) -> BehaviorResult {
    handler.tick(&mut NullAgent).unwrap()
}

fn new_tree(top: impl BehaviorNode + 'static) -> (Tree, NodeHash) {
    let mut tree = Tree::new("test");
    let root = tree.root().clone();
    let top = tree.create("top", top, &root, None).unwrap();
    (tree, top)
}

#[test]
fn test_root_without_child() {
    let mut handler = handler(Tree::new("empty"));
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
}

#[test]
fn test_selector_short_circuit() {
    let log = Log::default();
    let (mut tree, top) = new_tree(SelectorNode);
    tree.create("a", logged(&log, "a", BehaviorResult::Fail), &top, None).unwrap();
    tree.create("b", logged(&log, "b", BehaviorResult::Success), &top, None).unwrap();
    tree.create("c", logged(&log, "c", BehaviorResult::Fail), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn test_sequence_short_circuit() {
    let log = Log::default();
    let (mut tree, top) = new_tree(SequenceNode);
    tree.create("a", logged(&log, "a", BehaviorResult::Success), &top, None).unwrap();
    tree.create("b", logged(&log, "b", BehaviorResult::Fail), &top, None).unwrap();
    tree.create("c", logged(&log, "c", BehaviorResult::Success), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn test_error_propagates() {
    let log = Log::default();
    let (mut tree, top) = new_tree(SelectorNode);
    let inverter = tree.create("inverter", InverterNode, &top, None).unwrap();
    tree.create("err", logged(&log, "err", BehaviorResult::Error), &inverter, None).unwrap();
    tree.create("after", logged(&log, "after", BehaviorResult::Success), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Error);
    assert_eq!(*log.borrow(), vec!["err"]);
}

#[test]
fn test_mem_selector_resume() {
    let log = Log::default();
    let (mut tree, top) = new_tree(MemSelectorNode);
    tree.create("adder", logged(&log, "adder", BehaviorResult::Fail), &top, None).unwrap();
    tree.create("toggle", run_toggle(&log, "toggle"), &top, None).unwrap();
    let mut handler = handler(tree);

    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(*log.borrow(), vec!["adder", "toggle"]);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["adder", "toggle", "toggle"]);

    // A fresh iteration starts from the first child again
    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(*log.borrow(), vec!["adder", "toggle", "toggle", "adder", "toggle"]);
}

#[test]
fn test_mem_sequence_resume() {
    let log = Log::default();
    let (mut tree, top) = new_tree(MemSequenceNode);
    tree.create("first", logged(&log, "first", BehaviorResult::Success), &top, None).unwrap();
    tree.create("toggle", run_toggle(&log, "toggle"), &top, None).unwrap();
    tree.create("last", logged(&log, "last", BehaviorResult::Success), &top, None).unwrap();
    let mut handler = handler(tree);

    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["first", "toggle", "toggle", "last"]);
}

#[test]
fn test_plain_sequence_restarts() {
    let log = Log::default();
    let (mut tree, top) = new_tree(SequenceNode);
    tree.create("first", logged(&log, "first", BehaviorResult::Success), &top, None).unwrap();
    tree.create("toggle", run_toggle(&log, "toggle"), &top, None).unwrap();
    let mut handler = handler(tree);

    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["first", "toggle", "first", "toggle"]);
}

#[test]
fn test_prob_selector_weights() {
    let log = Log::default();
    let (mut tree, top) = new_tree(ProbSelectorNode);
    for (name, weight) in [("a", 0.), ("b", 1.), ("c", 0.)] {
        let hash = tree.create(name, logged(&log, name, BehaviorResult::Success), &top, None).unwrap();
        tree.set_default(&hash, "weight", weight).unwrap();
    }
    let mut handler = handler(tree);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        assert_eq!(
            handler.tick_with_rng(&mut NullAgent, &mut rng),
            Some(BehaviorResult::Success)
        );
    }
    assert!(log.borrow().iter().all(|name| *name == "b"));
}

#[test]
fn test_prob_selector_zero_weights_last() {
    let log = Log::default();
    let (mut tree, top) = new_tree(ProbSelectorNode);
    for (name, weight) in [("a", 0.), ("b", 1.), ("c", 2.)] {
        let hash = tree.create(name, logged(&log, name, BehaviorResult::Fail), &top, None).unwrap();
        tree.set_default(&hash, "weight", weight).unwrap();
    }
    let mut handler = handler(tree);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        log.borrow_mut().clear();
        assert_eq!(
            handler.tick_with_rng(&mut NullAgent, &mut rng),
            Some(BehaviorResult::Fail)
        );
        let order = log.borrow().clone();
        assert_eq!(order.len(), 3);
        assert_eq!(order[2], "a");
    }
}

#[test]
fn test_prob_sequence_permutation() {
    let log = Log::default();
    let (mut tree, top) = new_tree(ProbSequenceNode);
    for name in ["a", "b", "c"] {
        tree.create(name, logged(&log, name, BehaviorResult::Success), &top, None).unwrap();
    }
    let mut handler = handler(tree);
    for _ in 0..10 {
        log.borrow_mut().clear();
        assert_eq!(tick(&mut handler), BehaviorResult::Success);
        let mut order = log.borrow().clone();
        order.sort();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}

#[test]
fn test_prob_sequence_resume() {
    let log = Log::default();
    let (mut tree, top) = new_tree(ProbSequenceNode);
    for name in ["a", "b", "c"] {
        tree.create(name, run_toggle(&log, name), &top, None).unwrap();
    }
    let mut handler = handler(tree);
    let mut results = vec![];
    for _ in 0..4 {
        results.push(tick(&mut handler));
    }
    assert_eq!(
        results,
        vec![
            BehaviorResult::Running,
            BehaviorResult::Running,
            BehaviorResult::Running,
            BehaviorResult::Success
        ]
    );
    let log = log.borrow();
    // Each child runs, then finishes on the next tick before the next child starts
    assert_eq!(log.len(), 6);
    for pair in log.chunks(2) {
        assert_eq!(pair[0], pair[1]);
    }
    let mut visited = vec![log[0], log[2], log[4]];
    visited.sort();
    assert_eq!(visited, vec!["a", "b", "c"]);
}

fn parallel_tree(parallel: ParallelNode, results: &[BehaviorResult], log: &Log) -> AiHandler {
    let (mut tree, top) = new_tree(parallel);
    for (res, name) in results.iter().zip(["a", "b", "c", "d"]) {
        tree.create(name, logged(log, name, *res), &top, None).unwrap();
    }
    handler(tree)
}

#[test]
fn test_parallel_thresholds() {
    use BehaviorResult::*;
    let log = Log::default();
    let parallel = ParallelNode {
        req_successes: Some(2),
        ..ParallelNode::default()
    };
    let mut handler = parallel_tree(parallel, &[Success, Success, Fail], &log);
    assert_eq!(tick(&mut handler), Success);
    // No short circuit
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);

    let parallel = ParallelNode {
        req_successes: Some(2),
        primary_child: Some(2),
        ..ParallelNode::default()
    };
    let mut handler = parallel_tree(parallel, &[Success, Success, Fail], &Log::default());
    assert_eq!(tick(&mut handler), Fail);

    let parallel = ParallelNode {
        req_failures: Some(2),
        ..ParallelNode::default()
    };
    let mut handler = parallel_tree(parallel, &[Fail, Success, Fail], &Log::default());
    assert_eq!(tick(&mut handler), Fail);

    let parallel = ParallelNode {
        req_successes: Some(3),
        ..ParallelNode::default()
    };
    let mut handler = parallel_tree(parallel, &[Success, Running, Success], &Log::default());
    assert_eq!(tick(&mut handler), Running);

    let parallel = ParallelNode {
        default_success: false,
        ..ParallelNode::default()
    };
    let mut handler = parallel_tree(parallel, &[Success, Success], &Log::default());
    assert_eq!(tick(&mut handler), Fail);
}

#[test]
fn test_parallel_error() {
    use BehaviorResult::*;
    let log = Log::default();
    let parallel = ParallelNode {
        req_successes: Some(1),
        ..ParallelNode::default()
    };
    let mut handler = parallel_tree(parallel, &[Fail, Error, Success], &log);
    assert_eq!(tick(&mut handler), Error);
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn test_parallel_keeps_finished_children() {
    let log = Log::default();
    let (mut tree, top) = new_tree(ParallelNode::default());
    tree.create("done", logged(&log, "done", BehaviorResult::Success), &top, None).unwrap();
    tree.create("toggle", run_toggle(&log, "toggle"), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["done", "toggle", "toggle"]);
}

#[test]
fn test_parallel_policy_from_blackboard() {
    use BehaviorResult::*;
    let (mut tree, top) = new_tree(ParallelNode::default());
    for res in [Success, Fail, Fail] {
        tree.create("leaf", CommandNode::new(move |_, _| res), &top, None).unwrap();
    }
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), Success);
    handler
        .blackboard_mut()
        .unwrap()
        .record_mut(&top)
        .set("req_failures", 2);
    assert_eq!(tick(&mut handler), Fail);
}

#[test]
fn test_decorators() {
    use BehaviorResult::*;
    let cases: Vec<(Box<dyn BehaviorNode>, BehaviorResult, BehaviorResult)> = vec![
        (Box::new(InverterNode), Success, Fail),
        (Box::new(InverterNode), Fail, Success),
        (Box::new(InverterNode), Running, Running),
        (Box::new(SucceederNode), Fail, Success),
        (Box::new(SucceederNode), Error, Error),
        (Box::new(FailerNode), Success, Fail),
        (Box::new(FailerNode), Running, Running),
    ];
    for (decorator, child, expected) in cases {
        let mut tree = Tree::new("test");
        let root = tree.root().clone();
        let hash = tree.create_boxed("decorator", decorator, &root, None).unwrap();
        tree.create("child", CommandNode::new(move |_, _| child), &hash, None).unwrap();
        assert_eq!(tick(&mut handler(tree)), expected);
    }
}

#[test]
fn test_decorator_without_child() {
    let (tree, _) = new_tree(InverterNode);
    assert_eq!(tick(&mut handler(tree)), BehaviorResult::Fail);
}

#[test]
fn test_verifier() {
    let log = Log::default();
    let allow = Rc::new(Cell::new(false));
    let allow2 = allow.clone();
    let (mut tree, top) = new_tree(VerifierNode::new(move |_, _| Ok(allow2.get())));
    tree.create("child", logged(&log, "child", BehaviorResult::Success), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
    assert!(log.borrow().is_empty());
    allow.set(true);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["child"]);
}

#[test]
fn test_condition_error_recorded() {
    let (tree, top) = new_tree(ConditionNode::new(|_, _| Err("no target".to_owned())));
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Error);
    let blackboard = handler.blackboard().unwrap();
    assert_eq!(blackboard.error(&top), Some("no target"));
}

#[test]
fn test_repeater() {
    let log = Log::default();
    let (mut tree, top) = new_tree(RepeaterNode { repeats: 3 });
    tree.create("child", logged(&log, "child", BehaviorResult::Fail), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
    assert_eq!(log.borrow().len(), 3);

    let log = Log::default();
    let (mut tree, top) = new_tree(RepeaterNode { repeats: 3 });
    tree.create("child", logged(&log, "child", BehaviorResult::Running), &top, None).unwrap();
    let mut handler = self::handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_limiter() {
    let log = Log::default();
    let (mut tree, top) = new_tree(LimiterNode { repeats: 2 });
    tree.create("child", logged(&log, "child", BehaviorResult::Success), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
    assert_eq!(log.borrow().len(), 2);

    // Resetting the counter from outside lets the child run again
    handler.blackboard_mut().unwrap().record_mut(&top).set("count", 0);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn test_limiter_running_child_counts_once() {
    let log = Log::default();
    let (mut tree, top) = new_tree(LimiterNode { repeats: 1 });
    tree.create("toggle", run_toggle(&log, "toggle"), &top, None).unwrap();
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
}

#[test]
fn test_allocator() {
    let log = Log::default();
    let (mut tree, top) = new_tree(AllocatorNode {
        resources: vec!["door".to_owned(), "key".to_owned()],
    });
    tree.create("child", logged(&log, "child", BehaviorResult::Success), &top, None).unwrap();
    let mut handler = handler(tree);
    handler.blackboard_mut().unwrap().take_resource("key");
    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert!(log.borrow().is_empty());
    handler.blackboard_mut().unwrap().release_resource("key");
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(*log.borrow(), vec!["child"]);
}

#[derive(Default)]
struct Listener {
    msgs: Vec<String>,
}

impl Agent for Listener {
    fn key(&self) -> &str {
        "listener"
    }

    fn msg(&mut self, text: &str) {
        self.msgs.push(text.to_owned());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn test_echo() {
    let (mut tree, top) = new_tree(EchoDecoratorNode {
        msg: "You hear a noise.".to_owned(),
    });
    tree.create("leaf", EchoLeafNode { msg: "Who goes there?".to_owned() }, &top, None)
        .unwrap();
    let mut handler = handler(tree);
    let mut agent = Listener::default();
    assert_eq!(handler.tick(&mut agent), Some(BehaviorResult::Success));
    assert_eq!(agent.msgs, vec!["You hear a noise.", "Who goes there?"]);

    handler.blackboard_mut().unwrap().record_mut(&top).set("msg", "");
    assert_eq!(handler.tick(&mut agent), Some(BehaviorResult::Fail));
    assert_eq!(agent.msgs.len(), 2);
}

#[test]
fn test_agent_downcast() {
    let (tree, _) = new_tree(CommandNode::new(|ctx, node| {
        let name = node.name().to_owned();
        match ctx.agent_as::<Listener>() {
            Some(listener) => {
                listener.msgs.push(name);
                BehaviorResult::Success
            }
            None => BehaviorResult::Error,
        }
    }));
    let mut handler = handler(tree);
    let mut agent = Listener::default();
    assert_eq!(handler.tick(&mut agent), Some(BehaviorResult::Success));
    assert_eq!(agent.msgs, vec!["top"]);
    assert_eq!(handler.tick(&mut NullAgent), Some(BehaviorResult::Error));
}

#[test]
fn test_transition() {
    let library = TreeLibrary::default();
    let log = Log::default();
    let mut flee = Tree::new("flee");
    let root = flee.root().clone();
    let limiter = flee.create("once", LimiterNode { repeats: 1 }, &root, None).unwrap();
    flee.create("run", logged(&log, "run", BehaviorResult::Success), &limiter, None)
        .unwrap();
    library.insert(flee);

    let (tree, _) = new_tree(TransitionNode::new("flee"));
    let mut handler = AiHandler::new(library.clone());
    assert_eq!(
        handler.setup(&NullAgent, Some(shared_tree(tree).into()), false),
        Ok(true)
    );
    // Setup follows the transition into the target tree
    assert_eq!(
        handler.blackboard().unwrap().record(&limiter).and_then(|r| r.get_i64("count")),
        Some(0)
    );
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
    assert_eq!(*log.borrow(), vec!["run"]);
}

#[test]
fn test_transition_errors() {
    let (tree, top) = new_tree(TransitionNode::new("nowhere"));
    let mut handler = handler(tree);
    assert_eq!(tick(&mut handler), BehaviorResult::Error);
    assert!(handler.blackboard().unwrap().error(&top).is_some());

    let library = TreeLibrary::default();
    let (mut tree, _) = new_tree(SequenceNode);
    tree.set_name("loop");
    let seq = tree.find("top").unwrap().hash().clone();
    tree.create("again", TransitionNode::new("loop"), &seq, None).unwrap();
    let shared = library.insert(tree);
    let mut handler = AiHandler::new(library);
    assert_eq!(handler.setup(&NullAgent, Some(shared.into()), false), Ok(true));
    assert_eq!(tick(&mut handler), BehaviorResult::Error);
}

#[test]
fn test_interrupted_node_is_closed() {
    let flag = Rc::new(Cell::new(false));
    let flag2 = flag.clone();
    let (mut tree, top) = new_tree(SelectorNode);
    tree.create("alarm", ConditionNode::new(move |_, _| Ok(flag2.get())), &top, None)
        .unwrap();
    let mem = tree.create("work", MemSequenceNode, &top, None).unwrap();
    tree.create("step", CommandNode::new(|_, _| BehaviorResult::Success), &mem, None)
        .unwrap();
    tree.create("wait", CommandNode::new(|_, _| BehaviorResult::Running), &mem, None)
        .unwrap();
    let mut handler = handler(tree);

    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    let blackboard = handler.blackboard().unwrap();
    assert!(blackboard.running_now().contains(&mem));
    assert_eq!(blackboard.record(&mem).and_then(|r| r.get_i64("running_child")), Some(1));

    flag.set(true);
    assert_eq!(tick(&mut handler), BehaviorResult::Success);
    let blackboard = handler.blackboard().unwrap();
    assert!(blackboard.running_pre().contains(&mem));
    assert!(blackboard.running_now().is_empty());
    let record = blackboard.record(&mem).unwrap();
    assert!(!record.running);
    assert_eq!(record.get_i64("running_child"), Some(0));
}

#[test]
fn test_setup_keeps_running_path() {
    let (mut tree, top) = new_tree(MemSequenceNode);
    tree.create("wait", CommandNode::new(|_, _| BehaviorResult::Running), &top, None)
        .unwrap();
    let shared = shared_tree(tree);
    let mut handler = AiHandler::default();
    handler.setup(&NullAgent, Some(shared.clone().into()), false).unwrap();
    assert_eq!(tick(&mut handler), BehaviorResult::Running);

    shared
        .borrow_mut()
        .create("later", SucceederNode, &top, None)
        .unwrap();
    handler.setup(&NullAgent, None, false).unwrap();
    let blackboard = handler.blackboard().unwrap();
    assert!(blackboard.running_now().contains(&top));
    assert!(blackboard.record(&top).unwrap().running);

    handler.setup(&NullAgent, None, true).unwrap();
    let blackboard = handler.blackboard().unwrap();
    assert!(blackboard.running_now().is_empty());
    assert!(!blackboard.record(&top).unwrap().running);
}

#[test]
fn test_setup_without_tree() {
    let mut handler = AiHandler::default();
    assert_eq!(handler.setup(&NullAgent, None, false), Ok(false));
    assert!(handler.blackboard().is_none());
    assert_eq!(handler.tick(&mut NullAgent), None);
}

/// A leaf that keeps running and counts how often it was closed.
#[derive(Clone)]
struct Sentry {
    closed: Rc<Cell<usize>>,
}

impl BehaviorNode for Sentry {
    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn type_name(&self) -> &'static str {
        "Sentry"
    }

    fn update(&self, _node: &Node, _ctx: &mut Context) -> BehaviorResult {
        BehaviorResult::Running
    }

    fn close(&self, _node: &Node, _ctx: &mut Context) {
        self.closed.set(self.closed.get() + 1);
    }
}

#[test]
fn test_interrupted_node_in_transition_target_is_closed() {
    let closed = Rc::new(Cell::new(0));
    let mut post = Tree::new("post");
    let root = post.root().clone();
    let sentry = post
        .create("sentry", Sentry { closed: closed.clone() }, &root, None)
        .unwrap();
    let post = shared_tree(post);

    let on_duty = Rc::new(Cell::new(true));
    let on_duty2 = on_duty.clone();
    let (mut tree, top) = new_tree(SequenceNode);
    tree.create("on duty", ConditionNode::new(move |_, _| Ok(on_duty2.get())), &top, None)
        .unwrap();
    tree.create("go", TransitionNode::new(post), &top, None).unwrap();
    // No library: the target is only reachable through the transition
    let mut handler = handler(tree);

    assert_eq!(tick(&mut handler), BehaviorResult::Running);
    assert!(handler.blackboard().unwrap().running_now().contains(&sentry));
    assert_eq!(closed.get(), 0);

    on_duty.set(false);
    assert_eq!(tick(&mut handler), BehaviorResult::Fail);
    assert_eq!(closed.get(), 1);
    assert!(!handler.blackboard().unwrap().record(&sentry).unwrap().running);
}

#[test]
fn test_setup_tells_apart_trees_with_same_name() {
    let mut limiters = vec![];
    let (mut tree, top) = new_tree(SequenceNode);
    for _ in 0..2 {
        let mut twin = Tree::new("twin");
        let root = twin.root().clone();
        limiters.push(
            twin.create("once", LimiterNode { repeats: 1 }, &root, None)
                .unwrap(),
        );
        tree.create("go", TransitionNode::new(shared_tree(twin)), &top, None)
            .unwrap();
    }
    let handler = handler(tree);
    let blackboard = handler.blackboard().unwrap();
    for limiter in &limiters {
        assert_eq!(
            blackboard.record(limiter).and_then(|r| r.get_i64("count")),
            Some(0)
        );
    }
}
