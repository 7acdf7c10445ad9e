use agent_behavior::{
    boxify,
    funcparser::{FuncParserConfig, Kwargs, ParseOptions},
    load_yaml, shared_tree, Agent, AiHandler, BehaviorResult, CommandNode, ConditionNode,
    FuncParser, MemSequenceNode, Registry, Tree, TreeLibrary, TreeRef,
};
use std::any::Any;

const GUARD: &str = r#"
behavior_tree:
  guard:
    type: Selector
    children:
    - type: Sequence
      name: spot enemy
      children:
      - type: EnemyInSight
      - type: Transition
        target: flee
    - type: EchoLeaf
      msg: "All quiet."
  flee:
    type: Sequence
    children:
    - type: EchoLeaf
      msg: "$clr(r, Run!)"
"#;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Expands every message it receives.
struct Guard {
    enemy: bool,
    msgs: Vec<String>,
    parser: FuncParser,
}

impl Guard {
    fn new() -> Self {
        Self {
            enemy: false,
            msgs: vec![],
            parser: FuncParser::with_defaults(),
        }
    }
}

impl Agent for Guard {
    fn key(&self) -> &str {
        "guard#1"
    }

    fn ai_tree(&self) -> Option<TreeRef> {
        Some("guard".into())
    }

    fn msg(&mut self, text: &str) {
        let text = self.parser.parse(text).unwrap_or_else(|_| text.to_owned());
        self.msgs.push(text);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn library() -> anyhow::Result<TreeLibrary> {
    let mut reg = Registry::default();
    reg.register(
        "EnemyInSight",
        boxify(|| {
            ConditionNode::new(|ctx, _| Ok(ctx.agent_as::<Guard>().map_or(false, |g| g.enemy)))
        }),
    );
    let library = TreeLibrary::default();
    for tree in load_yaml(GUARD, &reg)? {
        library.insert(tree);
    }
    Ok(library)
}

#[test]
fn test_yaml_guard() -> anyhow::Result<()> {
    init_logging();
    let library = library()?;
    assert_eq!(library.names(), ["flee", "guard"]);

    let mut agent = Guard::new();
    let mut handler = AiHandler::new(library.clone());
    assert!(handler.setup(&agent, None, false)?);

    // Setup follows the transition into the other tree
    let flee = library.get("flee").expect("flee tree");
    let echo = flee.borrow().find("EchoLeaf").expect("echo leaf").hash().clone();
    let blackboard = handler.blackboard().expect("blackboard");
    assert_eq!(
        blackboard.record(&echo).and_then(|r| r.get_str("msg")),
        Some("$clr(r, Run!)")
    );

    assert_eq!(handler.tick(&mut agent), Some(BehaviorResult::Success));
    assert_eq!(agent.msgs, ["All quiet."]);

    agent.enemy = true;
    assert_eq!(handler.tick(&mut agent), Some(BehaviorResult::Success));
    assert_eq!(agent.msgs, ["All quiet.", "|rRun!|n"]);
    Ok(())
}

#[test]
fn test_shared_tree() -> anyhow::Result<()> {
    init_logging();
    let mut tree = Tree::new("chores");
    let root = tree.root().clone();
    let seq = tree.create("chores", MemSequenceNode, &root, None)?;
    tree.create(
        "sweep",
        CommandNode::new(|ctx, node| {
            let record = ctx.record_mut(node.hash());
            let ticks = record.get_i64("ticks").unwrap_or(0) + 1;
            record.set("ticks", ticks);
            if ticks < 2 {
                BehaviorResult::Running
            } else {
                BehaviorResult::Success
            }
        }),
        &seq,
        None,
    )?;
    tree.create(
        "report",
        CommandNode::new(|ctx, _| {
            ctx.agent_mut().msg("Done sweeping.");
            BehaviorResult::Success
        }),
        &seq,
        None,
    )?;
    let tree: TreeRef = shared_tree(tree).into();

    let (mut a, mut b) = (Guard::new(), Guard::new());
    let mut handler_a = AiHandler::default();
    let mut handler_b = AiHandler::default();
    assert!(handler_a.setup(&a, Some(tree.clone()), false)?);
    assert!(handler_b.setup(&b, Some(tree), false)?);

    assert_eq!(handler_a.tick(&mut a), Some(BehaviorResult::Running));
    assert_eq!(handler_b.tick(&mut b), Some(BehaviorResult::Running));
    assert_eq!(handler_a.tick(&mut a), Some(BehaviorResult::Success));
    assert_eq!(a.msgs, ["Done sweeping."]);
    assert!(b.msgs.is_empty());

    assert_eq!(handler_b.tick(&mut b), Some(BehaviorResult::Success));
    assert_eq!(b.msgs, ["Done sweeping."]);
    Ok(())
}

#[test]
fn test_parser_config() -> anyhow::Result<()> {
    init_logging();
    let config: FuncParserConfig = serde_yaml::from_str("start_char: '@'")?;
    let parser = FuncParser::with_defaults()
        .with_config(config)
        .callable("name", |_, kwargs| {
            Ok(kwargs.get("who").cloned().unwrap_or_else(|| "someone".into()))
        });

    let kwargs: Kwargs = [("who", "Anna")].into_iter().collect();
    let text = "@name() says: @pad(hi, 6, r, .) (costs $5)";
    assert_eq!(
        parser.parse_with(text, ParseOptions::default(), &kwargs)?,
        "Anna says: ....hi (costs $5)"
    );
    assert_eq!(parser.parse(text)?, "someone says: ....hi (costs $5)");
    Ok(())
}
