use crate::{
    nodes::{
        AllocatorNode, EchoDecoratorNode, EchoLeafNode, FailerNode, InverterNode, LimiterNode,
        MemSelectorNode, MemSequenceNode, ParallelNode, ProbSelectorNode, ProbSequenceNode,
        RepeaterNode, SelectorNode, SequenceNode, SucceederNode, TransitionNode,
    },
    BehaviorNode,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;

/// Builds a node from its definition. The definition is the node's whole yaml mapping, so
/// parameters sit next to `type` and `children`.
pub type Constructor = Box<dyn Fn(&serde_yaml::Value) -> Result<Box<dyn BehaviorNode>, String>>;

/// A constructor that ignores the node's parameters.
pub fn boxify<T>(cons: impl (Fn() -> T) + 'static) -> Constructor
where
    T: BehaviorNode + 'static,
{
    Box::new(move |_| Ok(Box::new(cons())))
}

/// A constructor that deserializes the node itself from its parameters.
pub fn with_params<T>() -> Constructor
where
    T: BehaviorNode + DeserializeOwned + 'static,
{
    Box::new(|value| {
        let node: T = serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
        Ok(Box::new(node))
    })
}

#[derive(Deserialize)]
struct TransitionParams {
    target: String,
}

pub struct Registry {
    node_types: HashMap<String, Constructor>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut ret = Self {
            node_types: HashMap::new(),
        };
        ret.register("Selector", boxify(|| SelectorNode));
        ret.register("Sequence", boxify(|| SequenceNode));
        ret.register("MemSelector", boxify(|| MemSelectorNode));
        ret.register("MemSequence", boxify(|| MemSequenceNode));
        ret.register("ProbSelector", boxify(|| ProbSelectorNode));
        ret.register("ProbSequence", boxify(|| ProbSequenceNode));
        ret.register("Parallel", with_params::<ParallelNode>());
        ret.register("Inverter", boxify(|| InverterNode));
        ret.register("Succeeder", boxify(|| SucceederNode));
        ret.register("Failer", boxify(|| FailerNode));
        ret.register("Repeater", with_params::<RepeaterNode>());
        ret.register("Limiter", with_params::<LimiterNode>());
        ret.register("Allocator", with_params::<AllocatorNode>());
        ret.register("EchoDecorator", with_params::<EchoDecoratorNode>());
        ret.register("EchoLeaf", with_params::<EchoLeafNode>());
        ret.register(
            "Transition",
            Box::new(|value| {
                let params: TransitionParams =
                    serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;
                Ok(Box::new(TransitionNode::new(params.target)))
            }),
        );
        ret
    }
}

impl Registry {
    /// A registry without any node types.
    pub fn empty() -> Self {
        Self {
            node_types: HashMap::new(),
        }
    }

    pub fn register(&mut self, type_name: impl ToString, constructor: Constructor) {
        self.node_types.insert(type_name.to_string(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.node_types.contains_key(type_name)
    }

    /// Returns `None` if the type is not registered, `Some(Err)` if its parameters were
    /// rejected.
    pub fn build(
        &self,
        type_name: &str,
        value: &serde_yaml::Value,
    ) -> Option<Result<Box<dyn BehaviorNode>, String>> {
        self.node_types
            .get(type_name)
            .map(|constructor| constructor(value))
    }
}
