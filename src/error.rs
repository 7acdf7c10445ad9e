use crate::tree::NodeHash;
use thiserror::Error;

/// Failure of a structural tree operation. The tree is left untouched whenever one of these
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TreeError {
    #[error("node '{0}' is not in this tree")]
    InvalidNode(NodeHash),
    #[error("node '{0}' is a root node; {1}")]
    RootNode(NodeHash, &'static str),
    #[error("node '{0}' could not be found in its purported source tree")]
    WrongTree(NodeHash),
    #[error("node '{node}' cannot be placed under '{destination}': {reason}")]
    InvalidDestination {
        node: NodeHash,
        destination: NodeHash,
        reason: &'static str,
    },
    #[error("node '{0}' is both the subject and the target of the operation")]
    SameNode(NodeHash),
    #[error("parent of node '{0}' is not a composite node, cannot shift it")]
    NotComposite(NodeHash),
    #[error("tree \"{tree}\" is inconsistent: {reason}")]
    Inconsistent { tree: String, reason: String },
}

pub type TreeResult<T = ()> = Result<T, TreeError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadYamlError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing \"behavior_tree\" mapping")]
    Missing,
    #[error("node type not found {0:?}")]
    MissingNode(String),
    #[error("node definition without a \"type\" in tree \"{0}\"")]
    MissingType(String),
    #[error("bad parameter for {node_type}: {reason}")]
    BadParam { node_type: String, reason: String },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Error returned by a macro callable. Outside `raise_errors` mode the call text is left
/// verbatim instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallError(pub String);

impl CallError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParsingError {
    #[error("unknown function '{name}' in {span:?} at {offset}")]
    UnknownFunction {
        name: String,
        span: String,
        offset: usize,
    },
    #[error("unclosed function call {span:?} at {offset}")]
    Unclosed { span: String, offset: usize },
    #[error("function '{name}' failed in {span:?}: {source}")]
    Callable {
        name: String,
        span: String,
        #[source]
        source: CallError,
    },
    #[error("call nesting deeper than {max} at {offset}")]
    TooDeep { max: usize, offset: usize },
}
