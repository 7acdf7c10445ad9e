
use crate::{error::LoadYamlError, NodeHash, Registry, Tree, Value};
use serde_yaml::Value as YamlValue;
use tracing::debug;

fn recurse_parse(
    value: &YamlValue,
    reg: &Registry,
    tree: &mut Tree,
    parent: &NodeHash,
) -> Result<(), LoadYamlError> {
    let Some(type_name) = value.get("type").and_then(|value| value.as_str()) else {
        return Err(LoadYamlError::MissingType(tree.name().to_owned()));
    };

    let behavior = reg
        .build(type_name, value)
        .ok_or_else(|| LoadYamlError::MissingNode(type_name.to_owned()))?
        .map_err(|reason| LoadYamlError::BadParam {
            node_type: type_name.to_owned(),
            reason,
        })?;

    let name = value
        .get("name")
        .and_then(|name| name.as_str())
        .unwrap_or(type_name);
    let hash = tree.create_boxed(name, behavior, parent, None)?;

    if let Some(YamlValue::Mapping(defaults)) = value.get("blackboard") {
        for (key, default) in defaults {
            if let Some(key) = key.as_str() {
                tree.set_default(&hash, key, Value::from(default))?;
            }
        }
    }

    if let Some(YamlValue::Sequence(children)) = value.get("children") {
        for child in children {
            recurse_parse(child, reg, tree, &hash)?;
        }
    }

    Ok(())
}

/// Builds every tree under the `behavior_tree` mapping. Each key is a tree name and its
/// value the node placed under that tree's root.
pub fn load_yaml(yaml: &str, reg: &Registry) -> Result<Vec<Tree>, LoadYamlError> {
    let yaml: YamlValue = serde_yaml::from_str(yaml)?;
    let Some(YamlValue::Mapping(roots)) = yaml.get("behavior_tree") else {
        return Err(LoadYamlError::Missing);
    };

    roots
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().ok_or(LoadYamlError::Missing)?;
            let mut tree = Tree::new(name);
            let root = tree.root().clone();
            recurse_parse(value, reg, &mut tree, &root)?;
            debug!("loaded tree {:?} with {} nodes", name, tree.len());
            Ok(tree)
        })
        .collect()
}
