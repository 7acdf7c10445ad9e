use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

/// Dynamically typed value stored in blackboard records and passed to macro callables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0. => Some(*f as i64),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness in the usual scripting sense: empty containers, zero and null are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.,
            Self::Str(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }

    /// Quoted form used when the value is nested inside a container.
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("'{}'", s.replace('\'', "\\'")),
            _ => self.to_string(),
        }
    }
}

fn fmt_float(f: f64, fmt: &mut Formatter) -> fmt::Result {
    if f.is_finite() && f.fract() == 0. && f.abs() < 1e16 {
        write!(fmt, "{:.1}", f)
    } else {
        write!(fmt, "{}", f)
    }
}

impl Display for Value {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(fmt, "None"),
            Self::Bool(true) => write!(fmt, "True"),
            Self::Bool(false) => write!(fmt, "False"),
            Self::Int(i) => write!(fmt, "{}", i),
            Self::Float(f) => fmt_float(*f, fmt),
            Self::Str(s) => write!(fmt, "{}", s),
            Self::List(l) => {
                write!(fmt, "[")?;
                for (i, item) in l.iter().enumerate() {
                    if i != 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{}", item.repr())?;
                }
                write!(fmt, "]")
            }
            Self::Map(m) => {
                write!(fmt, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i != 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "'{}': {}", k, v.repr())?;
                }
                write!(fmt, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Converts a YAML scalar/collection into a [`Value`]. Non-string mapping keys are stringified.
impl From<&serde_yaml::Value> for Value {
    fn from(v: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Y;
        match v {
            Y::Null => Self::Null,
            Y::Bool(b) => Self::Bool(*b),
            Y::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Y::String(s) => Self::Str(s.clone()),
            Y::Sequence(seq) => Self::List(seq.iter().map(Into::into).collect()),
            Y::Mapping(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Y::String(s) => s.clone(),
                            other => Value::from(other).to_string(),
                        };
                        (key, v.into())
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(21.).to_string(), "21.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(
            Value::from(vec![Value::Int(1), "a".into(), Value::Bool(true)]).to_string(),
            "[1, 'a', True]"
        );
        assert_eq!(Value::Null.to_string(), "None");
    }

    #[test]
    fn test_from_yaml() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("{a: 1, b: [2.5, x]}").unwrap();
        let value = Value::from(&yaml);
        let map = value.as_map().unwrap();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(map["b"], Value::from(vec![Value::Float(2.5), "x".into()]));
    }
}
