use super::{
    literal::{self, literal},
    Kwargs,
};
use crate::{error::CallError, Value};
use once_cell::sync::Lazy;
use rand::{seq::SliceRandom, Rng};
use std::collections::HashMap;

pub(crate) type DefaultCallable = fn(&[Value], &Kwargs) -> Result<Value, CallError>;

const DEFAULT_WIDTH: usize = 78;
const CROP_SUFFIX: &str = "[...]";

/// Callables every [`FuncParser::with_defaults`](super::FuncParser::with_defaults) starts with.
pub(crate) static DEFAULT_CALLABLES: Lazy<HashMap<&'static str, DefaultCallable>> = Lazy::new(|| {
    let mut ret: HashMap<&'static str, DefaultCallable> = HashMap::new();
    ret.insert("pad", pad);
    ret.insert("crop", crop);
    ret.insert("space", space);
    ret.insert("clr", clr);
    ret.insert("ljust", ljust);
    ret.insert("rjust", rjust);
    ret.insert("cjust", cjust);
    ret.insert("add", add);
    ret.insert("sub", sub);
    ret.insert("mult", mult);
    ret.insert("div", div);
    ret.insert("toint", toint);
    ret.insert("random", random);
    ret.insert("randint", randint);
    ret.insert("choice", choice);
    ret.insert("lit", lit);
    ret.insert("eval", eval);
    ret
});

/// The argument given by keyword, or else by position.
fn arg<'a>(args: &'a [Value], kwargs: &'a Kwargs, index: usize, key: &str) -> Option<&'a Value> {
    kwargs.get(key).or_else(|| args.get(index))
}

fn text_arg(args: &[Value], kwargs: &Kwargs, index: usize, key: &str) -> String {
    arg(args, kwargs, index, key)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

fn usize_arg(
    args: &[Value],
    kwargs: &Kwargs,
    index: usize,
    key: &str,
    default: usize,
) -> Result<usize, CallError> {
    let Some(v) = arg(args, kwargs, index, key) else {
        return Ok(default);
    };
    let n = match literal::to_int(&parsed(v))? {
        Value::Int(n) => n,
        _ => return Err(CallError::new(format!("{} is not an integer", key))),
    };
    let n = usize::try_from(n)
        .map_err(|_| CallError::new(format!("{} must not be negative", key)))?;
    if n > literal::MAX_LEN {
        return Err(CallError::new(format!(
            "{} must not exceed {}",
            key,
            literal::MAX_LEN
        )));
    }
    Ok(n)
}

fn fill_arg(args: &[Value], kwargs: &Kwargs, index: usize) -> char {
    arg(args, kwargs, index, "fillchar")
        .and_then(|v| v.to_string().chars().next())
        .unwrap_or(' ')
}

/// Reads a string argument as a literal, keeping it as a string if it is not one.
fn parsed(v: &Value) -> Value {
    match v {
        Value::Str(s) => literal(s).unwrap_or_else(|_| v.clone()),
        v => v.clone(),
    }
}

fn operands(args: &[Value], name: &str) -> Result<(Value, Value), CallError> {
    match args {
        [a, b, ..] => Ok((parsed(a), parsed(b))),
        _ => Err(CallError::new(format!("{} takes two arguments", name))),
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

fn justify(text: &str, width: usize, align: Align, fill: char) -> String {
    let len = text.chars().count();
    let extra = width.saturating_sub(len);
    let (left, right) = match align {
        Align::Left => (0, extra),
        Align::Right => (extra, 0),
        Align::Center => (extra / 2, extra - extra / 2),
    };
    let fill = |n| std::iter::repeat(fill).take(n).collect::<String>();
    format!("{}{}{}", fill(left), text, fill(right))
}

/// `$pad(text, width=78, align=c, fillchar= )`
fn pad(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    let text = text_arg(args, kwargs, 0, "text");
    let width = usize_arg(args, kwargs, 1, "width", DEFAULT_WIDTH)?;
    let align = match text_arg(args, kwargs, 2, "align").trim() {
        "l" => Align::Left,
        "r" => Align::Right,
        _ => Align::Center,
    };
    let fill = fill_arg(args, kwargs, 3);
    Ok(Value::Str(justify(&text, width, align, fill)))
}

/// `$crop(text, width=78, suffix=[...])`
fn crop(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    let text = text_arg(args, kwargs, 0, "text");
    let width = usize_arg(args, kwargs, 1, "width", DEFAULT_WIDTH)?;
    let suffix = arg(args, kwargs, 2, "suffix")
        .map(|v| v.to_string())
        .unwrap_or_else(|| CROP_SUFFIX.to_owned());
    if text.chars().count() <= width {
        return Ok(Value::Str(text));
    }
    let suffix_len = suffix.chars().count();
    let ret = if width <= suffix_len {
        text.chars().take(width).collect()
    } else {
        let mut ret: String = text.chars().take(width - suffix_len).collect();
        ret.push_str(&suffix);
        ret
    };
    Ok(Value::Str(ret))
}

fn space(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    let n = usize_arg(args, kwargs, 0, "spaces", 1)?;
    Ok(Value::Str(" ".repeat(n)))
}

/// `$clr(start, text, end=n)` wraps text in color markup.
fn clr(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    if args.len() < 2 && kwargs.get("text").is_none() {
        return Ok(Value::Str(text_arg(args, kwargs, 0, "text")));
    }
    let start = text_arg(args, kwargs, 0, "start");
    let text = text_arg(args, kwargs, 1, "text");
    let end = arg(args, kwargs, 2, "end")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "n".to_owned());
    Ok(Value::Str(format!("|{}{}|{}", start.trim(), text, end.trim())))
}

fn just(args: &[Value], kwargs: &Kwargs, align: Align) -> Result<Value, CallError> {
    let text = text_arg(args, kwargs, 0, "text");
    let width = usize_arg(args, kwargs, 1, "width", DEFAULT_WIDTH)?;
    let fill = fill_arg(args, kwargs, 2);
    Ok(Value::Str(justify(&text, width, align, fill)))
}

fn ljust(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    just(args, kwargs, Align::Left)
}

fn rjust(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    just(args, kwargs, Align::Right)
}

fn cjust(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    just(args, kwargs, Align::Center)
}

fn add(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    let (a, b) = operands(args, "add")?;
    literal::add(a, b)
}

fn sub(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    let (a, b) = operands(args, "sub")?;
    literal::sub(a, b)
}

fn mult(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    let (a, b) = operands(args, "mult")?;
    literal::mul(a, b)
}

fn div(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    let (a, b) = operands(args, "div")?;
    literal::div(a, b)
}

fn toint(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    let v = args
        .first()
        .ok_or_else(|| CallError::new("toint takes one argument"))?;
    literal::to_int(&parsed(v))
}

/// `$random()` is a float in `[0, 1)`. With bounds, the result is an integer if both bounds
/// are, otherwise a float, inclusive of both ends.
fn random(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    let mut rng = rand::thread_rng();
    if args.is_empty() && kwargs.get("min").is_none() && kwargs.get("max").is_none() {
        return Ok(Value::Float(rng.gen()));
    }
    let min = arg(args, kwargs, 0, "min").map_or(Value::Int(0), parsed);
    let max = arg(args, kwargs, 1, "max").map_or(Value::Int(1), parsed);
    match (&min, &max) {
        (Value::Int(min), Value::Int(max)) if min <= max => Ok(Value::Int(rng.gen_range(*min..=*max))),
        _ => match (min.as_f64(), max.as_f64()) {
            (Some(min), Some(max)) if min <= max => Ok(Value::Float(rng.gen_range(min..=max))),
            _ => Err(CallError::new(format!(
                "bad bounds for random: {} and {}",
                min.repr(),
                max.repr()
            ))),
        },
    }
}

fn randint(args: &[Value], kwargs: &Kwargs) -> Result<Value, CallError> {
    let bound = |index, key, default| -> Result<i64, CallError> {
        match arg(args, kwargs, index, key) {
            Some(v) => match literal::to_int(&parsed(v))? {
                Value::Int(n) => Ok(n),
                _ => Err(CallError::new(format!("{} is not an integer", key))),
            },
            None => Ok(default),
        }
    };
    let (min, max) = (bound(0, "min", 0)?, bound(1, "max", 1)?);
    if min > max {
        return Err(CallError::new(format!("empty range {}..={}", min, max)));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(min..=max)))
}

/// Picks an element of a list literal, or one of several arguments.
fn choice(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    let options = match args {
        [single] => match parsed(single) {
            Value::List(list) => list,
            other => vec![other],
        },
        many => many.to_vec(),
    };
    options
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| CallError::new("choice from an empty list"))
}

/// Converts its argument to a typed value. Text that is not a literal is returned as is.
fn lit(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    Ok(args.first().map_or(Value::Null, parsed))
}

fn eval(args: &[Value], _kwargs: &Kwargs) -> Result<Value, CallError> {
    match args.first() {
        Some(Value::Str(s)) if s.trim().is_empty() => Ok(Value::Str(String::new())),
        Some(Value::Str(s)) => literal::evaluate(s),
        Some(v) => Ok(v.clone()),
        None => Ok(Value::Str(String::new())),
    }
}
