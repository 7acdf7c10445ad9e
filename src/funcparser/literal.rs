//! Literal and arithmetic expression evaluation behind the `lit` and `eval` callables.
//!
//! Literals are numbers, quoted strings, `True`/`False`/`None`, lists, tuples, sets and
//! dicts. Tuples and sets become lists, dict keys are stringified. Expressions add
//! `+ - * / // %`, unary signs and the `str`, `int`, `float`, `len` and `abs` functions.

use crate::{error::CallError, Value};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use std::collections::BTreeMap;

/// Longest string or list an expression may produce.
pub(crate) const MAX_LEN: usize = 100_000;

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn fail(i: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(i, nom::error::ErrorKind::Verify))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn number(i: &str) -> IResult<&str, Value> {
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    let (rest, text) = recognize(tuple((
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(exponent),
    )))(i)?;
    if text.contains(['.', 'e', 'E']) {
        let f = text.parse::<f64>().map_err(|_| fail(i))?;
        Ok((rest, Value::Float(f)))
    } else {
        let n = text.parse::<i64>().map_err(|_| fail(i))?;
        Ok((rest, Value::Int(n)))
    }
}

fn string(i: &str) -> IResult<&str, Value> {
    let mut chars = i.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('\'' | '"'))) => q,
        _ => return Err(fail(i)),
    };
    let mut ret = String::new();
    let mut escaped = false;
    for (pos, c) in chars {
        if escaped {
            ret.push(match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                c => c,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((&i[pos + c.len_utf8()..], Value::Str(ret)));
        } else {
            ret.push(c);
        }
    }
    Err(fail(i))
}

fn keyword(i: &str) -> IResult<&str, Value> {
    let (rest, word) = identifier(i)?;
    match word {
        "True" => Ok((rest, Value::Bool(true))),
        "False" => Ok((rest, Value::Bool(false))),
        "None" => Ok((rest, Value::Null)),
        _ => Err(fail(i)),
    }
}

/// Comma separated items with an optional trailing comma. The flag tells whether any comma
/// was seen, which distinguishes `(1,)` from `(1)`.
fn items<const EXPR: bool>(i: &str) -> IResult<&str, (Vec<Value>, bool)> {
    let (i, list) = separated_list0(char(','), ws(expr::<EXPR>))(i)?;
    let (i, trailing) = opt(ws(char(',')))(i)?;
    let comma = list.len() > 1 || trailing.is_some();
    Ok((i, (list, comma)))
}

fn list<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    map(
        delimited(char('['), ws(items::<EXPR>), char(']')),
        |(list, _)| Value::List(list),
    )(i)
}

fn paren<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    let (i, (mut list, comma)) = delimited(char('('), ws(items::<EXPR>), char(')'))(i)?;
    if !comma && list.len() == 1 {
        Ok((i, list.remove(0)))
    } else {
        Ok((i, Value::List(list)))
    }
}

fn dict_entry<const EXPR: bool>(i: &str) -> IResult<&str, (String, Value)> {
    let (i, key) = ws(expr::<EXPR>)(i)?;
    let (i, _) = char(':')(i)?;
    let (i, val) = ws(expr::<EXPR>)(i)?;
    Ok((i, (key.to_string(), val)))
}

fn dict<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    let (i, entries) = separated_list0(char(','), ws(dict_entry::<EXPR>))(i)?;
    let (i, _) = terminated(opt(ws(char(','))), char('}'))(i)?;
    Ok((i, Value::Map(entries.into_iter().collect::<BTreeMap<_, _>>())))
}

fn set<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    let (i, (mut list, _)) = terminated(items::<EXPR>, char('}'))(i)?;
    let mut seen = vec![];
    list.retain(|v| {
        let keep = !seen.contains(v);
        if keep {
            seen.push(v.clone());
        }
        keep
    });
    Ok((i, Value::List(list)))
}

fn dict_or_set<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    preceded(
        pair(char('{'), multispace0),
        alt((dict::<EXPR>, set::<EXPR>)),
    )(i)
}

fn failure(i: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::Verify))
}

fn call(i: &str) -> IResult<&str, Value> {
    let (rest, name) = identifier(i)?;
    let (rest, arg) = delimited(ws(char('(')), expr::<true>, ws(char(')')))(rest)?;
    let res = match name {
        "str" => Ok(Value::Str(arg.to_string())),
        "int" => to_int(&arg),
        "float" => to_float(&arg),
        "len" => length(&arg),
        "abs" => match arg {
            Value::Int(n) => Ok(Value::Int(n.saturating_abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            _ => Err(CallError::new("bad operand for abs()")),
        },
        _ => return Err(fail(i)),
    };
    res.map(|v| (rest, v)).map_err(|_| failure(i))
}

fn atom<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    if EXPR {
        alt((
            number,
            string,
            keyword,
            call,
            list::<EXPR>,
            paren::<EXPR>,
            dict_or_set::<EXPR>,
        ))(i)
    } else {
        alt((
            number,
            string,
            keyword,
            list::<EXPR>,
            paren::<EXPR>,
            dict_or_set::<EXPR>,
        ))(i)
    }
}

fn unary<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    let (rest, sign) = opt(terminated(one_of("+-"), multispace0))(i)?;
    let Some(sign) = sign else {
        return atom::<EXPR>(i);
    };
    // Literals only allow signs on numbers
    let (rest, operand) = if EXPR { unary::<EXPR>(rest)? } else { number(rest)? };
    match (sign, operand) {
        ('-', Value::Int(n)) => Ok((rest, Value::Int(n.wrapping_neg()))),
        ('-', Value::Float(f)) => Ok((rest, Value::Float(-f))),
        ('+', v @ (Value::Int(_) | Value::Float(_))) => Ok((rest, v)),
        _ => Err(fail(i)),
    }
}

#[derive(Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

fn term<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    let (mut i, mut acc) = unary::<EXPR>(i)?;
    if !EXPR {
        return Ok((i, acc));
    }
    loop {
        let op = ws(alt((
            value(Op::FloorDiv, tag("//")),
            value(Op::Mul, char('*')),
            value(Op::Div, char('/')),
            value(Op::Mod, char('%')),
        )))(i);
        let Ok((rest, op)) = op else {
            return Ok((i, acc));
        };
        let (rest, rhs) = unary::<EXPR>(rest)?;
        acc = binop(op, acc, rhs).map_err(|_| failure(i))?;
        i = rest;
    }
}

fn expr<const EXPR: bool>(i: &str) -> IResult<&str, Value> {
    let (mut i, mut acc) = term::<EXPR>(i)?;
    if !EXPR {
        return Ok((i, acc));
    }
    loop {
        let op = ws(alt((value(Op::Add, char('+')), value(Op::Sub, char('-')))))(i);
        let Ok((rest, op)) = op else {
            return Ok((i, acc));
        };
        let (rest, rhs) = term::<EXPR>(rest)?;
        acc = binop(op, acc, rhs).map_err(|_| failure(i))?;
        i = rest;
    }
}

fn eval_all<const EXPR: bool>(src: &str) -> Result<Value, CallError> {
    all_consuming(ws(expr::<EXPR>))(src)
        .map(|(_, v)| v)
        .map_err(|e| CallError::new(format!("cannot evaluate {:?}: {}", src, e)))
}

/// Evaluates a literal such as `[1, 'a', {'k': None}]`. Operators are not allowed.
pub fn literal(src: &str) -> Result<Value, CallError> {
    eval_all::<false>(src)
}

/// Evaluates an arithmetic or string expression such as `'-' * 20` or `(21 + 21) / 2`.
pub fn evaluate(src: &str) -> Result<Value, CallError> {
    eval_all::<true>(src)
}

enum Num {
    Int(i64),
    Float(f64),
}

fn num(v: &Value) -> Option<Num> {
    match v {
        Value::Int(n) => Some(Num::Int(*n)),
        Value::Float(f) => Some(Num::Float(*f)),
        Value::Bool(b) => Some(Num::Int(*b as i64)),
        _ => None,
    }
}

fn as_float(n: &Num) -> f64 {
    match n {
        Num::Int(n) => *n as f64,
        Num::Float(f) => *f,
    }
}

fn check_len(len: Option<usize>) -> Result<usize, CallError> {
    match len {
        Some(len) if len <= MAX_LEN => Ok(len),
        _ => Err(CallError::new(format!("result longer than {} items", MAX_LEN))),
    }
}

fn repeat<T: Clone>(items: &[T], times: i64) -> Result<Vec<T>, CallError> {
    let times = usize::try_from(times).unwrap_or(0);
    let mut ret = Vec::with_capacity(check_len(items.len().checked_mul(times))?);
    for _ in 0..times {
        ret.extend_from_slice(items);
    }
    Ok(ret)
}

fn binop(op: Op, lhs: Value, rhs: Value) -> Result<Value, CallError> {
    use Value::*;
    match (op, &lhs, &rhs) {
        (Op::Add, Str(a), Str(b)) => {
            check_len(a.chars().count().checked_add(b.chars().count()))?;
            return Ok(Str(format!("{}{}", a, b)));
        }
        (Op::Add, List(a), List(b)) => {
            check_len(a.len().checked_add(b.len()))?;
            return Ok(List(a.iter().chain(b).cloned().collect()));
        }
        (Op::Mul, Str(s), Int(n)) | (Op::Mul, Int(n), Str(s)) => {
            let chars: Vec<char> = s.chars().collect();
            return Ok(Str(repeat(&chars, *n)?.into_iter().collect()));
        }
        (Op::Mul, List(l), Int(n)) | (Op::Mul, Int(n), List(l)) => {
            return Ok(List(repeat(l, *n)?))
        }
        _ => (),
    }
    let (Some(a), Some(b)) = (num(&lhs), num(&rhs)) else {
        return Err(CallError::new(format!(
            "unsupported operands {} and {}",
            lhs.repr(),
            rhs.repr()
        )));
    };
    let zero = || CallError::new("division by zero");
    Ok(match (op, a, b) {
        (Op::Add, Num::Int(a), Num::Int(b)) => a.checked_add(b).map_or(Float(a as f64 + b as f64), Int),
        (Op::Sub, Num::Int(a), Num::Int(b)) => a.checked_sub(b).map_or(Float(a as f64 - b as f64), Int),
        (Op::Mul, Num::Int(a), Num::Int(b)) => a.checked_mul(b).map_or(Float(a as f64 * b as f64), Int),
        (Op::FloorDiv, Num::Int(_), Num::Int(0)) | (Op::Mod, Num::Int(_), Num::Int(0)) => {
            return Err(zero())
        }
        (Op::FloorDiv, Num::Int(a), Num::Int(b)) => {
            let q = a.wrapping_div(b);
            Int(if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) { q - 1 } else { q })
        }
        (Op::Mod, Num::Int(a), Num::Int(b)) => {
            let r = a.wrapping_rem(b);
            Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        (op, a, b) => {
            let (a, b) = (as_float(&a), as_float(&b));
            match op {
                Op::Add => Float(a + b),
                Op::Sub => Float(a - b),
                Op::Mul => Float(a * b),
                _ if b == 0. => return Err(zero()),
                Op::Div => Float(a / b),
                Op::FloorDiv => Float((a / b).floor()),
                Op::Mod => {
                    let r = a % b;
                    Float(if r != 0. && (r < 0.) != (b < 0.) { r + b } else { r })
                }
            }
        }
    })
}

pub(crate) fn add(lhs: Value, rhs: Value) -> Result<Value, CallError> {
    binop(Op::Add, lhs, rhs)
}

pub(crate) fn sub(lhs: Value, rhs: Value) -> Result<Value, CallError> {
    binop(Op::Sub, lhs, rhs)
}

pub(crate) fn mul(lhs: Value, rhs: Value) -> Result<Value, CallError> {
    binop(Op::Mul, lhs, rhs)
}

pub(crate) fn div(lhs: Value, rhs: Value) -> Result<Value, CallError> {
    binop(Op::Div, lhs, rhs)
}

pub(crate) fn to_int(v: &Value) -> Result<Value, CallError> {
    match v {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| CallError::new(format!("invalid int: {:?}", s))),
        _ => Err(CallError::new(format!("cannot convert {} to int", v.repr()))),
    }
}

pub(crate) fn to_float(v: &Value) -> Result<Value, CallError> {
    match v {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| CallError::new(format!("invalid float: {:?}", s))),
        _ => Err(CallError::new(format!("cannot convert {} to float", v.repr()))),
    }
}

fn length(v: &Value) -> Result<Value, CallError> {
    let len = match v {
        Value::Str(s) => s.chars().count(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        _ => return Err(CallError::new(format!("{} has no len()", v.repr()))),
    };
    Ok(Value::Int(len as i64))
}
