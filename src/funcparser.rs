//! Expands `$name(args)` calls embedded in free text.
//!
//! Calls nest, and inner calls run first. A nested call standing alone as an argument hands
//! its typed result to the outer call; mixed with other text it is stringified.
//! Arguments are split on top-level commas, `key=value` pairs become keyword arguments,
//! and `'...'`, `"..."` or their tripled forms protect separators. `\` escapes any character inside a call, and
//! `\$` or `$$` escape a call.
//!
//! Malformed or unknown calls are left in the output as written, unless
//! [`ParseOptions::raise_errors`] is set.

mod callables;
mod literal;

pub use self::literal::{evaluate, literal};
pub use crate::{
    error::{CallError, ParsingError},
    value::Value,
};
use serde::Deserialize;
use std::{collections::HashMap, rc::Rc};
use tracing::{debug, warn};

pub type FuncCallable = Rc<dyn Fn(&[Value], &Kwargs) -> Result<Value, CallError>>;

/// Keyword arguments in the order they were first given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(Vec<(String, Value)>);

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its position if it was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts every pair of `other`, overriding existing keys.
    pub fn extend(&mut self, other: &Kwargs) {
        for (key, value) in &other.0 {
            self.insert(key.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ret = Self::new();
        for (key, value) in iter {
            ret.insert(key, value);
        }
        ret
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FuncParserConfig {
    pub start_char: char,
    pub escape_char: char,
    /// Calls nested deeper than this are left as text.
    pub max_nesting: usize,
}

impl Default for FuncParserConfig {
    fn default() -> Self {
        Self {
            start_char: '$',
            escape_char: '\\',
            max_nesting: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail on unknown functions, failing callables and unclosed calls instead of leaving
    /// them as text.
    pub raise_errors: bool,
    /// Remove every call from the text instead of expanding it.
    pub strip: bool,
    /// Escape every live call instead of expanding it.
    pub escape: bool,
}

/// Lowercases a function name and collapses its whitespace.
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_name_start(c: Option<char>) -> bool {
    c.map_or(false, |c| c.is_alphabetic() || c == '_')
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ' '
}

#[derive(Clone)]
pub struct FuncParser {
    callables: HashMap<String, FuncCallable>,
    default_kwargs: Kwargs,
    config: FuncParserConfig,
}

impl Default for FuncParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FuncParser {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut names: Vec<_> = self.callables.keys().collect();
        names.sort();
        fmt.debug_struct("FuncParser")
            .field("callables", &names)
            .field("default_kwargs", &self.default_kwargs)
            .field("config", &self.config)
            .finish()
    }
}

impl FuncParser {
    /// A parser without any callables.
    pub fn new() -> Self {
        Self {
            callables: HashMap::new(),
            default_kwargs: Kwargs::new(),
            config: FuncParserConfig::default(),
        }
    }

    /// A parser with the built-in callables: `pad`, `crop`, `space`, `clr`, `ljust`,
    /// `rjust`, `cjust`, `add`, `sub`, `mult`, `div`, `toint`, `random`, `randint`,
    /// `choice`, `lit` and `eval`.
    pub fn with_defaults() -> Self {
        let mut ret = Self::new();
        for (name, f) in callables::DEFAULT_CALLABLES.iter() {
            ret.callables.insert((*name).to_owned(), Rc::new(*f));
        }
        ret
    }

    pub fn callable(
        mut self,
        name: &str,
        f: impl Fn(&[Value], &Kwargs) -> Result<Value, CallError> + 'static,
    ) -> Self {
        self.register(name, f);
        self
    }

    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&[Value], &Kwargs) -> Result<Value, CallError> + 'static,
    ) {
        self.callables.insert(normalize(name), Rc::new(f));
    }

    pub fn has_callable(&self, name: &str) -> bool {
        self.callables.contains_key(&normalize(name))
    }

    /// Keyword arguments passed to every call, overridden by those written in the text and
    /// those given to a parse call.
    pub fn with_default_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.default_kwargs = kwargs;
        self
    }

    pub fn with_config(mut self, config: FuncParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FuncParserConfig {
        &self.config
    }

    pub fn parse(&self, text: &str) -> Result<String, ParsingError> {
        self.parse_with(text, ParseOptions::default(), &Kwargs::new())
    }

    /// Parses with options and extra keyword arguments that take precedence over any other
    /// keyword arguments of the calls.
    pub fn parse_with(
        &self,
        text: &str,
        options: ParseOptions,
        kwargs: &Kwargs,
    ) -> Result<String, ParsingError> {
        Ok(Scanner::new(self, options, kwargs).run(text)?.text)
    }

    /// Like [`Self::parse`], but if the text is a single call and nothing else but
    /// whitespace, returns that call's result without converting it to a string.
    pub fn parse_to_any(&self, text: &str) -> Result<Value, ParsingError> {
        self.parse_to_any_with(text, ParseOptions::default(), &Kwargs::new())
    }

    pub fn parse_to_any_with(
        &self,
        text: &str,
        options: ParseOptions,
        kwargs: &Kwargs,
    ) -> Result<Value, ParsingError> {
        let scanned = Scanner::new(self, options, kwargs).run(text)?;
        Ok(scanned.value.unwrap_or(Value::Str(scanned.text)))
    }
}

/// A call being read.
struct Frame {
    /// Byte offset of the start character.
    start: usize,
    name: String,
    in_args: bool,
    /// The call as written, with nested calls replaced by their output.
    raw: String,
    args: Vec<Value>,
    kwargs: Kwargs,
    key: Option<String>,
    buf: String,
    /// Result of a nested call that makes up the current argument so far.
    typed: Option<Value>,
    /// Whitespace after `typed`, dropped if the argument ends there.
    trailing: String,
    quote: Option<char>,
    /// The open quote is tripled, like `'''`.
    triple: bool,
    /// Whether the current argument was quoted, which keeps its whitespace.
    literal: bool,
    quote_end: usize,
    nesting: usize,
}

impl Frame {
    fn new(start: usize, start_char: char) -> Self {
        Self {
            start,
            name: String::new(),
            in_args: false,
            raw: start_char.to_string(),
            args: vec![],
            kwargs: Kwargs::new(),
            key: None,
            buf: String::new(),
            typed: None,
            trailing: String::new(),
            quote: None,
            triple: false,
            literal: false,
            quote_end: 0,
            nesting: 0,
        }
    }

    fn push_text(&mut self, s: &str) {
        if self.typed.is_some() && self.quote.is_none() && s.trim().is_empty() {
            self.trailing.push_str(s);
            return;
        }
        if let Some(v) = self.typed.take() {
            self.buf.push_str(&v.to_string());
            self.buf.push_str(&std::mem::take(&mut self.trailing));
        }
        self.buf.push_str(s);
    }

    fn push_char(&mut self, c: char) {
        self.push_text(c.encode_utf8(&mut [0; 4]));
    }

    /// Takes the result of a nested call.
    fn receive(&mut self, value: Value) {
        let text = value.to_string();
        self.raw.push_str(&text);
        if self.quote.is_none() && self.typed.is_none() && self.buf.trim().is_empty() {
            self.buf.clear();
            self.typed = Some(value);
        } else {
            self.push_text(&text);
        }
    }

    fn receive_text(&mut self, text: &str) {
        self.raw.push_str(text);
        self.push_text(text);
    }

    fn start_kwarg(&mut self) {
        let key = match self.typed.take() {
            Some(v) => v.to_string(),
            None => std::mem::take(&mut self.buf),
        };
        self.key = Some(key.trim().to_owned());
        self.buf.clear();
        self.trailing.clear();
        self.literal = false;
        self.quote_end = 0;
    }

    fn finish_arg(&mut self) {
        let value = match self.typed.take() {
            Some(v) => v,
            None if self.literal => {
                let (inner, tail) = self.buf.split_at(self.quote_end.min(self.buf.len()));
                Value::Str(format!("{}{}", inner, tail.trim_end()))
            }
            None => Value::Str(self.buf.trim().to_owned()),
        };
        let keep = self.literal || !matches!(&value, Value::Str(s) if s.is_empty());
        match self.key.take() {
            Some(key) => self.kwargs.insert(key, value),
            None if keep => self.args.push(value),
            None => (),
        }
        self.buf.clear();
        self.trailing.clear();
        self.literal = false;
        self.quote_end = 0;
    }
}

enum Output {
    Value(Value),
    Text(String),
}

struct Scanned {
    text: String,
    /// Result of the only call of the text, if the rest is whitespace.
    value: Option<Value>,
}

struct Scanner<'p> {
    parser: &'p FuncParser,
    options: ParseOptions,
    kwargs: &'p Kwargs,
    stack: Vec<Frame>,
    out: String,
    top_calls: usize,
    top_value: Option<Value>,
    top_text: bool,
}

enum Phase {
    Text,
    Name,
    Args,
}

impl<'p> Scanner<'p> {
    fn new(parser: &'p FuncParser, options: ParseOptions, kwargs: &'p Kwargs) -> Self {
        Self {
            parser,
            options,
            kwargs,
            stack: vec![],
            out: String::new(),
            top_calls: 0,
            top_value: None,
            top_text: false,
        }
    }

    fn emit(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(parent) => parent.receive_text(text),
            None => {
                if !text.trim().is_empty() {
                    self.top_text = true;
                }
                self.out.push_str(text);
            }
        }
    }

    fn run(mut self, text: &str) -> Result<Scanned, ParsingError> {
        let start_char = self.parser.config.start_char;
        let esc = self.parser.config.escape_char;
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut escaped = false;
        let mut i = 0;

        while i < chars.len() {
            let (offset, c) = chars[i];
            let next = chars.get(i + 1).map(|(_, c)| *c);
            i += 1;

            let phase = match self.stack.last() {
                None => Phase::Text,
                Some(frame) if !frame.in_args => Phase::Name,
                Some(_) => Phase::Args,
            };

            match phase {
                Phase::Text => {
                    if (c == esc || c == start_char) && next == Some(start_char) {
                        i += 1;
                        if self.options.escape {
                            self.emit(&format!("{}{}", c, start_char));
                        } else {
                            self.emit(&start_char.to_string());
                        }
                    } else if c == start_char && is_name_start(next) {
                        self.stack.push(Frame::new(offset, c));
                    } else {
                        self.emit(&c.to_string());
                    }
                }
                Phase::Name => {
                    if c == '(' {
                        self.open_call()?;
                    } else if is_name_char(c) {
                        if let Some(frame) = self.stack.last_mut() {
                            frame.name.push(c);
                            frame.raw.push(c);
                        }
                    } else {
                        // Not a call after all, read the character again as text
                        if let Some(frame) = self.stack.pop() {
                            self.emit(&frame.raw);
                        }
                        i -= 1;
                    }
                }
                Phase::Args => {
                    let Some(frame) = self.stack.last_mut() else {
                        continue;
                    };
                    if escaped {
                        escaped = false;
                        frame.raw.push(c);
                        frame.push_char(c);
                        continue;
                    }
                    if c == esc {
                        escaped = true;
                        frame.raw.push(c);
                        continue;
                    }
                    if c == start_char {
                        if next == Some(start_char) {
                            i += 1;
                            frame.raw.push(c);
                            frame.raw.push(c);
                            frame.push_char(c);
                        } else if is_name_start(next) {
                            self.stack.push(Frame::new(offset, c));
                        } else {
                            frame.raw.push(c);
                            frame.push_char(c);
                        }
                        continue;
                    }
                    frame.raw.push(c);
                    let tripled = |q: char| {
                        chars.get(i).map(|(_, c)| *c) == Some(q)
                            && chars.get(i + 1).map(|(_, c)| *c) == Some(q)
                    };
                    if let Some(quote) = frame.quote {
                        if c == quote && (!frame.triple || tripled(quote)) {
                            if frame.triple {
                                i += 2;
                                frame.raw.push(quote);
                                frame.raw.push(quote);
                            }
                            frame.quote = None;
                            frame.triple = false;
                            frame.quote_end = frame.buf.len();
                        } else {
                            frame.push_char(c);
                        }
                        continue;
                    }
                    match c {
                        '\'' | '"' => {
                            frame.push_text("");
                            if frame.buf.trim().is_empty() {
                                frame.buf.clear();
                            }
                            frame.triple = tripled(c);
                            if frame.triple {
                                i += 2;
                                frame.raw.push(c);
                                frame.raw.push(c);
                            }
                            frame.quote = Some(c);
                            frame.literal = true;
                        }
                        '(' | '[' | '{' => {
                            frame.nesting += 1;
                            frame.push_char(c);
                        }
                        ')' | ']' | '}' if frame.nesting > 0 => {
                            frame.nesting -= 1;
                            frame.push_char(c);
                        }
                        ')' => {
                            frame.finish_arg();
                            self.close_call()?;
                        }
                        ',' if frame.nesting == 0 => frame.finish_arg(),
                        '=' if frame.nesting == 0 && frame.key.is_none() => frame.start_kwarg(),
                        _ => frame.push_char(c),
                    }
                }
            }
        }

        while let Some(frame) = self.stack.pop() {
            if frame.in_args {
                if self.options.raise_errors {
                    return Err(ParsingError::Unclosed {
                        span: frame.raw,
                        offset: frame.start,
                    });
                }
                debug!("unclosed call {:?} at {}, leaving it as text", frame.raw, frame.start);
            }
            self.emit(&frame.raw);
        }

        let value = if self.top_calls == 1 && !self.top_text {
            self.top_value
        } else {
            None
        };
        Ok(Scanned {
            text: self.out,
            value,
        })
    }

    /// Enters the argument list of the innermost call, unless that would nest calls too
    /// deep.
    fn open_call(&mut self) -> Result<(), ParsingError> {
        let depth = self.stack.len();
        let max = self.parser.config.max_nesting;
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };
        frame.raw.push('(');
        if depth <= max {
            frame.in_args = true;
            return Ok(());
        }
        if self.options.raise_errors {
            return Err(ParsingError::TooDeep {
                max,
                offset: frame.start,
            });
        }
        debug!("call at {} nested deeper than {}, leaving it as text", frame.start, max);
        if let Some(frame) = self.stack.pop() {
            self.emit(&frame.raw);
            // The matching parenthesis now belongs to the enclosing argument
            if let Some(parent) = self.stack.last_mut() {
                parent.nesting += 1;
            }
        }
        Ok(())
    }

    fn close_call(&mut self) -> Result<(), ParsingError> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        let output = self.execute(frame)?;
        match (self.stack.last_mut(), output) {
            (Some(parent), Output::Value(v)) => parent.receive(v),
            (Some(parent), Output::Text(text)) => parent.receive_text(&text),
            (None, Output::Value(v)) => {
                self.out.push_str(&v.to_string());
                self.top_calls += 1;
                self.top_value = Some(v);
            }
            (None, Output::Text(text)) => {
                self.out.push_str(&text);
                self.top_calls += 1;
                self.top_value = None;
            }
        }
        Ok(())
    }

    fn execute(&self, frame: Frame) -> Result<Output, ParsingError> {
        if self.options.strip {
            return Ok(Output::Text(String::new()));
        }
        if self.options.escape {
            return Ok(Output::Text(format!(
                "{}{}",
                self.parser.config.escape_char, frame.raw
            )));
        }
        let name = normalize(&frame.name);
        let Some(callable) = self.parser.callables.get(&name) else {
            if self.options.raise_errors {
                return Err(ParsingError::UnknownFunction {
                    name,
                    span: frame.raw,
                    offset: frame.start,
                });
            }
            warn!("unknown function {:?} in {:?}, leaving it as text", name, frame.raw);
            return Ok(Output::Text(frame.raw));
        };
        let mut kwargs = self.parser.default_kwargs.clone();
        kwargs.extend(&frame.kwargs);
        kwargs.extend(self.kwargs);
        match callable(&frame.args, &kwargs) {
            Ok(value) => Ok(Output::Value(value)),
            Err(source) if self.options.raise_errors => Err(ParsingError::Callable {
                name,
                span: frame.raw,
                source,
            }),
            Err(e) => {
                warn!("function {:?} failed in {:?}: {}", name, frame.raw, e);
                Ok(Output::Text(frame.raw))
            }
        }
    }
}
