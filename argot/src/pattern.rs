// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Typed value matchers and the token / value model they operate on.
//!
//! A [`Pattern`] validates one token (a string piece or an opaque message
//! element) and converts it into a [`Value`], or rejects it. Patterns
//! compose: unions, sequences, mappings, regexes, keyword booleans and a
//! greedy rest-of-stream matcher.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

/// One unit of a message chain: a piece of text or an opaque host element.
#[derive(Clone)]
pub enum Token {
    /// A text piece; may still contain several logical tokens separated by
    /// the active separator set.
    Text(String),
    /// An opaque element from the host platform. Compared by pointer
    /// identity.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Token {
    /// Build an opaque token from any sendable value.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Token::Opaque(Arc::new(value))
    }

    /// The text content, if this is a text token.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(s) => Some(s),
            Token::Opaque(_) => None,
        }
    }

    /// Whether this token is text.
    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text(_))
    }

    /// Whether this is an empty text token (the cursor's end sentinel).
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Token::Text(s) if s.is_empty())
    }

    /// Downcast an opaque token to a concrete element type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Token::Opaque(a) => a.downcast_ref::<T>(),
            Token::Text(_) => None,
        }
    }

    pub(crate) fn type_id_of(&self) -> Option<TypeId> {
        match self {
            Token::Opaque(a) => Some(a.as_ref().type_id()),
            Token::Text(_) => None,
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            Token::Text(s) => Value::Str(s.clone()),
            Token::Opaque(a) => Value::Opaque(a.clone()),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => write!(f, "Text({s:?})"),
            Token::Opaque(a) => write!(f, "Opaque({:p})", Arc::as_ptr(a)),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => f.write_str(s),
            Token::Opaque(a) => write!(f, "<elem {:p}>", Arc::as_ptr(a)),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Text(a), Token::Text(b)) => a == b,
            (Token::Opaque(a), Token::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Text(s.to_owned())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::Text(s)
    }
}

/// An ordered input sequence: what `parse` accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message(pub Vec<Token>);

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message(vec![Token::Text(s.to_owned())])
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message(vec![Token::Text(s)])
    }
}

impl From<Vec<Token>> for Message {
    fn from(tokens: Vec<Token>) -> Self {
        Message(tokens)
    }
}

impl From<Token> for Message {
    fn from(token: Token) -> Self {
        Message(vec![token])
    }
}

impl FromIterator<Token> for Message {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Message(iter.into_iter().collect())
    }
}

/// The dynamic result of validating a token, and the currency of all parse
/// results.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered list.
    List(Vec<Value>),
    /// An ordered string-keyed map.
    Map(IndexMap<String, Value>),
    /// An opaque host element, compared by pointer identity.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// The string content, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float content, accepting integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The boolean content, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The list content, if any.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// The map content, if any.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Whether this is `Value::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Downcast an opaque value to a concrete element type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(a) => a.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b:?}"),
            Value::Int(i) => write!(f, "{i:?}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(l) => f.debug_list().entries(l).finish(),
            Value::Map(m) => f.debug_map().entries(m.iter()).finish(),
            Value::Opaque(a) => write!(f, "Opaque({:p})", Arc::as_ptr(a)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::List(l) => {
                let parts: Vec<String> = l.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(m) => {
                let parts: Vec<String> = m.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Opaque(a) => write!(f, "<elem {:p}>", Arc::as_ptr(a)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

/// Outcome of [`Pattern::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    /// The token matched; carries the converted value.
    Valid(Value),
    /// The token did not match; carries the rejection text.
    Invalid(String),
    /// The token did not match but a default stood in.
    Default(Value),
}

impl Validated {
    /// Whether the outcome is `Valid`.
    pub fn is_valid(&self) -> bool {
        matches!(self, Validated::Valid(_))
    }

    /// The carried value for `Valid` / `Default` outcomes.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Validated::Valid(v) | Validated::Default(v) => Some(v),
            Validated::Invalid(_) => None,
        }
    }
}

/// Which input shapes a `Convert` pattern admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// Text tokens.
    Text,
    /// Integer values (from a predecessor or native input).
    Int,
    /// Float values.
    Float,
    /// Boolean values.
    Bool,
    /// Opaque elements of the given type.
    Elem(TypeId),
}

impl Accept {
    fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Accept::Text, Value::Str(_)) => true,
            (Accept::Int, Value::Int(_)) => true,
            (Accept::Float, Value::Float(_)) => true,
            (Accept::Bool, Value::Bool(_)) => true,
            (Accept::Elem(id), Value::Opaque(a)) => a.as_ref().type_id() == *id,
            _ => false,
        }
    }
}

/// The collection shape recognised by sequence patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {
    /// `[a, b, c]`
    List,
    /// `(a, b, c)`
    Tuple,
    /// `{a, b, c}`
    Set,
}

impl SeqKind {
    fn brackets(self) -> (char, char) {
        match self {
            SeqKind::List => ('[', ']'),
            SeqKind::Tuple => ('(', ')'),
            SeqKind::Set => ('{', '}'),
        }
    }

    fn label(self) -> &'static str {
        match self {
            SeqKind::List => "list",
            SeqKind::Tuple => "tuple",
            SeqKind::Set => "set",
        }
    }
}

type Converter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;
type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
enum Kind {
    Any,
    AnyString,
    Str,
    Regex { source: String, full: Regex, convert: Option<Converter> },
    Convert { accepts: Vec<Accept>, convert: Converter },
    Union { members: Vec<Pattern>, literals: Vec<String>, anti: bool },
    Sequence { kind: SeqKind, inner: Box<Pattern> },
    Mapping { key: Box<Pattern>, value: Box<Pattern> },
    KwBool { name: String, matcher: Regex },
    AllParam,
}

/// A composable, typed value matcher.
///
/// `validate` takes a [`Value`] (a projected token) and yields a
/// [`Validated`] outcome. Post-validators can reject otherwise-valid
/// values; a `previous` predecessor preprocesses inputs whose shape is
/// rejected.
#[derive(Clone)]
pub struct Pattern {
    kind: Kind,
    alias: Option<String>,
    previous: Option<Box<Pattern>>,
    validators: Vec<Validator>,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            return f.write_str(alias);
        }
        match &self.kind {
            Kind::Any => f.write_str("any"),
            Kind::AnyString | Kind::Str => f.write_str("str"),
            Kind::Regex { source, .. } => f.write_str(source),
            Kind::Convert { .. } => f.write_str("convert"),
            Kind::Union { members, literals, anti } => {
                let mut parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                parts.extend(literals.iter().map(|l| format!("{l:?}")));
                write!(f, "{}{}", if *anti { "!" } else { "" }, parts.join("|"))
            }
            Kind::Sequence { kind, inner } => write!(f, "{}[{inner}]", kind.label()),
            Kind::Mapping { key, value } => write!(f, "dict[{key}, {value}]"),
            Kind::KwBool { name, .. } => write!(f, "(no){name}"),
            Kind::AllParam => f.write_str("..."),
        }
    }
}

impl Pattern {
    fn with(kind: Kind) -> Self {
        Pattern { kind, alias: None, previous: None, validators: Vec::new() }
    }

    /// Accepts anything; yields the input unchanged.
    pub fn any() -> Self {
        Pattern::with(Kind::Any)
    }

    /// Accepts anything; yields the input's display text.
    pub fn any_string() -> Self {
        Pattern::with(Kind::AnyString)
    }

    /// Accepts only text tokens.
    pub fn string() -> Self {
        Pattern::with(Kind::Str)
    }

    /// Greedy: consumes the rest of the stream.
    pub fn all() -> Self {
        Pattern::with(Kind::AllParam)
    }

    /// Full-match a regular expression over text tokens, yielding the first
    /// capture group (or the whole match when there is none).
    pub fn regex(expr: &str) -> crate::Result<Self> {
        let full = anchored(expr)?;
        Ok(Pattern::with(Kind::Regex { source: expr.to_owned(), full, convert: None }))
    }

    /// Like [`Pattern::regex`], with a converter applied to the first
    /// capture group (or to a `Value::Map` of named groups).
    pub fn regex_convert<F>(expr: &str, convert: F) -> crate::Result<Self>
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        let full = anchored(expr)?;
        Ok(Pattern::with(Kind::Regex {
            source: expr.to_owned(),
            full,
            convert: Some(Arc::new(convert)),
        }))
    }

    /// Accept the listed input shapes (all, when empty) and convert them.
    /// The converter returns `None` to reject.
    pub fn convert<F>(accepts: Vec<Accept>, convert: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Pattern::with(Kind::Convert { accepts, convert: Arc::new(convert) })
    }

    /// First-match-wins over the member patterns.
    pub fn union(members: Vec<Pattern>) -> Self {
        Pattern::with(Kind::Union { members, literals: Vec::new(), anti: false })
    }

    /// Succeeds iff all members reject.
    pub fn anti_union(members: Vec<Pattern>) -> Self {
        Pattern::with(Kind::Union { members, literals: Vec::new(), anti: true })
    }

    /// A union of literal strings, matched by equality.
    pub fn literals<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Pattern::with(Kind::Union {
            members: Vec::new(),
            literals: literals.into_iter().map(Into::into).collect(),
            anti: false,
        })
    }

    /// Match a bracketed collection (or a native list), each element
    /// validated by `inner`.
    pub fn sequence(kind: SeqKind, inner: Pattern) -> Self {
        Pattern::with(Kind::Sequence { kind, inner: Box::new(inner) })
    }

    /// Match a `{k: v, ...}` string or a native map.
    pub fn mapping(key: Pattern, value: Pattern) -> Self {
        Pattern::with(Kind::Mapping { key: Box::new(key), value: Box::new(value) })
    }

    /// Match `name` to `true` and `noname` / `no-name` to `false`.
    pub fn kw_bool(name: &str) -> Self {
        // The matcher is a fixed template over an escaped name; it always
        // compiles.
        let matcher = Regex::new(&format!("^(?:-*no)?-*{}$", regex::escape(name)))
            .expect("kw-bool template compiles");
        Pattern::with(Kind::KwBool { name: name.to_owned(), matcher })
    }

    /// Signed integer.
    pub fn int() -> Self {
        Pattern::convert(vec![Accept::Text, Accept::Int], |v| match v {
            Value::Int(i) => Some(Value::Int(*i)),
            Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::Int),
            _ => None,
        })
        .with_alias("int")
    }

    /// Floating point number.
    pub fn float() -> Self {
        Pattern::convert(vec![Accept::Text, Accept::Float, Accept::Int], |v| match v {
            Value::Float(x) => Some(Value::Float(*x)),
            Value::Int(i) => Some(Value::Float(*i as f64)),
            Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Float),
            _ => None,
        })
        .with_alias("float")
    }

    /// Integer-or-float, normalised to a float.
    pub fn number() -> Self {
        Pattern::float().with_alias("number")
    }

    /// Case-insensitive boolean.
    pub fn boolean() -> Self {
        Pattern::convert(vec![Accept::Text, Accept::Bool], |v| match v {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        })
        .with_alias("bool")
    }

    /// Match opaque elements of a concrete type.
    pub fn elem<T: Any + Send + Sync>(name: &str) -> Self {
        Pattern::convert(vec![Accept::Elem(TypeId::of::<T>())], |v| Some(v.clone()))
            .with_alias(name)
    }

    /// Set a display alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    /// Install a predecessor that preprocesses rejected input shapes.
    pub fn with_previous(mut self, previous: Pattern) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }

    /// Append a post-validator; it runs only on otherwise-valid results.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Whether this is the greedy rest-of-stream matcher.
    pub fn is_all(&self) -> bool {
        matches!(self.kind, Kind::AllParam)
    }

    /// Whether this pattern accepts any input unchanged.
    pub fn is_any(&self) -> bool {
        matches!(self.kind, Kind::Any)
    }

    pub(crate) fn is_str_kind(&self) -> bool {
        matches!(self.kind, Kind::Str)
    }

    pub(crate) fn is_kw_bool(&self) -> bool {
        matches!(self.kind, Kind::KwBool { .. })
    }

    pub(crate) fn regex_source(&self) -> Option<&str> {
        match &self.kind {
            Kind::Regex { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Validate `input`, falling back to `default` on rejection when given.
    pub fn validate_with(&self, input: &Value, default: Option<&Value>) -> Validated {
        match self.do_match(input) {
            Some(value) => {
                for validator in &self.validators {
                    if !validator(&value) {
                        return match default {
                            Some(d) => Validated::Default(d.clone()),
                            None => Validated::Invalid(format!("{input} is not matched")),
                        };
                    }
                }
                Validated::Valid(value)
            }
            None => match default {
                Some(d) => Validated::Default(d.clone()),
                None => Validated::Invalid(format!("{input} is not matched with {self}")),
            },
        }
    }

    /// Validate `input` with no fallback.
    pub fn validate(&self, input: &Value) -> Validated {
        self.validate_with(input, None)
    }

    fn do_match(&self, input: &Value) -> Option<Value> {
        match &self.kind {
            Kind::Any | Kind::AllParam => Some(input.clone()),
            Kind::AnyString => Some(Value::Str(input.to_string())),
            Kind::Str => match input {
                Value::Str(s) => Some(Value::Str(s.clone())),
                _ => self.retry_previous(input, |v| matches!(v, Value::Str(_))),
            },
            Kind::Regex { full, convert, .. } => {
                let text = match input {
                    Value::Str(s) => s.clone(),
                    _ => self.retry_previous(input, |v| matches!(v, Value::Str(_)))?.to_string(),
                };
                let caps = full.captures(&text)?;
                let captured = capture_value(full, &caps);
                match convert {
                    Some(f) => f(&captured),
                    None => Some(captured),
                }
            }
            Kind::Convert { accepts, convert } => {
                if accepts.is_empty() || accepts.iter().any(|a| a.admits(input)) {
                    convert(input)
                } else {
                    let admitted = self.retry_previous(input, |v| {
                        accepts.is_empty() || accepts.iter().any(|a| a.admits(v))
                    })?;
                    convert(&admitted)
                }
            }
            Kind::Union { members, literals, anti } => {
                let hit = match input {
                    Value::Str(s) if literals.iter().any(|l| l == s) => Some(input.clone()),
                    _ => members.iter().find_map(|m| m.do_match(input)),
                };
                match (hit, anti) {
                    (Some(v), false) => Some(v),
                    (None, true) => Some(input.clone()),
                    _ => None,
                }
            }
            Kind::Sequence { kind, inner } => match input {
                Value::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(inner.do_match(item)?);
                    }
                    Some(Value::List(out))
                }
                Value::Str(s) => {
                    let (open, close) = kind.brackets();
                    let body = s.trim().strip_prefix(open)?.strip_suffix(close)?;
                    let mut out = Vec::new();
                    if !body.trim().is_empty() {
                        for piece in body.split(',') {
                            out.push(inner.do_match(&Value::Str(piece.trim().to_owned()))?);
                        }
                    }
                    Some(Value::List(out))
                }
                _ => None,
            },
            Kind::Mapping { key, value } => match input {
                Value::Map(entries) => {
                    let mut out = IndexMap::new();
                    for (k, v) in entries {
                        let vk = key.do_match(&Value::Str(k.clone()))?;
                        out.insert(vk.to_string(), value.do_match(v)?);
                    }
                    Some(Value::Map(out))
                }
                Value::Str(s) => {
                    let body = s.trim().strip_prefix('{')?.strip_suffix('}')?;
                    let mut out = IndexMap::new();
                    if !body.trim().is_empty() {
                        for entry in body.split(',') {
                            let (k, v) = entry
                                .split_once(':')
                                .or_else(|| entry.split_once('='))?;
                            let vk = key.do_match(&Value::Str(k.trim().to_owned()))?;
                            let vv = value.do_match(&Value::Str(v.trim().to_owned()))?;
                            out.insert(vk.to_string(), vv);
                        }
                    }
                    Some(Value::Map(out))
                }
                _ => None,
            },
            Kind::KwBool { name, matcher } => match input {
                Value::Str(s) if matcher.is_match(s) => {
                    let stripped = s.trim_start_matches('-');
                    let negated = stripped
                        .strip_prefix("no")
                        .map(|rest| rest.trim_start_matches('-') == *name)
                        .unwrap_or(false);
                    Some(Value::Bool(!negated))
                }
                _ => None,
            },
        }
    }

    fn retry_previous(&self, input: &Value, admit: impl Fn(&Value) -> bool) -> Option<Value> {
        let previous = self.previous.as_ref()?;
        let produced = previous.do_match(input)?;
        admit(&produced).then_some(produced)
    }
}

fn anchored(expr: &str) -> crate::Result<Regex> {
    Regex::new(&format!("^(?:{expr})$"))
        .map_err(|e| crate::Error::InvalidParam(format!("bad pattern {expr:?}: {e}")))
}

fn capture_value(full: &Regex, caps: &regex::Captures<'_>) -> Value {
    let names: Vec<&str> = full.capture_names().flatten().collect();
    if !names.is_empty() {
        let mut map = IndexMap::new();
        for name in names {
            if let Some(m) = caps.name(name) {
                map.insert(name.to_owned(), Value::Str(m.as_str().to_owned()));
            }
        }
        return Value::Map(map);
    }
    let text = caps
        .get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default();
    Value::Str(text)
}

/// Regex source text used when a bracket-template header names a registered
/// type, e.g. `{n:int}`.
pub(crate) fn regex_source_for(name: &str) -> &'static str {
    match name {
        "str" => ".+",
        "int" => r"\-?\d+",
        "float" => r"\-?\d+\.?\d*",
        "number" => r"\-?\d+(?:\.\d*)?",
        "bool" => "(?i:true|false)",
        "list" => r"\[.+?\]",
        "tuple" => r"\(.+?\)",
        "set" | "dict" => r"\{.+?\}",
        _ => ".+?",
    }
}

static REGISTRY: Lazy<RwLock<IndexMap<String, Pattern>>> = Lazy::new(|| {
    let mut map = IndexMap::new();
    map.insert("any".to_owned(), Pattern::any());
    map.insert("str".to_owned(), Pattern::string());
    map.insert("int".to_owned(), Pattern::int());
    map.insert("float".to_owned(), Pattern::float());
    map.insert("number".to_owned(), Pattern::number());
    map.insert("bool".to_owned(), Pattern::boolean());
    RwLock::new(map)
});

/// Look up a default pattern by name (`"int"`, `"str"`, ...).
pub fn lookup(name: &str) -> Option<Pattern> {
    REGISTRY.read().get(name).cloned()
}

/// Install or replace a named default pattern. Intended for startup-time
/// configuration only; the registry is effectively read-only afterwards.
pub fn register(name: &str, pattern: Pattern) {
    REGISTRY.write().insert(name.to_owned(), pattern);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_accepts_text_and_native() {
        let p = Pattern::int();
        assert_eq!(p.validate(&Value::Str("123".into())), Validated::Valid(Value::Int(123)));
        assert_eq!(p.validate(&Value::Int(-4)), Validated::Valid(Value::Int(-4)));
        assert!(!p.validate(&Value::Str("abc".into())).is_valid());
    }

    #[test]
    fn default_stands_in_for_rejection() {
        let p = Pattern::int();
        let d = Value::Int(7);
        assert_eq!(
            p.validate_with(&Value::Str("abc".into()), Some(&d)),
            Validated::Default(Value::Int(7)),
        );
    }

    #[test]
    fn regex_full_match_only() {
        let p = Pattern::regex(r"\d+").unwrap();
        assert!(p.validate(&Value::Str("42".into())).is_valid());
        assert!(!p.validate(&Value::Str("42x".into())).is_valid());
    }

    #[test]
    fn union_literal_fast_path() {
        let p = Pattern::literals(["add", "del"]);
        assert!(p.validate(&Value::Str("add".into())).is_valid());
        assert!(!p.validate(&Value::Str("set".into())).is_valid());
    }

    #[test]
    fn anti_union_negates() {
        let p = Pattern::anti_union(vec![Pattern::int()]);
        assert!(p.validate(&Value::Str("abc".into())).is_valid());
        assert!(!p.validate(&Value::Str("12".into())).is_valid());
    }

    #[test]
    fn sequence_from_string() {
        let p = Pattern::sequence(SeqKind::List, Pattern::int());
        let got = p.validate(&Value::Str("[1, 2, 3]".into()));
        assert_eq!(
            got,
            Validated::Valid(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
        );
        assert!(!p.validate(&Value::Str("[1, x]".into())).is_valid());
    }

    #[test]
    fn mapping_from_string() {
        let p = Pattern::mapping(Pattern::string(), Pattern::int());
        let got = p.validate(&Value::Str("{a: 1, b=2}".into())).into_value().unwrap();
        let map = got.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
        assert_eq!(map.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn kw_bool_negation_forms() {
        let p = Pattern::kw_bool("color");
        assert_eq!(p.validate(&Value::Str("color".into())), Validated::Valid(Value::Bool(true)));
        assert_eq!(p.validate(&Value::Str("nocolor".into())), Validated::Valid(Value::Bool(false)));
        assert_eq!(
            p.validate(&Value::Str("--no-color".into())),
            Validated::Valid(Value::Bool(false)),
        );
        assert!(!p.validate(&Value::Str("colour".into())).is_valid());
    }

    #[test]
    fn post_validator_downgrades() {
        let p = Pattern::int().with_validator(|v| v.as_int().is_some_and(|i| i > 0));
        assert!(p.validate(&Value::Str("3".into())).is_valid());
        assert!(!p.validate(&Value::Str("-3".into())).is_valid());
    }

    #[test]
    fn previous_preprocesses_rejected_shape() {
        let stringify = Pattern::any_string();
        let p = Pattern::int().with_previous(stringify);
        assert_eq!(p.validate(&Value::Float(5.0)), Validated::Valid(Value::Int(5)));
    }

    #[test]
    fn named_groups_become_map() {
        let p = Pattern::regex_convert(r"(?P<a>\d+)\+(?P<b>\d+)", |v| {
            let m = v.as_map()?;
            let a = m.get("a")?.as_str()?.parse::<i64>().ok()?;
            let b = m.get("b")?.as_str()?.parse::<i64>().ok()?;
            Some(Value::Int(a + b))
        })
        .unwrap();
        assert_eq!(p.validate(&Value::Str("2+3".into())), Validated::Valid(Value::Int(5)));
    }
}
