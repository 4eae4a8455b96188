// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The mutable token cursor used during one parse.
//!
//! An [`Argv`] owns the normalised token stream: text pieces (splittable on
//! the active separator set, quote-aware) interleaved with opaque elements.
//! It supports single-token advance with mid-string splits, rollback,
//! remainder release, token addition, and a stable fingerprint for the
//! result cache.

use std::any::TypeId;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::args::Arg;
use crate::error::{Error, Special};
use crate::pattern::{Message, Token, Value};

/// Result of projecting an opaque element to text.
pub enum Projected {
    /// Keep the element opaque.
    Keep,
    /// Replace the element with this text.
    Text(String),
    /// Drop the element from the stream.
    Skip,
}

/// Projects opaque elements to text (or skips them) during `Argv::build`.
pub type TextProjector = Arc<dyn Fn(&Token) -> Projected + Send + Sync>;

/// Gates whether an input needs normalisation before tokenising.
pub type Checker = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// Normalises a whole input into the host-native message shape.
pub type InputConverter = Arc<dyn Fn(Message) -> Message + Send + Sync>;

/// Rewrites individual elements of a given type before projection.
pub type Preprocessor = Arc<dyn Fn(&Token) -> Option<Token> + Send + Sync>;

/// Interpolation style for context slots in argument positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStyle {
    /// `{name}`
    Bracket,
    /// `$(name)`
    Parentheses,
}

/// What the analyser is currently binding; drives completion prompts.
#[derive(Clone, Default)]
pub(crate) enum Current {
    #[default]
    None,
    /// Binding a concrete argument.
    Arg(Arg),
    /// Entering the named subcommand.
    Sub(usize),
}

/// The parse cursor. Lives for a single `parse` call.
pub struct Argv {
    pub(crate) raw: Vec<Token>,
    pub(crate) bak: Vec<Token>,
    pub(crate) idx: usize,
    pub(crate) ndata: usize,
    pub(crate) separators: Vec<char>,
    pub(crate) filter_crlf: bool,
    pub(crate) message_cache: bool,
    pub(crate) context_style: Option<ContextStyle>,
    pub(crate) fuzzy_match: bool,
    pub(crate) fuzzy_threshold: f32,
    pub(crate) token: u64,
    pub(crate) origin: Message,
    pub(crate) context: IndexMap<String, Value>,
    pub(crate) special: IndexMap<String, Special>,
    pub(crate) completion_names: HashSet<String>,
    pub(crate) disabled: HashSet<Special>,
    pub(crate) remainders: HashSet<String>,
    pub(crate) param_ids: HashSet<String>,
    pub(crate) soft_ids: HashSet<String>,
    pub(crate) error: Option<String>,
    pub(crate) current: Current,
    pub(crate) comp_active: bool,
    next_sep: Option<Vec<char>>,
    to_text: Option<TextProjector>,
    checker: Option<Checker>,
    converter: Option<InputConverter>,
    filter_out: Vec<TypeId>,
    preprocessors: IndexMap<TypeId, Preprocessor>,
}

impl Argv {
    pub(crate) fn new(separators: Vec<char>) -> Self {
        Argv {
            raw: Vec::new(),
            bak: Vec::new(),
            idx: 0,
            ndata: 0,
            separators,
            filter_crlf: true,
            message_cache: true,
            context_style: None,
            fuzzy_match: false,
            fuzzy_threshold: 0.6,
            token: 0,
            origin: Message::default(),
            context: IndexMap::new(),
            special: IndexMap::new(),
            completion_names: HashSet::new(),
            disabled: HashSet::new(),
            remainders: HashSet::new(),
            param_ids: HashSet::new(),
            soft_ids: HashSet::new(),
            error: None,
            current: Current::None,
            comp_active: false,
            next_sep: None,
            to_text: None,
            checker: None,
            converter: None,
            filter_out: Vec::new(),
            preprocessors: IndexMap::new(),
        }
    }

    pub(crate) fn install_hooks(
        &mut self,
        to_text: Option<TextProjector>,
        checker: Option<Checker>,
        converter: Option<InputConverter>,
        filter_out: Vec<TypeId>,
        preprocessors: IndexMap<TypeId, Preprocessor>,
    ) {
        self.to_text = to_text;
        self.checker = checker;
        self.converter = converter;
        self.filter_out = filter_out;
        self.preprocessors = preprocessors;
    }

    /// Whether every token has been consumed.
    pub(crate) fn done(&self) -> bool {
        self.idx == self.ndata
    }

    /// Normalise `data` into the token stream.
    pub(crate) fn build(&mut self, data: Message) -> Result<(), Error> {
        self.reset();
        let data = match &self.checker {
            Some(checker) if !checker(&data) => match &self.converter {
                Some(converter) => converter(data),
                None => return Err(Error::UnexpectedElement(format!("{data:?}"))),
            },
            _ => data,
        };
        self.origin = data.clone();
        let mut count = 0usize;
        for unit in data.0 {
            if let Some(id) = unit.type_id_of() {
                if self.filter_out.contains(&id) {
                    continue;
                }
            }
            let unit = match unit.type_id_of().and_then(|id| self.preprocessors.get(&id)) {
                Some(proc) => proc(&unit).unwrap_or(unit),
                None => unit,
            };
            let projected = match (&self.to_text, &unit) {
                (Some(project), Token::Opaque(_)) => project(&unit),
                _ => Projected::Keep,
            };
            match projected {
                Projected::Skip => continue,
                Projected::Text(text) => {
                    let text = text.trim().to_owned();
                    if text.is_empty() {
                        continue;
                    }
                    self.raw.push(Token::Text(text));
                }
                Projected::Keep => match unit {
                    Token::Text(text) => {
                        let text = text.trim().to_owned();
                        if text.is_empty() {
                            continue;
                        }
                        self.raw.push(Token::Text(text));
                    }
                    elem => self.raw.push(elem),
                },
            }
            count += 1;
        }
        if count < 1 {
            return Err(Error::NullMessage(format!("{:?}", self.origin)));
        }
        self.ndata = self.raw.len();
        self.bak = self.raw.clone();
        if self.message_cache {
            self.token = fingerprint(&self.raw);
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.raw.clear();
        self.bak.clear();
        self.idx = 0;
        self.ndata = 0;
        self.token = 0;
        self.origin = Message::default();
        self.next_sep = None;
        self.error = None;
        self.current = Current::None;
    }

    /// Append tokens, optionally merging adjacent text with the primary
    /// separator.
    pub(crate) fn addon<I>(&mut self, data: I, merge_str: bool)
    where
        I: IntoIterator<Item = Token>,
    {
        let sep = self.separators.first().copied().unwrap_or(' ');
        for (i, unit) in data.into_iter().enumerate() {
            let unit = match unit {
                Token::Text(text) => {
                    let text = text.trim().to_owned();
                    if text.is_empty() {
                        continue;
                    }
                    Token::Text(text)
                }
                elem => elem,
            };
            match (&unit, self.raw.last_mut()) {
                (Token::Text(text), Some(Token::Text(last))) if merge_str && i > 0 => {
                    last.push(sep);
                    last.push_str(text);
                }
                _ => {
                    self.raw.push(unit);
                    self.ndata += 1;
                }
            }
        }
        self.bak = self.raw.clone();
        self.ndata = self.raw.len();
        if self.message_cache {
            self.token = fingerprint(&self.raw);
        }
    }

    /// Advance and yield the next logical token; `(Text(""), true)` at end.
    pub(crate) fn next(&mut self, seps: Option<&[char]>) -> (Token, bool) {
        self.next_inner(seps, true)
    }

    /// Yield the next logical token without advancing.
    pub(crate) fn peek(&mut self, seps: Option<&[char]>) -> (Token, bool) {
        self.next_inner(seps, false)
    }

    fn next_inner(&mut self, seps: Option<&[char]>, advance: bool) -> (Token, bool) {
        if advance {
            self.next_sep = None;
        }
        if self.idx == self.ndata {
            return (Token::Text(String::new()), true);
        }
        let seps: Vec<char> = seps.unwrap_or(&self.separators).to_vec();
        match &self.raw[self.idx] {
            Token::Text(text) => {
                let (head, rest) = split_once(text, &seps, self.filter_crlf);
                if advance {
                    if rest.is_empty() {
                        self.idx += 1;
                    } else {
                        self.raw[self.idx] = Token::Text(rest);
                        self.next_sep = Some(seps);
                    }
                }
                (Token::Text(head), true)
            }
            elem => {
                let elem = elem.clone();
                if advance {
                    self.idx += 1;
                }
                (elem, false)
            }
        }
    }

    /// Put a consumed token back; with `replace`, overwrite the slot it
    /// rolls back into.
    pub(crate) fn rollback(&mut self, data: Token, replace: bool) {
        if data.is_empty_text() {
            return;
        }
        if let Some(seps) = self.next_sep.take() {
            // Undo a mid-string split: re-join with the separator, quoting
            // the piece if it now contains one.
            let sep = seps.first().copied().unwrap_or(' ');
            if let (Token::Text(piece), Some(Token::Text(rest))) =
                (&data, self.raw.get(self.idx))
            {
                let piece = if piece.contains(sep) && !piece.starts_with(['\'', '"']) {
                    format!("'{piece}'")
                } else {
                    piece.clone()
                };
                self.raw[self.idx] = Token::Text(format!("{piece}{sep}{rest}"));
                return;
            }
        }
        if self.idx >= 1 {
            self.idx -= 1;
        }
        if replace {
            self.raw[self.idx] = data;
        }
    }

    /// The remaining (or, with `recover`, the complete) token list.
    pub(crate) fn release(
        &self,
        seps: Option<&[char]>,
        recover: bool,
        no_split: bool,
    ) -> Vec<Token> {
        let seps: Vec<char> = seps.map(|s| s.to_vec()).unwrap_or_else(|| vec![' ']);
        let source: &[Token] = if recover { &self.bak } else { &self.raw[self.idx.min(self.raw.len())..] };
        let mut out = Vec::new();
        for unit in source {
            match unit {
                Token::Text(text) if text.is_empty() => continue,
                Token::Text(text) if !no_split => {
                    out.extend(
                        split(text, &seps, self.filter_crlf).into_iter().map(Token::Text),
                    );
                }
                other => out.push(other.clone()),
            }
        }
        out
    }

    /// Snapshot for speculative matching.
    pub(crate) fn snapshot(&self) -> (Vec<Token>, usize) {
        (self.raw.clone(), self.idx)
    }

    /// Restore a snapshot taken with [`Argv::snapshot`].
    pub(crate) fn restore(&mut self, data: Vec<Token>, idx: usize) {
        self.raw = data;
        self.idx = idx;
        self.next_sep = None;
    }

    /// Record the first error encountered; later successes keep it.
    pub(crate) fn note_error(&mut self, error: &Error) {
        if self.error.is_none() {
            self.error = Some(error.to_string());
        }
    }

    /// Install an interpolation context for this parse.
    pub(crate) fn enter(&mut self, ctx: IndexMap<String, Value>) {
        self.context = ctx;
    }

    /// Drop and return the interpolation context.
    pub(crate) fn exit(&mut self) -> IndexMap<String, Value> {
        std::mem::take(&mut self.context)
    }
}

/// Stable hash of a token stream; opaque elements hash by identity.
pub(crate) fn fingerprint(tokens: &[Token]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for token in tokens {
        match token {
            Token::Text(s) => {
                0u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
            Token::Opaque(a) => {
                1u8.hash(&mut hasher);
                (Arc::as_ptr(a) as *const () as usize).hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

fn is_sep(c: char, seps: &[char], crlf: bool) -> bool {
    seps.contains(&c) || (crlf && (c == '\n' || c == '\r'))
}

/// Split one logical token off `text`. Quote pairs protect separators; the
/// outer quotes of a fully-quoted piece are stripped. Returns the piece and
/// the rest with leading separators removed.
pub(crate) fn split_once(text: &str, seps: &[char], crlf: bool) -> (String, String) {
    let mut out = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut rest_start = text.len();
    for (i, c) in text.char_indices() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(q) if q == c => quote = None,
                Some(_) => out.push(c),
                None if out.is_empty() => quote = Some(c),
                None => out.push(c),
            },
            _ if quote.is_none() && is_sep(c, seps, crlf) => {
                rest_start = i + c.len_utf8();
                break;
            }
            _ => out.push(c),
        }
    }
    let rest = text[rest_start.min(text.len())..]
        .trim_start_matches(|c: char| is_sep(c, seps, crlf))
        .to_owned();
    (out, rest)
}

/// Split `text` into every logical token, dropping empties.
pub(crate) fn split(text: &str, seps: &[char], crlf: bool) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text.to_owned();
    while !rest.is_empty() {
        let (head, tail) = split_once(&rest, seps, crlf);
        if !head.is_empty() {
            out.push(head);
        }
        if tail == rest {
            break;
        }
        rest = tail;
    }
    out
}

/// Separator strings are treated as character sets, like the schema
/// builders do.
pub(crate) fn seps_of(s: &str) -> Vec<char> {
    if s.is_empty() { vec![' '] } else { s.chars().collect() }
}

#[cfg(test)]
mod test {
    use super::*;

    fn argv_with(text: &str) -> Argv {
        let mut argv = Argv::new(vec![' ']);
        argv.build(Message::from(text)).unwrap();
        argv
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(
            split("a 'b c' d", &[' '], true),
            vec!["a".to_owned(), "b c".to_owned(), "d".to_owned()],
        );
    }

    #[test]
    fn split_once_returns_rest() {
        let (head, rest) = split_once("foo  bar baz", &[' '], true);
        assert_eq!(head, "foo");
        assert_eq!(rest, "bar baz");
    }

    #[test]
    fn next_walks_logical_tokens() {
        let mut argv = argv_with("core 123 abc");
        assert_eq!(argv.next(None).0, Token::Text("core".into()));
        assert_eq!(argv.next(None).0, Token::Text("123".into()));
        assert_eq!(argv.next(None).0, Token::Text("abc".into()));
        assert!(argv.next(None).0.is_empty_text());
    }

    #[test]
    fn rollback_restores_mid_split() {
        let mut argv = argv_with("core rest");
        let (head, _) = argv.next(None);
        argv.rollback(head, false);
        assert_eq!(argv.next(None).0, Token::Text("core".into()));
    }

    #[test]
    fn rollback_replace_overwrites() {
        let mut argv = argv_with("bar42");
        let (head, _) = argv.next(None);
        assert_eq!(head, Token::Text("bar42".into()));
        argv.rollback(Token::Text("42".into()), true);
        assert_eq!(argv.next(None).0, Token::Text("42".into()));
    }

    #[test]
    fn release_splits_remainder() {
        let mut argv = argv_with("core a b");
        argv.next(None);
        let rest = argv.release(None, false, false);
        assert_eq!(rest, vec![Token::Text("a".into()), Token::Text("b".into())]);
    }

    #[test]
    fn opaque_elements_interleave() {
        let elem = Token::opaque(42u32);
        let mut argv = Argv::new(vec![' ']);
        argv.build(Message(vec![Token::Text("core x".into()), elem.clone()])).unwrap();
        assert_eq!(argv.next(None).0, Token::Text("core".into()));
        assert_eq!(argv.next(None).0, Token::Text("x".into()));
        let (got, is_text) = argv.next(None);
        assert!(!is_text);
        assert_eq!(got, elem);
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = argv_with("core 1 2");
        let b = argv_with("core 1 2");
        assert_eq!(fingerprint(&a.raw), fingerprint(&b.raw));
    }

    #[test]
    fn empty_message_is_rejected() {
        let mut argv = Argv::new(vec![' ']);
        assert!(matches!(argv.build(Message::from("   ")), Err(Error::NullMessage(_))));
    }
}
