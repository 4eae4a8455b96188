// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Schema nodes: options (flags with typed arguments) and subcommands.

use crate::args::Args;
use crate::argv::seps_of;
use crate::error::{Error, Result};
use crate::pattern::Value;

/// How repeated occurrences of an option fold into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Last write wins.
    Store,
    /// Values accumulate into a list.
    Append,
    /// An integer counter accumulates.
    Count,
}

/// The action an option performs on each occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub(crate) kind: ActionKind,
    pub(crate) value: Value,
}

impl Action {
    /// Store the matched value; last occurrence wins.
    pub fn store() -> Self {
        Action { kind: ActionKind::Store, value: Value::None }
    }

    /// Store a fixed value on every occurrence.
    pub fn store_value(value: impl Into<Value>) -> Self {
        Action { kind: ActionKind::Store, value: value.into() }
    }

    /// Store `true` on occurrence.
    pub fn store_true() -> Self {
        Action::store_value(true)
    }

    /// Store `false` on occurrence.
    pub fn store_false() -> Self {
        Action::store_value(false)
    }

    /// Append the matched values into a list.
    pub fn append() -> Self {
        Action { kind: ActionKind::Append, value: Value::List(Vec::new()) }
    }

    /// Add `inc` to a counter on every occurrence. Compact repetition
    /// (`-vvv`) multiplies the increment.
    pub fn count(inc: i64) -> Self {
        Action { kind: ActionKind::Count, value: Value::Int(inc) }
    }

    pub(crate) fn increment(&self) -> i64 {
        self.value.as_int().unwrap_or(1)
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::store()
    }
}

/// Splits `"user perm set|del"` into requires path, canonical name and
/// aliases. The longest `|`-alternate becomes the name.
fn split_name(raw: &str) -> Result<(Vec<String>, String, Vec<String>)> {
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    let last = words.pop().ok_or_else(|| Error::InvalidParam("empty node name".into()))?;
    let requires: Vec<String> = words.into_iter().map(str::to_owned).collect();
    let mut alts: Vec<String> = last.split('|').filter(|s| !s.is_empty()).map(str::to_owned).collect();
    if alts.is_empty() {
        return Err(Error::InvalidParam("empty node name".into()));
    }
    alts.sort_by_key(|a| std::cmp::Reverse(a.len()));
    let name = alts[0].clone();
    let mut aliases = vec![name.clone()];
    aliases.extend(alts.into_iter().skip(1));
    Ok((requires, name, aliases))
}

/// A command option: aliases, an action, typed arguments, and optionally a
/// compact form where the name and first argument share one token.
#[derive(Clone)]
pub struct Opt {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) dest: String,
    pub(crate) args: Args,
    pub(crate) action: Action,
    pub(crate) separators: Vec<char>,
    pub(crate) help_text: String,
    pub(crate) requires: Vec<String>,
    pub(crate) priority: i32,
    pub(crate) soft_keyword: bool,
    pub(crate) compact: bool,
    pub(crate) default: Option<Value>,
}

impl Opt {
    /// Declare an option. `name` may carry `|`-separated alternates
    /// (`"--foo|-f"`) and space-separated leading `requires` words
    /// (`"user perm set"`). Name parsing errors surface when the owning
    /// command is built.
    pub fn new(name: &str) -> Self {
        let (requires, name, aliases) = match split_name(name) {
            Ok(parts) => parts,
            Err(_) => (Vec::new(), String::new(), Vec::new()),
        };
        let dest = name.trim_start_matches('-');
        let dest = if dest.is_empty() { name.clone() } else { dest.to_owned() };
        Opt {
            help_text: dest.clone(),
            name,
            aliases,
            dest,
            args: Args::new(),
            action: Action::store(),
            separators: vec![' '],
            requires,
            priority: 0,
            soft_keyword: false,
            compact: false,
            default: None,
        }
    }

    /// The canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The result key; the name with leading dashes stripped unless
    /// overridden.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// All accepted names, canonical first.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Attach typed arguments.
    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Add an extra alias.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    /// Override the result key.
    pub fn dest_name(mut self, dest: &str) -> Self {
        self.dest = dest.to_owned();
        self
    }

    /// Set the occurrence action.
    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Separator characters between the name and its arguments. An empty
    /// string enables the compact form.
    pub fn separators(mut self, seps: &str) -> Self {
        if seps.is_empty() {
            self.compact = true;
            self.separators = vec![' '];
        } else {
            self.separators = seps_of(seps);
        }
        self
    }

    /// Help line for this option.
    pub fn help(mut self, text: &str) -> Self {
        self.help_text = text.to_owned();
        self
    }

    /// Require these sentence words before the option name.
    pub fn requires<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = words.into_iter().map(Into::into).collect();
        self
    }

    /// Priority among alias-colliding siblings; higher tries first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Allow the name to be consumed as an argument value when context
    /// demands.
    pub fn soft_keyword(mut self) -> Self {
        self.soft_keyword = true;
        self
    }

    /// Allow the first argument to follow the name with no separator.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    /// Default value recorded when the option never occurs.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub(crate) fn nargs(&self) -> usize {
        self.args.len()
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidParam("empty option name".into()));
        }
        self.args.finish()?;
        // Defaults are normalised once against the action kind.
        if let Some(default) = self.default.take() {
            self.default = Some(match (self.action.kind, default) {
                (ActionKind::Append, Value::List(l)) => Value::List(l),
                (ActionKind::Append, single) => Value::List(vec![single]),
                (ActionKind::Count, Value::Int(i)) => Value::Int(i),
                (ActionKind::Count, _) => Value::Int(1),
                (_, other) => other,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Opt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Opt({:?}", self.dest)?;
        if !self.args.is_empty() {
            write!(f, ", args={:?}", self.args)?;
        }
        f.write_str(")")
    }
}

/// A nested command: options, subcommands and its own arguments, compiled
/// into a sub-analyser with its own routing tables.
#[derive(Clone)]
pub struct Subcommand {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) dest: String,
    pub(crate) args: Args,
    pub(crate) separators: Vec<char>,
    pub(crate) help_text: String,
    pub(crate) requires: Vec<String>,
    pub(crate) soft_keyword: bool,
    pub(crate) default: Option<Value>,
    pub(crate) children: Vec<Node>,
}

/// A direct child of a subcommand.
#[derive(Clone, Debug)]
pub enum Node {
    /// An option.
    Opt(Opt),
    /// A nested subcommand.
    Sub(Subcommand),
}

impl Subcommand {
    /// Declare a subcommand. `name` accepts the same alternate / requires
    /// syntax as [`Opt::new`].
    pub fn new(name: &str) -> Self {
        let (requires, name, aliases) = match split_name(name) {
            Ok(parts) => parts,
            Err(_) => (Vec::new(), String::new(), Vec::new()),
        };
        let dest = name.trim_start_matches('-');
        let dest = if dest.is_empty() { name.clone() } else { dest.to_owned() };
        Subcommand {
            help_text: dest.clone(),
            name,
            aliases,
            dest,
            args: Args::new(),
            separators: vec![' '],
            requires,
            soft_keyword: false,
            default: None,
            children: Vec::new(),
        }
    }

    /// The canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The result key.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Attach the subcommand's own arguments.
    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Add an option.
    pub fn option(mut self, opt: Opt) -> Self {
        self.children.push(Node::Opt(opt));
        self
    }

    /// Add a nested subcommand.
    pub fn subcommand(mut self, sub: Subcommand) -> Self {
        self.children.push(Node::Sub(sub));
        self
    }

    /// Add an extra alias.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    /// Separator characters between the name and what follows.
    pub fn separators(mut self, seps: &str) -> Self {
        self.separators = seps_of(seps);
        self
    }

    /// Help line for this subcommand.
    pub fn help(mut self, text: &str) -> Self {
        self.help_text = text.to_owned();
        self
    }

    /// Require these sentence words before the subcommand name.
    pub fn requires<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = words.into_iter().map(Into::into).collect();
        self
    }

    /// Allow the name to be consumed as an argument value when context
    /// demands.
    pub fn soft_keyword(mut self) -> Self {
        self.soft_keyword = true;
        self
    }

    /// Value recorded for the subcommand when entered.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub(crate) fn nargs(&self) -> usize {
        self.args.len()
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidParam("empty subcommand name".into()));
        }
        self.args.finish()?;
        for child in &mut self.children {
            match child {
                Node::Opt(opt) => opt.finish()?,
                Node::Sub(sub) => sub.finish()?,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Subcommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subcommand({:?}, {} children)", self.dest, self.children.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alternates_pick_longest_name() {
        let opt = Opt::new("-i|--index-url");
        assert_eq!(opt.name(), "--index-url");
        assert_eq!(opt.aliases(), &["--index-url".to_owned(), "-i".to_owned()]);
        assert_eq!(opt.dest(), "index-url");
    }

    #[test]
    fn requires_words_split_off() {
        let opt = Opt::new("user perm set");
        assert_eq!(opt.requires, vec!["user".to_owned(), "perm".to_owned()]);
        assert_eq!(opt.name(), "set");
    }

    #[test]
    fn append_default_wraps_once() {
        let mut opt = Opt::new("--tag").action(Action::append()).default("x");
        opt.finish().unwrap();
        assert_eq!(opt.default, Some(Value::List(vec![Value::Str("x".into())])));
        // a second finish must not wrap again
        opt.finish().unwrap();
        assert_eq!(opt.default, Some(Value::List(vec![Value::Str("x".into())])));
    }

    #[test]
    fn count_default_becomes_int() {
        let mut opt = Opt::new("-v").action(Action::count(1)).default("yes");
        opt.finish().unwrap();
        assert_eq!(opt.default, Some(Value::Int(1)));
    }

    #[test]
    fn empty_separators_enable_compact() {
        let opt = Opt::new("bar").separators("");
        assert!(opt.compact);
    }
}
