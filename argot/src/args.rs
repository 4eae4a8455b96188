// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The ordered argument schema: positional, keyword-only and variadic
//! argument declarations with defaults and per-argument separators.

use indexmap::IndexMap;

use crate::argv::seps_of;
use crate::error::{Error, Result};
use crate::pattern::{Pattern, Value};

/// Repetition behaviour of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multi {
    /// Exactly one token.
    #[default]
    Off,
    /// One or more tokens (`+`).
    AtLeastOne,
    /// Zero or more tokens (`*`).
    ZeroOrMore,
    /// At most this many tokens.
    Count(usize),
    /// Consume like `+` and join the pieces with the argument's separator.
    Join,
}

impl Multi {
    /// Whether this is a variadic form.
    pub fn is_var(self) -> bool {
        !matches!(self, Multi::Off)
    }
}

/// Completion guidance attached to an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSource {
    /// A one-line hint.
    Hint(String),
    /// Concrete candidate values.
    Candidates(Vec<String>),
}

/// Per-argument behaviour beyond the pattern itself.
#[derive(Clone, Default)]
pub struct ArgField {
    pub(crate) default: Option<Value>,
    pub(crate) optional: bool,
    pub(crate) hidden: bool,
    pub(crate) kw_only: bool,
    pub(crate) kw_sep: char,
    pub(crate) multi: Multi,
    pub(crate) notice: Option<String>,
    pub(crate) missing_tips: Option<String>,
    pub(crate) unmatch_tips: Option<String>,
    pub(crate) completion: Option<CompletionSource>,
}

impl ArgField {
    pub(crate) fn missing_text(&self, name: &str) -> String {
        self.missing_tips.clone().unwrap_or_else(|| name.to_owned())
    }

    pub(crate) fn unmatch_text(&self, got: &str, fallback: String) -> String {
        match &self.unmatch_tips {
            Some(tips) => tips.replace("{target}", got),
            None => fallback,
        }
    }
}

/// One argument declaration.
#[derive(Clone)]
pub struct Arg {
    pub(crate) name: String,
    pub(crate) pattern: Pattern,
    pub(crate) separators: Vec<char>,
    pub(crate) field: ArgField,
}

impl Arg {
    /// Declare an argument bound to a pattern.
    pub fn new(name: &str, pattern: Pattern) -> Self {
        Arg {
            name: name.to_owned(),
            pattern,
            separators: vec![' '],
            field: ArgField { kw_sep: '=', ..ArgField::default() },
        }
    }

    /// The argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Names starting with `_` are consumed but not reported.
    pub fn anonymous(&self) -> bool {
        self.name.starts_with('_')
    }

    /// Whether a missing token is tolerated.
    pub fn optional(&self) -> bool {
        self.field.optional
    }

    /// Set the default value; it must satisfy the pattern.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.field.default = Some(value.into());
        self
    }

    /// Mark the argument optional.
    pub fn optional_arg(mut self) -> Self {
        self.field.optional = true;
        self
    }

    /// Hide the argument from help output.
    pub fn hidden(mut self) -> Self {
        self.field.hidden = true;
        self
    }

    /// Make the argument keyword-only (bound as `name=value`).
    pub fn keyword_only(mut self) -> Self {
        self.field.kw_only = true;
        self
    }

    /// The key/value separator for keyword binding. Defaults to `=`.
    pub fn kw_sep(mut self, sep: char) -> Self {
        self.field.kw_sep = sep;
        self
    }

    /// Set the repetition behaviour.
    pub fn multi(mut self, multi: Multi) -> Self {
        self.field.multi = multi;
        self
    }

    /// Set the separator characters between this argument and the next.
    pub fn separators(mut self, seps: &str) -> Self {
        self.separators = seps_of(seps);
        self
    }

    /// Attach a short notice shown in help output.
    pub fn notice(mut self, text: &str) -> Self {
        self.field.notice = Some(text.to_owned());
        self
    }

    /// Override the message used when the argument is missing.
    pub fn missing_tips(mut self, text: &str) -> Self {
        self.field.missing_tips = Some(text.to_owned());
        self
    }

    /// Override the message used when a token fails validation;
    /// `{target}` interpolates the offending token.
    pub fn unmatch_tips(mut self, text: &str) -> Self {
        self.field.unmatch_tips = Some(text.to_owned());
        self
    }

    /// Attach a completion hint.
    pub fn completion_hint(mut self, text: &str) -> Self {
        self.field.completion = Some(CompletionSource::Hint(text.to_owned()));
        self
    }

    /// Attach completion candidates.
    pub fn completion<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field.completion =
            Some(CompletionSource::Candidates(candidates.into_iter().map(Into::into).collect()));
        self
    }

    pub(crate) fn is_var_positional(&self) -> bool {
        self.field.multi.is_var() && !self.field.kw_only
    }

    pub(crate) fn is_var_keyword(&self) -> bool {
        self.field.multi.is_var() && self.field.kw_only
    }

    pub(crate) fn is_keyword_only(&self) -> bool {
        self.field.kw_only && !self.field.multi.is_var()
    }
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}': {}", self.name, self.pattern)?;
        if let Some(default) = &self.field.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// The ordered list of argument declarations plus the derived groupings the
/// engine binds in: `normal` → variadic positional → keyword-only →
/// variadic keyword.
#[derive(Clone, Default)]
pub struct Args {
    items: Vec<Arg>,
    normal: Vec<usize>,
    keyword_only: IndexMap<String, usize>,
    var_positional: Option<usize>,
    var_keyword: Option<usize>,
    optional_count: usize,
}

impl Args {
    /// An empty schema.
    pub fn new() -> Self {
        Args::default()
    }

    /// Append an argument. Invariants are checked when the owning node is
    /// built.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.items.push(arg);
        self
    }

    /// Concatenate two schemas; invariants are re-checked at build time.
    pub fn merge(mut self, other: Args) -> Self {
        self.items.extend(other.items);
        self
    }

    /// Apply a separator set to every argument.
    pub fn separators(mut self, seps: &str) -> Self {
        let seps = seps_of(seps);
        for arg in &mut self.items {
            arg.separators = seps.clone();
        }
        self
    }

    /// The number of declared arguments.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no arguments are declared.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items(&self) -> &[Arg] {
        &self.items
    }

    pub(crate) fn normal(&self) -> impl Iterator<Item = &Arg> {
        self.normal.iter().map(|&i| &self.items[i])
    }

    pub(crate) fn var_positional(&self) -> Option<&Arg> {
        self.var_positional.map(|i| &self.items[i])
    }

    pub(crate) fn var_keyword(&self) -> Option<&Arg> {
        self.var_keyword.map(|i| &self.items[i])
    }

    pub(crate) fn keyword_only(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.keyword_only.iter().map(|(k, &i)| (k.as_str(), &self.items[i]))
    }

    pub(crate) fn keyword_only_get(&self, name: &str) -> Option<&Arg> {
        self.keyword_only.get(name).map(|&i| &self.items[i])
    }

    pub(crate) fn keyword_only_len(&self) -> usize {
        self.keyword_only.len()
    }

    pub(crate) fn optional_count(&self) -> usize {
        self.optional_count
    }

    /// Recompute groupings and enforce the structural invariants.
    pub(crate) fn finish(&mut self) -> Result<()> {
        // Duplicate names: first declaration wins.
        let mut seen = std::collections::HashSet::new();
        self.items.retain(|arg| seen.insert(arg.name.clone()));

        self.normal.clear();
        self.keyword_only.clear();
        self.var_positional = None;
        self.var_keyword = None;
        self.optional_count = 0;

        let mut saw_optional = false;
        let mut saw_keyword = false;
        for (i, arg) in self.items.iter().enumerate() {
            if arg.is_var_keyword() {
                if self.var_keyword.is_some() {
                    return Err(Error::InvalidParam(format!(
                        "duplicate variadic keyword argument {}",
                        arg.name
                    )));
                }
                self.var_keyword = Some(i);
            } else if arg.is_var_positional() {
                if self.var_positional.is_some() {
                    return Err(Error::InvalidParam(format!(
                        "duplicate variadic positional argument {}",
                        arg.name
                    )));
                }
                if saw_keyword {
                    return Err(Error::InvalidParam(format!(
                        "variadic positional argument {} after keyword-only arguments",
                        arg.name
                    )));
                }
                self.var_positional = Some(i);
            } else if arg.is_keyword_only() {
                saw_keyword = true;
                self.keyword_only.insert(arg.name.clone(), i);
            } else {
                if saw_keyword {
                    return Err(Error::InvalidParam(format!(
                        "positional argument {} after keyword-only arguments",
                        arg.name
                    )));
                }
                if self.var_positional.is_some() {
                    return Err(Error::InvalidParam(format!(
                        "positional argument {} after a variadic positional",
                        arg.name
                    )));
                }
                let optionalish = arg.field.optional || arg.field.default.is_some();
                if saw_optional && !optionalish {
                    return Err(Error::InvalidParam(format!(
                        "required argument {} after an optional one",
                        arg.name
                    )));
                }
                saw_optional |= optionalish;
                self.normal.push(i);
            }
            if arg.field.optional || arg.field.default.is_some() {
                self.optional_count += 1;
            }
            if let Some(default) = &arg.field.default {
                let skip = default.is_none()
                    || arg.field.multi.is_var()
                    || arg.pattern.is_any()
                    || arg.pattern.is_all();
                if !skip && !arg.pattern.validate(default).is_valid() {
                    return Err(Error::InvalidParam(format!(
                        "default {default} of argument {} does not satisfy {}",
                        arg.name, arg.pattern
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.items.is_empty() {
            return f.write_str("Empty");
        }
        let parts: Vec<String> = self.items.iter().map(|a| format!("{a:?}")).collect();
        write!(f, "Args({})", parts.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn finished(args: Args) -> Result<Args> {
        let mut args = args;
        args.finish()?;
        Ok(args)
    }

    #[test]
    fn groupings_are_derived() {
        let args = finished(
            Args::new()
                .arg(Arg::new("a", Pattern::int()))
                .arg(Arg::new("rest", Pattern::string()).multi(Multi::ZeroOrMore))
                .arg(Arg::new("k", Pattern::string()).keyword_only())
                .arg(Arg::new("kw", Pattern::string()).keyword_only().multi(Multi::ZeroOrMore)),
        )
        .unwrap();
        assert_eq!(args.normal().count(), 1);
        assert_eq!(args.var_positional().unwrap().name(), "rest");
        assert_eq!(args.keyword_only_len(), 1);
        assert_eq!(args.var_keyword().unwrap().name(), "kw");
    }

    #[test]
    fn two_variadic_positionals_rejected() {
        let result = finished(
            Args::new()
                .arg(Arg::new("a", Pattern::string()).multi(Multi::AtLeastOne))
                .arg(Arg::new("b", Pattern::string()).multi(Multi::ZeroOrMore)),
        );
        assert!(matches!(result, Err(Error::InvalidParam(_))));
    }

    #[test]
    fn positional_after_keyword_rejected() {
        let result = finished(
            Args::new()
                .arg(Arg::new("k", Pattern::string()).keyword_only())
                .arg(Arg::new("a", Pattern::string())),
        );
        assert!(matches!(result, Err(Error::InvalidParam(_))));
    }

    #[test]
    fn required_after_optional_rejected() {
        let result = finished(
            Args::new()
                .arg(Arg::new("a", Pattern::string()).optional_arg())
                .arg(Arg::new("b", Pattern::string())),
        );
        assert!(matches!(result, Err(Error::InvalidParam(_))));
    }

    #[test]
    fn default_must_satisfy_pattern() {
        let result = finished(Args::new().arg(Arg::new("n", Pattern::int()).default("abc")));
        assert!(matches!(result, Err(Error::InvalidParam(_))));
        assert!(finished(Args::new().arg(Arg::new("n", Pattern::int()).default(3i64))).is_ok());
    }

    #[test]
    fn duplicate_names_first_wins() {
        let args = finished(
            Args::new()
                .arg(Arg::new("a", Pattern::int()))
                .arg(Arg::new("a", Pattern::string())),
        )
        .unwrap();
        assert_eq!(args.len(), 1);
    }
}
