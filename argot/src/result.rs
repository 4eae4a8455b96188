// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Parse result records: header, option and subcommand matches, and the
//! top-level [`Matches`] object handed to callers.

use indexmap::IndexMap;

use crate::pattern::{Message, Token, Value};

/// How the header phase concluded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadMatch {
    /// The raw token(s) the header consumed.
    pub origin: Value,
    /// The value the header matched them to.
    pub result: Value,
    /// Whether the header matched.
    pub matched: bool,
    /// Named groups captured by template headers.
    pub groups: IndexMap<String, Value>,
}

/// The result of one option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptMatch {
    /// The option's value (action-dependent).
    pub value: Value,
    /// Argument name → matched value.
    pub args: IndexMap<String, Value>,
}

/// The result of one subcommand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMatch {
    /// The subcommand's value.
    pub value: Value,
    /// Argument name → matched value.
    pub args: IndexMap<String, Value>,
    /// Nested option results.
    pub options: IndexMap<String, OptMatch>,
    /// Nested subcommand results.
    pub subcommands: IndexMap<String, SubMatch>,
}

/// The structured result of a parse.
#[derive(Debug, Clone, Default)]
pub struct Matches {
    /// The source command path (`namespace.name`).
    pub source: String,
    /// The original input.
    pub origin: Message,
    /// Whether the parse succeeded.
    pub matched: bool,
    /// Header phase outcome.
    pub header: HeadMatch,
    /// The rendered error, when the parse failed.
    pub error_info: Option<String>,
    /// The unconsumed tokens at failure time.
    pub error_data: Vec<Token>,
    /// The command's own argument results.
    pub main_args: IndexMap<String, Value>,
    /// Flat union of every nested `args` map; filled at finalisation.
    pub other_args: IndexMap<String, Value>,
    /// Option results by dest.
    pub options: IndexMap<String, OptMatch>,
    /// Subcommand results by dest.
    pub subcommands: IndexMap<String, SubMatch>,
    /// The interpolation context active during the parse.
    pub context: IndexMap<String, Value>,
}

impl Matches {
    /// Whether the header matched, regardless of the rest.
    pub fn head_matched(&self) -> bool {
        self.header.matched
    }

    /// Named groups captured by a template header.
    pub fn header_groups(&self) -> &IndexMap<String, Value> {
        &self.header.groups
    }

    /// Every matched argument: main args overlaid with the flattened rest.
    pub fn all_args(&self) -> IndexMap<String, Value> {
        let mut merged = self.main_args.clone();
        for (k, v) in &self.other_args {
            merged.entry(k.clone()).or_insert_with(|| v.clone());
        }
        merged
    }

    /// Flatten every nested `args` map into `other_args`.
    pub(crate) fn unpack(&mut self) {
        fn walk_opts(out: &mut IndexMap<String, Value>, opts: &IndexMap<String, OptMatch>) {
            for opt in opts.values() {
                for (k, v) in &opt.args {
                    out.insert(k.clone(), v.clone());
                }
            }
        }
        fn walk_subs(out: &mut IndexMap<String, Value>, subs: &IndexMap<String, SubMatch>) {
            for sub in subs.values() {
                for (k, v) in &sub.args {
                    out.insert(k.clone(), v.clone());
                }
                walk_opts(out, &sub.options);
                walk_subs(out, &sub.subcommands);
            }
        }
        let mut out = IndexMap::new();
        walk_opts(&mut out, &self.options);
        walk_subs(&mut out, &self.subcommands);
        self.other_args = out;
    }

    /// Look up a dotted path across options, subcommands, argument maps and
    /// the context. `options.foo.args.x`, `foo.x`, `sub.opt.arg` and bare
    /// argument names all resolve.
    pub fn query(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        let (first, rest) = parts.split_first()?;
        match *first {
            "main_args" | "$main" => map_path(&self.main_args, rest),
            "other_args" | "$other" => map_path(&self.other_args, rest),
            "args" => map_path(&self.all_args(), rest),
            "options" => {
                let (name, rest) = rest.split_first()?;
                query_opt(self.options.get(*name)?, rest)
            }
            "subcommands" => {
                let (name, rest) = rest.split_first()?;
                query_sub(self.subcommands.get(*name)?, rest)
            }
            "context" => map_path(&self.context, rest),
            name if self.options.contains_key(name) => query_opt(&self.options[name], rest),
            name if self.subcommands.contains_key(name) => {
                query_sub(&self.subcommands[name], rest)
            }
            name if rest.is_empty() => self
                .main_args
                .get(name)
                .or_else(|| self.other_args.get(name))
                .or_else(|| self.context.get(name))
                .cloned(),
            _ => None,
        }
    }

    /// Whether a dotted path resolves.
    pub fn find(&self, path: &str) -> bool {
        self.query(path).is_some()
    }
}

fn map_path(map: &IndexMap<String, Value>, rest: &[&str]) -> Option<Value> {
    match rest {
        [] => Some(Value::Map(map.clone())),
        [name] => map.get(*name).cloned(),
        _ => None,
    }
}

fn query_opt(opt: &OptMatch, rest: &[&str]) -> Option<Value> {
    match rest {
        [] => Some(opt.value.clone()),
        ["value"] => Some(opt.value.clone()),
        ["args"] => Some(Value::Map(opt.args.clone())),
        ["args", name] => opt.args.get(*name).cloned(),
        [name] => opt.args.get(*name).cloned(),
        _ => None,
    }
}

fn query_sub(sub: &SubMatch, rest: &[&str]) -> Option<Value> {
    match rest {
        [] => Some(sub.value.clone()),
        ["value"] => Some(sub.value.clone()),
        ["args"] => Some(Value::Map(sub.args.clone())),
        ["args", name] => sub.args.get(*name).cloned(),
        _ => {
            let (first, tail) = rest.split_first()?;
            match *first {
                "options" => {
                    let (name, tail) = tail.split_first()?;
                    query_opt(sub.options.get(*name)?, tail)
                }
                "subcommands" => {
                    let (name, tail) = tail.split_first()?;
                    query_sub(sub.subcommands.get(*name)?, tail)
                }
                name if sub.options.contains_key(name) => query_opt(&sub.options[name], tail),
                name if sub.subcommands.contains_key(name) => {
                    query_sub(&sub.subcommands[name], tail)
                }
                name if tail.is_empty() => sub.args.get(name).cloned(),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Matches {
        let mut m = Matches {
            matched: true,
            main_args: IndexMap::from([("foo".to_owned(), Value::Int(1))]),
            ..Matches::default()
        };
        m.options.insert(
            "num".to_owned(),
            OptMatch {
                value: Value::None,
                args: IndexMap::from([("count".to_owned(), Value::Int(222))]),
            },
        );
        let mut user = SubMatch {
            args: IndexMap::from([("name".to_owned(), Value::Str("alice".into()))]),
            ..SubMatch::default()
        };
        user.subcommands.insert(
            "perm".to_owned(),
            SubMatch {
                args: IndexMap::from([("p".to_owned(), Value::Str("read".into()))]),
                ..SubMatch::default()
            },
        );
        m.subcommands.insert("user".to_owned(), user);
        m.unpack();
        m
    }

    #[test]
    fn query_walks_options() {
        let m = sample();
        assert_eq!(m.query("num.count"), Some(Value::Int(222)));
        assert_eq!(m.query("options.num.args.count"), Some(Value::Int(222)));
    }

    #[test]
    fn query_walks_subcommands() {
        let m = sample();
        assert_eq!(m.query("user.name"), Some(Value::Str("alice".into())));
        assert_eq!(m.query("user.perm.p"), Some(Value::Str("read".into())));
        assert_eq!(m.query("subcommands.user.subcommands.perm.args.p"), Some(Value::Str("read".into())));
    }

    #[test]
    fn unpack_flattens_nested_args() {
        let m = sample();
        assert_eq!(m.other_args.get("count"), Some(&Value::Int(222)));
        assert_eq!(m.other_args.get("p"), Some(&Value::Str("read".into())));
        assert_eq!(m.all_args().get("foo"), Some(&Value::Int(1)));
    }

    #[test]
    fn bare_names_fall_through() {
        let m = sample();
        assert_eq!(m.query("foo"), Some(Value::Int(1)));
        assert!(m.find("name"));
        assert!(!m.find("missing"));
    }
}
