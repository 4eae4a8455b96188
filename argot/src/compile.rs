// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The compiler: walks a command schema into an arena of per-subcommand
//! routing tables. Arena indices stand in for parent/child references so
//! the tables own no cycles.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::args::Args;
use crate::error::Result;
use crate::node::{ActionKind, Node, Opt, Subcommand};
use crate::pattern::Value;

/// A routing table entry.
#[derive(Debug, Clone)]
pub(crate) enum Param {
    /// A single option, by index into the owning unit's `opts`.
    Opt(usize),
    /// Alias-colliding options, sorted by descending priority.
    OptList(Vec<usize>),
    /// A subcommand, by unit arena index.
    Sub(usize),
    /// A fragment of a multi-word `requires` path.
    Sentence,
}

/// A node that must be retried as a prefix match when lookup fails.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CompactRef {
    Opt(usize),
    Sub(usize),
}

/// One compiled subcommand level: the node's own data plus its routing
/// tables.
pub(crate) struct Unit {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) dest: String,
    pub(crate) args: Args,
    pub(crate) separators: Vec<char>,
    pub(crate) requires: Vec<String>,
    pub(crate) soft_keyword: bool,
    pub(crate) default: Option<Value>,
    pub(crate) opts: Vec<Opt>,
    pub(crate) params: IndexMap<String, Param>,
    pub(crate) compact_params: Vec<CompactRef>,
    pub(crate) sub_units: Vec<usize>,
    pub(crate) need_main_args: bool,
    pub(crate) default_main_only: bool,
}

/// A compiled command: the unit arena (root at index 0) and the flat
/// param-id sets consulted by variadic cutoffs.
pub(crate) struct Compiled {
    pub(crate) units: Vec<Unit>,
    pub(crate) param_ids: HashSet<String>,
    pub(crate) soft_ids: HashSet<String>,
}

impl Compiled {
    pub(crate) fn root(&self) -> &Unit {
        &self.units[0]
    }
}

fn seps_superset(parent: &[char], child: &[char]) -> bool {
    child.iter().all(|c| parent.contains(c))
}

fn register_opt(params: &mut IndexMap<String, Param>, opts: &[Opt], idx: usize) {
    let by_priority = |list: &mut Vec<usize>| {
        list.sort_by_key(|&i| std::cmp::Reverse(opts[i].priority));
    };
    for alias in opts[idx].aliases.clone() {
        match params.get_mut(&alias) {
            None => {
                params.insert(alias, Param::Opt(idx));
            }
            Some(Param::Sub(_)) => continue,
            Some(Param::Sentence) => {
                params.insert(alias, Param::Opt(idx));
            }
            Some(Param::OptList(list)) => {
                list.push(idx);
                by_priority(list);
            }
            Some(Param::Opt(prev)) => {
                let mut list = vec![*prev, idx];
                by_priority(&mut list);
                params.insert(alias, Param::OptList(list));
            }
        }
    }
}

fn build_unit(
    sub: &Subcommand,
    units: &mut Vec<Unit>,
    param_ids: &mut HashSet<String>,
    soft_ids: &mut HashSet<String>,
) -> Result<usize> {
    let nargs = sub.nargs();
    let defaulted =
        sub.args.items().iter().filter(|a| a.field.default.is_some()).count();
    let unit = Unit {
        name: sub.name.clone(),
        aliases: sub.aliases.clone(),
        dest: sub.dest.clone(),
        args: sub.args.clone(),
        separators: sub.separators.clone(),
        requires: sub.requires.clone(),
        soft_keyword: sub.soft_keyword,
        default: sub.default.clone(),
        opts: Vec::new(),
        params: IndexMap::new(),
        compact_params: Vec::new(),
        sub_units: Vec::new(),
        need_main_args: nargs > 0 && nargs > sub.args.optional_count(),
        default_main_only: nargs > 0 && defaulted == nargs,
    };
    let idx = units.len();
    units.push(unit);

    let mut opts = Vec::new();
    let mut params = IndexMap::new();
    let mut compact_params = Vec::new();
    let mut sub_units = Vec::new();

    for child in &sub.children {
        match child {
            Node::Opt(opt) => {
                let opt_idx = opts.len();
                opts.push(opt.clone());
                if opt.compact
                    || opt.action.kind == ActionKind::Count
                    || !seps_superset(&sub.separators, &opt.separators)
                {
                    compact_params.push(CompactRef::Opt(opt_idx));
                }
                register_opt(&mut params, &opts, opt_idx);
                param_ids.extend(opt.aliases.iter().cloned());
                if opt.soft_keyword {
                    soft_ids.extend(opt.aliases.iter().cloned());
                }
                if !opt.requires.is_empty() {
                    param_ids.extend(opt.requires.iter().cloned());
                    for word in &opt.requires {
                        params.entry(word.clone()).or_insert(Param::Sentence);
                    }
                }
            }
            Node::Sub(nested) => {
                let child_idx = build_unit(nested, units, param_ids, soft_ids)?;
                sub_units.push(child_idx);
                for alias in &nested.aliases {
                    params.insert(alias.clone(), Param::Sub(child_idx));
                }
                param_ids.extend(nested.aliases.iter().cloned());
                if nested.soft_keyword {
                    soft_ids.extend(nested.aliases.iter().cloned());
                }
                if !seps_superset(&sub.separators, &nested.separators) {
                    compact_params.push(CompactRef::Sub(child_idx));
                }
                if !nested.requires.is_empty() {
                    param_ids.extend(nested.requires.iter().cloned());
                    for word in &nested.requires {
                        params.entry(word.clone()).or_insert(Param::Sentence);
                    }
                }
            }
        }
    }

    let unit = &mut units[idx];
    unit.opts = opts;
    unit.params = params;
    unit.compact_params = compact_params;
    unit.sub_units = sub_units;
    Ok(idx)
}

/// Compile a (finished) schema tree into routing tables. Idempotent: the
/// output depends only on the tree.
pub(crate) fn compile(root: &Subcommand) -> Result<Compiled> {
    let mut units = Vec::new();
    let mut param_ids = HashSet::new();
    let mut soft_ids = HashSet::new();
    build_unit(root, &mut units, &mut param_ids, &mut soft_ids)?;
    log::debug!(
        "compiled {} into {} unit(s), {} param id(s)",
        root.name,
        units.len(),
        param_ids.len()
    );
    Ok(Compiled { units, param_ids, soft_ids })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::args::Arg;
    use crate::node::Action;
    use crate::pattern::Pattern;

    fn schema() -> Subcommand {
        let mut root = Subcommand::new("root")
            .option(Opt::new("--foo|-f").args(Args::new().arg(Arg::new("x", Pattern::int()))))
            .option(Opt::new("-v").action(Action::count(1)))
            .option(Opt::new("user perm set"))
            .subcommand(Subcommand::new("sub").option(Opt::new("--bar")));
        root.finish().unwrap();
        root
    }

    #[test]
    fn aliases_route_to_the_same_option() {
        let compiled = compile(&schema()).unwrap();
        let root = compiled.root();
        let Some(Param::Opt(a)) = root.params.get("--foo") else { panic!("missing --foo") };
        let Some(Param::Opt(b)) = root.params.get("-f") else { panic!("missing -f") };
        assert_eq!(a, b);
    }

    #[test]
    fn count_options_are_compact_candidates() {
        let compiled = compile(&schema()).unwrap();
        assert!(compiled
            .root()
            .compact_params
            .iter()
            .any(|c| matches!(c, CompactRef::Opt(i) if compiled.root().opts[*i].name() == "-v")));
    }

    #[test]
    fn requires_words_become_sentences() {
        let compiled = compile(&schema()).unwrap();
        assert!(matches!(compiled.root().params.get("user"), Some(Param::Sentence)));
        assert!(matches!(compiled.root().params.get("perm"), Some(Param::Sentence)));
        assert!(matches!(compiled.root().params.get("set"), Some(Param::Opt(_))));
    }

    #[test]
    fn nested_subcommands_get_their_own_unit() {
        let compiled = compile(&schema()).unwrap();
        let Some(Param::Sub(idx)) = compiled.root().params.get("sub") else {
            panic!("missing sub")
        };
        assert!(matches!(compiled.units[*idx].params.get("--bar"), Some(Param::Opt(_))));
        assert!(compiled.param_ids.contains("--bar"));
    }

    #[test]
    fn colliding_aliases_sort_by_priority() {
        let mut root = Subcommand::new("root")
            .option(Opt::new("-u").priority(1).dest_name("low"))
            .option(Opt::new("-u").priority(5).dest_name("high"));
        root.finish().unwrap();
        let compiled = compile(&root).unwrap();
        let Some(Param::OptList(list)) = compiled.root().params.get("-u") else {
            panic!("expected a list")
        };
        assert_eq!(compiled.root().opts[list[0]].dest(), "high");
    }
}
