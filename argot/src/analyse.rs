// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The analyser: a state machine driving one parse over the compiled
//! routing tables. Header phase, body phase (options / subcommands /
//! arguments interleaved, with backtracking), finalisation and result
//! assembly.

use indexmap::IndexMap;

use crate::args::{Arg, Args, CompletionSource};
use crate::argv::{Argv, Current};
use crate::compile::{CompactRef, Compiled, Param};
use crate::complete::Prompt;
use crate::error::{Error, PauseKind, PauseState, Result, Special};
use crate::handlers::{
    analyse_args, analyse_header, fold_option, fuzzy_suggest, handle_opt, special_of,
};
use crate::header::Header;
use crate::help::param_display;
use crate::output;
use crate::pattern::{Pattern, Token, Value};
use crate::result::{HeadMatch, Matches, OptMatch, SubMatch};

/// Command-level services the analyser calls back into.
pub(crate) trait Host {
    /// The command path, `namespace.name`.
    fn path(&self) -> String;
    /// The command name; the output channel key.
    fn command_name(&self) -> &str;
    /// Render help for the node named by `parts` (empty: the command).
    fn help_text(&self, parts: &[String]) -> String;
    /// Apply the inline shortcut DSL; returns the feedback message.
    fn shortcut_dsl(
        &self,
        action: Option<&str>,
        name: Option<&str>,
        command: Option<&str>,
    ) -> String;
}

/// Per-unit accumulation during one parse.
#[derive(Default)]
struct UnitState {
    args: IndexMap<String, Value>,
    options: IndexMap<String, OptMatch>,
    subcommands: IndexMap<String, SubMatch>,
    sentences: Vec<String>,
    value: Value,
}

/// One parse in flight. Constructed fresh per `parse` call.
pub(crate) struct Driver<'a> {
    compiled: &'a Compiled,
    header: &'a Header,
    host: &'a dyn Host,
    raise_exception: bool,
    strict: bool,
    states: Vec<UnitState>,
    head: Option<HeadMatch>,
}

impl<'a> Driver<'a> {
    pub(crate) fn new(
        compiled: &'a Compiled,
        header: &'a Header,
        host: &'a dyn Host,
        raise_exception: bool,
        strict: bool,
    ) -> Self {
        let states = compiled.units.iter().map(|_| UnitState::default()).collect();
        Driver { compiled, header, host, raise_exception, strict, states, head: None }
    }

    /// Run the full pipeline over a prepared argv.
    ///
    /// `Err(InvalidHeader)` is left for the caller, which may rewrite the
    /// input through a shortcut and retry; every other failure is resolved
    /// here per the `raise_exception` policy.
    pub(crate) fn process(&mut self, argv: &mut Argv) -> Result<Matches> {
        match analyse_header(self.header, argv) {
            Ok(head) => {
                log::debug!("{}: header matched {:?}", self.host.command_name(), head.result);
                self.head = Some(head);
            }
            Err(e @ Error::InvalidHeader(_)) => return Err(e),
            Err(e @ Error::FuzzyMatchSuccess { .. }) => {
                output::send(self.host.command_name(), || e.to_string());
                return Ok(self.export_fail(argv, Some(&e)));
            }
            Err(e) => return self.fail(argv, e),
        }

        if let Err(e) = self.run_root(argv) {
            return self.on_body_error(argv, e);
        }

        let root = self.compiled.root();
        if argv.done() && (!root.need_main_args || !self.states[0].args.is_empty()) {
            return Ok(self.export_ok(argv));
        }

        let rest = argv.release(None, false, false);
        if !rest.is_empty() {
            if let Some(Token::Text(last)) = rest.last() {
                if argv.completion_names.contains(last) {
                    let last = last.clone();
                    trim_completion_tail(argv, &last);
                    return self.handle_completion(argv, None);
                }
            }
            let (token, _) = argv.peek(None);
            let e = Error::ParamsUnmatched(token.to_string());
            return self.on_tail_error(argv, e);
        }
        let e = Error::ArgumentMissing(format!("{} requires main arguments", root.dest));
        self.on_tail_error(argv, e)
    }

    fn run_root(&mut self, argv: &mut Argv) -> Result<()> {
        loop {
            match self.analyse_param(argv, 0, None, !self.strict)? {
                true => {
                    if argv.done() {
                        break;
                    }
                }
                false => break,
            }
        }
        let root = self.compiled.root();
        if root.default_main_only && self.states[0].args.is_empty() {
            self.states[0].args = analyse_args(argv, &root.args)?;
        }
        Ok(())
    }

    /// One step of the body loop. `Ok(false)` yields back to the caller.
    fn analyse_param(
        &mut self,
        argv: &mut Argv,
        unit: usize,
        seps: Option<&[char]>,
        extra_allow: bool,
    ) -> Result<bool> {
        let (token, is_str) = argv.peek(seps);
        let text = match token.as_text() {
            Some(t) if is_str && !t.is_empty() => Some(t.to_owned()),
            _ => None,
        };
        if let Some(t) = &text {
            if let Some(kind) = special_of(argv, t) {
                if kind == Special::Completion {
                    if let Some(Token::Text(s)) = argv.bak.get_mut(argv.idx) {
                        *s = s.replace(t.as_str(), "").trim().to_owned();
                    }
                }
                return Err(Error::SpecialOptionTriggered(kind));
            }
        }
        let compiled = self.compiled;
        let unit_ref = &compiled.units[unit];
        let param = text.as_ref().and_then(|t| unit_ref.params.get(t).cloned());

        // Soft keywords: try the node, fall back to argument binding.
        if let (Some(t), Some(p)) = (&text, &param) {
            if compiled.soft_ids.contains(t)
                && !unit_ref.args.is_empty()
                && self.states[unit].args.is_empty()
            {
                let (raw, idx) = argv.snapshot();
                match self.dispatch_param(argv, unit, p.clone()) {
                    Ok(()) => {
                        self.states[unit].sentences.clear();
                        argv.current = Current::None;
                        return Ok(true);
                    }
                    Err(e) if e.is_control() => return Err(e),
                    Err(e) => {
                        log::trace!("soft keyword {t} fell back to argument binding: {e}");
                        argv.note_error(&e);
                        argv.restore(raw, idx);
                        if let Param::Sub(sidx) = &p {
                            let dest = compiled.units[*sidx].dest.clone();
                            self.states[unit].subcommands.shift_remove(&dest);
                        }
                    }
                }
                let result = analyse_args(argv, &unit_ref.args)?;
                if !result.is_empty() {
                    self.states[unit].args = result;
                    argv.current = Current::None;
                    return Ok(true);
                }
                return Ok(false);
            }
        }

        if param.is_none() && !unit_ref.compact_params.is_empty() && self.try_compacts(argv, unit)?
        {
            argv.current = Current::None;
            return Ok(true);
        }
        if param.is_none() && !unit_ref.args.is_empty() && self.states[unit].args.is_empty() {
            let result = analyse_args(argv, &unit_ref.args)?;
            if !result.is_empty() {
                self.states[unit].args = result;
                argv.current = Current::None;
                return Ok(true);
            }
        }
        let Some(param) = param else {
            if extra_allow {
                if let Some(t) = text {
                    match self.states[unit].args.get_mut("$extra") {
                        Some(Value::List(list)) => list.push(Value::Str(t)),
                        _ => {
                            self.states[unit]
                                .args
                                .insert("$extra".to_owned(), Value::List(vec![Value::Str(t)]));
                        }
                    }
                    argv.next(seps);
                    return Ok(true);
                }
            }
            return Ok(false);
        };
        if matches!(param, Param::Sentence) {
            let (token, _) = argv.next(seps);
            if let Some(word) = token.as_text() {
                self.states[unit].sentences.push(word.to_owned());
            }
            return Ok(true);
        }
        self.dispatch_param(argv, unit, param)?;
        self.states[unit].sentences.clear();
        argv.current = Current::None;
        Ok(true)
    }

    fn require_error(&self, unit: usize, name: &str, requires: &[String]) -> Error {
        Error::InvalidParam(format!(
            "{name} requires \"{}\", got \"{}\"",
            requires.join(" "),
            self.states[unit].sentences.join(" ")
        ))
    }

    fn dispatch_param(&mut self, argv: &mut Argv, unit: usize, param: Param) -> Result<()> {
        let compiled = self.compiled;
        match param {
            Param::Opt(i) => {
                let opt = &compiled.units[unit].opts[i];
                if !opt.requires.is_empty() && self.states[unit].sentences != opt.requires {
                    return Err(self.require_error(unit, &opt.name, &opt.requires));
                }
                let (dest, fresh) = handle_opt(argv, opt)?;
                fold_option(&mut self.states[unit].options, opt, dest, fresh);
                Ok(())
            }
            Param::OptList(list) => {
                let mut last = None;
                for i in list {
                    let opt = &compiled.units[unit].opts[i];
                    let (raw, idx) = argv.snapshot();
                    if !opt.requires.is_empty() && self.states[unit].sentences != opt.requires {
                        last = Some(self.require_error(unit, &opt.name, &opt.requires));
                        continue;
                    }
                    self.states[unit].sentences.clear();
                    match handle_opt(argv, opt) {
                        Ok((dest, fresh)) => {
                            fold_option(&mut self.states[unit].options, opt, dest, fresh);
                            last = None;
                            break;
                        }
                        Err(e) if e.is_control() => return Err(e),
                        Err(e) => {
                            argv.note_error(&e);
                            argv.restore(raw, idx);
                            last = Some(e);
                        }
                    }
                }
                match last {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
            Param::Sub(idx) => {
                let sub = &compiled.units[idx];
                if !sub.requires.is_empty() && self.states[unit].sentences != sub.requires {
                    return Err(self.require_error(unit, &sub.name, &sub.requires));
                }
                self.enter_sub(argv, unit, idx)
            }
            Param::Sentence => Ok(()),
        }
    }

    fn enter_sub(&mut self, argv: &mut Argv, parent: usize, idx: usize) -> Result<()> {
        let dest = self.compiled.units[idx].dest.clone();
        match self.process_sub(argv, idx) {
            Ok(()) => {
                let result = self.take_sub(idx);
                self.states[parent].subcommands.insert(dest, result);
                Ok(())
            }
            Err(e) if e.is_control() => {
                self.take_sub(idx);
                Err(e)
            }
            Err(e) => {
                let at_entry = matches!(argv.current, Current::Sub(i) if i == idx);
                let partial = self.take_sub(idx);
                if !(matches!(e, Error::InvalidParam(_)) && at_entry) {
                    // keep what the subcommand managed to bind
                    self.states[parent].subcommands.insert(dest, partial);
                }
                Err(e)
            }
        }
    }

    fn process_sub(&mut self, argv: &mut Argv, idx: usize) -> Result<()> {
        argv.current = Current::Sub(idx);
        let compiled = self.compiled;
        let unit = &compiled.units[idx];
        let (token, _) = argv.next(Some(&unit.separators));
        let name = token.as_text().unwrap_or_default().to_owned();
        if name != unit.name && !unit.aliases.iter().any(|a| a == &name) {
            if argv.fuzzy_match {
                if let Some(hit) = fuzzy_suggest(argv.fuzzy_threshold, &name, &unit.aliases) {
                    return Err(Error::FuzzyMatchSuccess { input: name, suggestion: hit });
                }
            }
            return Err(Error::ParamsUnmatched(format!(
                "{name} is not the name of subcommand {}",
                unit.name
            )));
        }
        self.states[idx].value = unit.default.clone().unwrap_or(Value::None);
        loop {
            if !self.analyse_param(argv, idx, Some(&unit.separators), false)? {
                break;
            }
        }
        if unit.default_main_only && self.states[idx].args.is_empty() {
            self.states[idx].args = analyse_args(argv, &unit.args)?;
        }
        if self.states[idx].args.is_empty() && unit.need_main_args {
            return Err(Error::ArgumentMissing(format!(
                "subcommand {} requires main arguments",
                unit.dest
            )));
        }
        Ok(())
    }

    fn try_compacts(&mut self, argv: &mut Argv, unit: usize) -> Result<bool> {
        let compiled = self.compiled;
        let candidates = compiled.units[unit].compact_params.clone();
        for candidate in candidates {
            let (raw, idx) = argv.snapshot();
            match candidate {
                CompactRef::Opt(i) => {
                    let opt = &compiled.units[unit].opts[i];
                    if !opt.requires.is_empty() && self.states[unit].sentences != opt.requires {
                        return Err(self.require_error(unit, &opt.name, &opt.requires));
                    }
                    match handle_opt(argv, opt) {
                        Ok((dest, fresh)) => {
                            fold_option(&mut self.states[unit].options, opt, dest, fresh);
                            return Ok(true);
                        }
                        Err(e) if e.is_control() => return Err(e),
                        Err(e @ Error::InvalidParam(_))
                            if matches!(argv.current, Current::Arg(_)) =>
                        {
                            return Err(e);
                        }
                        Err(e) => {
                            log::trace!("compact candidate {} rejected: {e}", opt.name);
                            argv.note_error(&e);
                            argv.restore(raw, idx);
                        }
                    }
                }
                CompactRef::Sub(sidx) => {
                    let sub = &compiled.units[sidx];
                    if !sub.requires.is_empty() && self.states[unit].sentences != sub.requires {
                        return Err(self.require_error(unit, &sub.name, &sub.requires));
                    }
                    match self.enter_sub(argv, unit, sidx) {
                        Ok(()) => return Ok(true),
                        Err(e) if e.is_control() => return Err(e),
                        Err(e @ Error::InvalidParam(_)) => {
                            if matches!(argv.current, Current::Arg(_)) {
                                return Err(e);
                            }
                            argv.note_error(&e);
                            argv.restore(raw, idx);
                        }
                        Err(e @ Error::ParamsUnmatched(_))
                            if matches!(argv.current, Current::Sub(i) if i == sidx) =>
                        {
                            // name mismatch under the sub's own separators
                            argv.note_error(&e);
                            argv.restore(raw, idx);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(false)
    }

    fn take_sub(&mut self, idx: usize) -> SubMatch {
        let state = &mut self.states[idx];
        let mut result = SubMatch {
            value: std::mem::take(&mut state.value),
            args: std::mem::take(&mut state.args),
            options: std::mem::take(&mut state.options),
            subcommands: std::mem::take(&mut state.subcommands),
        };
        state.sentences.clear();
        for opt in &self.compiled.units[idx].opts {
            if let Some(default) = &opt.default {
                result
                    .options
                    .entry(opt.dest.clone())
                    .or_insert_with(|| OptMatch { value: default.clone(), args: IndexMap::new() });
            }
        }
        result
    }

    fn on_body_error(&mut self, argv: &mut Argv, e: Error) -> Result<Matches> {
        match e {
            Error::FuzzyMatchSuccess { .. } => {
                output::send(self.host.command_name(), || e.to_string());
                Ok(self.export_fail(argv, Some(&e)))
            }
            Error::SpecialOptionTriggered(kind) => self.dispatch_special(argv, kind),
            Error::PauseTriggered(_) => Err(e),
            Error::ParamsUnmatched(_) | Error::ArgumentMissing(_) | Error::InvalidParam(_) => {
                let rest = argv.release(None, false, false);
                if let Some(Token::Text(last)) = rest.last() {
                    if argv.completion_names.contains(last) {
                        let last = last.clone();
                        trim_completion_tail(argv, &last);
                        return self.handle_completion(argv, None);
                    }
                    if let Some(kind) = special_of(argv, last) {
                        return self.dispatch_special(argv, kind);
                    }
                }
                self.on_tail_error(argv, e)
            }
            other => self.fail(argv, other),
        }
    }

    fn on_tail_error(&mut self, argv: &mut Argv, e: Error) -> Result<Matches> {
        if matches!(e, Error::ArgumentMissing(_)) && argv.comp_active {
            let prompts = self.prompt(argv, None);
            return Err(Error::PauseTriggered(PauseState { prompts, kind: PauseKind::Missing }));
        }
        self.fail(argv, e)
    }

    fn dispatch_special(&mut self, argv: &mut Argv, kind: Special) -> Result<Matches> {
        match kind {
            Special::Help => {
                let parts: Vec<String> = argv
                    .release(None, true, false)
                    .iter()
                    .filter_map(|t| t.as_text().map(str::to_owned))
                    .filter(|t| !argv.special.contains_key(t))
                    .collect();
                let text = self.host.help_text(&parts);
                output::send(self.host.command_name(), move || text);
                Ok(self.export_fail_special(argv, Special::Help))
            }
            Special::Completion => self.handle_completion(argv, None),
            Special::Shortcut => self.handle_shortcut_dsl(argv),
        }
    }

    fn handle_shortcut_dsl(&mut self, argv: &mut Argv) -> Result<Matches> {
        argv.next(None);
        let mut dsl = Args::new()
            .arg(Arg::new("action", Pattern::literals(["delete", "list"])).optional_arg())
            .arg(Arg::new("name", Pattern::string()).optional_arg())
            .arg(Arg::new("command", Pattern::string()).default("$"));
        dsl.finish()?;
        match analyse_args(argv, &dsl) {
            Err(Error::SpecialOptionTriggered(Special::Completion)) => {
                self.handle_completion(argv, None)
            }
            Err(e) => {
                output::send(self.host.command_name(), || e.to_string());
                Ok(self.export_fail_special(argv, Special::Shortcut))
            }
            Ok(values) => {
                let action = values.get("action").and_then(Value::as_str).map(str::to_owned);
                let name = values.get("name").and_then(Value::as_str).map(str::to_owned);
                let command = values.get("command").and_then(Value::as_str).map(str::to_owned);
                let message = self.host.shortcut_dsl(
                    action.as_deref(),
                    name.as_deref(),
                    command.as_deref(),
                );
                output::send(self.host.command_name(), move || message);
                Ok(self.export_fail_special(argv, Special::Shortcut))
            }
        }
    }

    fn handle_completion(
        &mut self,
        argv: &mut Argv,
        trigger: Option<String>,
    ) -> Result<Matches> {
        let kind = match &trigger {
            Some(t) => PauseKind::Unmatched(t.clone()),
            None => PauseKind::Missing,
        };
        let prompts = self.prompt(argv, trigger);
        if !prompts.is_empty() {
            if argv.comp_active {
                return Err(Error::PauseTriggered(PauseState { prompts, kind }));
            }
            let lines: Vec<String> =
                prompts.iter().map(|p| format!("* {}", p.text)).collect();
            output::send(self.host.command_name(), move || {
                format!("next possible input:\n{}", lines.join("\n"))
            });
        }
        Ok(self.export_fail_special(argv, Special::Completion))
    }

    fn prompt(&self, argv: &mut Argv, trigger: Option<String>) -> Vec<Prompt> {
        let state = &self.states[0];
        let mut got: Vec<String> = state.options.keys().cloned().collect();
        got.extend(state.subcommands.keys().cloned());
        got.extend(state.sentences.iter().cloned());
        if let Some(partial) = trigger {
            return self.prompt_partial(&partial, &got);
        }
        match argv.current.clone() {
            Current::Arg(arg) => prompt_unit(&arg, argv),
            Current::Sub(idx) => self.compiled.units[idx]
                .params
                .keys()
                .map(|k| Prompt::usable(k.clone()))
                .collect(),
            Current::None => {
                let releases = argv.release(None, true, false);
                let target = releases
                    .iter()
                    .rev()
                    .find_map(|t| t.as_text())
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned);
                if let Some(target) = &target {
                    let out = self.prompt_partial(target, &got);
                    if !out.is_empty() {
                        return out;
                    }
                }
                if !state.sentences.is_empty() {
                    self.prompt_sentence()
                } else {
                    self.prompt_none(argv, &got)
                }
            }
        }
    }

    fn prompt_partial(&self, partial: &str, got: &[String]) -> Vec<Prompt> {
        let hits: Vec<String> = self
            .compiled
            .root()
            .params
            .keys()
            .filter(|k| k.contains(partial) && k.as_str() != partial)
            .cloned()
            .collect();
        let fresh: Vec<String> =
            hits.iter().filter(|k| !got.contains(k)).cloned().collect();
        let pick = if fresh.is_empty() { hits } else { fresh };
        pick.into_iter()
            .map(|k| Prompt { text: k, can_use: true, removal_prefix: Some(partial.to_owned()) })
            .collect()
    }

    fn prompt_sentence(&self) -> Vec<Prompt> {
        let sentences = &self.states[0].sentences;
        let depth = sentences.len();
        let mut out = Vec::new();
        let root = self.compiled.root();
        for opt in &root.opts {
            if opt.requires.len() >= depth && opt.requires[depth - 1] == sentences[depth - 1] {
                if opt.requires.len() > depth {
                    out.push(Prompt::usable(opt.requires[depth].clone()));
                } else {
                    out.extend(opt.aliases.iter().map(|k| Prompt::usable(k.clone())));
                }
            }
        }
        for &sidx in &root.sub_units {
            let sub = &self.compiled.units[sidx];
            if sub.requires.len() >= depth && sub.requires[depth - 1] == sentences[depth - 1] {
                if sub.requires.len() > depth {
                    out.push(Prompt::usable(sub.requires[depth].clone()));
                } else {
                    out.push(Prompt::usable(sub.name.clone()));
                }
            }
        }
        out
    }

    fn prompt_none(&self, argv: &mut Argv, got: &[String]) -> Vec<Prompt> {
        let root = self.compiled.root();
        let mut out = Vec::new();
        if self.states[0].args.is_empty() {
            if let Some(first) = root.args.items().first() {
                out.extend(prompt_unit(first, argv));
            }
        }
        for opt in &root.opts {
            if !opt.requires.is_empty() {
                if !got.contains(&opt.requires[0]) {
                    out.push(Prompt::usable(opt.requires[0].clone()));
                }
            } else if !got.iter().any(|g| g == opt.dest()) {
                out.extend(opt.aliases.iter().map(|k| Prompt::usable(k.clone())));
            }
        }
        for &sidx in &root.sub_units {
            let sub = &self.compiled.units[sidx];
            if !got.iter().any(|g| g == &sub.dest) {
                out.push(Prompt::usable(sub.name.clone()));
            }
        }
        out
    }

    fn fail(&mut self, argv: &mut Argv, e: Error) -> Result<Matches> {
        if self.raise_exception {
            return Err(e);
        }
        Ok(self.export_fail(argv, Some(&e)))
    }

    fn export_fail_special(&mut self, argv: &mut Argv, kind: Special) -> Matches {
        self.export_fail(argv, Some(&Error::SpecialOptionTriggered(kind)))
    }

    fn export_fail(&mut self, argv: &mut Argv, error: Option<&Error>) -> Matches {
        Matches {
            source: self.host.path(),
            origin: argv.origin.clone(),
            matched: false,
            header: self.head.take().unwrap_or_default(),
            error_info: error.map(ToString::to_string).or_else(|| argv.error.take()),
            error_data: argv.release(None, false, false),
            context: argv.exit(),
            ..Matches::default()
        }
    }

    fn export_ok(&mut self, argv: &mut Argv) -> Matches {
        let state = &mut self.states[0];
        let mut matches = Matches {
            source: self.host.path(),
            origin: argv.origin.clone(),
            matched: true,
            header: self.head.take().unwrap_or_default(),
            error_info: argv.error.take(),
            error_data: Vec::new(),
            main_args: std::mem::take(&mut state.args),
            other_args: IndexMap::new(),
            options: std::mem::take(&mut state.options),
            subcommands: std::mem::take(&mut state.subcommands),
            context: argv.exit(),
        };
        for opt in &self.compiled.root().opts {
            if let Some(default) = &opt.default {
                matches
                    .options
                    .entry(opt.dest.clone())
                    .or_insert_with(|| OptMatch { value: default.clone(), args: IndexMap::new() });
            }
        }
        matches.unpack();
        matches
    }
}

fn prompt_unit(arg: &Arg, argv: &mut Argv) -> Vec<Prompt> {
    match &arg.field.completion {
        None => vec![Prompt::display(param_display(arg))],
        Some(CompletionSource::Hint(hint)) => {
            vec![Prompt::display(format!("{}: {hint}", arg.name))]
        }
        Some(CompletionSource::Candidates(candidates)) => {
            let releases = argv.release(None, true, false);
            let target = releases
                .iter()
                .rev()
                .find_map(|t| t.as_text())
                .filter(|t| !t.is_empty())
                .map(str::to_owned);
            let filtered: Vec<&String> = match &target {
                Some(t) => {
                    let hits: Vec<&String> =
                        candidates.iter().filter(|c| c.contains(t.as_str())).collect();
                    if hits.is_empty() { candidates.iter().collect() } else { hits }
                }
                None => candidates.iter().collect(),
            };
            filtered
                .into_iter()
                .map(|c| Prompt {
                    text: format!("{}: {c}", arg.name),
                    can_use: false,
                    removal_prefix: target.clone(),
                })
                .collect()
        }
    }
}

fn trim_completion_tail(argv: &mut Argv, text: &str) {
    if let Some(Token::Text(last)) = argv.bak.last_mut() {
        if let Some(pos) = last.rfind(text) {
            last.truncate(pos);
            *last = last.trim_end().to_owned();
        }
    }
}
