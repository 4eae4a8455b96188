// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Per-construct parse handlers: argument binding in all four phases,
//! option matching with compact expansion and action folding, header
//! analysis per matcher shape, and fuzzy suggestion scoring.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_fuzzy_search::fuzzy_compare;

use crate::args::{Arg, Args, Multi};
use crate::argv::{Argv, ContextStyle, Current};
use crate::error::{Error, Result, Special};
use crate::header::{DoubleCmd, HeadContent, Header};
use crate::node::{ActionKind, Opt};
use crate::pattern::{Token, Validated, Value};
use crate::result::{HeadMatch, OptMatch};

// strips the boolean-negation prefix from keyword names
static KW_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new("^(?:-*no)?-*(?P<name>.+)$").expect("kw name pattern compiles"));
static BRACKET_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{(.+)\}$").expect("bracket slot pattern compiles"));
static PAREN_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?\((.+)\)$").expect("paren slot pattern compiles"));

/// The built-in option named by `text`, unless disabled.
pub(crate) fn special_of(argv: &Argv, text: &str) -> Option<Special> {
    let kind = argv.special.get(text)?;
    (!argv.disabled.contains(kind)).then_some(*kind)
}

/// Resolve a `{name}` / `$(name)` slot against the parse context, with
/// dotted access into map values.
fn interpolate(argv: &Argv, arg: &Arg, text: &str) -> Result<Option<Value>> {
    let style = match argv.context_style {
        Some(style) => style,
        None => return Ok(None),
    };
    let finder = match style {
        ContextStyle::Bracket => &*BRACKET_SLOT,
        ContextStyle::Parentheses => &*PAREN_SLOT,
    };
    let Some(caps) = finder.captures(text) else { return Ok(None) };
    let name = &caps[1];
    if name == "_" {
        return Ok(Some(Value::Map(argv.context.clone())));
    }
    if let Some(found) = argv.context.get(name) {
        return Ok(Some(found.clone()));
    }
    let mut parts = name.split('.');
    let first = parts.next().unwrap_or_default();
    let mut cursor = argv
        .context
        .get(first)
        .ok_or_else(|| Error::ArgumentMissing(arg.field.missing_text(&arg.name)))?
        .clone();
    for part in parts {
        cursor = match cursor.as_map().and_then(|m| m.get(part)) {
            Some(next) => next.clone(),
            None => {
                return Err(Error::InvalidParam(
                    arg.field.unmatch_text(text, format!("{name} not found in context")),
                ));
            }
        };
    }
    Ok(Some(cursor))
}

/// Bind one token to `arg`, storing the converted value into `result`.
/// Rolls the token back on anything but a clean match.
fn bind_arg(
    argv: &mut Argv,
    arg: &Arg,
    result: &mut IndexMap<String, Value>,
    token: Token,
    is_str: bool,
) -> Result<()> {
    let mut candidate = token.to_value();
    if is_str {
        if let Some(text) = token.as_text() {
            if let Some(resolved) = interpolate(argv, arg, text)? {
                candidate = resolved;
            }
        }
    }
    if arg.pattern.is_any() || (arg.pattern.is_str_kind() && is_str) {
        if !arg.anonymous() {
            result.insert(arg.name.clone(), candidate);
        }
        return Ok(());
    }
    match arg.pattern.validate_with(&candidate, arg.field.default.as_ref()) {
        Validated::Valid(value) => {
            if !arg.anonymous() {
                result.insert(arg.name.clone(), value);
            }
            Ok(())
        }
        Validated::Default(value) => {
            argv.rollback(token, false);
            if !arg.anonymous() {
                result.insert(arg.name.clone(), value);
            }
            Ok(())
        }
        Validated::Invalid(reason) => {
            argv.rollback(token, false);
            if arg.optional() {
                return Ok(());
            }
            Err(Error::InvalidParam(arg.field.unmatch_text(&candidate.to_string(), reason)))
        }
    }
}

fn kw_sep_chars(args: &Args) -> Vec<char> {
    args.keyword_only().map(|(_, arg)| arg.field.kw_sep).collect()
}

/// Whether a token opens a keyword-only binding, used as a variadic cutoff.
fn hits_keyword_only(argv: &Argv, args: &Args, text: &str) -> bool {
    let seps = kw_sep_chars(args);
    if seps.is_empty() {
        return false;
    }
    let stripped = KW_NAME
        .captures(text)
        .and_then(|c| c.name("name"))
        .map(|m| m.as_str())
        .unwrap_or(text);
    let (key, _) = crate::argv::split_once(stripped, &seps, argv.filter_crlf);
    args.keyword_only_get(&key).is_some()
}

fn step_varpos(
    argv: &mut Argv,
    args: &Args,
    arg: &Arg,
    result: &mut IndexMap<String, Value>,
) -> Result<()> {
    argv.current = Current::Arg(arg.clone());
    let cap = match arg.field.multi {
        Multi::Count(n) => n,
        _ => usize::MAX,
    };
    let var_key_sep = args.var_keyword().map(|kw| kw.field.kw_sep);
    let mut collected: Vec<Value> = Vec::new();
    while !argv.done() {
        let (token, is_str) = argv.next(Some(&arg.separators));
        if let Some(text) = token.as_text() {
            if is_str {
                if let Some(kind) = special_of(argv, text) {
                    argv.rollback(token.clone(), false);
                    return Err(Error::SpecialOptionTriggered(kind));
                }
            }
            if argv.remainders.contains(text) {
                break;
            }
        }
        let cut = match token.as_text() {
            Some(text) if text.is_empty() => true,
            Some(text) => {
                (argv.param_ids.contains(text) && !argv.soft_ids.contains(text))
                    || hits_keyword_only(argv, args, text)
                    || var_key_sep.is_some_and(|sep| text.contains(sep))
            }
            None => false,
        };
        if cut {
            argv.rollback(token, false);
            break;
        }
        match arg.pattern.validate(&token.to_value()) {
            Validated::Valid(value) => collected.push(value),
            _ => {
                argv.rollback(token, false);
                break;
            }
        }
        if collected.len() >= cap {
            break;
        }
    }
    if collected.is_empty() {
        if let Some(default) = &arg.field.default {
            let value = match default {
                Value::List(l) => Value::List(l.clone()),
                single => Value::List(vec![single.clone()]),
            };
            result.insert(arg.name.clone(), value);
            return Ok(());
        }
        if matches!(arg.field.multi, Multi::ZeroOrMore) {
            result.insert(arg.name.clone(), Value::List(Vec::new()));
            return Ok(());
        }
        return Err(Error::ArgumentMissing(arg.field.missing_text(&arg.name)));
    }
    let value = if matches!(arg.field.multi, Multi::Join) {
        let sep = arg.separators.first().copied().unwrap_or(' ');
        let joined: Vec<String> = collected.iter().map(|v| v.to_string()).collect();
        Value::Str(joined.join(&sep.to_string()))
    } else {
        Value::List(collected)
    };
    result.insert(arg.name.clone(), value);
    Ok(())
}

fn step_keyword(
    argv: &mut Argv,
    args: &Args,
    result: &mut IndexMap<String, Value>,
) -> Result<()> {
    let mut walk_seps: Vec<char> = Vec::new();
    for (_, arg) in args.keyword_only() {
        for sep in &arg.separators {
            if !walk_seps.contains(sep) {
                walk_seps.push(*sep);
            }
        }
    }
    let pair_seps = kw_sep_chars(args);
    let target = args.keyword_only_len();
    let mut count = 0;
    while count < target {
        let (token, is_str) = argv.next(Some(&walk_seps));
        let Some(text) = token.as_text().map(str::to_owned) else {
            argv.rollback(token, false);
            break;
        };
        if text.is_empty() || !is_str {
            argv.rollback(token, false);
            break;
        }
        if let Some(kind) = special_of(argv, &text) {
            argv.rollback(token, false);
            return Err(Error::SpecialOptionTriggered(kind));
        }
        if argv.remainders.contains(&text) {
            break;
        }
        let (key_raw, inline_value) = crate::argv::split_once(&text, &pair_seps, argv.filter_crlf);
        let stripped = KW_NAME
            .captures(&key_raw)
            .and_then(|c| c.name("name"))
            .map(|m| m.as_str().to_owned())
            .unwrap_or_else(|| key_raw.clone());
        let key = if args.keyword_only_get(&stripped).is_some() {
            stripped
        } else {
            key_raw.clone()
        };
        let Some(arg) = args.keyword_only_get(&key).cloned() else {
            argv.rollback(token, false);
            if args.var_keyword().is_some() || argv.param_ids.contains(&text) {
                break;
            }
            for (_, kw_arg) in args.keyword_only() {
                if kw_arg.pattern.validate(&Value::Str(text.clone())).is_valid() {
                    return Err(Error::InvalidParam(format!(
                        "{text} missing its key {}",
                        kw_arg.name
                    )));
                }
            }
            let names: Vec<String> = args.keyword_only().map(|(n, _)| n.to_owned()).collect();
            if let Some(hit) = fuzzy_suggest(argv.fuzzy_threshold, &key, &names) {
                return Err(Error::FuzzyMatchSuccess { input: key, suggestion: hit });
            }
            return Err(Error::InvalidParam(format!("unknown keyword {key}")));
        };
        if result.contains_key(&key) {
            return Err(Error::InvalidParam(format!("duplicate keyword {key}")));
        }
        let (value_token, value_is_str) = if inline_value.is_empty() {
            if arg.pattern.is_kw_bool() {
                (Token::Text(key_raw.clone()), true)
            } else {
                argv.next(Some(&arg.separators))
            }
        } else {
            (Token::Text(inline_value), true)
        };
        bind_arg(argv, &arg, result, value_token, value_is_str)?;
        count += 1;
    }
    if count < target {
        for (name, arg) in args.keyword_only() {
            if result.contains_key(name) {
                continue;
            }
            if let Some(default) = &arg.field.default {
                result.insert(name.to_owned(), default.clone());
            } else if !arg.optional() {
                return Err(Error::ArgumentMissing(arg.field.missing_text(name)));
            }
        }
    }
    Ok(())
}

fn step_varkey(
    argv: &mut Argv,
    arg: &Arg,
    result: &mut IndexMap<String, Value>,
) -> Result<()> {
    argv.current = Current::Arg(arg.clone());
    let cap = match arg.field.multi {
        Multi::Count(n) => n,
        _ => usize::MAX,
    };
    let sep = arg.field.kw_sep;
    let pair = Regex::new(&format!(
        "^(-*[^{}]+){}(.*)$",
        regex::escape(&sep.to_string()),
        regex::escape(&sep.to_string())
    ))
    .map_err(|e| Error::InvalidParam(format!("bad keyword separator {sep:?}: {e}")))?;
    let mut collected: IndexMap<String, Value> = IndexMap::new();
    while !argv.done() {
        let (token, is_str) = argv.next(Some(&arg.separators));
        let Some(text) = token.as_text().map(str::to_owned) else {
            argv.rollback(token, false);
            break;
        };
        if text.is_empty() || !is_str {
            argv.rollback(token, false);
            break;
        }
        if let Some(kind) = special_of(argv, &text) {
            argv.rollback(token, false);
            return Err(Error::SpecialOptionTriggered(kind));
        }
        if argv.param_ids.contains(&text) {
            argv.rollback(token, false);
            break;
        }
        if argv.remainders.contains(&text) {
            break;
        }
        let Some(caps) = pair.captures(&text) else {
            argv.rollback(token, false);
            break;
        };
        let key = caps[1].trim_start_matches('-').to_owned();
        let value_text = caps[2].to_owned();
        let inline = !value_text.is_empty();
        let value_token = if inline {
            Token::Text(value_text)
        } else {
            argv.next(Some(&arg.separators)).0
        };
        match arg.pattern.validate(&value_token.to_value()) {
            Validated::Valid(value) => {
                collected.insert(key, value);
            }
            _ => {
                if !inline {
                    argv.rollback(value_token, false);
                }
                argv.rollback(Token::Text(text), false);
                break;
            }
        }
        if collected.len() >= cap {
            break;
        }
    }
    if collected.is_empty() {
        if let Some(default) = &arg.field.default {
            let value = match default {
                Value::Map(m) => Value::Map(m.clone()),
                _ => Value::Map(IndexMap::new()),
            };
            result.insert(arg.name.clone(), value);
            return Ok(());
        }
        if matches!(arg.field.multi, Multi::ZeroOrMore) {
            result.insert(arg.name.clone(), Value::Map(IndexMap::new()));
            return Ok(());
        }
        return Err(Error::ArgumentMissing(arg.field.missing_text(&arg.name)));
    }
    result.insert(arg.name.clone(), Value::Map(collected));
    Ok(())
}

/// Bind an `Args` block: normal positionals, then the variadic positional,
/// then keyword-onlys, then the variadic keyword.
pub(crate) fn analyse_args(argv: &mut Argv, args: &Args) -> Result<IndexMap<String, Value>> {
    let mut result = IndexMap::new();
    for arg in args.normal().cloned().collect::<Vec<_>>() {
        argv.current = Current::Arg(arg.clone());
        let (token, is_str) = argv.next(Some(&arg.separators));
        if let Some(text) = token.as_text() {
            if is_str && !text.is_empty() {
                if let Some(kind) = special_of(argv, text) {
                    argv.rollback(token.clone(), false);
                    return Err(Error::SpecialOptionTriggered(kind));
                }
                if argv.param_ids.contains(text) && arg.optional() {
                    if let Some(default) = &arg.field.default {
                        result.insert(arg.name.clone(), default.clone());
                    }
                    argv.rollback(token, false);
                    continue;
                }
            }
        }
        if token.is_empty_text() {
            if let Some(default) = &arg.field.default {
                result.insert(arg.name.clone(), default.clone());
            } else if !arg.optional() {
                return Err(Error::ArgumentMissing(arg.field.missing_text(&arg.name)));
            }
            continue;
        }
        if arg.pattern.is_all() {
            argv.rollback(token, false);
            let rest: Vec<Value> =
                argv.release(None, false, true).iter().map(Token::to_value).collect();
            argv.idx = argv.ndata;
            if !arg.anonymous() {
                result.insert(arg.name.clone(), Value::List(rest));
            }
            argv.current = Current::None;
            return Ok(result);
        }
        bind_arg(argv, &arg, &mut result, token, is_str)?;
    }
    if let Some(arg) = args.var_positional().cloned() {
        step_varpos(argv, args, &arg, &mut result)?;
    }
    if args.keyword_only_len() > 0 {
        step_keyword(argv, args, &mut result)?;
    }
    if let Some(arg) = args.var_keyword().cloned() {
        step_varkey(argv, &arg, &mut result)?;
    }
    argv.current = Current::None;
    Ok(result)
}

/// Match an option's name (with compact expansion and count stacking) and
/// bind its arguments.
pub(crate) fn handle_opt(argv: &mut Argv, opt: &Opt) -> Result<(String, OptMatch)> {
    argv.current = Current::None;
    let (token, _) = argv.next(Some(&opt.separators));
    let name = match token.as_text() {
        Some(text) => text.to_owned(),
        None => {
            argv.rollback(token, false);
            return Err(Error::InvalidParam(format!("option {} not matched", opt.dest)));
        }
    };
    let mut stack = 0i64;
    let mut hit = false;
    if opt.compact {
        for alias in &opt.aliases {
            let matcher = Regex::new(&format!("^{}(?P<rest>.*)$", regex::escape(alias)))
                .map_err(|e| Error::InvalidParam(format!("bad alias {alias:?}: {e}")))?;
            if let Some(caps) = matcher.captures(&name) {
                let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or_default();
                if !rest.is_empty() {
                    argv.rollback(Token::Text(rest.to_owned()), true);
                }
                hit = true;
                break;
            }
        }
    } else if opt.action.kind == ActionKind::Count {
        for alias in &opt.aliases {
            let bare = name.trim_start_matches('-');
            let alias_bare = alias.trim_start_matches('-');
            if name.starts_with(alias.as_str())
                && !alias_bare.is_empty()
                && bare.len() % alias_bare.len() == 0
                && bare.chars().collect::<Vec<_>>().chunks(alias_bare.len()).all(|chunk| {
                    chunk.iter().collect::<String>() == alias_bare
                })
            {
                stack = (bare.len() / alias_bare.len()) as i64;
                hit = true;
                break;
            }
        }
    } else if opt.aliases.iter().any(|a| a == &name) {
        hit = true;
    }
    if !hit {
        argv.rollback(Token::Text(name.clone()), false);
        if argv.fuzzy_match {
            if let Some(suggestion) = fuzzy_suggest(argv.fuzzy_threshold, &name, &opt.aliases) {
                return Err(Error::FuzzyMatchSuccess { input: name, suggestion });
            }
        }
        return Err(Error::InvalidParam(format!(
            "{name} is not the name of option {}",
            opt.dest
        )));
    }
    if opt.nargs() > 0 {
        let args = analyse_args(argv, &opt.args)?;
        return Ok((opt.dest.clone(), OptMatch { value: Value::None, args }));
    }
    let value = if opt.action.kind == ActionKind::Count {
        Value::Int(stack.max(1) * opt.action.increment())
    } else {
        opt.action.value.clone()
    };
    Ok((opt.dest.clone(), OptMatch { value, args: IndexMap::new() }))
}

/// Fold a fresh occurrence into the existing result per the option action.
pub(crate) fn fold_option(
    results: &mut IndexMap<String, OptMatch>,
    opt: &Opt,
    dest: String,
    mut fresh: OptMatch,
) {
    match results.get_mut(&dest) {
        None => {
            if opt.action.kind == ActionKind::Append {
                for value in fresh.args.values_mut() {
                    *value = Value::List(vec![value.clone()]);
                }
                if opt.nargs() == 0 {
                    fresh.value = Value::List(vec![fresh.value]);
                }
            }
            results.insert(dest, fresh);
        }
        Some(existing) => match opt.action.kind {
            ActionKind::Store => *existing = fresh,
            ActionKind::Count => {
                if opt.nargs() == 0 {
                    let sum = existing.value.as_int().unwrap_or(0)
                        + fresh.value.as_int().unwrap_or(0);
                    existing.value = Value::Int(sum);
                } else {
                    *existing = fresh;
                }
            }
            ActionKind::Append => {
                if opt.nargs() == 0 {
                    let mut list = existing.value.as_list().map(<[Value]>::to_vec).unwrap_or_default();
                    list.push(fresh.value);
                    existing.value = Value::List(list);
                } else {
                    for (key, value) in fresh.args {
                        match existing.args.get_mut(&key) {
                            Some(Value::List(list)) => list.push(value),
                            Some(other) => {
                                let prev = other.clone();
                                existing.args.insert(key, Value::List(vec![prev, value]));
                            }
                            None => {
                                existing.args.insert(key, Value::List(vec![value]));
                            }
                        }
                    }
                }
            }
        },
    }
}

/// The closest candidate at or above `threshold`, if any.
pub(crate) fn fuzzy_suggest<S: AsRef<str>>(
    threshold: f32,
    source: &str,
    candidates: &[S],
) -> Option<String> {
    candidates
        .iter()
        .map(|c| (c.as_ref(), fuzzy_compare(source, c.as_ref())))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c.to_owned())
}

fn converted_groups(
    header: &Header,
    caps: &regex::Captures<'_>,
    re: &Regex,
) -> IndexMap<String, Value> {
    let mut groups = IndexMap::new();
    for name in re.capture_names().flatten() {
        let Some(m) = caps.name(name) else { continue };
        let raw = Value::Str(m.as_str().to_owned());
        let value = match header.mapping.get(name) {
            Some(pattern) => pattern.validate(&raw).into_value().unwrap_or(raw),
            None => raw,
        };
        groups.insert(name.to_owned(), value);
    }
    groups
}

fn head_hit(origin: Value, result: Value, groups: IndexMap<String, Value>) -> HeadMatch {
    HeadMatch { origin, result, matched: true, groups }
}

fn compact_prefix<'t>(header: &Header, text: &'t str) -> Option<(&'t str, &'t str)> {
    let re = header.compact_regex.as_ref()?;
    let m = re.find(text)?;
    (m.start() == 0).then(|| (&text[..m.end()], &text[m.end()..]))
}

fn header_fail(
    header: &Header,
    argv: &mut Argv,
    head: Token,
    may: Option<Token>,
    head_str: bool,
) -> Error {
    let candidates = header.candidate_texts();
    if head_str {
        if let Some(may) = may {
            argv.rollback(may, false);
        }
        let text = head.as_text().unwrap_or_default().to_owned();
        if argv.fuzzy_match {
            if let Some(hit) = fuzzy_suggest(argv.fuzzy_threshold, &text, &candidates) {
                return Error::FuzzyMatchSuccess { input: text, suggestion: hit };
            }
        }
        return Error::InvalidHeader(text);
    }
    if let Some(Token::Text(may_text)) = &may {
        if !may_text.is_empty() {
            let joined = format!("{head} {may_text}");
            if argv.fuzzy_match {
                if let Some(hit) = fuzzy_suggest(argv.fuzzy_threshold, &joined, &candidates) {
                    return Error::FuzzyMatchSuccess { input: joined, suggestion: hit };
                }
            }
            return Error::InvalidHeader(joined);
        }
    }
    if let Some(may) = may {
        argv.rollback(may, false);
    }
    Error::InvalidHeader(head.to_string())
}

/// Run the header phase, consuming one or two leading tokens.
pub(crate) fn analyse_header(header: &Header, argv: &mut Argv) -> Result<HeadMatch> {
    match &header.content {
        HeadContent::Literals(lits) => {
            let (head, head_str) = argv.next(None);
            if let (true, Some(text)) = (head_str, head.as_text()) {
                if lits.iter().any(|l| l == text) {
                    let v = Value::Str(text.to_owned());
                    return Ok(head_hit(v.clone(), v, IndexMap::new()));
                }
                if header.compact {
                    if let Some((hit, rest)) = compact_prefix(header, text) {
                        let v = Value::Str(hit.to_owned());
                        argv.rollback(Token::Text(rest.to_owned()), true);
                        return Ok(head_hit(v.clone(), v, IndexMap::new()));
                    }
                }
            }
            let (may, may_str) = argv.next(None);
            if may_str && !may.is_empty_text() {
                let sep = argv.separators.first().copied().unwrap_or(' ');
                let joined = format!("{head}{sep}{may}");
                if lits.iter().any(|l| l == &joined) {
                    let v = Value::Str(joined);
                    return Ok(head_hit(v.clone(), v, IndexMap::new()));
                }
                if header.compact {
                    if let Some((hit, rest)) = compact_prefix(header, &joined) {
                        let v = Value::Str(hit.to_owned());
                        argv.rollback(Token::Text(rest.to_owned()), true);
                        return Ok(head_hit(v.clone(), v, IndexMap::new()));
                    }
                }
            }
            Err(header_fail(header, argv, head, Some(may), head_str))
        }
        HeadContent::Template(re) => {
            let (head, head_str) = argv.next(None);
            if let (true, Some(text)) = (head_str, head.as_text()) {
                if let Some(caps) = re.captures(text) {
                    let groups = converted_groups(header, &caps, re);
                    let v = Value::Str(text.to_owned());
                    return Ok(head_hit(v.clone(), v, groups));
                }
                if header.compact {
                    if let Some((hit, rest)) = compact_prefix(header, text) {
                        let v = Value::Str(hit.to_owned());
                        argv.rollback(Token::Text(rest.to_owned()), true);
                        return Ok(head_hit(v.clone(), v, IndexMap::new()));
                    }
                }
            }
            let (may, may_str) = argv.next(None);
            if may_str && !may.is_empty_text() {
                let sep = argv.separators.first().copied().unwrap_or(' ');
                let joined = format!("{head}{sep}{may}");
                if let Some(caps) = re.captures(&joined) {
                    let groups = converted_groups(header, &caps, re);
                    let v = Value::Str(joined);
                    return Ok(head_hit(v.clone(), v, groups));
                }
            }
            Err(header_fail(header, argv, head, Some(may), head_str))
        }
        HeadContent::Elem(pattern) => {
            let (head, head_str) = argv.next(None);
            if let Validated::Valid(value) = pattern.validate(&head.to_value()) {
                return Ok(head_hit(head.to_value(), value, IndexMap::new()));
            }
            if header.compact && head_str {
                if let Some(text) = head.as_text() {
                    if let Some((hit, rest)) = compact_prefix(header, text) {
                        let v = Value::Str(hit.to_owned());
                        argv.rollback(Token::Text(rest.to_owned()), true);
                        return Ok(head_hit(v.clone(), v, IndexMap::new()));
                    }
                }
            }
            Err(header_fail(header, argv, head, None, head_str))
        }
        HeadContent::Double { pairs, texts, command } => {
            let (head, head_str) = argv.next(None);
            if let (true, Some(text)) = (head_str, head.as_text()) {
                // a text prefix matches within a single token
                for prefix in texts {
                    if let Some(rest) = text.strip_prefix(prefix.as_str()) {
                        if double_cmd_hit(command, rest) {
                            let v = Value::Str(text.to_owned());
                            return Ok(head_hit(v.clone(), v, IndexMap::new()));
                        }
                    }
                }
                if header.compact {
                    if let Some((hit, rest)) = compact_prefix(header, text) {
                        let v = Value::Str(hit.to_owned());
                        argv.rollback(Token::Text(rest.to_owned()), true);
                        return Ok(head_hit(v.clone(), v, IndexMap::new()));
                    }
                }
                return Err(header_fail(header, argv, head, None, head_str));
            }
            let (may, may_str) = argv.next(None);
            if may_str {
                if let Some(may_text) = may.as_text() {
                    for (pattern, prefix) in pairs {
                        if !pattern.validate(&head.to_value()).is_valid() {
                            continue;
                        }
                        if let Some(rest) = may_text.strip_prefix(prefix.as_str()) {
                            if double_cmd_hit(command, rest) {
                                let origin = Value::List(vec![
                                    head.to_value(),
                                    Value::Str(may_text.to_owned()),
                                ]);
                                return Ok(head_hit(
                                    origin,
                                    Value::Str(may_text.to_owned()),
                                    IndexMap::new(),
                                ));
                            }
                        }
                    }
                }
            }
            Err(header_fail(header, argv, head, Some(may), head_str))
        }
    }
}

fn double_cmd_hit(command: &DoubleCmd, text: &str) -> bool {
    match command {
        DoubleCmd::Literals(lits) => lits.iter().any(|l| l == text),
        DoubleCmd::Template(re) => re.is_match(text),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fuzzy_suggest_respects_threshold() {
        let candidates = ["--help".to_owned(), "--host".to_owned()];
        assert_eq!(fuzzy_suggest(0.6, "--hlep", &candidates), Some("--help".to_owned()));
        assert_eq!(fuzzy_suggest(0.99, "--hlep", &candidates), None);
    }
}
