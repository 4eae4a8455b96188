// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Shortcut rewriting: when the header fails, a registered shortcut may
//! rebuild the argv from a stored command line, substituting positional
//! (`{%N}`), wildcard (`{*sep}`) and regex-group (`{N}` / `{name}`) slots.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::argv::Argv;
use crate::error::{Error, Result};
use crate::header::{escape, unescape};
use crate::pattern::{Message, Token};
use crate::result::Matches;

/// Which slot a regex-shortcut wrapper is filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKey<'a> {
    /// A numbered group (`{0}`, `{1}`, ...).
    Index(usize),
    /// A named group (`{name}`).
    Name(&'a str),
}

/// Maps a captured group into the token spliced into the argv.
pub type ShortcutWrapper =
    Arc<dyn for<'a> Fn(SlotKey<'a>, &str) -> Option<Token> + Send + Sync>;

/// A stored shortcut specification.
#[derive(Clone)]
pub struct ShortcutArgs {
    /// The command line the shortcut expands to; the owning command's own
    /// name when `None`.
    pub command: Option<String>,
    /// Extra tokens appended after the command.
    pub args: Vec<Token>,
    /// Allow trailing tokens beyond the slots.
    pub fuzzy: bool,
    /// Allow the command's prefixes in front of the shortcut key.
    pub prefixes: bool,
    /// Optional regex-group wrapper.
    pub wrapper: Option<ShortcutWrapper>,
}

impl Default for ShortcutArgs {
    fn default() -> Self {
        ShortcutArgs { command: None, args: Vec::new(), fuzzy: true, prefixes: false, wrapper: None }
    }
}

impl ShortcutArgs {
    /// A shortcut expanding to `command`.
    pub fn to_command(command: &str) -> Self {
        ShortcutArgs { command: Some(command.to_owned()), ..ShortcutArgs::default() }
    }
}

impl std::fmt::Debug for ShortcutArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcutArgs")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("fuzzy", &self.fuzzy)
            .field("prefixes", &self.prefixes)
            .finish_non_exhaustive()
    }
}

/// A registered shortcut: a rewrite spec, or a pre-built result returned
/// verbatim.
#[derive(Clone, Debug)]
pub enum Shortcut {
    /// Rewrite the input through a spec.
    Args(ShortcutArgs),
    /// Return this result as-is.
    Complete(Box<Matches>),
}

/// The persistable subset of a shortcut spec.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct StoredShortcut {
    pub(crate) command: Option<String>,
    pub(crate) args: Vec<String>,
    pub(crate) fuzzy: bool,
    pub(crate) prefixes: bool,
}

impl StoredShortcut {
    /// Only specs whose extra tokens are all text persist.
    pub(crate) fn of(short: &Shortcut) -> Option<StoredShortcut> {
        let Shortcut::Args(args) = short else { return None };
        let texts: Option<Vec<String>> =
            args.args.iter().map(|t| t.as_text().map(str::to_owned)).collect();
        Some(StoredShortcut {
            command: args.command.clone(),
            args: texts?,
            fuzzy: args.fuzzy,
            prefixes: args.prefixes,
        })
    }
}

impl From<StoredShortcut> for Shortcut {
    fn from(stored: StoredShortcut) -> Self {
        Shortcut::Args(ShortcutArgs {
            command: stored.command,
            args: stored.args.into_iter().map(Token::Text).collect(),
            fuzzy: stored.fuzzy,
            prefixes: stored.prefixes,
            wrapper: None,
        })
    }
}

/// Owned capture groups of a regex shortcut key match.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegMatch {
    pub(crate) groups: Vec<String>,
    pub(crate) named: IndexMap<String, String>,
}

impl RegMatch {
    pub(crate) fn of(re: &Regex, caps: &regex::Captures<'_>) -> RegMatch {
        let mut named = IndexMap::new();
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                named.insert(name.to_owned(), m.as_str().to_owned());
            }
        }
        let groups = (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_owned()).unwrap_or_default())
            .collect();
        RegMatch { groups, named }
    }
}

static INDEX_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%(\d+)\}").expect("index slot pattern compiles"));
static WILDCARD_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\*(.*?)\}").expect("wildcard slot pattern compiles"));
static INDEX_REG_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("reg index slot pattern compiles"));
static KEY_REG_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("reg key slot pattern compiles"));

fn default_wrapper(_key: SlotKey<'_>, value: &str) -> Option<Token> {
    Some(Token::Text(value.to_owned()))
}

// join adjacent text tokens with `sep`, keeping opaque elements standalone
fn gen_extend(data: &[Token], sep: &str) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    for unit in data {
        match (unit, out.last_mut()) {
            (Token::Text(text), Some(Token::Text(last))) => {
                last.push_str(sep);
                last.push_str(text);
            }
            _ => out.push(unit.clone()),
        }
    }
    out
}

fn recover_quote(argv: &Argv, token: Token) -> Token {
    match token {
        Token::Text(text)
            if argv.separators.iter().any(|s| text.contains(*s))
                && !(text.starts_with(['"', '\''])
                    && text.ends_with(text.chars().next().unwrap_or('"'))) =>
        {
            Token::Text(format!("\"{text}\""))
        }
        other => other,
    }
}

/// Substitute `{%N}` and `{*sep}` slots in the argv from `data`; returns
/// the unused tokens (quote-recovered) to append as trailing args.
fn handle_slot_data(argv: &mut Argv, data: Vec<Token>) -> Vec<Token> {
    let mut used = std::collections::HashSet::new();
    let units: Vec<(usize, String)> = argv
        .raw
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.as_text().map(|s| (i, escape(s))))
        .collect();
    let mut insertions: Vec<(usize, Vec<Token>)> = Vec::new();
    for (i, unit) in units {
        if let Some(caps) = INDEX_SLOT.captures(&unit).filter(|c| c[0].len() == unit.len()) {
            let index: usize = match caps[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Some(slot) = data.get(index) {
                argv.raw[i] = slot.clone();
                used.insert(index);
            }
            continue;
        }
        if INDEX_SLOT.is_match(&unit) {
            let mut text = unit.clone();
            let mut splice: Vec<Token> = Vec::new();
            for caps in INDEX_SLOT.captures_iter(&unit) {
                let index: usize = match caps[1].parse() {
                    Ok(n) => n,
                    Err(_) => continue,
                };
                let Some(slot) = data.get(index) else { continue };
                match slot {
                    Token::Text(s) => text = text.replace(&caps[0], s),
                    elem => {
                        // an opaque slot splits the text around it
                        let (left, right) =
                            text.split_once(&caps[0]).unwrap_or((text.as_str(), ""));
                        let left = left.trim().to_owned();
                        let right = right.trim().to_owned();
                        if !left.is_empty() {
                            splice.push(Token::Text(unescape(&left)));
                        }
                        splice.push(elem.clone());
                        if !right.is_empty() {
                            splice.push(Token::Text(unescape(&right)));
                        }
                        text = String::new();
                    }
                }
                used.insert(index);
            }
            if splice.is_empty() {
                argv.raw[i] = Token::Text(unescape(&text));
            } else {
                insertions.push((i, splice));
            }
            continue;
        }
        if let Some(caps) = WILDCARD_SLOT.captures(&unit) {
            let sep = if caps[1].is_empty() { " " } else { &caps[1] };
            let extend = gen_extend(&data, sep);
            if caps[0].len() == unit.len() {
                argv.raw.remove(i);
                for (offset, token) in extend.into_iter().enumerate() {
                    argv.raw.insert(i + offset, token);
                }
            } else {
                let joined: Vec<String> = extend.iter().map(|t| t.to_string()).collect();
                argv.raw[i] = Token::Text(unescape(&unit.replace(&caps[0], &joined.join(""))));
            }
            argv.bak = argv.raw.clone();
            argv.ndata = argv.raw.len();
            return Vec::new();
        }
    }
    for (i, splice) in insertions.into_iter().rev() {
        argv.raw.splice(i..=i, splice);
    }
    argv.bak = argv.raw.clone();
    argv.ndata = argv.raw.len();
    data.into_iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .map(|(_, t)| recover_quote(argv, t))
        .collect()
}

/// Substitute `{N}` / `{name}` regex-group slots through the wrapper.
fn handle_slot_reg(argv: &mut Argv, reg: &RegMatch, wrapper: &ShortcutWrapper) -> Vec<Token> {
    let mut out = Vec::new();
    for unit in argv.raw.clone() {
        let Some(text) = unit.as_text() else {
            out.push(unit);
            continue;
        };
        let mut text = escape(text);
        if let Some(caps) = INDEX_REG_SLOT.captures(&text).filter(|c| c[0].len() == text.len()) {
            let index: usize = match caps[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let Some(slot) = reg.groups.get(index) else { continue };
            if let Some(token) = wrapper(SlotKey::Index(index), slot) {
                out.push(token);
            }
            continue;
        }
        if let Some(caps) = KEY_REG_SLOT.captures(&text).filter(|c| c[0].len() == text.len()) {
            let key = caps[1].to_owned();
            let Some(slot) = reg.named.get(&key) else { continue };
            if let Some(token) = wrapper(SlotKey::Name(&key), slot) {
                out.push(token);
            }
            continue;
        }
        for caps in INDEX_REG_SLOT.captures_iter(&text.clone()) {
            let index: usize = match caps[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let filler = match reg.groups.get(index) {
                Some(slot) => wrapper(SlotKey::Index(index), slot)
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };
            text = text.replace(&caps[0], &filler);
        }
        for caps in KEY_REG_SLOT.captures_iter(&text.clone()) {
            let key = &caps[1];
            let filler = match reg.named.get(key) {
                Some(slot) => wrapper(SlotKey::Name(key), slot)
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };
            text = text.replace(&caps[0], &filler);
        }
        if !text.is_empty() {
            out.push(Token::Text(unescape(&text)));
        }
    }
    out
}

/// Rebuild `argv` from a shortcut spec. `data` carries the tokens that
/// followed the shortcut key; `reg` carries regex-key capture groups.
pub(crate) fn expand(
    argv: &mut Argv,
    data: Vec<Token>,
    short: &ShortcutArgs,
    reg: Option<&RegMatch>,
    fallback_command: &str,
) -> Result<()> {
    let command = short.command.clone().unwrap_or_else(|| fallback_command.to_owned());
    argv.build(Message::from(command))?;
    if !short.fuzzy && !data.is_empty() {
        return Err(Error::ParamsUnmatched(format!(
            "{} is not allowed after the shortcut",
            data[0]
        )));
    }
    argv.addon(short.args.clone(), false);
    let leftover = handle_slot_data(argv, data);
    if leftover.is_empty()
        && argv.raw.iter().any(|t| {
            t.as_text().is_some_and(|s| INDEX_SLOT.is_match(s) || WILDCARD_SLOT.is_match(s))
        })
    {
        return Err(Error::ArgumentMissing("shortcut slots remain unfilled".into()));
    }
    argv.addon(leftover, false);
    if let Some(reg) = reg {
        let wrapper: ShortcutWrapper =
            short.wrapper.clone().unwrap_or_else(|| Arc::new(default_wrapper));
        let rebuilt = handle_slot_reg(argv, reg, &wrapper);
        argv.raw.clear();
        argv.bak.clear();
        argv.idx = 0;
        argv.ndata = 0;
        argv.addon(rebuilt, true);
    }
    log::debug!("shortcut expanded into {:?}", argv.raw);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn argv() -> Argv {
        Argv::new(vec![' '])
    }

    #[test]
    fn index_slots_substitute_in_order() {
        let mut argv = argv();
        let short = ShortcutArgs::to_command("core {%0} end");
        expand(
            &mut argv,
            vec![Token::Text("123".into())],
            &short,
            None,
            "core",
        )
        .unwrap();
        let texts: Vec<String> =
            argv.release(None, false, false).iter().map(|t| t.to_string()).collect();
        assert_eq!(texts, vec!["core".to_owned(), "123".to_owned(), "end".to_owned()]);
    }

    #[test]
    fn wildcard_joins_remaining() {
        let mut argv = argv();
        let short = ShortcutArgs::to_command("core {*+}");
        expand(
            &mut argv,
            vec![Token::Text("a".into()), Token::Text("b".into())],
            &short,
            None,
            "core",
        )
        .unwrap();
        let texts: Vec<String> =
            argv.release(None, false, false).iter().map(|t| t.to_string()).collect();
        assert_eq!(texts, vec!["core".to_owned(), "a+b".to_owned()]);
    }

    #[test]
    fn unfilled_slots_are_missing_arguments() {
        let mut argv = argv();
        let short = ShortcutArgs::to_command("core {%0}");
        let got = expand(&mut argv, Vec::new(), &short, None, "core");
        assert!(matches!(got, Err(Error::ArgumentMissing(_))));
    }

    #[test]
    fn regex_groups_fill_numbered_slots() {
        let mut argv = argv();
        let short = ShortcutArgs::to_command("core {0}");
        let reg = RegMatch { groups: vec!["321".to_owned()], named: IndexMap::new() };
        expand(&mut argv, Vec::new(), &short, Some(&reg), "core").unwrap();
        let texts: Vec<String> =
            argv.release(None, false, false).iter().map(|t| t.to_string()).collect();
        assert_eq!(texts, vec!["core".to_owned(), "321".to_owned()]);
    }

    #[test]
    fn strict_shortcut_rejects_trailing() {
        let mut argv = argv();
        let short =
            ShortcutArgs { fuzzy: false, ..ShortcutArgs::to_command("core") };
        let got = expand(&mut argv, vec![Token::Text("extra".into())], &short, None, "core");
        assert!(matches!(got, Err(Error::ParamsUnmatched(_))));
    }
}
