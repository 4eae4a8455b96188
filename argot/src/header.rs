// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Header matching: the command name plus its prefix list, compiled into
//! the cheapest matcher the shapes allow.

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::pattern::{self, Pattern};

/// One allowed prefix before the command name.
#[derive(Clone, Debug)]
pub enum Prefix {
    /// A text prefix glued to the command name (`"!" + "core"`).
    Text(String),
    /// An opaque element matched by a pattern, standing alone before the
    /// command token.
    Elem(Pattern),
    /// An element followed by a text prefix on the command token.
    Pair(Pattern, String),
}

/// The command part of a header.
#[derive(Clone, Debug)]
pub enum CommandHead {
    /// A command name, possibly carrying `{name:type}` placeholders or a
    /// `re:` raw regex.
    Text(String),
    /// An element-class command (the whole head is one opaque element).
    Elem(Pattern),
}

/// The command side of a pair-matching header.
#[derive(Debug)]
pub(crate) enum DoubleCmd {
    Literals(Vec<String>),
    Template(Regex),
}

/// Compiled matcher content, by shape.
#[derive(Debug)]
pub(crate) enum HeadContent {
    /// Full-string comparison against `prefix + command` texts.
    Literals(Vec<String>),
    /// Full-match regex (template or `re:` headers).
    Template(Regex),
    /// A single element-pattern head.
    Elem(Pattern),
    /// Element/pair prefixes with a separate command part.
    Double {
        pairs: Vec<(Pattern, String)>,
        texts: Vec<String>,
        command: DoubleCmd,
    },
}

/// A compiled header.
pub(crate) struct Header {
    pub(crate) origin: (String, Vec<Prefix>),
    pub(crate) content: HeadContent,
    pub(crate) mapping: IndexMap<String, Pattern>,
    pub(crate) compact: bool,
    pub(crate) compact_regex: Option<Regex>,
}

const ESCAPES: &[(&str, char)] = &[
    ("\\\\", '\u{0}'),
    ("\\[", '\u{1}'),
    ("\\]", '\u{2}'),
    ("\\{", '\u{3}'),
    ("\\}", '\u{4}'),
    ("\\|", '\u{5}'),
];

pub(crate) fn escape(text: &str) -> String {
    let mut out = text.to_owned();
    for (seq, mark) in ESCAPES {
        out = out.replace(seq, &mark.to_string());
    }
    out
}

pub(crate) fn unescape(text: &str) -> String {
    let mut out = text.to_owned();
    for (seq, mark) in ESCAPES {
        out = out.replace(*mark, &seq[1..]);
    }
    out
}

/// Compile `{name[:type]}` placeholders into regex fragments, collecting
/// named-group conversion patterns into `mapping`. Returns the fragment and
/// whether any placeholder forced regex mode.
fn handle_bracket(name: &str, mapping: &mut IndexMap<String, Pattern>) -> Result<(String, bool)> {
    let name = escape(name);
    let finder = Regex::new(r"\{.*?\}").expect("placeholder finder compiles");
    if finder.find(&name).is_none() {
        return Ok((unescape(&name), false));
    }
    let mut out = String::new();
    let mut last = 0;
    for mat in finder.find_iter(&name) {
        out.push_str(&name[last..mat.start()]);
        let body = &mat.as_str()[1..mat.as_str().len() - 1];
        let (slot, ty) = match body.split_once(':') {
            Some((s, t)) => (s.trim(), t.trim()),
            None => (body.trim(), ""),
        };
        match (slot.is_empty(), ty.is_empty()) {
            (true, true) => out.push_str(".+?"),
            (false, true) => out.push_str(&format!("(?P<{slot}>.+)")),
            (true, false) => {
                if pattern::lookup(ty).is_some() {
                    out.push_str(pattern::regex_source_for(ty));
                } else {
                    // unknown type names are raw regex fragments
                    out.push_str(ty);
                }
            }
            (false, false) => {
                let src = pattern::regex_source_for(ty);
                if let Some(pat) = pattern::lookup(ty) {
                    mapping.insert(slot.to_owned(), pat);
                    out.push_str(&format!("(?P<{slot}>{src})"));
                } else {
                    // unknown type names are raw regex fragments
                    out.push_str(&format!("(?P<{slot}>{ty})"));
                }
            }
        }
        last = mat.end();
    }
    out.push_str(&name[last..]);
    Ok((unescape_keep(&out), true))
}

// unescape without interpreting the marks as escape sequences again
fn unescape_keep(text: &str) -> String {
    let mut out = text.to_owned();
    for (seq, mark) in ESCAPES {
        out = out.replace(*mark, &regex::escape(&seq[1..2]));
    }
    out
}

fn full_regex(src: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{src})$"))
        .map_err(|e| Error::InvalidParam(format!("bad header pattern {src:?}: {e}")))
}

fn prefix_regex(src: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{src})"))
        .map_err(|e| Error::InvalidParam(format!("bad header pattern {src:?}: {e}")))
}

impl Header {
    /// Compile the cheapest matcher for `command` under `prefixes`.
    pub(crate) fn generate(
        command: &CommandHead,
        prefixes: &[Prefix],
        compact: bool,
    ) -> Result<Header> {
        let mut mapping = IndexMap::new();
        let command_text = match command {
            CommandHead::Text(t) => t.clone(),
            CommandHead::Elem(pat) => {
                // element-class head; text prefixes make no sense here
                let compact_regex = match (compact, pat.regex_source()) {
                    (true, Some(src)) => Some(prefix_regex(src)?),
                    _ => None,
                };
                return Ok(Header {
                    origin: (String::new(), prefixes.to_vec()),
                    content: HeadContent::Elem(pat.clone()),
                    mapping,
                    compact,
                    compact_regex,
                });
            }
        };

        let (cmd_src, to_regex) = if let Some(raw) = command_text.strip_prefix("re:") {
            (raw.to_owned(), true)
        } else {
            handle_bracket(&command_text, &mut mapping)?
        };

        let mut texts = Vec::new();
        let mut pairs = Vec::new();
        for prefix in prefixes {
            match prefix {
                Prefix::Text(t) => texts.push(t.clone()),
                Prefix::Elem(pat) => pairs.push((pat.clone(), String::new())),
                Prefix::Pair(pat, t) => pairs.push((pat.clone(), t.clone())),
            }
        }

        let origin = (command_text.clone(), prefixes.to_vec());
        if pairs.is_empty() {
            if texts.is_empty() {
                let compact_regex = Some(prefix_regex(&cmd_src)?);
                let content = if to_regex {
                    HeadContent::Template(full_regex(&cmd_src)?)
                } else {
                    HeadContent::Literals(vec![cmd_src])
                };
                return Ok(Header { origin, content, mapping, compact, compact_regex });
            }
            let prf: Vec<String> = texts.iter().map(|t| regex::escape(t)).collect();
            let prf = prf.join("|");
            let compact_regex = Some(prefix_regex(&format!("(?:{prf}){cmd_src}"))?);
            let content = if to_regex {
                HeadContent::Template(full_regex(&format!("(?:{prf}){cmd_src}"))?)
            } else {
                HeadContent::Literals(texts.iter().map(|t| format!("{t}{cmd_src}")).collect())
            };
            return Ok(Header { origin, content, mapping, compact, compact_regex });
        }

        let command = if to_regex {
            DoubleCmd::Template(full_regex(&cmd_src)?)
        } else {
            DoubleCmd::Literals(vec![cmd_src.clone()])
        };
        let compact_regex = if texts.is_empty() {
            Some(prefix_regex(&cmd_src)?)
        } else {
            let prf: Vec<String> = texts.iter().map(|t| regex::escape(t)).collect();
            Some(prefix_regex(&format!("(?:{}){cmd_src}", prf.join("|")))?)
        };
        Ok(Header {
            origin,
            content: HeadContent::Double { pairs, texts, command },
            mapping,
            compact,
            compact_regex,
        })
    }

    /// Every concrete header text, for fuzzy candidates and display.
    pub(crate) fn candidate_texts(&self) -> Vec<String> {
        match &self.content {
            HeadContent::Literals(lits) => lits.clone(),
            HeadContent::Template(_) | HeadContent::Elem(_) => {
                let (command, prefixes) = &self.origin;
                if prefixes.is_empty() {
                    vec![command.clone()]
                } else {
                    prefixes
                        .iter()
                        .map(|p| match p {
                            Prefix::Text(t) => format!("{t}{command}"),
                            Prefix::Elem(pat) => format!("{pat} {command}"),
                            Prefix::Pair(pat, t) => format!("{pat} {t}{command}"),
                        })
                        .collect()
                }
            }
            HeadContent::Double { pairs, texts, .. } => {
                let command = &self.origin.0;
                let mut out: Vec<String> =
                    texts.iter().map(|t| format!("{t}{command}")).collect();
                out.extend(pairs.iter().map(|(pat, t)| format!("{pat} {t}{command}")));
                out
            }
        }
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (command, prefixes) = &self.origin;
        if prefixes.is_empty() {
            return f.write_str(command);
        }
        let texts: Vec<String> = prefixes
            .iter()
            .filter_map(|p| match p {
                Prefix::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            f.write_str(command)
        } else if texts.len() == 1 {
            write!(f, "{}{command}", texts[0])
        } else {
            write!(f, "[{}]{command}", texts.join("│"))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_command_is_a_literal_set() {
        let h = Header::generate(
            &CommandHead::Text("core".into()),
            &[Prefix::Text("!".into()), Prefix::Text("/".into())],
            false,
        )
        .unwrap();
        match &h.content {
            HeadContent::Literals(lits) => {
                assert_eq!(lits, &["!core".to_owned(), "/core".to_owned()]);
            }
            other => panic!("expected literals, got {other:?}"),
        }
    }

    #[test]
    fn bracket_template_compiles_named_groups() {
        let h =
            Header::generate(&CommandHead::Text("RD{r:int}?=={e:int}".into()), &[], false).unwrap();
        let HeadContent::Template(re) = &h.content else { panic!("expected template") };
        let caps = re.captures("RD100==36").unwrap();
        assert_eq!(&caps["r"], "100");
        assert_eq!(&caps["e"], "36");
        assert!(h.mapping.contains_key("r"));
    }

    #[test]
    fn escaped_braces_stay_literal() {
        let h =
            Header::generate(&CommandHead::Text(r"RD\{r:int\}".into()), &[], false).unwrap();
        match &h.content {
            HeadContent::Literals(lits) => assert_eq!(lits, &["RD{r:int}".to_owned()]),
            other => panic!("expected literals, got {other:?}"),
        }
    }

    #[test]
    fn raw_regex_headers() {
        let h = Header::generate(&CommandHead::Text("re:ping\\d+".into()), &[], false).unwrap();
        let HeadContent::Template(re) = &h.content else { panic!("expected template") };
        assert!(re.is_match("ping12"));
        assert!(!re.is_match("ping"));
    }

    #[test]
    fn compact_regex_is_prefix_anchored() {
        let h = Header::generate(
            &CommandHead::Text("core".into()),
            &[Prefix::Text("!".into())],
            true,
        )
        .unwrap();
        let re = h.compact_regex.unwrap();
        let m = re.find("!coreabc").unwrap();
        assert_eq!(m.as_str(), "!core");
    }
}
