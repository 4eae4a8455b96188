// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Command metadata, per-command configuration and namespace defaults.

use std::any::TypeId;
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::argv::{Checker, ContextStyle, InputConverter, Preprocessor, TextProjector};
use crate::error::Special;

/// Descriptive metadata attached to a command; shown in help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// One-line description.
    pub description: String,
    /// Usage override.
    pub usage: Option<String>,
    /// A usage example.
    pub example: Option<String>,
    /// The author.
    pub author: Option<String>,
    /// The command version.
    pub version: Option<String>,
    /// Free-form extra entries.
    pub extra: IndexMap<String, String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            description: "Unknown".to_owned(),
            usage: None,
            example: None,
            author: None,
            version: None,
            extra: IndexMap::new(),
        }
    }
}

impl Metadata {
    /// Metadata with just a description.
    pub fn describe(description: &str) -> Self {
        Metadata { description: description.to_owned(), ..Metadata::default() }
    }
}

/// Names recognised for the built-in pseudo-options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinNames {
    /// Names triggering help.
    pub help: Vec<String>,
    /// Names triggering shortcut management.
    pub shortcut: Vec<String>,
    /// Names triggering completion.
    pub completion: Vec<String>,
}

impl Default for BuiltinNames {
    fn default() -> Self {
        BuiltinNames {
            help: vec!["--help".to_owned(), "-h".to_owned()],
            shortcut: vec!["--shortcut".to_owned(), "-sct".to_owned()],
            completion: vec!["--comp".to_owned(), "-cp".to_owned(), "?".to_owned()],
        }
    }
}

/// Per-command behaviour switches.
#[derive(Clone)]
pub struct Config {
    /// Suggest close candidates on mismatches.
    pub fuzzy_match: bool,
    /// Similarity threshold for suggestions, in `0.0..=1.0`.
    pub fuzzy_threshold: f32,
    /// Propagate parse errors instead of returning a failed result.
    pub raise_exception: bool,
    /// Reject unknown tokens; when off they accumulate under `$extra`.
    pub strict: bool,
    /// Keep CR/LF instead of treating them as separators.
    pub keep_crlf: bool,
    /// Allow the first argument to follow the header with no separator.
    pub compact: bool,
    /// Context interpolation style; `None` disables interpolation.
    pub context_style: Option<ContextStyle>,
    /// Cache results keyed by input fingerprint.
    pub enable_message_cache: bool,
    /// Hide the command from the manager's overview help.
    pub hide: bool,
    /// Hide registered shortcuts from help output.
    pub hide_shortcut: bool,
    /// Built-in options that must not intercept parsing.
    pub disable_builtin_options: HashSet<Special>,
    /// Names for the built-in options.
    pub builtin_option_name: BuiltinNames,
    /// Free-form extra entries.
    pub extra: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fuzzy_match: false,
            fuzzy_threshold: 0.6,
            raise_exception: false,
            strict: true,
            keep_crlf: false,
            compact: false,
            context_style: None,
            enable_message_cache: true,
            hide: false,
            hide_shortcut: false,
            disable_builtin_options: HashSet::from([Special::Shortcut]),
            builtin_option_name: BuiltinNames::default(),
            extra: IndexMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("fuzzy_match", &self.fuzzy_match)
            .field("raise_exception", &self.raise_exception)
            .field("strict", &self.strict)
            .field("compact", &self.compact)
            .field("enable_message_cache", &self.enable_message_cache)
            .finish_non_exhaustive()
    }
}

/// Defaults shared by every command registered under one namespace.
#[derive(Clone)]
pub struct Namespace {
    /// The namespace name; the first half of a command path.
    pub name: String,
    /// Default prefixes for commands built in this namespace.
    pub prefixes: Vec<String>,
    /// Default separator characters.
    pub separators: String,
    /// Default per-command configuration.
    pub config: Config,
    /// Registered commands beyond this raise `ExceedMaxCount`.
    pub command_max_count: usize,
    /// Capacity of the result cache.
    pub message_max_cache: usize,
    /// Tokens that cut off variadic consumption.
    pub remainders: HashSet<String>,
    /// Projects opaque elements to text during tokenisation.
    pub to_text: Option<TextProjector>,
    /// Gates whether an input needs normalisation.
    pub checker: Option<Checker>,
    /// Normalises gated inputs.
    pub converter: Option<InputConverter>,
    /// Element types dropped from the stream.
    pub filter_out: Vec<TypeId>,
    /// Per-type element rewriters applied before projection.
    pub preprocessors: IndexMap<TypeId, Preprocessor>,
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::new("argot")
    }
}

impl Namespace {
    /// A namespace with default configuration.
    pub fn new(name: &str) -> Self {
        Namespace {
            name: name.to_owned(),
            prefixes: Vec::new(),
            separators: " ".to_owned(),
            config: Config::default(),
            command_max_count: 200,
            message_max_cache: 100,
            remainders: HashSet::from(["--".to_owned()]),
            to_text: None,
            checker: None,
            converter: None,
            filter_out: Vec::new(),
            preprocessors: IndexMap::new(),
        }
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("prefixes", &self.prefixes)
            .field("command_max_count", &self.command_max_count)
            .finish_non_exhaustive()
    }
}
