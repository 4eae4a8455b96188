// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Schema-driven argument parsing for commands and message chains.
//!
//! Programs build a command schema at runtime — a name with optional
//! prefixes, typed positional arguments, options with aliases and actions,
//! nested subcommands — and parse input against it. Input is either plain
//! text or a *message chain*: text pieces interleaved with opaque host
//! elements (images, mentions, whatever the platform carries).
//!
//! ## Basic Example
//!
//! ```rust
//! use argot::{Arg, Args, Command, Opt, Pattern, Value};
//!
//! let cmd = Command::new("echo")
//!     .args(Args::new().arg(Arg::new("count", Pattern::int())))
//!     .option(Opt::new("--upper|-u").help("uppercase the output"))
//!     .build()
//!     .unwrap();
//!
//! let res = cmd.parse("echo 3 --upper").unwrap();
//! assert!(res.matched);
//! assert_eq!(res.query("count"), Some(Value::Int(3)));
//! assert!(res.find("upper"));
//! ```
//!
//! Prefixes gate the command, and options may be compact (no separator
//! between the name and its argument):
//!
//! ```rust
//! use argot::{Arg, Args, Command, Opt, Pattern, Value};
//!
//! let cmd = Command::new("roll")
//!     .prefixes(["!"])
//!     .option(Opt::new("d").compact().args(Args::new().arg(Arg::new("sides", Pattern::int()))))
//!     .build()
//!     .unwrap();
//!
//! let res = cmd.parse("!roll d20").unwrap();
//! assert_eq!(res.query("d.sides"), Some(Value::Int(20)));
//! ```
//!
//! Subcommands nest arbitrarily, each with its own options:
//!
//! ```rust
//! use argot::{Arg, Args, Command, Pattern, Subcommand, Value};
//!
//! let cmd = Command::new("lp")
//!     .subcommand(
//!         Subcommand::new("user")
//!             .args(Args::new().arg(Arg::new("name", Pattern::string())))
//!             .subcommand(
//!                 Subcommand::new("perm").args(Args::new().arg(Arg::new("p", Pattern::string()))),
//!             ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let res = cmd.parse("lp user alice perm read").unwrap();
//! assert_eq!(res.query("user.name"), Some(Value::Str("alice".into())));
//! assert_eq!(res.query("user.perm.p"), Some(Value::Str("read".into())));
//! ```

#![deny(missing_docs)]

mod analyse;
mod args;
mod argv;
mod compile;
mod complete;
mod config;
mod error;
mod handlers;
mod header;
mod help;
mod manager;
mod node;
pub mod output;
pub mod pattern;
mod result;
mod shortcut;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::analyse::{Driver, Host};
use crate::compile::Compiled;

pub use crate::args::{Arg, ArgField, Args, CompletionSource, Multi};
pub use crate::argv::{
    Checker, ContextStyle, InputConverter, Preprocessor, Projected, TextProjector,
};
pub use crate::complete::{CompSession, EnterResult, Prompt};
pub use crate::config::{BuiltinNames, Config, Metadata, Namespace};
pub use crate::error::{Error, PauseKind, PauseState, Result, Special};
pub use crate::header::{CommandHead, Prefix};
pub use crate::manager::Manager;
pub use crate::node::{Action, ActionKind, Node, Opt, Subcommand};
pub use crate::pattern::{Accept, Message, Pattern, SeqKind, Token, Validated, Value};
pub use crate::result::{HeadMatch, Matches, OptMatch, SubMatch};
pub use crate::shortcut::{Shortcut, ShortcutArgs, ShortcutWrapper, SlotKey};

/// A post-match callback registered with [`Command::bind`].
pub type Executor =
    Box<dyn Fn(&Matches) -> std::result::Result<(), String> + Send + Sync>;

struct Schema {
    root: Subcommand,
    header: header::Header,
    compiled: Compiled,
}

pub(crate) struct CommandCore {
    name: String,
    raw_name: String,
    namespace: Namespace,
    prefixes: Vec<Prefix>,
    meta: Metadata,
    cfg: Config,
    schema: RwLock<Schema>,
    executors: RwLock<Vec<Executor>>,
    used_tokens: Mutex<HashSet<u64>>,
    manager: Arc<Manager>,
}

impl CommandCore {
    fn header_display(&self) -> String {
        let texts: Vec<&str> = self
            .prefixes
            .iter()
            .filter_map(|p| match p {
                Prefix::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        match texts.len() {
            0 => self.raw_name.clone(),
            1 => format!("{}{}", texts[0], self.raw_name),
            _ => format!("[{}]{}", texts.join("│"), self.raw_name),
        }
    }

    fn path_of(&self) -> String {
        format!("{}.{}", self.namespace.name, self.name)
    }
}

impl Host for CommandCore {
    fn path(&self) -> String {
        self.path_of()
    }

    fn command_name(&self) -> &str {
        &self.name
    }

    fn help_text(&self, parts: &[String]) -> String {
        let schema = self.schema.read_recursive();
        help::format_for(&schema.root, &self.meta, &self.header_display(), parts)
    }

    fn shortcut_dsl(
        &self,
        action: Option<&str>,
        name: Option<&str>,
        command: Option<&str>,
    ) -> String {
        let path = self.path_of();
        match action {
            Some("list") => {
                let keys = self.manager.shortcuts_of(&path);
                if keys.is_empty() {
                    "no shortcut registered".to_owned()
                } else {
                    keys.join("\n")
                }
            }
            Some("delete") => match name {
                None => "a shortcut name is required".to_owned(),
                Some(key) => match self.manager.delete_shortcut(&path, key) {
                    Ok(()) => format!("shortcut {key} removed"),
                    Err(e) => e.to_string(),
                },
            },
            _ => match name {
                None => "a shortcut name is required".to_owned(),
                Some(key) => {
                    let spec = match command {
                        None | Some("$") => ShortcutArgs::to_command(&self.raw_name),
                        Some("_") => match self.manager.recent_message() {
                            Some(message) => {
                                let texts: Vec<String> = message
                                    .0
                                    .iter()
                                    .filter_map(|t| t.as_text().map(str::to_owned))
                                    .collect();
                                ShortcutArgs::to_command(&texts.join(" "))
                            }
                            None => return "no recent command to bind".to_owned(),
                        },
                        Some(cmd) => ShortcutArgs::to_command(cmd),
                    };
                    match self.manager.add_shortcut(&path, key, Shortcut::Args(spec)) {
                        Ok(()) => format!("shortcut {key} added"),
                        Err(e) => e.to_string(),
                    }
                }
            },
        }
    }
}

/// A compiled command schema. Cheap to clone; clones share the schema,
/// executors and cache bookkeeping.
#[derive(Clone)]
pub struct Command {
    core: Arc<CommandCore>,
}

/// Builds a [`Command`].
pub struct CommandBuilder {
    name: String,
    command_pattern: Option<Pattern>,
    prefixes: Vec<Prefix>,
    args: Args,
    children: Vec<Node>,
    meta: Metadata,
    cfg: Option<Config>,
    namespace: Namespace,
    manager: Option<Arc<Manager>>,
}

impl Command {
    /// Start building a command. `name` may carry `|`-separated alternates
    /// and `{slot:type}` header placeholders (or a `re:` raw regex).
    pub fn new(name: &str) -> CommandBuilder {
        CommandBuilder {
            name: name.to_owned(),
            command_pattern: None,
            prefixes: Vec::new(),
            args: Args::new(),
            children: Vec::new(),
            meta: Metadata::default(),
            cfg: None,
            namespace: Namespace::default(),
            manager: None,
        }
    }

    /// The command name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The namespace this command registered under.
    pub fn namespace(&self) -> &str {
        &self.core.namespace.name
    }

    /// The command path, `namespace.name`.
    pub fn path(&self) -> String {
        self.core.path_of()
    }

    /// The command's metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.core.meta
    }

    /// The command's configuration.
    pub fn config(&self) -> &Config {
        &self.core.cfg
    }

    /// Render the command's help text.
    pub fn get_help(&self) -> String {
        self.core.help_text(&[])
    }

    /// Parse an input against the schema.
    pub fn parse(&self, input: impl Into<Message>) -> Result<Matches> {
        self.parse_with(input, IndexMap::new())
    }

    /// Parse with an interpolation context for `{name}` / `$(name)` slots.
    pub fn parse_with(
        &self,
        input: impl Into<Message>,
        ctx: IndexMap<String, Value>,
    ) -> Result<Matches> {
        let mut argv = self.make_argv(false);
        argv.enter(ctx);
        if let Err(e) = argv.build(input.into()) {
            if self.core.cfg.raise_exception {
                return Err(e);
            }
            return Ok(self.failed_matches(&argv, &e));
        }
        self.run(&mut argv, None)
    }

    /// Register a callback invoked on every successful parse. A returned
    /// error surfaces as [`Error::ExecuteFailed`].
    pub fn bind(
        &self,
        executor: impl Fn(&Matches) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) -> &Self {
        self.core.executors.write().push(Box::new(executor));
        self
    }

    /// Register a shortcut: input starting with `key` (a literal or a
    /// regex) is rewritten through `spec` when the header fails.
    pub fn shortcut(&self, key: &str, spec: ShortcutArgs) -> Result<String> {
        self.core.manager.add_shortcut(&self.path(), key, Shortcut::Args(spec))?;
        Ok(format!("shortcut {key} added"))
    }

    /// Register a shortcut that returns a pre-built result verbatim.
    pub fn shortcut_static(&self, key: &str, matches: Matches) -> Result<String> {
        self.core
            .manager
            .add_shortcut(&self.path(), key, Shortcut::Complete(Box::new(matches)))?;
        Ok(format!("shortcut {key} added"))
    }

    /// Remove a registered shortcut.
    pub fn remove_shortcut(&self, key: &str) -> Result<String> {
        self.core.manager.delete_shortcut(&self.path(), key)?;
        Ok(format!("shortcut {key} removed"))
    }

    /// The shortcut keys registered for this command.
    pub fn get_shortcuts(&self) -> Vec<String> {
        self.core.manager.shortcuts_of(&self.path())
    }

    /// Append an option after construction; the schema recompiles.
    pub fn add_option(&self, opt: Opt) -> Result<()> {
        let mut schema = self.core.schema.write();
        schema.root.children.push(Node::Opt(opt));
        schema.root.finish()?;
        schema.compiled = compile::compile(&schema.root)?;
        Ok(())
    }

    /// Append a subcommand after construction; the schema recompiles.
    pub fn add_subcommand(&self, sub: Subcommand) -> Result<()> {
        let mut schema = self.core.schema.write();
        schema.root.children.push(Node::Sub(sub));
        schema.root.finish()?;
        schema.compiled = compile::compile(&schema.root)?;
        Ok(())
    }

    /// Join with another command into a group tried in order.
    pub fn union(self, other: Command) -> CommandGroup {
        CommandGroup { commands: vec![self, other] }
    }

    fn failed_matches(&self, argv: &argv::Argv, error: &Error) -> Matches {
        Matches {
            source: self.path(),
            origin: argv.origin.clone(),
            matched: false,
            error_info: Some(error.to_string()),
            error_data: argv.release(None, false, false),
            ..Matches::default()
        }
    }

    pub(crate) fn make_argv(&self, comp_active: bool) -> argv::Argv {
        let core = &self.core;
        let mut argv = argv::Argv::new(argv::seps_of(&core.namespace.separators));
        argv.filter_crlf = !core.cfg.keep_crlf;
        argv.message_cache = core.cfg.enable_message_cache;
        argv.context_style = core.cfg.context_style;
        argv.fuzzy_match = core.cfg.fuzzy_match;
        argv.fuzzy_threshold = core.cfg.fuzzy_threshold;
        argv.comp_active = comp_active;
        argv.remainders = core.namespace.remainders.clone();
        for name in &core.cfg.builtin_option_name.help {
            argv.special.insert(name.clone(), Special::Help);
        }
        for name in &core.cfg.builtin_option_name.shortcut {
            argv.special.insert(name.clone(), Special::Shortcut);
        }
        for name in &core.cfg.builtin_option_name.completion {
            argv.special.insert(name.clone(), Special::Completion);
            argv.completion_names.insert(name.clone());
        }
        argv.disabled = core.cfg.disable_builtin_options.clone();
        {
            let schema = core.schema.read();
            argv.param_ids = schema.compiled.param_ids.clone();
            argv.soft_ids = schema.compiled.soft_ids.clone();
        }
        argv.install_hooks(
            core.namespace.to_text.clone(),
            core.namespace.checker.clone(),
            core.namespace.converter.clone(),
            core.namespace.filter_out.clone(),
            core.namespace.preprocessors.clone(),
        );
        argv
    }

    pub(crate) fn run(
        &self,
        argv: &mut argv::Argv,
        raise_override: Option<bool>,
    ) -> Result<Matches> {
        let core = &self.core;
        let raise = raise_override.unwrap_or(core.cfg.raise_exception);
        if core.cfg.enable_message_cache && core.used_tokens.lock().contains(&argv.token) {
            if let Some(cached) = core.manager.get_record(argv.token) {
                log::debug!("{}: result cache hit", core.name);
                return Ok(cached);
            }
        }
        let prefix_texts: Vec<String> = core
            .prefixes
            .iter()
            .filter_map(|p| match p {
                Prefix::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        let schema = core.schema.read();
        let mut rewrites = 0usize;
        loop {
            let mut driver = Driver::new(
                &schema.compiled,
                &schema.header,
                core.as_ref(),
                raise,
                core.cfg.strict,
            );
            match driver.process(argv) {
                Ok(matches) => return self.finish(argv, matches),
                Err(e @ Error::InvalidHeader(_)) => {
                    let bak = argv.bak.clone();
                    argv.restore(bak, 0);
                    let (first, _) = argv.peek(None);
                    let Some(first_text) = first.as_text().map(str::to_owned) else {
                        return self.settle(raise, argv, e);
                    };
                    let found =
                        core.manager.find_shortcut(&self.path(), &first_text, &prefix_texts);
                    let Some((shortcut, reg)) = found else {
                        return self.settle(raise, argv, e);
                    };
                    rewrites += 1;
                    if rewrites > 4 {
                        return self.settle(raise, argv, e);
                    }
                    log::debug!("{}: header miss, shortcut {first_text} engaged", core.name);
                    match shortcut {
                        Shortcut::Complete(matches) => return Ok(*matches),
                        Shortcut::Args(spec) => {
                            argv.next(None);
                            let data = argv.release(None, false, false);
                            argv.reset();
                            if let Err(se) =
                                shortcut::expand(argv, data, &spec, reg.as_ref(), &core.raw_name)
                            {
                                return self.settle(raise, argv, se);
                            }
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn settle(&self, raise: bool, argv: &argv::Argv, e: Error) -> Result<Matches> {
        if raise {
            return Err(e);
        }
        Ok(self.failed_matches(argv, &e))
    }

    fn finish(&self, argv: &mut argv::Argv, matches: Matches) -> Result<Matches> {
        let core = &self.core;
        if !matches.matched {
            return Ok(matches);
        }
        if core.cfg.enable_message_cache && argv.token != 0 {
            core.manager.record(argv.token, matches.clone());
            core.used_tokens.lock().insert(argv.token);
        }
        for executor in core.executors.read().iter() {
            if let Err(message) = executor(&matches) {
                return Err(Error::ExecuteFailed(message));
            }
        }
        Ok(matches)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Command({})", self.core.path_of())
    }
}

impl CommandBuilder {
    /// Set text prefixes gating the command.
    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(|p| Prefix::Text(p.into())));
        self
    }

    /// Add a non-text prefix (an opaque element matcher, or an element
    /// paired with a text lead-in).
    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefixes.push(prefix);
        self
    }

    /// Match the whole head as an element class instead of a name.
    pub fn command_pattern(mut self, pattern: Pattern) -> Self {
        self.command_pattern = Some(pattern);
        self
    }

    /// Attach the command's own arguments.
    pub fn args(mut self, args: Args) -> Self {
        self.args = self.args.merge(args);
        self
    }

    /// Add an option.
    pub fn option(mut self, opt: Opt) -> Self {
        self.children.push(Node::Opt(opt));
        self
    }

    /// Add a subcommand.
    pub fn subcommand(mut self, sub: Subcommand) -> Self {
        self.children.push(Node::Sub(sub));
        self
    }

    /// Attach metadata.
    pub fn meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    /// Override the configuration (defaults come from the namespace).
    pub fn config(mut self, cfg: Config) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Register under this namespace instead of the default.
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Register with this manager instead of the global one.
    pub fn manager(mut self, manager: Arc<Manager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Compile the schema and register the command.
    pub fn build(self) -> Result<Command> {
        let namespace = self.namespace;
        let cfg = self.cfg.unwrap_or_else(|| namespace.config.clone());
        let prefixes = if self.prefixes.is_empty() {
            namespace.prefixes.iter().map(|p| Prefix::Text(p.clone())).collect()
        } else {
            self.prefixes
        };
        let mut root = Subcommand::new(&self.name).args(self.args);
        root.separators = argv::seps_of(&namespace.separators);
        root.children = self.children;
        root.finish()?;
        let head = match self.command_pattern {
            Some(pattern) => CommandHead::Elem(pattern),
            None => CommandHead::Text(self.name.clone()),
        };
        let header = header::Header::generate(&head, &prefixes, cfg.compact)?;
        let compiled = compile::compile(&root)?;
        let manager = self.manager.unwrap_or_else(Manager::global);
        let core = CommandCore {
            name: root.name().to_owned(),
            raw_name: self.name,
            namespace,
            prefixes,
            meta: self.meta,
            cfg,
            schema: RwLock::new(Schema { root, header, compiled }),
            executors: RwLock::new(Vec::new()),
            used_tokens: Mutex::new(HashSet::new()),
            manager: manager.clone(),
        };
        let command = Command { core: Arc::new(core) };
        manager.register(command.clone())?;
        Ok(command)
    }
}

/// Commands tried in order; the first match wins.
pub struct CommandGroup {
    commands: Vec<Command>,
}

impl CommandGroup {
    /// Group the given commands.
    pub fn new(commands: Vec<Command>) -> Self {
        CommandGroup { commands }
    }

    /// Append another command.
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Parse against each member until one matches; the last result is
    /// returned when none does.
    pub fn parse(&self, input: impl Into<Message>) -> Result<Matches> {
        let message = input.into();
        let mut last = None;
        for command in &self.commands {
            let matches = command.parse(message.clone())?;
            if matches.matched {
                return Ok(matches);
            }
            last = Some(matches);
        }
        last.ok_or_else(|| Error::NullMessage("empty command group".into()))
    }
}

impl std::ops::BitOr<Command> for CommandGroup {
    type Output = CommandGroup;

    fn bitor(mut self, rhs: Command) -> CommandGroup {
        self.commands.push(rhs);
        self
    }
}

impl std::ops::BitOr for Command {
    type Output = CommandGroup;

    fn bitor(self, rhs: Command) -> CommandGroup {
        self.union(rhs)
    }
}
