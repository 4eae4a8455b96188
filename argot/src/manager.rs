// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The command manager: a registry of commands by (namespace, name), a
//! bounded result cache keyed by input fingerprint, and the shortcut
//! store with optional JSON persistence.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use regex::Regex;

use crate::error::{Error, Result};
use crate::pattern::Message;
use crate::result::Matches;
use crate::shortcut::{RegMatch, Shortcut, StoredShortcut};
use crate::Command;

static GLOBAL: Lazy<Arc<Manager>> = Lazy::new(|| Arc::new(Manager::new(200, 100)));

/// Process-wide coordination for commands. A default global instance backs
/// the convenience paths; construct your own to isolate registries.
pub struct Manager {
    commands: RwLock<IndexMap<String, IndexMap<String, Command>>>,
    records: Mutex<LruCache<u64, Matches>>,
    shortcuts: RwLock<IndexMap<String, Shortcut>>,
    shortcut_keys: RwLock<IndexMap<String, Regex>>,
    disabled: RwLock<HashSet<String>>,
    max_count: usize,
    cache_path: RwLock<Option<PathBuf>>,
}

impl Manager {
    /// A manager allowing up to `max_count` commands and caching up to
    /// `record_capacity` results.
    pub fn new(max_count: usize, record_capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(record_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Manager {
            commands: RwLock::new(IndexMap::new()),
            records: Mutex::new(LruCache::new(capacity)),
            shortcuts: RwLock::new(IndexMap::new()),
            shortcut_keys: RwLock::new(IndexMap::new()),
            disabled: RwLock::new(HashSet::new()),
            max_count,
            cache_path: RwLock::new(None),
        }
    }

    /// The process-wide default instance.
    pub fn global() -> Arc<Manager> {
        GLOBAL.clone()
    }

    pub(crate) fn register(&self, command: Command) -> Result<()> {
        let mut commands = self.commands.write();
        let count: usize = commands.values().map(IndexMap::len).sum();
        let namespace = commands.entry(command.namespace().to_owned()).or_default();
        let fresh = !namespace.contains_key(command.name());
        if fresh && count >= self.max_count {
            return Err(Error::ExceedMaxCount);
        }
        log::debug!("registering command {}", command.path());
        namespace.insert(command.name().to_owned(), command);
        Ok(())
    }

    /// Remove a command by `namespace.name` path.
    pub fn delete(&self, path: &str) {
        let (namespace, name) = split_path(path);
        let mut commands = self.commands.write();
        if let Some(table) = commands.get_mut(&namespace) {
            table.shift_remove(&name);
            if table.is_empty() {
                commands.shift_remove(&namespace);
            }
        }
        log::debug!("deleted command {path}");
    }

    /// Fetch a command by path, if registered.
    pub fn resolve(&self, path: &str) -> Option<Command> {
        let (namespace, name) = split_path(path);
        self.commands.read().get(&namespace)?.get(&name).cloned()
    }

    /// Fetch a command by path, failing loudly when unknown.
    pub fn require(&self, path: &str) -> Result<Command> {
        self.resolve(path)
            .ok_or_else(|| Error::ExecuteFailed(format!("command {path} is not registered")))
    }

    /// Every registered command, optionally restricted to one namespace.
    pub fn commands(&self, namespace: Option<&str>) -> Vec<Command> {
        let commands = self.commands.read();
        match namespace {
            Some(ns) => {
                commands.get(ns).map(|t| t.values().cloned().collect()).unwrap_or_default()
            }
            None => commands.values().flat_map(|t| t.values().cloned()).collect(),
        }
    }

    /// Stop a command from being considered by `broadcast`.
    pub fn set_disable(&self, path: &str) {
        self.disabled.write().insert(path.to_owned());
    }

    /// Re-enable a disabled command.
    pub fn set_enable(&self, path: &str) {
        self.disabled.write().remove(path);
    }

    /// Whether the command is disabled.
    pub fn is_disable(&self, path: &str) -> bool {
        self.disabled.read().contains(path)
    }

    pub(crate) fn add_shortcut(&self, path: &str, key: &str, short: Shortcut) -> Result<()> {
        let stored_key = format!("{path}::{key}");
        if let Ok(re) = Regex::new(&format!("^{key}$")) {
            self.shortcut_keys.write().insert(stored_key.clone(), re);
        }
        self.shortcuts.write().insert(stored_key, short);
        self.persist();
        Ok(())
    }

    pub(crate) fn delete_shortcut(&self, path: &str, key: &str) -> Result<()> {
        let stored_key = format!("{path}::{key}");
        let removed = self.shortcuts.write().shift_remove(&stored_key);
        self.shortcut_keys.write().shift_remove(&stored_key);
        self.persist();
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::ExecuteFailed(format!("shortcut {key} is not registered"))),
        }
    }

    /// The shortcut keys registered for a command path.
    pub fn shortcuts_of(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}::");
        self.shortcuts
            .read()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(str::to_owned)
            .collect()
    }

    /// Look up a shortcut of `path` triggered by `token`: literal keys
    /// first, then regex keys in registration order. `prefixes` are tried
    /// as strippable lead-ins for shortcuts that allow them.
    pub(crate) fn find_shortcut(
        &self,
        path: &str,
        token: &str,
        prefixes: &[String],
    ) -> Option<(Shortcut, Option<RegMatch>)> {
        let shortcuts = self.shortcuts.read();
        let keys = self.shortcut_keys.read();
        let prefix = format!("{path}::");
        let candidates = |text: &str, allow_prefixed_only: bool| {
            for (stored_key, short) in shortcuts.iter() {
                if !stored_key.starts_with(&prefix) {
                    continue;
                }
                if allow_prefixed_only {
                    let prefixed_ok = matches!(short, Shortcut::Args(a) if a.prefixes);
                    if !prefixed_ok {
                        continue;
                    }
                }
                let bare = &stored_key[prefix.len()..];
                if bare == text {
                    return Some((short.clone(), None));
                }
                if let Some(re) = keys.get(stored_key) {
                    if let Some(caps) = re.captures(text) {
                        if caps.get(0).map(|m| m.as_str() == text).unwrap_or(false) {
                            let reg = RegMatch::of(re, &caps);
                            return Some((short.clone(), Some(reg)));
                        }
                    }
                }
            }
            None
        };
        if let Some(hit) = candidates(token, false) {
            return Some(hit);
        }
        for p in prefixes {
            if let Some(stripped) = token.strip_prefix(p.as_str()) {
                if let Some(hit) = candidates(stripped, true) {
                    return Some(hit);
                }
            }
        }
        None
    }

    /// Cache a successful parse under its input fingerprint.
    pub fn record(&self, token: u64, matches: Matches) {
        if token == 0 {
            return;
        }
        self.records.lock().put(token, matches);
    }

    /// Fetch a cached result.
    pub fn get_record(&self, token: u64) -> Option<Matches> {
        if token == 0 {
            return None;
        }
        self.records.lock().get(&token).cloned()
    }

    /// The most recently cached input.
    pub fn recent_message(&self) -> Option<Message> {
        self.records.lock().iter().next().map(|(_, m)| m.origin.clone())
    }

    /// Try each registered command (optionally within one namespace) until
    /// one matches.
    pub fn broadcast(&self, message: Message, namespace: Option<&str>) -> Option<Matches> {
        for command in self.commands(namespace) {
            if self.is_disable(&command.path()) {
                continue;
            }
            if let Ok(matches) = command.parse(message.clone()) {
                if matches.matched {
                    return Some(matches);
                }
            }
        }
        None
    }

    /// One-line help for every visible command.
    pub fn all_command_help(&self, namespace: Option<&str>) -> String {
        let lines: Vec<String> = self
            .commands(namespace)
            .iter()
            .filter(|c| !c.config().hide)
            .map(|c| format!(" - {} : {}", c.name(), c.metadata().description))
            .collect();
        format!("# Commands\n{}", lines.join("\n"))
    }

    /// Full help for one command by path.
    pub fn command_help(&self, path: &str) -> Option<String> {
        self.resolve(path).map(|c| c.get_help())
    }

    /// Load the persisted shortcut store from a JSON keystore.
    pub fn load_cache(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ExecuteFailed(format!("keystore read failed: {e}")))?;
        let stored: IndexMap<String, StoredShortcut> = serde_json::from_str(&text)
            .map_err(|e| Error::ExecuteFailed(format!("keystore decode failed: {e}")))?;
        let mut shortcuts = self.shortcuts.write();
        let mut keys = self.shortcut_keys.write();
        for (stored_key, spec) in stored {
            if let Ok(re) = Regex::new(&format!(
                "^{}$",
                stored_key.rsplit_once("::").map(|(_, k)| k).unwrap_or(&stored_key)
            )) {
                keys.insert(stored_key.clone(), re);
            }
            shortcuts.insert(stored_key, spec.into());
        }
        *self.cache_path.write() = Some(path.as_ref().to_owned());
        Ok(())
    }

    /// Persist the shortcut store to a JSON keystore.
    pub fn dump_cache(&self, path: impl AsRef<Path>) -> Result<()> {
        let shortcuts = self.shortcuts.read();
        let stored: IndexMap<String, StoredShortcut> = shortcuts
            .iter()
            .filter_map(|(k, s)| StoredShortcut::of(s).map(|v| (k.clone(), v)))
            .collect();
        let text = serde_json::to_string_pretty(&stored)
            .map_err(|e| Error::ExecuteFailed(format!("keystore encode failed: {e}")))?;
        std::fs::write(path.as_ref(), text)
            .map_err(|e| Error::ExecuteFailed(format!("keystore write failed: {e}")))?;
        *self.cache_path.write() = Some(path.as_ref().to_owned());
        Ok(())
    }

    // re-dump to the opened keystore, if any
    fn persist(&self) {
        let path = self.cache_path.read().clone();
        if let Some(path) = path {
            if let Err(e) = self.dump_cache(&path) {
                log::debug!("shortcut keystore persist failed: {e}");
            }
        }
    }
}

fn split_path(path: &str) -> (String, String) {
    match path.split_once('.') {
        Some((ns, name)) => (ns.to_owned(), name.to_owned()),
        None => ("argot".to_owned(), path.to_owned()),
    }
}
