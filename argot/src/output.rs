// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The output collaborator: routes generated text (help, suggestions,
//! shortcut feedback) to a host-configurable sink, with scoped capture for
//! tests and frameworks.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

type SendAction = Arc<dyn Fn(&str) + Send + Sync>;

struct OutputState {
    actions: HashMap<String, SendAction>,
    global: SendAction,
    captures: HashMap<String, Vec<String>>,
}

static STATE: Lazy<Mutex<OutputState>> = Lazy::new(|| {
    Mutex::new(OutputState {
        actions: HashMap::new(),
        global: Arc::new(|text| println!("{text}")),
        captures: HashMap::new(),
    })
});

/// Generate and deliver output on behalf of `command`. The generator only
/// runs once a sink is decided, capture included.
pub fn send(command: &str, generator: impl FnOnce() -> String) {
    let text = generator();
    let mut state = STATE.lock();
    if let Some(buffer) = state.captures.get_mut(command) {
        buffer.push(text);
        return;
    }
    let action =
        state.actions.get(command).cloned().unwrap_or_else(|| state.global.clone());
    drop(state);
    action(&text);
}

/// Install the sink for one command, or the global sink when `command` is
/// `None`.
pub fn set_action(command: Option<&str>, action: impl Fn(&str) + Send + Sync + 'static) {
    let mut state = STATE.lock();
    match command {
        Some(name) => {
            state.actions.insert(name.to_owned(), Arc::new(action));
        }
        None => state.global = Arc::new(action),
    }
}

/// A scoped buffer accumulating output for `command`; delivery resumes when
/// the guard drops.
pub fn capture(command: &str) -> CaptureGuard {
    STATE.lock().captures.insert(command.to_owned(), Vec::new());
    CaptureGuard { command: command.to_owned() }
}

/// Holds a capture open; drop to release.
pub struct CaptureGuard {
    command: String,
}

impl CaptureGuard {
    /// Drain everything captured so far.
    pub fn drain(&self) -> Vec<String> {
        STATE
            .lock()
            .captures
            .get_mut(&self.command)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        STATE.lock().captures.remove(&self.command);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capture_buffers_output() {
        let guard = capture("cap-test");
        send("cap-test", || "hello".to_owned());
        send("cap-test", || "world".to_owned());
        assert_eq!(guard.drain(), vec!["hello".to_owned(), "world".to_owned()]);
        drop(guard);
    }
}
