// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Interactive completion: a re-entrant session that catches the
//! analyser's pause point, offers prompts, and resumes with user-supplied
//! tokens.

use crate::argv::Argv;
use crate::error::{Error, PauseKind, PauseState, Result};
use crate::pattern::{Message, Token};
use crate::result::Matches;
use crate::Command;

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// The text shown to the user.
    pub text: String,
    /// Whether `enter()` may use the text verbatim.
    pub can_use: bool,
    /// A partial prefix to strip from the input before applying the text.
    pub removal_prefix: Option<String>,
}

impl Prompt {
    pub(crate) fn usable(text: impl Into<String>) -> Self {
        Prompt { text: text.into(), can_use: true, removal_prefix: None }
    }

    pub(crate) fn display(text: impl Into<String>) -> Self {
        Prompt { text: text.into(), can_use: false, removal_prefix: None }
    }
}

/// What `CompSession::enter` produced.
#[derive(Debug, Default)]
pub struct EnterResult {
    /// The finished parse, if the resume ran to completion.
    pub result: Option<Matches>,
    /// The failure, if the resume failed outright (the session stays
    /// usable).
    pub error: Option<Error>,
}

/// A re-entrant completion session around one command.
///
/// `parse` runs with the pause gate armed: instead of failing on a missing
/// argument, the analyser suspends and fills the session with prompts.
/// `tab` cycles them; `enter` resumes with the chosen prompt or explicit
/// content.
pub struct CompSession {
    command: Command,
    prompts: Vec<Prompt>,
    index: usize,
    trigger: Option<PauseKind>,
    argv: Option<Argv>,
}

impl CompSession {
    /// Open a session over `command`.
    pub fn new(command: &Command) -> Self {
        CompSession {
            command: command.clone(),
            prompts: Vec::new(),
            index: 0,
            trigger: None,
            argv: None,
        }
    }

    /// Parse with the pause gate armed. `Ok(None)` means the session
    /// suspended and holds prompts.
    pub fn parse(&mut self, input: impl Into<Message>) -> Result<Option<Matches>> {
        let mut argv = self.command.make_argv(true);
        argv.build(input.into())?;
        match self.command.run(&mut argv, Some(true)) {
            Ok(matches) => {
                self.clear();
                Ok(Some(matches))
            }
            Err(Error::PauseTriggered(state)) => {
                self.fresh(state);
                self.argv = Some(argv);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether prompts are available.
    pub fn available(&self) -> bool {
        !self.prompts.is_empty()
    }

    /// The prompts currently offered.
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// The selected prompt's text.
    pub fn current(&self) -> Option<&str> {
        self.prompts.get(self.index).map(|p| p.text.as_str())
    }

    /// Cycle the selection by `offset` and return the new text.
    pub fn tab(&mut self, offset: usize) -> Option<&str> {
        if self.prompts.is_empty() {
            return None;
        }
        self.index = (self.index + offset) % self.prompts.len();
        self.current()
    }

    /// Resume with `content`, or with the selected prompt when `None`.
    ///
    /// On success the parse result is returned and the session cleared; on
    /// another pause the prompts refresh; on failure the error is returned
    /// and the session stays usable.
    pub fn enter(&mut self, content: Option<Vec<Token>>) -> EnterResult {
        let Some(mut argv) = self.argv.take() else {
            return EnterResult {
                result: None,
                error: Some(Error::ExecuteFailed("no suspended parse to resume".into())),
            };
        };
        let backup_raw = argv.raw.clone();
        let backup_bak = argv.bak.clone();
        let backup_idx = argv.idx;
        let backup_ndata = argv.ndata;
        let input = match content {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => {
                let Some(prompt) = self.prompts.get(self.index).cloned() else {
                    self.argv = Some(argv);
                    return EnterResult {
                        result: None,
                        error: Some(Error::ExecuteFailed("prompt list is empty".into())),
                    };
                };
                if !prompt.can_use {
                    self.argv = Some(argv);
                    return EnterResult {
                        result: None,
                        error: Some(Error::ExecuteFailed(format!(
                            "prompt {} cannot be applied verbatim",
                            prompt.text
                        ))),
                    };
                }
                if let Some(prefix) = &prompt.removal_prefix {
                    if let Some(Token::Text(last)) = argv.bak.last_mut() {
                        if let Some(stripped) = last.strip_suffix(prefix.as_str()) {
                            *last = stripped.trim_end().to_owned();
                        }
                    }
                }
                vec![Token::Text(prompt.text.clone())]
            }
        };
        argv.raw = argv.bak.clone();
        argv.idx = 0;
        argv.ndata = argv.raw.len();
        argv.addon(input, true);
        argv.bak = argv.raw.clone();
        match self.command.run(&mut argv, Some(true)) {
            Ok(matches) => {
                self.clear();
                EnterResult { result: Some(matches), error: None }
            }
            Err(Error::PauseTriggered(state)) => {
                self.fresh(state);
                self.argv = Some(argv);
                EnterResult { result: None, error: None }
            }
            Err(e) => {
                argv.restore(backup_raw, backup_idx);
                argv.bak = backup_bak;
                argv.ndata = backup_ndata;
                self.argv = Some(argv);
                EnterResult { result: None, error: Some(e) }
            }
        }
    }

    /// What triggered the current suspension.
    pub fn trigger(&self) -> Option<&PauseKind> {
        self.trigger.as_ref()
    }

    /// Render the prompt list, marking the selection.
    pub fn lines(&self) -> Vec<String> {
        self.prompts
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!("{} {}", if i == self.index { ">>" } else { " *" }, p.text)
            })
            .collect()
    }

    fn fresh(&mut self, state: PauseState) {
        self.prompts = state.prompts;
        self.trigger = Some(state.kind);
        self.index = 0;
    }

    fn clear(&mut self) {
        self.prompts.clear();
        self.index = 0;
        self.trigger = None;
        self.argv = None;
    }
}
