// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The error taxonomy of the parsing engine.
//!
//! Match-phase errors (`ParamsUnmatched`, `InvalidParam`, `ArgumentMissing`,
//! `InvalidHeader`) may be intercepted inside the analyser for backtracking;
//! control variants (`FuzzyMatchSuccess`, `SpecialOptionTriggered`,
//! `PauseTriggered`) are intercepted at the root. Whether the remainder
//! surfaces as `Err` or as a failed [`Matches`](crate::Matches) depends on
//! the command's `raise_exception` configuration.

use thiserror::Error;

use crate::complete::Prompt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The built-in pseudo-option that intercepted a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    /// The help option.
    Help,
    /// The shortcut-management option.
    Shortcut,
    /// The completion option.
    Completion,
}

impl std::fmt::Display for Special {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Special::Help => "help",
            Special::Shortcut => "shortcut",
            Special::Completion => "completion",
        })
    }
}

/// What the analyser was working on when a completion pause fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseKind {
    /// A required argument had no token.
    Missing,
    /// A token did not fit any slot; completion was asked on the partial text.
    Unmatched(String),
}

/// Payload of a completion suspension: the candidate prompts and what
/// triggered them. Consumed by `CompSession`.
#[derive(Debug, Clone)]
pub struct PauseState {
    /// Candidate prompts, in presentation order.
    pub prompts: Vec<Prompt>,
    /// The trigger that produced the prompts.
    pub kind: PauseKind,
}

/// Errors produced while building schemas or parsing input.
#[derive(Debug, Error)]
pub enum Error {
    /// A token did not fit the slot the analyser tried to bind it to.
    #[error("param {0} is not matched")]
    ParamsUnmatched(String),

    /// A token fit the slot but the validator rejected it, or a schema
    /// builder was given an invalid piece.
    #[error("param {0} is incorrect")]
    InvalidParam(String),

    /// The leading tokens did not match the command header.
    #[error("header {0} is not matched")]
    InvalidHeader(String),

    /// A required argument had no token to bind.
    #[error("argument {0} is missing")]
    ArgumentMissing(String),

    /// The input was empty or could not be normalised into tokens.
    #[error("message {0} is empty or unparsable")]
    NullMessage(String),

    /// A stream element was filtered out but reached the engine anyway.
    #[error("unexpected element {0}")]
    UnexpectedElement(String),

    /// No exact match, but a candidate was close enough to suggest.
    #[error("{input} is not matched; maybe you mean {suggestion}?")]
    FuzzyMatchSuccess {
        /// The text the user typed.
        input: String,
        /// The closest schema-owned candidate.
        suggestion: String,
    },

    /// A built-in option (help / shortcut / completion) intercepted the
    /// parse.
    #[error("special option {0} triggered")]
    SpecialOptionTriggered(Special),

    /// The analyser suspended for interactive completion.
    #[error("completion paused with {} prompt(s)", .0.prompts.len())]
    PauseTriggered(PauseState),

    /// Too many commands registered with the manager.
    #[error("commands exceed the configured maximum count")]
    ExceedMaxCount,

    /// A post-match behaviour cancelled itself.
    #[error("behave cancelled")]
    BehaveCancelled,

    /// A post-match behaviour stepped out of bounds.
    #[error("out of bounds behave")]
    OutBoundsBehave,

    /// A bound executor failed or was invoked without a match.
    #[error("execute failed: {0}")]
    ExecuteFailed(String),
}

impl Error {
    /// Whether this error is a control-flow variant rather than a plain
    /// match failure.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Error::FuzzyMatchSuccess { .. }
                | Error::SpecialOptionTriggered(_)
                | Error::PauseTriggered(_)
        )
    }
}
