// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Shared help-formatting data model between the argot runtime and external
//! renderers.
//!
//! The argot engine walks a command schema into these records; anything that
//! wants to draw help output (the built-in text formatter, a host UI, a
//! machine-readable exporter) consumes them. Schemas exist only at runtime,
//! so the records own their strings.

/// Information about a particular command used for output.
#[derive(Debug, Default, PartialEq, Eq, Clone, serde::Serialize)]
pub struct CommandInfo {
    /// The name of the command.
    pub name: String,
    /// A short description of the command's functionality.
    pub description: String,
}

/// Information about the command line arguments for a given command.
#[derive(Debug, Default, PartialEq, Eq, Clone, serde::Serialize)]
pub struct CommandInfoWithArgs {
    /// The name of the command.
    pub name: String,
    /// A short description of the command's functionality.
    pub description: String,
    /// Usage override, if the schema provides one.
    pub usage: Option<String>,
    /// Examples of usage.
    pub examples: Vec<String>,
    /// Flags.
    pub flags: Vec<FlagInfo>,
    /// Notes about usage.
    pub notes: Vec<String>,
    /// The subcommands.
    pub commands: Vec<SubCommandInfo>,
    /// Positional args.
    pub positionals: Vec<PositionalInfo>,
}

/// Information about positional arguments.
#[derive(Debug, PartialEq, Eq, Clone, serde::Serialize)]
pub struct PositionalInfo {
    /// Name of the argument.
    pub name: String,
    /// Description of the argument.
    pub description: String,
    /// Optionality of the argument.
    pub optionality: Optionality,
    /// Visibility in the help for this argument.
    /// `false` indicates this argument will not appear
    /// in the help message.
    pub hidden: bool,
}

/// Information about a subcommand.
#[derive(Debug, Default, PartialEq, Eq, Clone, serde::Serialize)]
pub struct SubCommandInfo {
    /// The subcommand name.
    pub name: String,
    /// The information about the subcommand.
    pub command: CommandInfoWithArgs,
}

/// Information about a flag or option.
#[derive(Debug, Default, PartialEq, Eq, Clone, serde::Serialize)]
pub struct FlagInfo {
    /// The kind of flag.
    pub kind: FlagInfoKind,
    /// The optionality of the flag.
    pub optionality: Optionality,
    /// The long string of the flag.
    pub long: String,
    /// Alternate names accepted for this flag.
    pub aliases: Vec<String>,
    /// The description of the flag.
    pub description: String,
    /// Visibility in the help for this argument.
    /// `false` indicates this argument will not appear
    /// in the help message.
    pub hidden: bool,
}

/// The kind of flags.
#[derive(Debug, Default, PartialEq, Eq, Clone, serde::Serialize)]
pub enum FlagInfoKind {
    /// switch represents a boolean flag.
    #[default]
    Switch,
    /// option is a flag that also has one or more associated
    /// values, named by `arg_names`.
    Option {
        /// Display names of the flag's arguments.
        arg_names: Vec<String>,
    },
}

/// The optionality defines the requirements related
/// to the presence of the argument on the command line.
#[derive(Debug, Default, PartialEq, Eq, Clone, serde::Serialize)]
pub enum Optionality {
    /// Required indicates the argument is required
    /// exactly once.
    #[default]
    Required,
    /// Optional indicates the argument may or may not
    /// be present.
    Optional,
    /// Repeating indicates the argument may appear zero
    /// or more times.
    Repeating,
    /// Greedy is used for positional arguments which
    /// capture the all command line input up to the next flag or
    /// the end of the input.
    Greedy,
}

/// Indentation used for descriptions and option listings.
pub const INDENT: &str = "  ";
const DESCRIPTION_INDENT: usize = 20;
const WRAP_WIDTH: usize = 80;

/// Write command names and descriptions to an output string.
pub fn write_description(out: &mut String, cmd: &CommandInfo) {
    let mut current_line = INDENT.to_string();
    current_line.push_str(&cmd.name);

    if cmd.description.is_empty() {
        new_line(&mut current_line, out);
        return;
    }

    if !indent_description(&mut current_line) {
        // Start the description on a new line if the flag names already
        // add up to more than DESCRIPTION_INDENT.
        new_line(&mut current_line, out);
    }

    let mut words = cmd.description.split(' ').peekable();
    while let Some(first_word) = words.next() {
        indent_description(&mut current_line);
        current_line.push_str(first_word);

        'inner: while let Some(&word) = words.peek() {
            if (char_len(&current_line) + char_len(word) + 1) > WRAP_WIDTH {
                new_line(&mut current_line, out);
                break 'inner;
            } else {
                // advance the iterator
                let _ = words.next();
                current_line.push(' ');
                current_line.push_str(word);
            }
        }
    }
    new_line(&mut current_line, out);
}

// Indent the current line in to DESCRIPTION_INDENT chars.
// Returns a boolean indicating whether or not spacing was added.
fn indent_description(line: &mut String) -> bool {
    let cur_len = char_len(line);
    if cur_len < DESCRIPTION_INDENT {
        let num_spaces = DESCRIPTION_INDENT - cur_len;
        line.extend(std::iter::repeat(' ').take(num_spaces));
        true
    } else {
        false
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// Append a newline and the current line to the output,
// clearing the current line.
fn new_line(current_line: &mut String, out: &mut String) {
    out.push('\n');
    out.push_str(current_line);
    current_line.truncate(0);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_description_stays_on_one_line() {
        let mut out = String::new();
        write_description(
            &mut out,
            &CommandInfo { name: "list".into(), description: "list all the things".into() },
        );
        assert_eq!(out, "\n  list              list all the things");
    }

    #[test]
    fn long_name_pushes_description_to_next_line() {
        let mut out = String::new();
        write_description(
            &mut out,
            &CommandInfo {
                name: "a-very-long-command-name".into(),
                description: "does things".into(),
            },
        );
        assert_eq!(out, "\n  a-very-long-command-name\n                    does things");
    }

    #[test]
    fn description_wraps_at_width() {
        let mut out = String::new();
        let description = "word ".repeat(30).trim_end().to_string();
        write_description(&mut out, &CommandInfo { name: "w".into(), description });
        for line in out.lines() {
            assert!(char_len(line) <= WRAP_WIDTH);
        }
    }
}
