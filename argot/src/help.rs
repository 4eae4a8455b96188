// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Help text assembly: walks a schema into the shared info records and
//! renders them.

use argot_shared::{
    write_description, CommandInfo, CommandInfoWithArgs, FlagInfo, FlagInfoKind, Optionality,
    PositionalInfo, SubCommandInfo, INDENT,
};

use crate::args::{Arg, Multi};
use crate::config::Metadata;
use crate::node::{ActionKind, Node, Opt, Subcommand};

const SECTION_SEPARATOR: &str = "\n\n";

/// The display form of one argument, e.g. `<count: int = 3>`.
pub(crate) fn param_display(arg: &Arg) -> String {
    let mut out = format!("<{}: {}", arg.name(), arg.pattern());
    if let Some(default) = &arg.field.default {
        out.push_str(&format!(" = {default}"));
    }
    out.push('>');
    out
}

fn positional_info(arg: &Arg) -> PositionalInfo {
    let optionality = match arg.field.multi {
        Multi::AtLeastOne | Multi::ZeroOrMore | Multi::Count(_) | Multi::Join => {
            Optionality::Repeating
        }
        Multi::Off if arg.pattern().is_all() => Optionality::Greedy,
        Multi::Off if arg.optional() || arg.field.default.is_some() => Optionality::Optional,
        Multi::Off => Optionality::Required,
    };
    PositionalInfo {
        name: arg.name().to_owned(),
        description: arg
            .field
            .notice
            .clone()
            .unwrap_or_else(|| arg.pattern().to_string()),
        optionality,
        hidden: arg.field.hidden || arg.anonymous(),
    }
}

fn flag_info(opt: &Opt) -> FlagInfo {
    let kind = if opt.args.is_empty() {
        FlagInfoKind::Switch
    } else {
        FlagInfoKind::Option {
            arg_names: opt.args.items().iter().map(param_display).collect(),
        }
    };
    let optionality = match opt.action.kind {
        ActionKind::Append | ActionKind::Count => Optionality::Repeating,
        ActionKind::Store => Optionality::Optional,
    };
    let mut display = opt.requires.clone();
    display.push(opt.name.clone());
    FlagInfo {
        kind,
        optionality,
        long: display.join(" "),
        aliases: opt.aliases.iter().skip(1).cloned().collect(),
        description: opt.help_text.clone(),
        hidden: false,
    }
}

/// Walk a schema node into the shared record shape.
pub(crate) fn node_info(sub: &Subcommand, description: &str) -> CommandInfoWithArgs {
    let mut info = CommandInfoWithArgs {
        name: sub.name().to_owned(),
        description: description.to_owned(),
        ..CommandInfoWithArgs::default()
    };
    info.positionals = sub.args.items().iter().map(positional_info).collect();
    for child in &sub.children {
        match child {
            Node::Opt(opt) => info.flags.push(flag_info(opt)),
            Node::Sub(nested) => info.commands.push(SubCommandInfo {
                name: nested.name().to_owned(),
                command: node_info(nested, &nested.help_text),
            }),
        }
    }
    info
}

/// Render one node's help.
pub(crate) fn render(info: &CommandInfoWithArgs, header_display: &str, meta: &Metadata) -> String {
    let mut out = match &meta.usage {
        Some(usage) => format!("Usage: {usage}"),
        None => {
            let mut line = format!("Usage: {header_display}");
            for positional in &info.positionals {
                if positional.hidden {
                    continue;
                }
                line.push(' ');
                positional_usage(&mut line, positional);
            }
            for flag in info.flags.iter().filter(|f| !f.hidden) {
                line.push(' ');
                flag_usage(&mut line, flag);
            }
            if !info.commands.is_empty() {
                line.push_str(" [<command>] [<args>]");
            }
            line
        }
    };

    out.push_str(SECTION_SEPARATOR);
    out.push_str(&info.description);

    let shown: Vec<&PositionalInfo> =
        info.positionals.iter().filter(|p| !p.hidden).collect();
    if !shown.is_empty() {
        out.push_str(SECTION_SEPARATOR);
        out.push_str("Positional Arguments:");
        for positional in shown {
            let record = CommandInfo {
                name: positional.name.clone(),
                description: positional.description.clone(),
            };
            write_description(&mut out, &record);
        }
    }

    if !info.flags.is_empty() {
        out.push_str(SECTION_SEPARATOR);
        out.push_str("Options:");
        for flag in info.flags.iter().filter(|f| !f.hidden) {
            let mut name = flag.long.clone();
            for alias in &flag.aliases {
                name.push_str(", ");
                name.push_str(alias);
            }
            if let FlagInfoKind::Option { arg_names } = &flag.kind {
                for arg_name in arg_names {
                    name.push(' ');
                    name.push_str(arg_name);
                }
            }
            let record = CommandInfo { name, description: flag.description.clone() };
            write_description(&mut out, &record);
        }
    }

    if !info.commands.is_empty() {
        out.push_str(SECTION_SEPARATOR);
        out.push_str("Commands:");
        for cmd in &info.commands {
            let record = CommandInfo {
                name: cmd.name.clone(),
                description: cmd.command.description.clone(),
            };
            write_description(&mut out, &record);
        }
    }

    if let Some(example) = &meta.example {
        out.push_str(SECTION_SEPARATOR);
        out.push_str("Examples:");
        for line in example.split('\n') {
            out.push('\n');
            out.push_str(INDENT);
            out.push_str(line);
        }
    }

    if let Some(author) = &meta.author {
        out.push_str(SECTION_SEPARATOR);
        out.push_str("Notes:");
        out.push('\n');
        out.push_str(INDENT);
        out.push_str(&format!("author: {author}"));
        if let Some(version) = &meta.version {
            out.push('\n');
            out.push_str(INDENT);
            out.push_str(&format!("version: {version}"));
        }
    } else if let Some(version) = &meta.version {
        out.push_str(SECTION_SEPARATOR);
        out.push_str("Notes:");
        out.push('\n');
        out.push_str(INDENT);
        out.push_str(&format!("version: {version}"));
    }

    out.push('\n');
    out
}

fn positional_usage(out: &mut String, positional: &PositionalInfo) {
    let required = positional.optionality == Optionality::Required;
    if !required {
        out.push('[');
    }
    out.push('<');
    out.push_str(&positional.name);
    if positional.optionality == Optionality::Repeating
        || positional.optionality == Optionality::Greedy
    {
        out.push_str("...");
    }
    out.push('>');
    if !required {
        out.push(']');
    }
}

fn flag_usage(out: &mut String, flag: &FlagInfo) {
    out.push('[');
    out.push_str(&flag.long);
    if let FlagInfoKind::Option { arg_names } = &flag.kind {
        for arg_name in arg_names {
            out.push(' ');
            out.push_str(arg_name);
        }
    }
    out.push(']');
}

/// Render help for the node selected by `parts` (names of nested
/// subcommands; unknown names are skipped).
pub(crate) fn format_for(
    root: &Subcommand,
    meta: &Metadata,
    header_display: &str,
    parts: &[String],
) -> String {
    let mut node = root;
    let mut display = header_display.to_owned();
    for part in parts {
        let next = node.children.iter().find_map(|child| match child {
            Node::Sub(sub) if sub.name() == part || sub.aliases.contains(part) => Some(sub),
            _ => None,
        });
        if let Some(sub) = next {
            display.push(' ');
            display.push_str(sub.name());
            node = sub;
        }
    }
    if std::ptr::eq(node, root) {
        render(&node_info(root, &meta.description), &display, meta)
    } else {
        let sub_meta = Metadata::describe(&node.help_text);
        render(&node_info(node, &node.help_text), &display, &sub_meta)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::args::Args;
    use crate::pattern::Pattern;

    #[test]
    fn usage_line_lists_positionals_and_flags() {
        let mut root = Subcommand::new("core")
            .args(Args::new().arg(Arg::new("foo", Pattern::int())))
            .option(Opt::new("--bar").args(Args::new().arg(Arg::new("num", Pattern::int()))))
            .subcommand(Subcommand::new("sub"));
        root.finish().unwrap();
        let text = format_for(&root, &Metadata::describe("a test command"), "core", &[]);
        assert!(text.starts_with("Usage: core <foo: int>"));
        assert!(text.contains("a test command"));
        assert!(text.contains("Options:"));
        assert!(text.contains("Commands:"));
    }

    #[test]
    fn subcommand_path_selects_nested_node() {
        let mut root = Subcommand::new("core")
            .subcommand(Subcommand::new("user").help("manage users").option(Opt::new("--id")));
        root.finish().unwrap();
        let text = format_for(
            &root,
            &Metadata::default(),
            "core",
            &["core".to_owned(), "user".to_owned()],
        );
        assert!(text.starts_with("Usage: core user"));
        assert!(text.contains("--id"));
    }
}
