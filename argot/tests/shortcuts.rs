// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::sync::Arc;

use argot::{
    output, Arg, Args, BuiltinNames, Command, Config, Manager, Pattern, ShortcutArgs, Value,
};

#[test]
fn literal_shortcut_rewrites_input() {
    let cmd = Command::new("scut")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .build()
        .unwrap();
    cmd.shortcut("go", ShortcutArgs::to_command("scut {%0}")).unwrap();
    let via = cmd.parse("go 999").unwrap();
    let direct = cmd.parse("scut 999").unwrap();
    assert!(via.matched);
    assert_eq!(via.query("foo"), direct.query("foo"));
}

#[test]
fn regex_shortcut_substitutes_groups() {
    let cmd = Command::new("rcore")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .build()
        .unwrap();
    cmd.shortcut(r"TEST(\d+)", ShortcutArgs::to_command("rcore {0}")).unwrap();
    let res = cmd.parse("TEST321").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("foo"), Some(Value::Int(321)));
}

#[test]
fn trailing_tokens_append_after_slots() {
    let cmd = Command::new("tail")
        .args(
            Args::new()
                .arg(Arg::new("a", Pattern::int()))
                .arg(Arg::new("b", Pattern::string())),
        )
        .build()
        .unwrap();
    cmd.shortcut("t", ShortcutArgs::to_command("tail {%0}")).unwrap();
    let res = cmd.parse("t 1 extra").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("a"), Some(Value::Int(1)));
    assert_eq!(res.query("b"), Some(Value::Str("extra".into())));
}

#[test]
fn strict_shortcut_rejects_extras() {
    let cmd = Command::new("strictcut").build().unwrap();
    cmd.shortcut(
        "sc",
        ShortcutArgs { fuzzy: false, ..ShortcutArgs::to_command("strictcut") },
    )
    .unwrap();
    let res = cmd.parse("sc trailing").unwrap();
    assert!(!res.matched);
}

#[test]
fn first_registered_regex_key_wins() {
    let cmd = Command::new("dupkey")
        .args(Args::new().arg(Arg::new("v", Pattern::string())))
        .build()
        .unwrap();
    cmd.shortcut(r"K(\w+)", ShortcutArgs::to_command("dupkey first")).unwrap();
    cmd.shortcut(r"K(\d+)", ShortcutArgs::to_command("dupkey second")).unwrap();
    let res = cmd.parse("K12").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("v"), Some(Value::Str("first".into())));
}

#[test]
fn removed_shortcuts_stop_matching() {
    let cmd = Command::new("gone").build().unwrap();
    cmd.shortcut("bye", ShortcutArgs::to_command("gone")).unwrap();
    assert!(cmd.parse("bye").unwrap().matched);
    cmd.remove_shortcut("bye").unwrap();
    assert!(!cmd.parse("bye").unwrap().matched);
}

#[test]
fn static_shortcut_returns_prebuilt_result() {
    let cmd = Command::new("fixed")
        .args(Args::new().arg(Arg::new("n", Pattern::int())))
        .build()
        .unwrap();
    let canned = cmd.parse("fixed 7").unwrap();
    assert!(canned.matched);
    cmd.shortcut_static("lucky", canned).unwrap();
    let res = cmd.parse("lucky").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("n"), Some(Value::Int(7)));
}

#[test]
fn shortcut_dsl_manages_the_store() {
    let guard = output::capture("dslcmd");
    let cmd = Command::new("dslcmd")
        .config(Config {
            disable_builtin_options: Default::default(),
            builtin_option_name: BuiltinNames::default(),
            ..Config::default()
        })
        .build()
        .unwrap();

    // create: `--shortcut <name>` binds the command itself
    let res = cmd.parse("dslcmd --shortcut mykey").unwrap();
    assert!(!res.matched);
    assert!(res.error_info.unwrap_or_default().contains("shortcut"));
    assert!(cmd.get_shortcuts().contains(&"mykey".to_owned()));
    assert!(cmd.parse("mykey").unwrap().matched);

    // list names the key
    cmd.parse("dslcmd --shortcut list").unwrap();
    let captured = guard.drain();
    assert!(captured.iter().any(|line| line.contains("mykey")));

    // delete removes it
    cmd.parse("dslcmd --shortcut delete mykey").unwrap();
    assert!(!cmd.get_shortcuts().contains(&"mykey".to_owned()));
}

#[test]
fn keystore_persists_shortcuts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shortcuts.json");

    let manager = Arc::new(Manager::new(10, 10));
    let cmd = Command::new("persist")
        .manager(manager.clone())
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .build()
        .unwrap();
    cmd.shortcut("p", ShortcutArgs::to_command("persist {%0}")).unwrap();
    manager.dump_cache(&path).unwrap();

    let fresh = Arc::new(Manager::new(10, 10));
    fresh.load_cache(&path).unwrap();
    let reborn = Command::new("persist")
        .manager(fresh.clone())
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .build()
        .unwrap();
    assert_eq!(fresh.shortcuts_of("argot.persist"), vec!["p".to_owned()]);
    let res = reborn.parse("p 55").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("foo"), Some(Value::Int(55)));
}
