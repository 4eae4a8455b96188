// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use argot::{
    output, Action, Arg, Args, Command, Config, ContextStyle, Error, Manager, Message, Metadata,
    Multi, Opt, Pattern, Subcommand, Token, Value,
};
use indexmap::IndexMap;

#[test]
fn simple_positional() {
    let cmd = Command::new("core")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .build()
        .expect("failed to build core");
    let res = cmd.parse("core 123").expect("parse failed");
    assert!(res.matched);
    assert_eq!(res.query("foo"), Some(Value::Int(123)));
}

#[test]
fn prefixed_option_with_compact_arg() {
    let cmd = Command::new("pcore")
        .prefixes(["!"])
        .option(
            Opt::new("bar").compact().args(Args::new().arg(Arg::new("num", Pattern::int()))),
        )
        .build()
        .unwrap();
    let res = cmd.parse("!pcore bar42").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("bar.num"), Some(Value::Int(42)));
    assert_eq!(res.query("options.bar.args.num"), Some(Value::Int(42)));
}

#[test]
fn nested_subcommand_with_option() {
    let cmd = Command::new("lpx")
        .subcommand(
            Subcommand::new("user")
                .args(Args::new().arg(Arg::new("name", Pattern::string())))
                .subcommand(
                    Subcommand::new("perm")
                        .args(Args::new().arg(Arg::new("p", Pattern::string()))),
                ),
        )
        .build()
        .unwrap();
    let res = cmd.parse("lpx user alice perm read").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("user.name"), Some(Value::Str("alice".into())));
    assert_eq!(res.query("user.perm.p"), Some(Value::Str("read".into())));
    assert_eq!(
        res.query("subcommands.user.subcommands.perm.args.p"),
        Some(Value::Str("read".into())),
    );
}

#[test]
fn variadic_keyword_arguments() {
    let cmd = Command::new("vkt")
        .args(Args::new().arg(
            Arg::new("kw", Pattern::string()).keyword_only().multi(Multi::ZeroOrMore),
        ))
        .build()
        .unwrap();
    let res = cmd.parse("vkt a=1 b=2").unwrap();
    assert!(res.matched);
    let kw = res.query("kw").unwrap();
    let map = kw.as_map().unwrap();
    assert_eq!(map.get("a"), Some(&Value::Str("1".into())));
    assert_eq!(map.get("b"), Some(&Value::Str("2".into())));
}

#[test]
fn header_exclusivity_over_prefixes() {
    let cmd = Command::new("hcore").prefixes(["/", "!"]).build().unwrap();
    assert!(cmd.parse("/hcore").unwrap().head_matched());
    assert!(cmd.parse("!hcore").unwrap().head_matched());
    assert!(!cmd.parse("#hcore").unwrap().head_matched());
    // a prefix alone is not the command
    assert!(!cmd.parse("/ hcore").unwrap().matched);
}

#[test]
fn compact_header_consumes_glued_argument() {
    let cmd = Command::new("ccore")
        .args(Args::new().arg(Arg::new("foo", Pattern::string())))
        .config(Config { compact: true, ..Config::default() })
        .build()
        .unwrap();
    assert!(cmd.parse("ccore abc").unwrap().matched);
    let res = cmd.parse("ccoreabc").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("foo"), Some(Value::Str("abc".into())));
}

#[test]
fn bracket_template_header_captures_groups() {
    let cmd = Command::new("RD{r:int}=={e:int}").build().unwrap();
    let res = cmd.parse("RD100==36").unwrap();
    assert!(res.matched);
    assert_eq!(res.header_groups().get("r"), Some(&Value::Int(100)));
    assert_eq!(res.header_groups().get("e"), Some(&Value::Int(36)));
    assert!(!cmd.parse("RDx==36").unwrap().matched);
}

#[test]
fn store_action_last_occurrence_wins() {
    let cmd = Command::new("sw")
        .option(Opt::new("--mode").args(Args::new().arg(Arg::new("m", Pattern::string()))))
        .build()
        .unwrap();
    let res = cmd.parse("sw --mode a --mode b").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("mode.m"), Some(Value::Str("b".into())));
    assert_eq!(res.options.len(), 1);
}

#[test]
fn count_action_accumulates() {
    let cmd = Command::new("vb").option(Opt::new("-v").action(Action::count(1))).build().unwrap();
    let res = cmd.parse("vb -v -v").unwrap();
    assert_eq!(res.query("v"), Some(Value::Int(2)));
    let res = cmd.parse("vb -vvv").unwrap();
    assert_eq!(res.query("v"), Some(Value::Int(3)));
}

#[test]
fn append_action_collects_lists() {
    let cmd = Command::new("ap")
        .option(
            Opt::new("--tag")
                .action(Action::append())
                .args(Args::new().arg(Arg::new("t", Pattern::string()))),
        )
        .build()
        .unwrap();
    let res = cmd.parse("ap --tag red --tag blue --tag green").unwrap();
    assert!(res.matched);
    assert_eq!(
        res.query("tag.t"),
        Some(Value::List(vec![
            Value::Str("red".into()),
            Value::Str("blue".into()),
            Value::Str("green".into()),
        ])),
    );
}

#[test]
fn variadic_positional_bounds() {
    let plus = Command::new("vsum")
        .args(Args::new().arg(Arg::new("items", Pattern::int()).multi(Multi::AtLeastOne)))
        .build()
        .unwrap();
    let res = plus.parse("vsum 1 2 3").unwrap();
    assert_eq!(
        res.query("items"),
        Some(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
    );
    assert!(!plus.parse("vsum").unwrap().matched);

    let star = Command::new("vany")
        .args(Args::new().arg(Arg::new("items", Pattern::int()).multi(Multi::ZeroOrMore)))
        .build()
        .unwrap();
    assert_eq!(star.parse("vany").unwrap().query("items"), Some(Value::List(Vec::new())));

    let capped = Command::new("vcap")
        .args(Args::new().arg(Arg::new("items", Pattern::int()).multi(Multi::Count(2))))
        .build()
        .unwrap();
    let res = capped.parse("vcap 7").unwrap();
    assert_eq!(res.query("items"), Some(Value::List(vec![Value::Int(7)])));
    let res = capped.parse("vcap 7 8").unwrap();
    assert_eq!(res.query("items"), Some(Value::List(vec![Value::Int(7), Value::Int(8)])));
    assert!(!capped.parse("vcap 7 8 9").unwrap().matched);

    let joined = Command::new("vjoin")
        .args(Args::new().arg(Arg::new("words", Pattern::string()).multi(Multi::Join)))
        .build()
        .unwrap();
    assert_eq!(
        joined.parse("vjoin a b c").unwrap().query("words"),
        Some(Value::Str("a b c".into())),
    );
}

#[test]
fn keyword_only_arguments() {
    let cmd = Command::new("cfg")
        .args(
            Args::new()
                .arg(Arg::new("mode", Pattern::string()).keyword_only())
                .arg(Arg::new("flag", Pattern::kw_bool("flag")).keyword_only().default(false)),
        )
        .build()
        .unwrap();
    let res = cmd.parse("cfg mode=fast flag").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("mode"), Some(Value::Str("fast".into())));
    assert_eq!(res.query("flag"), Some(Value::Bool(true)));

    let res = cmd.parse("cfg noflag mode=slow").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("flag"), Some(Value::Bool(false)));

    // a required keyword stays required
    assert!(!cmd.parse("cfg flag").unwrap().matched);
}

#[test]
fn optional_trailing_arguments_may_be_skipped() {
    let cmd = Command::new("opt2")
        .option(Opt::new("test"))
        .args(
            Args::new()
                .arg(Arg::new("foo", Pattern::int()).optional_arg())
                .arg(Arg::new("bar", Pattern::string()).optional_arg()),
        )
        .build()
        .unwrap();
    assert!(cmd.parse("opt2 test 123").unwrap().matched);
    assert!(cmd.parse("opt2 123").unwrap().matched);
    assert!(cmd.parse("opt2 test").unwrap().matched);
    assert!(cmd.parse("opt2").unwrap().matched);
    assert!(cmd.parse("opt2 abc").unwrap().matched);
    assert!(cmd.parse("opt2 123 abc").unwrap().matched);
}

#[test]
fn anonymous_arguments_are_not_reported() {
    let cmd = Command::new("anon")
        .args(
            Args::new()
                .arg(Arg::new("_skip", Pattern::string()))
                .arg(Arg::new("kept", Pattern::int())),
        )
        .build()
        .unwrap();
    let res = cmd.parse("anon whatever 42").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("kept"), Some(Value::Int(42)));
    assert_eq!(res.query("_skip"), None);
}

#[test]
fn greedy_rest_capture() {
    let cmd = Command::new("wild")
        .args(Args::new().arg(Arg::new("rest", Pattern::all())))
        .build()
        .unwrap();
    let res = cmd.parse("wild abc def 123").unwrap();
    assert!(res.matched);
    let rest = res.query("rest").unwrap();
    assert_eq!(rest.as_list().map(<[Value]>::len), Some(3));
}

#[test]
fn union_pattern_first_match_wins() {
    let cmd = Command::new("uni")
        .args(Args::new().arg(Arg::new(
            "val",
            Pattern::union(vec![Pattern::int(), Pattern::literals(["auto"])]),
        )))
        .build()
        .unwrap();
    assert_eq!(cmd.parse("uni 5").unwrap().query("val"), Some(Value::Int(5)));
    assert_eq!(cmd.parse("uni auto").unwrap().query("val"), Some(Value::Str("auto".into())));
    assert!(!cmd.parse("uni other").unwrap().matched);
}

#[test]
fn alias_collisions_resolve_by_backtracking() {
    let cmd = Command::new("ol")
        .option(
            Opt::new("-u").dest_name("uid").args(Args::new().arg(Arg::new("id", Pattern::int()))),
        )
        .option(
            Opt::new("-u")
                .dest_name("uname")
                .args(Args::new().arg(Arg::new("name", Pattern::string()))),
        )
        .build()
        .unwrap();
    let res = cmd.parse("ol -u 42").unwrap();
    assert_eq!(res.query("uid.id"), Some(Value::Int(42)));
    let res = cmd.parse("ol -u bob").unwrap();
    assert_eq!(res.query("uname.name"), Some(Value::Str("bob".into())));
}

#[test]
fn multi_word_requires_paths() {
    let cmd = Command::new("req")
        .args(Args::new().arg(Arg::new("target", Pattern::int())))
        .option(Opt::new("user perm set").args(Args::new().arg(Arg::new("foo", Pattern::string()))))
        .option(Opt::new("user perm del").args(Args::new().arg(Arg::new("foo", Pattern::string()))))
        .build()
        .unwrap();
    assert!(cmd.parse("req 1 user perm set rw").unwrap().find("set"));
    assert!(cmd.parse("req 1 user perm del rw").unwrap().find("del"));
    // the bare option name without its sentence path does not resolve
    assert!(!cmd.parse("req 1 set rw").unwrap().matched);
}

#[test]
fn soft_keyword_doubles_as_argument() {
    let cmd = Command::new("soft")
        .args(Args::new().arg(Arg::new("word", Pattern::string()).optional_arg()))
        .subcommand(
            Subcommand::new("add")
                .soft_keyword()
                .args(Args::new().arg(Arg::new("n", Pattern::int()))),
        )
        .build()
        .unwrap();
    let res = cmd.parse("soft add 5").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("add.n"), Some(Value::Int(5)));
    // with no numeric argument following, "add" binds as the word instead
    let res = cmd.parse("soft add").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("word"), Some(Value::Str("add".into())));
}

#[test]
fn strict_off_collects_extras() {
    let cmd = Command::new("loose")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .config(Config { strict: false, ..Config::default() })
        .build()
        .unwrap();
    let res = cmd.parse("loose 1 junk1 junk2").unwrap();
    assert!(res.matched);
    assert_eq!(
        res.query("$extra"),
        Some(Value::List(vec![Value::Str("junk1".into()), Value::Str("junk2".into())])),
    );
}

#[test]
fn strict_mode_rejects_unknown_tokens() {
    let cmd = Command::new("tight")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .build()
        .unwrap();
    let res = cmd.parse("tight 1 junk").unwrap();
    assert!(!res.matched);
    assert!(res.error_info.is_some());
    assert!(!res.error_data.is_empty());
}

#[test]
fn raise_exception_policy_propagates() {
    let cmd = Command::new("raisy")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .config(Config { raise_exception: true, ..Config::default() })
        .build()
        .unwrap();
    assert!(matches!(cmd.parse("raisy abc"), Err(Error::InvalidParam(_))));
    assert!(matches!(cmd.parse("other 1"), Err(Error::InvalidHeader(_))));
}

#[test]
fn fuzzy_header_suggestion() {
    let guard = output::capture("testfuzzy");
    let cmd = Command::new("testfuzzy")
        .config(Config { fuzzy_match: true, ..Config::default() })
        .build()
        .unwrap();
    let res = cmd.parse("testfuzy").unwrap();
    assert!(!res.matched);
    assert!(res.error_info.unwrap_or_default().contains("maybe you mean"));
    let captured = guard.drain();
    assert!(captured.iter().any(|line| line.contains("testfuzzy")));
}

#[test]
fn help_option_intercepts() {
    let guard = output::capture("helpful");
    let cmd = Command::new("helpful")
        .meta(Metadata::describe("a helpful command"))
        .option(Opt::new("--bar").help("do bar things"))
        .build()
        .unwrap();
    let res = cmd.parse("helpful --help").unwrap();
    assert!(!res.matched);
    assert!(res.error_info.unwrap_or_default().contains("help"));
    let captured = guard.drain();
    assert!(captured.iter().any(|text| text.contains("Usage: helpful")));
    assert!(captured.iter().any(|text| text.contains("do bar things")));
}

#[test]
fn disabled_builtins_do_not_intercept() {
    // shortcut is disabled by default, so its trigger is a plain token
    let cmd = Command::new("dis")
        .args(Args::new().arg(Arg::new("foo", Pattern::string())))
        .build()
        .unwrap();
    let res = cmd.parse("dis -sct").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("foo"), Some(Value::Str("-sct".into())));
}

#[test]
fn context_interpolation_resolves_slots() {
    let cmd = Command::new("ctx")
        .args(Args::new().arg(Arg::new("target", Pattern::string())))
        .config(Config { context_style: Some(ContextStyle::Bracket), ..Config::default() })
        .build()
        .unwrap();
    let mut ctx = IndexMap::new();
    ctx.insert("who".to_owned(), Value::Str("alice".into()));
    let res = cmd.parse_with("ctx {who}", ctx).unwrap();
    assert!(res.matched);
    assert_eq!(res.query("target"), Some(Value::Str("alice".into())));

    // unresolved names are missing arguments
    let res = cmd.parse_with("ctx {nobody}", IndexMap::new()).unwrap();
    assert!(!res.matched);
}

#[test]
fn opaque_elements_flow_through() {
    let cmd = Command::new("elemtest")
        .args(Args::new().arg(Arg::new("item", Pattern::any())))
        .build()
        .unwrap();
    let elem = Token::opaque(7u32);
    let res = cmd.parse(Message(vec![Token::Text("elemtest".into()), elem])).unwrap();
    assert!(res.matched);
    let item = res.query("item").unwrap();
    assert_eq!(item.downcast_ref::<u32>(), Some(&7));
}

#[test]
fn reparse_is_idempotent_and_cached() {
    let cmd = Command::new("cachecmd")
        .args(Args::new().arg(Arg::new("a", Pattern::int()).multi(Multi::AtLeastOne)))
        .option(Opt::new("--flag"))
        .build()
        .unwrap();
    let first = cmd.parse("cachecmd 1 2 --flag").unwrap();
    let second = cmd.parse("cachecmd 1 2 --flag").unwrap();
    assert!(first.matched && second.matched);
    assert_eq!(first.query("a"), second.query("a"));
    assert_eq!(first.other_args, second.other_args);
    assert_eq!(first.options.keys().collect::<Vec<_>>(), second.options.keys().collect::<Vec<_>>());
}

#[test]
fn executors_run_on_success() {
    let hits = Arc::new(AtomicUsize::new(0));
    let cmd = Command::new("bound")
        .config(Config { enable_message_cache: false, ..Config::default() })
        .args(Args::new().arg(Arg::new("n", Pattern::int())))
        .build()
        .unwrap();
    let seen = hits.clone();
    cmd.bind(move |m| {
        if m.query("n") == Some(Value::Int(9)) {
            seen.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    });
    assert!(cmd.parse("bound 9").unwrap().matched);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    // executors do not run on failures
    assert!(!cmd.parse("bound x").unwrap().matched);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn executor_failure_surfaces() {
    let cmd = Command::new("boundfail")
        .config(Config { enable_message_cache: false, ..Config::default() })
        .build()
        .unwrap();
    cmd.bind(|_| Err("veto".to_owned()));
    assert!(matches!(cmd.parse("boundfail"), Err(Error::ExecuteFailed(_))));
}

#[test]
fn command_group_tries_in_order() {
    let first = Command::new("grp1").option(Opt::new("--foo")).build().unwrap();
    let second = Command::new("grp2").option(Opt::new("--baz")).build().unwrap();
    let group = first | second;
    assert!(group.parse("grp1 --foo").unwrap().matched);
    assert!(group.parse("grp2 --baz").unwrap().matched);
    assert!(!group.parse("grp3").unwrap().matched);
}

#[test]
fn manager_registry_roundtrip() {
    let manager = Arc::new(Manager::new(10, 10));
    let cmd = Command::new("managed").manager(manager.clone()).build().unwrap();
    assert_eq!(cmd.path(), "argot.managed");
    assert!(manager.resolve("argot.managed").is_some());
    assert!(manager.require("argot.missing").is_err());
    manager.delete("argot.managed");
    assert!(manager.resolve("argot.managed").is_none());
}

#[test]
fn manager_enforces_max_count() {
    let manager = Arc::new(Manager::new(1, 10));
    Command::new("only").manager(manager.clone()).build().unwrap();
    let second = Command::new("toomany").manager(manager.clone()).build();
    assert!(matches!(second, Err(Error::ExceedMaxCount)));
}

#[test]
fn manager_broadcast_finds_a_match() {
    let manager = Arc::new(Manager::new(10, 10));
    Command::new("bc1")
        .manager(manager.clone())
        .args(Args::new().arg(Arg::new("x", Pattern::int())))
        .build()
        .unwrap();
    Command::new("bc2").manager(manager.clone()).build().unwrap();
    let hit = manager.broadcast(Message::from("bc2"), None).expect("broadcast missed");
    assert_eq!(hit.source, "argot.bc2");
    manager.set_disable("argot.bc2");
    assert!(manager.broadcast(Message::from("bc2"), None).is_none());
}

#[test]
fn option_defaults_fill_in() {
    let cmd = Command::new("dft")
        .option(Opt::new("--num").default(123i64))
        .build()
        .unwrap();
    let res = cmd.parse("dft").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("num"), Some(Value::Int(123)));
}

#[test]
fn quoted_tokens_hold_separators() {
    let cmd = Command::new("quoted")
        .args(Args::new().arg(Arg::new("text", Pattern::string())).arg(Arg::new(
            "more",
            Pattern::string(),
        )))
        .build()
        .unwrap();
    let res = cmd.parse("quoted 'hello there' end").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("text"), Some(Value::Str("hello there".into())));
    assert_eq!(res.query("more"), Some(Value::Str("end".into())));
}

#[test]
fn custom_separators_on_options() {
    let cmd = Command::new("sep")
        .option(
            Opt::new("name")
                .separators("：")
                .args(Args::new().arg(Arg::new("song", Pattern::string()).separators("："))),
        )
        .build()
        .unwrap();
    let res = cmd.parse("sep name：Freejia").unwrap();
    assert!(res.matched);
    assert_eq!(res.query("name.song"), Some(Value::Str("Freejia".into())));
}
