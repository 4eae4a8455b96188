// Copyright (c) 2023 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use argot::{output, Arg, Args, Command, CompSession, Opt, Pattern, Token, Value};

#[test]
fn session_pauses_and_resumes_to_success() {
    let cmd = Command::new("comp1")
        .args(
            Args::new()
                .arg(Arg::new("foo", Pattern::int()))
                .arg(Arg::new("bar", Pattern::string())),
        )
        .build()
        .unwrap();
    let mut session = CompSession::new(&cmd);

    // missing foo suspends
    let paused = session.parse("comp1").unwrap();
    assert!(paused.is_none());
    assert!(session.available());

    // supply foo; bar still missing, so the session refreshes
    let step = session.enter(Some(vec![Token::Text("1".into())]));
    assert!(step.result.is_none());
    assert!(step.error.is_none());
    assert!(session.available());

    // supply bar; the parse completes
    let done = session.enter(Some(vec![Token::Text("a".into())]));
    let res = done.result.expect("expected a finished parse");
    assert!(res.matched);
    assert_eq!(res.query("foo"), Some(Value::Int(1)));
    assert_eq!(res.query("bar"), Some(Value::Str("a".into())));
}

#[test]
fn prompts_show_argument_hints() {
    let cmd = Command::new("comp2")
        .args(Args::new().arg(Arg::new("level", Pattern::int()).completion_hint("a number 1-9")))
        .build()
        .unwrap();
    let mut session = CompSession::new(&cmd);
    assert!(session.parse("comp2").unwrap().is_none());
    let prompts = session.prompts();
    assert!(prompts.iter().any(|p| p.text.contains("a number 1-9")));
}

#[test]
fn candidate_completions_are_offered() {
    let cmd = Command::new("comp3")
        .args(Args::new().arg(
            Arg::new("color", Pattern::string()).completion(["red", "green", "blue"]),
        ))
        .build()
        .unwrap();
    let mut session = CompSession::new(&cmd);
    assert!(session.parse("comp3").unwrap().is_none());
    let texts: Vec<&str> = session.prompts().iter().map(|p| p.text.as_str()).collect();
    assert!(texts.iter().any(|t| t.contains("red")));
    assert!(texts.iter().any(|t| t.contains("blue")));
}

#[test]
fn tab_cycles_the_selection() {
    let cmd = Command::new("comp4")
        .args(Args::new().arg(Arg::new("pick", Pattern::string()).completion(["one", "two"])))
        .build()
        .unwrap();
    let mut session = CompSession::new(&cmd);
    assert!(session.parse("comp4").unwrap().is_none());
    let first = session.current().map(str::to_owned);
    let second = session.tab(1).map(str::to_owned);
    assert_ne!(first, second);
    let wrapped = session.tab(1).map(str::to_owned);
    assert_eq!(first, wrapped);
}

#[test]
fn failed_resume_keeps_the_session_usable() {
    let cmd = Command::new("comp5")
        .args(Args::new().arg(Arg::new("n", Pattern::int())))
        .build()
        .unwrap();
    let mut session = CompSession::new(&cmd);
    assert!(session.parse("comp5").unwrap().is_none());

    // a non-numeric resume fails but the session survives
    let failed = session.enter(Some(vec![Token::Text("oops".into())]));
    assert!(failed.result.is_none());
    assert!(failed.error.is_some());

    let done = session.enter(Some(vec![Token::Text("12".into())]));
    let res = done.result.expect("expected a finished parse");
    assert!(res.matched);
    assert_eq!(res.query("n"), Some(Value::Int(12)));
}

#[test]
fn completion_option_prints_prompts_outside_sessions() {
    let guard = output::capture("comp6");
    let cmd = Command::new("comp6")
        .args(Args::new().arg(Arg::new("foo", Pattern::int())))
        .option(Opt::new("--extra"))
        .build()
        .unwrap();
    let res = cmd.parse("comp6 ?").unwrap();
    assert!(!res.matched);
    assert!(res.error_info.unwrap_or_default().contains("completion"));
    let captured = guard.drain();
    assert!(captured.iter().any(|text| text.contains("foo")));
}
