//!
//! sqlchat interactive interpreter
//! -------------------------------
//! Line-oriented REPL over one in-process `ChatSession`. Each input is classified,
//! completed into a full statement, run, and printed with its timing summary.

use std::env;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use sqlchat::cli::{self, parse_args, parse_repl_line, print_load_report, print_submission, print_tables, ReplCommand};
use sqlchat::config::{RowLimit, SessionConfig};
use sqlchat::{new_session, ChatSession};

fn load_file(session: &mut ChatSession, path: &str) -> Result<()> {
    let report = session.load_path(path).with_context(|| format!("Failed to load '{}'", path))?;
    print_load_report(&report);
    Ok(())
}

fn prompt_for(session: &ChatSession) -> String {
    match session.current_tables().latest_table {
        Some(t) => format!("sqlchat [{}]> ", t),
        None => "sqlchat> ".to_string(),
    }
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "sqlchat".to_string() } else { args.remove(0) };
    let parsed = match parse_args(&args, SessionConfig::from_env()) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", cli::usage(&program));
            std::process::exit(2);
        }
    };
    if parsed.help {
        println!("{}", cli::usage(&program));
        return Ok(());
    }

    let mut session = new_session(parsed.config);
    if let Some(path) = parsed.file.as_deref() {
        load_file(&mut session, path)?;
    }

    if let Some(input) = parsed.query {
        let sub = session.submit(&input, None);
        print_submission(&sub);
        if sub.outcome.is_err() { std::process::exit(1); }
        return Ok(());
    }

    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    println!("sqlchat: type .help for commands, quit to leave.");
    loop {
        match editor.readline(&prompt_for(&session)) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                let cmd = match parse_repl_line(&line) {
                    Ok(c) => c,
                    Err(msg) => { eprintln!("{}", msg); continue; }
                };
                match cmd {
                    ReplCommand::Empty => {}
                    ReplCommand::Quit => break,
                    ReplCommand::Help => println!("{}", cli::HELP),
                    ReplCommand::Tables => print_tables(&session.current_tables()),
                    ReplCommand::Unload => {
                        session.unload();
                        println!("data removed");
                    }
                    ReplCommand::Limit(n) => {
                        session.set_row_limit(RowLimit::new(n));
                        match RowLimit::new(n).get() {
                            Some(l) => println!("row limit set to {}", l),
                            None => println!("row limit removed"),
                        }
                    }
                    ReplCommand::Load(path) => {
                        if let Err(e) = load_file(&mut session, &path) {
                            eprintln!("Error: {:#}", e);
                        }
                    }
                    ReplCommand::Input(text) => print_submission(&session.submit(&text, None)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        }
    }
    Ok(())
}
