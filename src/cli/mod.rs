//!
//! sqlchat terminal front end
//! --------------------------
//! Argument parsing and dot-command recognition for the interactive interpreter,
//! plus table rendering in `outputformatter`. The binary in `src/bin/sqlchat.rs`
//! wires these to a `ChatSession`.

pub mod outputformatter;

pub use outputformatter::{print_load_report, print_submission, print_tables, render_table};

use crate::config::{CreationMode, RowLimit, SessionConfig};

pub const HELP: &str = "\
Interactive commands:
  .load <path>      load a csv/tsv/parquet/json/ndjson file as the default table
  .unload           remove the loaded data and every derived table
  .tables           show the latest table and all active tables
  .limit <n>        set the row limit for queries (0 = no limit)
  .help             show this help
  quit | exit       leave the interpreter
  <input>           a table name, `name = <query>`, a SELECT probe, or any SQL statement;
                    end a statement with `;` to run it as written";

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n  {program} [--file <path>] [--table <name>] [--limit <n>] [--views] [--no-auto-from] [--capture-results <name>] [-q <input>]\n\nFlags:\n  --file <path>              Load this file before the first prompt\n  --table <name>             Name the loaded file is registered as (env: SQLCHAT_DEFAULT_TABLE, default tbl)\n  --limit <n>                Row limit for queries (env: SQLCHAT_ROW_LIMIT, default 0 = none)\n  --views                    Alias assignments create views instead of tables (env: SQLCHAT_USE_VIEWS)\n  --no-auto-from             Do not inject FROM <latest table> into FROM-less SELECTs (env: SQLCHAT_AUTO_FROM)\n  --capture-results <name>   Keep every query result as table <name> (env: SQLCHAT_CAPTURE_RESULT_AS)\n  -q, --query <input>        Run one input and exit\n  -h, --help                 Show this help\n\n{HELP}"
    )
}

/// Parsed command line of the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub file: Option<String>,
    pub query: Option<String>,
    pub help: bool,
    pub config: SessionConfig,
}

/// Apply `args` (without the program name) on top of `base`.
pub fn parse_args(args: &[String], base: SessionConfig) -> Result<CliArgs, String> {
    let mut out = CliArgs { file: None, query: None, help: false, config: base };
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = |name: &str| -> Result<String, String> {
            args.get(i + 1).cloned().ok_or_else(|| format!("{} requires a value", name))
        };
        match flag {
            "--file" => { out.file = Some(value("--file")?); i += 2; }
            "--table" => { out.config.default_table_name = value("--table")?; i += 2; }
            "--limit" => {
                let raw = value("--limit")?;
                let n = raw.trim().parse::<i64>().map_err(|_| format!("--limit expects an integer, got '{}'", raw))?;
                out.config.row_limit = RowLimit::new(n);
                i += 2;
            }
            "--views" => { out.config.creation_mode = CreationMode::View; i += 1; }
            "--no-auto-from" => { out.config.auto_from_table = false; i += 1; }
            "--capture-results" => { out.config.capture_result_as = Some(value("--capture-results")?); i += 2; }
            "-q" | "--query" => { out.query = Some(value("--query")?); i += 2; }
            "-h" | "--help" => { out.help = true; i += 1; }
            unk => return Err(format!("Unrecognized argument: {}", unk)),
        }
    }
    Ok(out)
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Load(String),
    Unload,
    Tables,
    Limit(i64),
    Help,
    Quit,
    Empty,
    /// Anything that is not a dot-command goes to the session.
    Input(String),
}

pub fn parse_repl_line(line: &str) -> Result<ReplCommand, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() { return Ok(ReplCommand::Empty); }
    let lower = trimmed.to_ascii_lowercase();
    if lower == "quit" || lower == "exit" { return Ok(ReplCommand::Quit); }
    if !trimmed.starts_with('.') { return Ok(ReplCommand::Input(line.to_string())); }

    let (cmd, rest) = match trimmed.find(char::is_whitespace) {
        Some(pos) => (&trimmed[..pos], trimmed[pos..].trim()),
        None => (trimmed, ""),
    };
    match cmd.to_ascii_lowercase().as_str() {
        ".load" => {
            if rest.is_empty() { return Err(".load requires a file path".to_string()); }
            Ok(ReplCommand::Load(unquote(rest).to_string()))
        }
        ".unload" => Ok(ReplCommand::Unload),
        ".tables" => Ok(ReplCommand::Tables),
        ".limit" => rest
            .parse::<i64>()
            .map(ReplCommand::Limit)
            .map_err(|_| format!(".limit expects an integer, got '{}'", rest)),
        ".help" => Ok(ReplCommand::Help),
        ".quit" | ".exit" => Ok(ReplCommand::Quit),
        other => Err(format!("unknown command '{}'; type .help", other)),
    }
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_override_base_config() {
        let parsed = parse_args(
            &args(&["--file", "data.csv", "--table", "t", "--limit", "25", "--views", "--no-auto-from", "--capture-results", "_temp"]),
            SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(parsed.file.as_deref(), Some("data.csv"));
        assert_eq!(parsed.config.default_table_name, "t");
        assert_eq!(parsed.config.row_limit.get(), Some(25));
        assert_eq!(parsed.config.creation_mode, CreationMode::View);
        assert!(!parsed.config.auto_from_table);
        assert_eq!(parsed.config.capture_result_as.as_deref(), Some("_temp"));
    }

    #[test]
    fn bad_flags_are_reported() {
        assert!(parse_args(&args(&["--limit"]), SessionConfig::default()).is_err());
        assert!(parse_args(&args(&["--limit", "many"]), SessionConfig::default()).is_err());
        assert!(parse_args(&args(&["--bogus"]), SessionConfig::default()).is_err());
        let parsed = parse_args(&args(&["-q", "SELECT 1;"]), SessionConfig::default()).unwrap();
        assert_eq!(parsed.query.as_deref(), Some("SELECT 1;"));
    }

    #[test]
    fn dot_commands() {
        assert_eq!(parse_repl_line(".load 'my data.csv'").unwrap(), ReplCommand::Load("my data.csv".into()));
        assert_eq!(parse_repl_line(".LIMIT 5").unwrap(), ReplCommand::Limit(5));
        assert_eq!(parse_repl_line("  exit ").unwrap(), ReplCommand::Quit);
        assert_eq!(parse_repl_line(".tables").unwrap(), ReplCommand::Tables);
        assert_eq!(parse_repl_line("   ").unwrap(), ReplCommand::Empty);
        assert!(parse_repl_line(".load").is_err());
        assert!(parse_repl_line(".frobnicate").is_err());
    }

    #[test]
    fn everything_else_is_session_input() {
        assert_eq!(parse_repl_line("big = SELECT * FROM tbl").unwrap(), ReplCommand::Input("big = SELECT * FROM tbl".into()));
        assert_eq!(parse_repl_line("quitting").unwrap(), ReplCommand::Input("quitting".into()));
    }
}
