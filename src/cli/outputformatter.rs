use terminal_size::{terminal_size, Height, Width};

use crate::exec::QueryOutput;
use crate::service::{LoadReport, Submission};
use crate::session::TablesSnapshot;

const NULL_TEXT: &str = "NULL";

/// Print everything the REPL shows for one submitted input.
pub fn print_submission(sub: &Submission) {
    let termw = get_terminal_width();
    crate::tprintln!("[cli.outputformatter] detected terminal width={} columns", termw);
    for line in render_submission(sub, termw) {
        println!("{}", line);
    }
}

pub fn render_submission(sub: &Submission, termw: usize) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(rewritten) = &sub.rewritten {
        out.push(fit_line_to_width(&format!("\x1b[36m{}\x1b[0m", rewritten), termw));
    }
    for w in &sub.warnings {
        out.push(fit_line_to_width(&format!("\x1b[33mwarning:\x1b[0m {}", w), termw));
    }
    match &sub.outcome {
        Ok(QueryOutput::Table(rs)) => {
            let (cols, rows) = rs.to_tabular();
            out.extend(render_table(&cols, &rows, termw));
        }
        Ok(QueryOutput::Explain(pairs)) => {
            // Plans span several lines; print them as-is instead of squeezing into cells.
            for (key, value) in pairs {
                out.push(format!("\x1b[32m{}\x1b[0m", key));
                out.extend(value.lines().map(|l| l.to_string()));
            }
        }
        Err(e) => {
            out.push(format!("\x1b[31merror [{}]:\x1b[0m {}", e.code_str(), e));
        }
    }
    if let Some(summary) = sub.summary_line() {
        out.push(fit_line_to_width(&summary, termw));
    }
    out
}

pub fn print_load_report(report: &LoadReport) {
    let termw = get_terminal_width();
    if report.unchanged {
        println!("'{}' is already loaded as '{}'; session kept.", report.file_name, report.table);
        return;
    }
    println!(
        "Loaded '{}' as '{}' ({} encoding): {} rows, {} columns, ~{} bytes in memory.",
        report.file_name,
        report.table,
        report.encoding.label(),
        report.rows,
        report.cols,
        report.estimated_bytes
    );
    let schema_cols = vec!["column_name".to_string(), "column_type".to_string()];
    let schema_rows: Vec<Vec<Option<String>>> = report
        .schema
        .iter()
        .map(|c| vec![Some(c.name.clone()), Some(c.dtype.clone())])
        .collect();
    for line in render_table(&schema_cols, &schema_rows, termw) {
        println!("{}", line);
    }
    println!("preview:");
    for line in render_table(&report.preview_columns, &report.preview_rows, termw) {
        println!("{}", line);
    }
}

pub fn print_tables(tables: &TablesSnapshot) {
    match &tables.latest_table {
        Some(latest) => println!("latest: {}", latest),
        None => println!("latest: <none>"),
    }
    if tables.active_tables.is_empty() {
        println!("no active tables");
    } else {
        println!("active: {}", tables.active_tables.join(", "));
    }
}

/// Render columns and rows as an ASCII table no wider than `termw`, followed by a
/// "rows: N, cols: M" footer.
pub fn render_table(cols: &[String], rows: &[Vec<Option<String>>], termw: usize) -> Vec<String> {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|c| c.clone().unwrap_or_else(|| NULL_TEXT.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = cols.iter().map(|s| s.chars().count().min(termw)).collect();
    for r in &cells {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = cell.chars().count();
            if w > widths[i] { widths[i] = w.min(termw); }
        }
    }

    let mut out = Vec::with_capacity(cells.len() + 5);
    let sep = build_separator(&widths);
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&build_row_header_colored(cols, &widths), termw));
    out.push(fit_line_to_width(&sep, termw));
    for r in &cells {
        out.push(fit_line_to_width(&build_row(r, &widths), termw));
    }
    out.push(fit_line_to_width(&sep, termw));
    out.push(format!("rows: {}, cols: {}", cells.len(), cols.len()));
    out
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = w.saturating_sub(visible_len(&text));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push_str(" |");
    }
    s
}

// Header cells are green and left-aligned; padding follows the visible width.
fn build_row_header_colored(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = w.saturating_sub(visible_len(&text));
        s.push(' ');
        s.push_str(&format!("\x1b[32m{}\x1b[0m", text));
        s.push_str(&" ".repeat(pad));
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+eE,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

// --- Terminal fitting & ANSI helpers ---

pub fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 4 => (w - 4) as usize,
        _ => 80,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw { return s.to_string(); }
    elide_middle_preserving_ansi(s, maxw)
}

enum Piece<'a> {
    Ansi(&'a str),
    Text(&'a str),
}

// Split into ANSI escape sequences (ESC [ ... letter) and plain text runs.
fn pieces(s: &str) -> Vec<Piece<'_>> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i] == 0x1B {
            i += 1;
            if i < bytes.len() && bytes[i] == b'[' {
                i += 1;
                while i < bytes.len() {
                    let b = bytes[i];
                    i += 1;
                    if b.is_ascii_alphabetic() { break; }
                }
            }
            out.push(Piece::Ansi(&s[start..i]));
        } else {
            while i < bytes.len() && bytes[i] != 0x1B { i += 1; }
            out.push(Piece::Text(&s[start..i]));
        }
    }
    out
}

fn visible_len(s: &str) -> usize {
    pieces(s)
        .iter()
        .map(|p| match p {
            Piece::Ansi(_) => 0,
            Piece::Text(t) => t.chars().count(),
        })
        .sum()
}

fn elide_middle_preserving_ansi(s: &str, maxw: usize) -> String {
    if maxw <= 3 { return "…".repeat(maxw.min(1)); }
    if visible_len(s) <= maxw { return s.to_string(); }
    let budget = maxw - 3;
    let front_keep = budget / 2;
    let back_keep = budget - front_keep;
    let toks = pieces(s);

    let mut front = String::new();
    let mut collected = 0usize;
    for t in &toks {
        match t {
            Piece::Ansi(a) => front.push_str(a),
            Piece::Text(text) => {
                let vis = text.chars().count();
                if collected + vis <= front_keep {
                    front.push_str(text);
                    collected += vis;
                } else {
                    front.extend(text.chars().take(front_keep - collected));
                    break;
                }
            }
        }
    }

    let mut back_parts: Vec<String> = Vec::new();
    let mut collected = 0usize;
    for t in toks.iter().rev() {
        match t {
            Piece::Ansi(a) => back_parts.push(a.to_string()),
            Piece::Text(text) => {
                let vis = text.chars().count();
                if collected + vis <= back_keep {
                    back_parts.push(text.to_string());
                    collected += vis;
                } else {
                    let need = back_keep - collected;
                    back_parts.push(text.chars().skip(vis - need).collect());
                    break;
                }
            }
        }
    }
    back_parts.reverse();

    let mut out = front;
    out.push_str("...");
    out.push_str(&back_parts.concat());
    // Reset color in case an escape was cut.
    out.push_str("\x1b[0m");
    out
}
