//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

mod prompt;
mod theme;
mod validator;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use reedline::{default_emacs_keybindings, Emacs, FileBackedHistory, Reedline, Signal};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tabplan::engine::write_csv_to;
use tabplan::polars::prelude::{AnyValue, DataFrame, DataType};
use tabplan::{Plan, PlanError};

use prompt::PlanPrompt;
use validator::PlanValidator;

#[derive(Parser)]
#[command(name = "tabplan", version, about = "Run JSON query plans against CSV tables")]
struct Args {
    /// CSV file loaded as the source table
    input: PathBuf,
    /// Execute the JSON plan in FILE and exit
    #[arg(short, long, value_name = "FILE")]
    plan: Option<PathBuf>,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    /// Print the compiled pipeline before running it
    #[arg(short, long)]
    explain: bool,
    /// Show query execution time
    #[arg(short, long)]
    timer: bool,
    /// Log plan compilation at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// REPL state: the loaded table and display settings.
struct Session {
    table: DataFrame,
    format: OutputFormat,
    explain: bool,
    timer: bool,
}

impl Session {
    fn run(&self, text: &str) -> Result<(), PlanError> {
        let plan = Plan::from_json(text)?;
        let lazy = tabplan::execute(&self.table, &plan)?;
        if self.explain {
            println!("{}{}{}", theme::PIPELINE, lazy.explain(false)?, theme::R);
        }
        let start = Instant::now();
        let mut result = lazy.collect()?;
        let elapsed = start.elapsed();
        print_result(&mut result, self.format);
        if self.timer {
            eprintln!(
                "{}Run Time: {:.3}s{}",
                theme::TIMER,
                elapsed.as_secs_f64(),
                theme::R
            );
        }
        Ok(())
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let table = match tabplan::read_csv(&args.input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!(
                "{}Error loading {}: {e}{}",
                theme::ERROR,
                args.input.display(),
                theme::R
            );
            std::process::exit(1);
        }
    };
    tracing::debug!(rows = table.height(), cols = table.width(), "loaded {}", args.input.display());

    let mut session = Session {
        table,
        format: args.format,
        explain: args.explain,
        timer: args.timer,
    };

    // Non-interactive: execute a plan file
    if let Some(ref path) = args.plan {
        let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("{}Error reading {}: {e}{}", theme::ERROR, path.display(), theme::R);
            std::process::exit(1);
        });
        if let Err(e) = session.run(&text) {
            eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
            std::process::exit(1);
        }
        return;
    }

    run_repl(&mut session, &args.input);
}

fn init_tracing(verbose: bool) {
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();
    if verbose {
        env_filter = env_filter.add_directive(tracing::Level::DEBUG.into());
    }
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: logging disabled: {e}");
    }
}

fn run_repl(session: &mut Session, input: &Path) {
    print_banner(input, &session.table);

    let keybindings = default_emacs_keybindings();

    // --- History ---
    let history_path = dirs_or_home().join(".tabplan_history");
    let history = match FileBackedHistory::with_file(1000, history_path.clone()) {
        Ok(history) => Some(history),
        Err(e) => {
            eprintln!(
                "{}Warning: history disabled ({}): {}{}",
                theme::ERROR,
                history_path.display(),
                e,
                theme::R
            );
            None
        }
    };

    // --- Assemble editor ---
    let editor = Reedline::create()
        .with_validator(Box::new(PlanValidator))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));
    let mut editor = if let Some(history) = history {
        editor.with_history(Box::new(history))
    } else {
        editor
    };

    let prompt = PlanPrompt::new(input);

    loop {
        match editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                // Dot commands
                if trimmed.starts_with('.') {
                    if !handle_dot_command(trimmed, session) {
                        break;
                    }
                    continue;
                }

                // JSON plan (Validator ensured braces balance)
                if let Err(e) = session.run(trimmed) {
                    eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
                }
            }
            Ok(Signal::CtrlD) => break,
            Ok(Signal::CtrlC) => continue,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output formatting
// ---------------------------------------------------------------------------

fn print_result(df: &mut DataFrame, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_table(df),
        OutputFormat::Csv => print_csv(df),
        OutputFormat::Json => print_json(df),
    }
}

const HEAD_ROWS: usize = 20;
const TAIL_ROWS: usize = 20;

fn print_table(df: &DataFrame) {
    use std::fmt::Write;
    use std::io::Write as IoWrite;
    use theme::*;
    let mut out = String::with_capacity(4096);

    let nrows = df.height();
    let ncols = df.width();

    if ncols == 0 {
        println!("{FOOTER}(empty result){R}");
        return;
    }

    let columns = df.get_columns();
    let col_names: Vec<&str> = columns.iter().map(|c| c.name().as_str()).collect();
    let col_types: Vec<String> = columns.iter().map(|c| c.dtype().to_string()).collect();
    let is_right: Vec<bool> = columns.iter().map(|c| is_number(c.dtype())).collect();

    let show_dots = nrows > HEAD_ROWS + TAIL_ROWS;
    let head_n = if show_dots { HEAD_ROWS } else { nrows };
    let tail_n = if show_dots { TAIL_ROWS } else { 0 };
    let shown = head_n + tail_n;

    let render_row = |r: usize| -> (Vec<String>, Vec<bool>) {
        (0..ncols)
            .map(|c| match columns[c].get(r) {
                Ok(AnyValue::Null) | Err(_) => ("NULL".to_string(), true),
                Ok(v) => (format_cell(&v), false),
            })
            .unzip()
    };

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(shown + 1);
    let mut is_null: Vec<Vec<bool>> = Vec::with_capacity(shown + 1);
    for r in 0..head_n {
        let (row, nulls) = render_row(r);
        cells.push(row);
        is_null.push(nulls);
    }
    if show_dots {
        cells.push(
            (0..ncols)
                .map(|_| "\u{00b7}\u{00b7}\u{00b7}".to_string())
                .collect(),
        );
        is_null.push(vec![false; ncols]);
        for r in (nrows - tail_n)..nrows {
            let (row, nulls) = render_row(r);
            cells.push(row);
            is_null.push(nulls);
        }
    }

    let footer_left = if show_dots {
        format!("{nrows} rows ({shown} shown)")
    } else {
        format!("{nrows} rows")
    };
    let footer_right = format!("{ncols} columns");
    let footer_min = footer_left.len() + footer_right.len() + 3;

    let mut w: Vec<usize> = (0..ncols)
        .map(|c| {
            let mut max = col_names[c].chars().count().max(col_types[c].len());
            for row in &cells {
                max = max.max(row[c].chars().count());
            }
            max
        })
        .collect();

    let mut inner_width: usize = w.iter().map(|x| x + 2).sum::<usize>() + ncols - 1;

    if inner_width < footer_min {
        let extra = footer_min - inner_width;
        w[ncols - 1] += extra;
        inner_width += extra;
    }
    let mut buf = String::with_capacity(inner_width * 2);

    macro_rules! hline {
        ($left:expr, $mid:expr, $right:expr) => {{
            buf.clear();
            buf.push_str(BORDER);
            buf.push($left);
            for c in 0..ncols {
                if c > 0 {
                    buf.push($mid);
                }
                for _ in 0..w[c] + 2 {
                    buf.push('\u{2500}');
                }
            }
            buf.push($right);
            buf.push_str(R);
            let _ = writeln!(out, "{buf}");
        }};
    }

    hline!('\u{250c}', '\u{252c}', '\u{2510}');

    buf.clear();
    for c in 0..ncols {
        buf.push_str(BORDER);
        buf.push('\u{2502}');
        buf.push_str(R);
        let _ = write!(
            buf,
            " {BOLD}{HEADER}{:^width$}{R} ",
            col_names[c],
            width = w[c]
        );
    }
    buf.push_str(BORDER);
    buf.push('\u{2502}');
    buf.push_str(R);
    let _ = writeln!(out, "{buf}");

    buf.clear();
    for c in 0..ncols {
        buf.push_str(BORDER);
        buf.push('\u{2502}');
        buf.push_str(R);
        let _ = write!(buf, " {TYPE_DIM}{:^width$}{R} ", col_types[c], width = w[c]);
    }
    buf.push_str(BORDER);
    buf.push('\u{2502}');
    buf.push_str(R);
    let _ = writeln!(out, "{buf}");

    hline!('\u{251c}', '\u{253c}', '\u{2524}');

    let dots_idx = if show_dots { Some(head_n) } else { None };
    for (ri, row) in cells.iter().enumerate() {
        buf.clear();
        let is_dots = dots_idx == Some(ri);
        for c in 0..ncols {
            buf.push_str(BORDER);
            buf.push('\u{2502}');
            buf.push_str(R);
            if is_dots {
                let _ = write!(buf, " {FOOTER}{:^width$}{R} ", row[c], width = w[c]);
            } else if is_null[ri][c] {
                let _ = write!(
                    buf,
                    " {ITALIC}{NULL_CLR}{:>width$}{R} ",
                    row[c],
                    width = w[c]
                );
            } else if is_right[c] {
                let _ = write!(buf, " {TEXT}{:>width$}{R} ", row[c], width = w[c]);
            } else {
                let _ = write!(buf, " {TEXT}{:<width$}{R} ", row[c], width = w[c]);
            }
        }
        buf.push_str(BORDER);
        buf.push('\u{2502}');
        buf.push_str(R);
        let _ = writeln!(out, "{buf}");
    }

    hline!('\u{251c}', '\u{2534}', '\u{2524}');

    let pad = inner_width - footer_left.len() - footer_right.len() - 2;
    buf.clear();
    let _ = write!(
        buf,
        "{BORDER}\u{2502}{R} {FOOTER}{footer_left}{:pad$}{footer_right}{R} {BORDER}\u{2502}{R}",
        ""
    );
    let _ = writeln!(out, "{buf}");

    buf.clear();
    buf.push_str(BORDER);
    buf.push('\u{2514}');
    for _ in 0..inner_width {
        buf.push('\u{2500}');
    }
    buf.push('\u{2518}');
    buf.push_str(R);
    let _ = writeln!(out, "{buf}");

    // Single write to stdout avoids per-line flush overhead on terminals
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = lock.write_all(out.as_bytes());
}

fn print_csv(df: &mut DataFrame) {
    let stdout = std::io::stdout();
    if let Err(e) = write_csv_to(df, stdout.lock()) {
        eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
    }
}

fn print_json(df: &DataFrame) {
    let columns = df.get_columns();
    let records: Vec<serde_json::Map<String, serde_json::Value>> = (0..df.height())
        .map(|r| {
            columns
                .iter()
                .map(|c| {
                    let value = c.get(r).map(|v| json_value(&v)).unwrap_or_default();
                    (c.name().to_string(), value)
                })
                .collect()
        })
        .collect();
    match serde_json::to_string_pretty(&records) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{}Error: {e}{}", theme::ERROR, theme::R),
    }
}

fn json_value(value: &AnyValue) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        AnyValue::Null => Json::Null,
        AnyValue::Boolean(b) => Json::from(*b),
        AnyValue::Int8(v) => Json::from(*v),
        AnyValue::Int16(v) => Json::from(*v),
        AnyValue::Int32(v) => Json::from(*v),
        AnyValue::Int64(v) => Json::from(*v),
        AnyValue::UInt8(v) => Json::from(*v),
        AnyValue::UInt16(v) => Json::from(*v),
        AnyValue::UInt32(v) => Json::from(*v),
        AnyValue::UInt64(v) => Json::from(*v),
        AnyValue::Float32(v) => json_float(f64::from(*v)),
        AnyValue::Float64(v) => json_float(*v),
        AnyValue::String(s) => Json::from(*s),
        AnyValue::StringOwned(s) => Json::from(s.as_str()),
        AnyValue::List(items) => Json::Array(items.iter().map(|v| json_value(&v)).collect()),
        other => Json::from(other.to_string()),
    }
}

// NaN and infinities have no JSON form.
fn json_float(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

fn is_number(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

fn format_cell(value: &AnyValue) -> String {
    let float = |v: f64| {
        let s = format!("{v:.6}");
        let s = s.trim_end_matches('0');
        if s.ends_with('.') {
            format!("{s}0")
        } else {
            s.to_string()
        }
    };
    match value {
        AnyValue::Float64(v) => float(*v),
        AnyValue::Float32(v) => float(f64::from(*v)),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::List(items) => {
            let items: Vec<String> = items.iter().map(|v| format_cell(&v)).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Dot commands
// ---------------------------------------------------------------------------

/// Returns false when the REPL should exit.
fn handle_dot_command(cmd: &str, session: &mut Session) -> bool {
    use theme::*;

    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let Some(&name) = parts.first() else {
        return true;
    };
    match name {
        ".mode" => match parts.get(1) {
            Some(&"table") => {
                session.format = OutputFormat::Table;
                println!("{SUCCESS}Output mode: table{R}");
            }
            Some(&"csv") => {
                session.format = OutputFormat::Csv;
                println!("{SUCCESS}Output mode: csv{R}");
            }
            Some(&"json") => {
                session.format = OutputFormat::Json;
                println!("{SUCCESS}Output mode: json{R}");
            }
            Some(_) => println!("{ERROR}Unknown mode. Use: table, csv, json{R}"),
            None => println!("{FOOTER}Usage: .mode table|csv|json{R}"),
        },
        ".timer" => match toggle(parts.get(1).copied()) {
            Some(on) => {
                session.timer = on;
                println!("{SUCCESS}Timer: {}{R}", if on { "on" } else { "off" });
            }
            None => println!("{FOOTER}Usage: .timer on|off{R}"),
        },
        ".explain" => match toggle(parts.get(1).copied()) {
            Some(on) => {
                session.explain = on;
                println!("{SUCCESS}Explain: {}{R}", if on { "on" } else { "off" });
            }
            None => println!("{FOOTER}Usage: .explain on|off{R}"),
        },
        ".schema" => {
            for (name, dtype) in session.table.schema().iter() {
                println!("  {HEADER}{:20}{R} {FOOTER}{}{R}", name.as_str(), dtype);
            }
        }
        ".functions" => {
            let names: Vec<&str> = tabplan::plan::function_names().collect();
            println!("  {TEXT}{}{R}", names.join(", "));
        }
        ".help" => print_help(),
        ".quit" | ".exit" => return false,
        _ => println!("{ERROR}Unknown command: {name}. Type .help for commands.{R}"),
    }
    true
}

fn toggle(arg: Option<&str>) -> Option<bool> {
    match arg {
        Some("on") => Some(true),
        Some("off") => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Banner & help
// ---------------------------------------------------------------------------

fn print_banner(input: &Path, table: &DataFrame) {
    use theme::*;

    let ver = env!("CARGO_PKG_VERSION");
    let hash = env!("GIT_HASH");
    let arch = std::env::consts::ARCH;
    let tag = format!("v{}  \u{b7}  {}  \u{b7}  {}", ver, hash, arch);
    let source = format!(
        "{}: {} rows \u{00d7} {} columns",
        input.display(),
        table.height(),
        table.width()
    );
    let help = "enter a JSON plan, or .help for commands";
    let tag_w = tag.chars().count();
    let source_w = source.chars().count();
    let help_w = help.chars().count();
    let w = tag_w.max(source_w).max(help_w);
    let fill = w.saturating_sub(9);
    println!(
        "{BAN_BORDER}\u{256d}\u{2500} {BOLD}{BAN_TITLE}tabplan{R}{BAN_BORDER} \u{2500}{}\u{256e}{R}",
        "\u{2500}".repeat(fill)
    );
    for (line, width, color) in [(&tag, tag_w, BAN_INFO), (&source, source_w, BAN_INFO)] {
        println!(
            "{BAN_BORDER}\u{2502}{R} {color}{}{}{R} {BAN_BORDER}\u{2502}{R}",
            line,
            " ".repeat(w - width)
        );
    }
    println!(
        "{BAN_BORDER}\u{2502}{R} {BAN_HELP}{}{}{R} {BAN_BORDER}\u{2502}{R}",
        help,
        " ".repeat(w - help_w)
    );
    println!(
        "{BAN_BORDER}\u{2570}{}\u{256f}{R}",
        "\u{2500}".repeat(w + 2)
    );
    println!();
}

fn print_help() {
    use theme::*;

    println!("{BOLD}{HEADER}Commands:{R}");
    println!("  {CMD}.mode table|csv|json{R}  {CMD_DESC}Set output format{R}");
    println!("  {CMD}.schema{R}               {CMD_DESC}Show the source table's columns{R}");
    println!("  {CMD}.functions{R}            {CMD_DESC}List functions usable in func nodes{R}");
    println!("  {CMD}.explain on|off{R}       {CMD_DESC}Print the compiled pipeline{R}");
    println!("  {CMD}.timer on|off{R}         {CMD_DESC}Show query execution time{R}");
    println!("  {CMD}.help{R}                 {CMD_DESC}Show this help{R}");
    println!("  {CMD}.quit{R}                 {CMD_DESC}Exit{R}");
    println!();
    println!("{BOLD}{HEADER}Plans:{R}");
    println!(
        "  {TEXT}{{\"ops\": [{{\"op\": \"filter\", \"predicate\": {{\"kind\": \"binary\", \"op\": \"gt\",{R}"
    );
    println!(
        "  {TEXT}    \"left\": {{\"kind\": \"col\", \"name\": \"sales\"}}, \"right\": {{\"kind\": \"lit\", \"value\": 20}}}}}},{R}"
    );
    println!("  {TEXT}  {{\"op\": \"limit\", \"n\": 5}}]}}{R}");
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

