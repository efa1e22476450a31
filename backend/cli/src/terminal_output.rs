//! Terminal output utilities: role-coloured turns, notes, table rendering.

use proglot_core::{Role, Turn};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const MAGENTA: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Errors go to stderr so piped output stays clean.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Tutor",
    }
}

/// Format one turn as `Speaker: text`, coloured by role when `color` is set.
pub fn render_turn(turn: &Turn, color: bool) -> String {
    let name = speaker(turn.role());
    if !color {
        return format!("{name}: {}", turn.text());
    }
    let tint = match turn.role() {
        Role::User => CYAN,
        Role::Assistant => MAGENTA,
    };
    format!("{tint}{BOLD}{name}:{RESET} {}", turn.text())
}

pub fn print_turn(turn: &Turn) {
    println!("{}", render_turn(turn, supports_color()));
}

/// Print a transcript. `omitted` turns before it are summarised on one line.
pub fn print_transcript(turns: &[Turn], omitted: usize) {
    if omitted > 0 {
        let line = format!("... {omitted} earlier turns not shown (use --all)");
        if supports_color() {
            println!("{DIM}{line}{RESET}");
        } else {
            println!("{line}");
        }
    }
    for turn in turns {
        print_turn(turn);
        println!();
    }
}

/// Print a prompt meant for copy and paste between visible markers.
pub fn print_block(title: &str, body: &str) {
    let rule = "-".repeat(60);
    if supports_color() {
        println!("{DIM}{rule}{RESET}\n{BOLD}{title}{RESET}\n{DIM}{rule}{RESET}");
    } else {
        println!("{rule}\n{title}\n{rule}");
    }
    println!("{body}");
    if supports_color() {
        println!("{DIM}{rule}{RESET}");
    } else {
        println!("{rule}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// A left-aligned table column.
pub struct Column {
    pub header: String,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

/// Render a table with given columns and rows.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| strip_ansi(&c.header).chars().count())
        .collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(strip_ansi(cell).chars().count());
        }
    }

    let mut out = String::new();

    let header_cells: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i]))
        .collect();
    out.push_str(&format!("  {}  \n", header_cells.join("  ")));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(cell, widths[i])
            })
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }

    out
}

fn pad_cell(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(strip_ansi(s).chars().count());
    format!("{s}{}", " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn renders_turns_by_role() {
        assert_eq!(render_turn(&Turn::user("Ciao!"), false), "You: Ciao!");
        assert_eq!(
            render_turn(&Turn::assistant("Ciao! Come stai?"), false),
            "Tutor: Ciao! Come stai?"
        );
        let colored = render_turn(&Turn::assistant("Hola"), true);
        assert!(colored.contains(MAGENTA));
        assert_eq!(strip_ansi(&colored), "Tutor: Hola");
    }

    #[test]
    fn renders_table_with_wide_chars() {
        let cols = vec![Column::left("Code"), Column::left("Language")];
        let rows = vec![
            vec!["ja".to_string(), "Japanese (Japonca)".to_string()],
            vec!["de".to_string(), "German (Almanca)".to_string()],
        ];
        let table = render_table(&cols, &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Japanese (Japonca)"));
        assert_eq!(lines[2].len(), lines[3].len());
    }
}
