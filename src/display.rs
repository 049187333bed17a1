//! # Display Module
//!
//! Terminal output helpers shared by the commands: boxed panels, tables,
//! spinners and the confidence bar.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{format, Row, Table};
use std::time::Duration;

/// Border colour of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Failure,
}

impl Tone {
    fn paint(&self, s: &str) -> ColoredString {
        match self {
            Tone::Info => s.cyan(),
            Tone::Success => s.green(),
            Tone::Warning => s.yellow(),
            Tone::Failure => s.red(),
        }
    }
}

#[derive(Debug, Clone)]
enum PanelLine {
    Field { label: String, value: String },
    Text(String),
    Separator,
    Blank,
}

/// Titled box sized to its content.
#[derive(Debug, Clone)]
pub struct Panel {
    title: String,
    tone: Tone,
    lines: Vec<PanelLine>,
    min_width: usize,
    max_width: usize,
}

impl Panel {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            tone: Tone::Info,
            lines: Vec::new(),
            min_width: 50,
            max_width: 100,
        }
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// `label` left, `value` after it; labels are aligned across the panel.
    pub fn field(&mut self, label: &str, value: impl AsRef<str>) -> &mut Self {
        self.lines.push(PanelLine::Field {
            label: label.to_string(),
            value: value.as_ref().to_string(),
        });
        self
    }

    pub fn text(&mut self, value: impl AsRef<str>) -> &mut Self {
        self.lines.push(PanelLine::Text(value.as_ref().to_string()));
        self
    }

    pub fn separator(&mut self) -> &mut Self {
        self.lines.push(PanelLine::Separator);
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(PanelLine::Blank);
        self
    }

    fn label_width(&self) -> usize {
        self.lines
            .iter()
            .filter_map(|line| match line {
                PanelLine::Field { label, .. } => Some(visual_width(label)),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    fn width(&self) -> usize {
        let label_width = self.label_width();
        let content = self
            .lines
            .iter()
            .map(|line| match line {
                PanelLine::Field { value, .. } => label_width + 2 + visual_width(value),
                PanelLine::Text(value) => visual_width(value),
                PanelLine::Separator | PanelLine::Blank => 0,
            })
            .max()
            .unwrap_or(0);

        // "│ " + content + " │"
        let needed = (content + 4).max(visual_width(&self.title) + 6);
        needed.clamp(self.min_width, self.max_width)
    }

    pub fn render(&self) -> String {
        let width = self.width();
        let inner = width - 4;
        let label_width = self.label_width();
        let side = self.tone.paint("│");

        let mut out = Vec::with_capacity(self.lines.len() + 2);
        let title_len = visual_width(&self.title);
        out.push(format!(
            "{} {} {}",
            self.tone.paint("┌─"),
            self.title.bold(),
            self.tone
                .paint(&format!("{}┐", "─".repeat(width.saturating_sub(title_len + 5))))
        ));

        for line in &self.lines {
            let content = match line {
                PanelLine::Field { label, value } => {
                    let padding = " ".repeat(label_width - visual_width(label));
                    let value = truncate_to_width(value, inner.saturating_sub(label_width + 2));
                    format!("{}{}  {}", label.bright_white(), padding, value)
                }
                PanelLine::Text(value) => truncate_to_width(value, inner),
                PanelLine::Separator => "─".repeat(inner).dimmed().to_string(),
                PanelLine::Blank => String::new(),
            };
            let fill = " ".repeat(inner.saturating_sub(visual_width(&content)));
            out.push(format!("{} {}{} {}", side, content, fill, side));
        }

        out.push(
            self.tone
                .paint(&format!("└{}┘", "─".repeat(width - 2)))
                .to_string(),
        );
        out.join("\n")
    }

    pub fn print(&self) {
        println!("\n{}", self.render());
    }
}

/// Table with box-drawing borders and bold headers.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        headers
            .iter()
            .map(|h| prettytable::Cell::new(h).style_spec("bFc"))
            .collect(),
    ));
    table
}

/// Steady-ticking spinner; finish it with `finish_with_message`.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// `████░░░░ 72%`, coloured by how sure the model is.
pub fn confidence_bar(score: f32) -> String {
    const BAR_WIDTH: usize = 20;
    let score = score.clamp(0.0, 1.0);
    let filled = ((score * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    let percentage = format!("{:.0}%", score * 100.0);

    let percentage = if score >= 0.8 {
        percentage.green()
    } else if score >= 0.6 {
        percentage.yellow()
    } else {
        percentage.red()
    };

    format!(
        "{}{} {}",
        "█".repeat(filled).green(),
        "░".repeat(BAR_WIDTH - filled).dimmed(),
        percentage
    )
}

/// Cut `s` to `max` characters, ending with `...` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Printable width, ignoring ANSI colour sequences.
pub fn visual_width(s: &str) -> usize {
    strip_ansi_codes(s).chars().map(char_width).sum()
}

fn char_width(ch: char) -> usize {
    match ch {
        '\u{0000}'..='\u{001F}' | '\u{007F}' | '\u{0300}'..='\u{036F}' | '\u{FE0F}' => 0,
        '\u{2600}'..='\u{27BF}'
        | '\u{1F300}'..='\u{1F9FF}'
        | '\u{1100}'..='\u{115F}'
        | '\u{2E80}'..='\u{A4CF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FF60}'
        | '\u{FFE0}'..='\u{FFE6}' => 2,
        _ => 1,
    }
}

/// Fit `s` into `max_width` columns. Coloured input loses its colour when cut.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if visual_width(s) <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut width = 0;
    for ch in strip_ansi_codes(s).chars() {
        let w = char_width(ch);
        if width + w > max_width.saturating_sub(3) {
            break;
        }
        result.push(ch);
        width += w;
    }
    result.push_str("...");
    result
}

fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }
    result
}
