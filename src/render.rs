// Pure projection of (list, filter) into a display description

use crate::filter::{Filter, compute_visible};
use crate::item::Item;
use colored::Colorize;
use std::fmt::Write;

/// Glyph shown on the toggle control of a completed row
pub const CHECK_GLYPH: &str = "✓";

/// Glyph shown on every row's delete control
pub const DELETE_GLYPH: &str = "✕";

/// Everything a host needs to draw the widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub rows: Vec<Row>,
    /// Count of items not completed, over the whole list
    pub items_left: usize,
    pub filters: Vec<FilterControl>,
}

/// One visible item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    /// Raw item text, used to pre-fill the edit field
    pub text: String,
    /// Markup-safe text for the label
    pub label: String,
    pub completed: bool,
    pub state: RowState,
}

/// Whether a row shows its label or an edit field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowState {
    Display,
    /// `caret` is a character offset into `value`
    Editing { value: String, caret: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterControl {
    pub filter: Filter,
    pub active: bool,
}

/// Render the visible items of `items` under `filter`
///
/// Every row starts in `RowState::Display`.
pub fn render(items: &[Item], filter: Filter) -> Frame {
    let rows = compute_visible(items, filter)
        .into_iter()
        .map(|item| Row {
            id: item.id.clone(),
            text: item.text.clone(),
            label: escape_html(&item.text),
            completed: item.completed,
            state: RowState::Display,
        })
        .collect();

    let filters = Filter::VARIANTS
        .iter()
        .map(|&f| FilterControl {
            filter: f,
            active: f == filter,
        })
        .collect();

    Frame {
        rows,
        items_left: items.iter().filter(|item| !item.completed).count(),
        filters,
    }
}

/// Replace `& < > " '` with their HTML entities
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl Row {
    /// Text on the toggle control
    pub fn toggle_glyph(&self) -> &'static str {
        if self.completed { CHECK_GLYPH } else { "" }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, RowState::Editing { .. })
    }
}

impl Frame {
    /// Footer label; grammar is not adjusted for a single item
    pub fn items_left_label(&self) -> String {
        format!("{} items left", self.items_left)
    }

    pub fn active_filter(&self) -> Filter {
        self.filters
            .iter()
            .find(|control| control.active)
            .map(|control| control.filter)
            .unwrap_or_default()
    }

    /// Look up a row by item id
    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn row_mut(&mut self, id: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    /// Row currently in edit mode, if any
    pub fn editing_row(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.is_editing())
    }

    /// Draw the frame for a terminal
    ///
    /// Rows are numbered from 1 in display order.
    pub fn paint(&self) -> String {
        let mut out = String::new();

        if self.rows.is_empty() {
            let _ = writeln!(out, "  {}", "(nothing to show)".dimmed());
        }

        for (index, row) in self.rows.iter().enumerate() {
            let number = format!("{:>3}.", index + 1);
            let toggle = if row.completed {
                format!("[{}]", CHECK_GLYPH).green().to_string()
            } else {
                "[ ]".to_string()
            };

            let body = match &row.state {
                RowState::Display if row.completed => row.text.strikethrough().dimmed().to_string(),
                RowState::Display => row.text.clone(),
                RowState::Editing { value, caret } => {
                    let split = value.char_indices().nth(*caret).map(|(i, _)| i).unwrap_or(value.len());
                    let (before, after) = value.split_at(split);
                    format!("{} {}|{}", "edit:".yellow(), before, after)
                }
            };

            let _ = writeln!(
                out,
                "{} {} {}  {}",
                number.dimmed(),
                toggle,
                body,
                short_id(&row.id).dimmed()
            );
        }

        let filter_bar: Vec<String> = self
            .filters
            .iter()
            .map(|control| {
                if control.active {
                    format!("[{}]", control.filter).bold().to_string()
                } else {
                    control.filter.to_string()
                }
            })
            .collect();

        let _ = writeln!(
            out,
            "{}   {}   {}",
            self.items_left_label(),
            filter_bar.join(" "),
            "clear completed".dimmed()
        );

        out
    }
}

/// Trailing characters of an id, enough to tell rows apart
fn short_id(id: &str) -> &str {
    let start = id.char_indices().rev().nth(7).map(|(i, _)| i).unwrap_or(0);
    &id[start..]
}
