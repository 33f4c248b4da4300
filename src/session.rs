// Line-oriented host: parses command lines into intents for a view

use crate::blob::BlobStore;
use crate::filter::Filter;
use crate::view::{Intent, Key, View};
use eyre::{Result, eyre};

pub const HELP: &str = "\
Commands:
  add <text>          add an item
  toggle <row>        toggle completion
  delete <row>        delete an item (alias: rm)
  edit <row>          start editing a row's text (alias: dblclick)
  type <text>         replace the edit field's value
  enter | esc         commit or cancel the edit
  blur                move focus away from the edit field
  filter <name>       show all, active or completed items
  clear               clear completed items
  show | help | quit

<row> is a row number from the list or an item id.";

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    Toggle(String),
    Delete(String),
    DoubleActivate(String),
    Type(String),
    Key(Key),
    Blur,
    Filter(Filter),
    Clear,
    Show,
    Help,
    Quit,
    Empty,
}

/// What the host should do after a line ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this text and keep going
    Continue(Option<String>),
    Quit,
}

/// Parse one command line; row references stay unresolved
pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "add" => Command::Submit(rest.to_string()),
        "toggle" => Command::Toggle(required(word, rest)?),
        "delete" | "rm" => Command::Delete(required(word, rest)?),
        "edit" | "dblclick" => Command::DoubleActivate(required(word, rest)?),
        "type" => Command::Type(rest.to_string()),
        "enter" => Command::Key(Key::Enter),
        "esc" | "escape" => Command::Key(Key::Escape),
        "blur" => Command::Blur,
        "filter" => Command::Filter(required(word, rest)?.parse()?),
        "clear" => Command::Clear,
        "show" | "ls" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(eyre!("Unknown command: {} (try 'help')", other)),
    };

    Ok(command)
}

fn required(word: &str, rest: &str) -> Result<String> {
    if rest.is_empty() {
        return Err(eyre!("'{}' needs an argument", word));
    }
    Ok(rest.to_string())
}

/// Drives a view from command lines
pub struct Session<B: BlobStore> {
    view: View<B>,
}

impl<B: BlobStore> Session<B> {
    pub fn new(view: View<B>) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &View<B> {
        &self.view
    }

    /// Run one line, returning the painted frame whenever it was redrawn
    pub fn execute(&mut self, line: &str) -> Result<Outcome> {
        let intent = match parse_line(line)? {
            Command::Submit(text) => Intent::Submit(text),
            Command::Toggle(row) => Intent::Toggle(self.view.resolve_row(&row)),
            Command::Delete(row) => Intent::Delete(self.view.resolve_row(&row)),
            Command::DoubleActivate(row) => Intent::DoubleActivate(self.view.resolve_row(&row)),
            Command::Type(text) => Intent::EditInput(text),
            Command::Key(key) => Intent::KeyPress(key),
            Command::Blur => Intent::Blur,
            Command::Filter(filter) => Intent::SelectFilter(filter),
            Command::Clear => Intent::ClearCompleted,
            Command::Show => return Ok(Outcome::Continue(Some(self.view.frame().paint()))),
            Command::Help => return Ok(Outcome::Continue(Some(HELP.to_string()))),
            Command::Quit => return Ok(Outcome::Quit),
            Command::Empty => return Ok(Outcome::Continue(None)),
        };

        let renders = self.view.renders();
        let editing = self.view.editing().map(str::to_string);
        self.view.handle(intent)?;

        let changed = self.view.renders() != renders || self.view.editing() != editing.as_deref();
        Ok(Outcome::Continue(changed.then(|| self.view.frame().paint())))
    }
}
