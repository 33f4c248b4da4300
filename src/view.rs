// View: turns user intents into store calls and keeps the current frame

use crate::blob::BlobStore;
use crate::filter::Filter;
use crate::render::{Frame, RowState, render};
use crate::store::Store;
use eyre::{Result, eyre};
use tracing::debug;

/// A user-intent notification delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The new-item field was submitted with this value
    Submit(String),
    /// A row's toggle control was activated
    Toggle(String),
    /// A row's delete control was activated
    Delete(String),
    /// A row's label was double-activated
    DoubleActivate(String),
    /// The edit field's value changed
    EditInput(String),
    KeyPress(Key),
    /// The edit field lost focus
    Blur,
    SelectFilter(Filter),
    ClearCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

/// Owns the store and the frame currently on screen
pub struct View<B: BlobStore> {
    store: Store<B>,
    frame: Frame,
    /// Id of the row in edit mode
    editing: Option<String>,
    renders: usize,
}

impl<B: BlobStore> View<B> {
    pub fn new(store: Store<B>) -> Self {
        let frame = render(store.items(), store.filter());
        Self {
            store,
            frame,
            editing: None,
            renders: 1,
        }
    }

    pub fn store(&self) -> &Store<B> {
        &self.store
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Number of full renders so far, including the initial one
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Id of the row currently being edited
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Handle one intent to completion
    ///
    /// Errors come only from failed writes; the store has already rolled
    /// back when one is returned.
    pub fn handle(&mut self, intent: Intent) -> Result<()> {
        debug!(?intent, "handle");
        match intent {
            Intent::Submit(text) => {
                if self.store.add(&text)?.is_some() {
                    self.redraw();
                }
            }
            Intent::Toggle(id) => {
                if self.store.toggle(&id)? {
                    self.redraw();
                }
            }
            Intent::Delete(id) => {
                if self.store.delete(&id)? {
                    self.redraw();
                }
            }
            Intent::DoubleActivate(id) => {
                if self.editing.as_deref() == Some(id.as_str()) {
                    return Ok(());
                }
                if self.editing.is_some() {
                    // Focus moves to the new field, which blurs the old one
                    self.commit_edit()?;
                }
                self.begin_edit(&id);
            }
            Intent::EditInput(value) => self.update_edit(value),
            Intent::KeyPress(Key::Enter) | Intent::Blur => {
                if self.editing.is_some() {
                    self.commit_edit()?;
                }
            }
            Intent::KeyPress(Key::Escape) => {
                if self.editing.is_some() {
                    self.redraw();
                }
            }
            Intent::KeyPress(Key::Other) => {}
            Intent::SelectFilter(filter) => {
                self.store.set_filter(filter);
                self.redraw();
            }
            Intent::ClearCompleted => {
                if self.store.clear_completed()? {
                    self.redraw();
                }
            }
        }
        Ok(())
    }

    /// Map a row reference to an item id
    ///
    /// A number from 1 to the row count picks that row of the current frame;
    /// anything else is taken as an id.
    pub fn resolve_row(&self, reference: &str) -> String {
        let reference = reference.trim();
        reference
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=self.frame.rows.len()).contains(n))
            .map(|n| self.frame.rows[n - 1].id.clone())
            .unwrap_or_else(|| reference.to_string())
    }

    /// Open `reference`'s edit field, type `text` and move focus away
    ///
    /// Fails when the row is not on screen.
    pub fn edit_row(&mut self, reference: &str, text: &str) -> Result<()> {
        let id = self.resolve_row(reference);
        self.handle(Intent::DoubleActivate(id))?;
        if self.editing.is_none() {
            return Err(eyre!("No such row: {}", reference));
        }
        self.handle(Intent::EditInput(text.to_string()))?;
        self.handle(Intent::Blur)
    }

    /// Re-render from store state, resetting every row to display mode
    pub fn redraw(&mut self) {
        self.editing = None;
        self.frame = render(self.store.items(), self.store.filter());
        self.renders += 1;
    }

    fn begin_edit(&mut self, id: &str) {
        let Some(row) = self.frame.row_mut(id) else {
            debug!(id, "begin_edit: row not on screen");
            return;
        };
        let value = row.text.clone();
        let caret = value.chars().count();
        row.state = RowState::Editing { value, caret };
        self.editing = Some(id.to_string());
    }

    fn update_edit(&mut self, new_value: String) {
        let Some(id) = self.editing.as_deref() else {
            return;
        };
        if let Some(row) = self.frame.row_mut(id) {
            let caret = new_value.chars().count();
            row.state = RowState::Editing {
                value: new_value,
                caret,
            };
        }
    }

    fn commit_edit(&mut self) -> Result<()> {
        let Some(id) = self.editing.take() else {
            return Ok(());
        };
        let value = match self.frame.row(&id).map(|row| &row.state) {
            Some(RowState::Editing { value, .. }) => value.clone(),
            _ => return Ok(()),
        };

        let result = self.store.edit(&id, &value);
        self.redraw();
        result.map(|_| ())
    }
}
