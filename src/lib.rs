// TodoStore - Persistent todo list with a pure render loop

pub mod blob;
pub mod filter;
pub mod item;
pub mod render;
pub mod session;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use filter::{Filter, compute_visible};
pub use item::Item;
pub use render::{Frame, Row, RowState, escape_html, render};
pub use session::{Outcome, Session};
pub use store::{STORAGE_KEY, Store};
pub use view::{Intent, Key, View};
