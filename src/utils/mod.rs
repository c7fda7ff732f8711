//! Utility modules.

pub mod path;
pub mod text;

pub use path::{is_truthy, resolve_non_null, resolve_path, type_name};
pub use text::{PREVIEW_CHARS, preview};
