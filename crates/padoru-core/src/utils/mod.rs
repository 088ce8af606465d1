//! Path helpers shared by collection loading and entry image resolution.

pub mod path;

pub use path::{make_absolute, make_relative, normalize_relative};
