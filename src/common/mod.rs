//! Shared filesystem utilities across pipeline stages.

pub mod files;
pub mod paths;

pub use files::{ensure_dir, remove_file_if_exists, write_file_with_dirs};
pub use paths::{base_name, copy_dir_all, move_path, remove_path, to_slash};
