//! Core types shared across commands.

mod category;
mod issue;
mod link;

pub use category::ContentKind;
pub use issue::{Issue, Severity};
pub use link::{LinkKind, is_external_link, split_path_fragment};
