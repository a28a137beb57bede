mod examples;
mod root;

pub use examples::{create_example, list_examples};
pub use root::{GREETING, not_found, root};
