pub(crate) mod page;

pub use page::{ContentType, Page};
