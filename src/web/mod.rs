pub mod page;

pub use page::{escape, render_page, Outcome, PageView};
