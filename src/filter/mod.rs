pub mod error;
pub mod filter;
pub mod filter_order;
pub mod page;
pub mod scope;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use page::{Page, Pagination};
pub use scope::Scope;
pub use types::*;
