pub mod list;

pub use list::{BlockRecord, ListBlocksQuery};
