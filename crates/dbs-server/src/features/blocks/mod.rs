pub mod queries;
pub mod routes;

pub use queries::{BlockRecord, ListBlocksQuery};

pub use routes::blocks_routes;
