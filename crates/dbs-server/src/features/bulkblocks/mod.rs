pub mod commands;
pub mod routes;

pub use commands::InsertBulkBlockCommand;

pub use routes::bulkblocks_routes;
