pub mod insert;

pub use insert::InsertBulkBlockCommand;
