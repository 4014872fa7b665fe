pub mod queries;
pub mod routes;

pub use queries::{
    FileChildRecord, FileChildrenQuery, FileLumiRecord, FileLumisQuery, FileParentRecord,
    FileParentsQuery, FileRecord, ListFilesQuery,
};

pub use routes::files_routes;
