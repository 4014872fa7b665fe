pub mod children;
pub mod list;
pub mod lumis;
pub mod parents;

pub use children::{FileChildRecord, FileChildrenQuery};
pub use list::{FileRecord, ListFilesQuery};
pub use lumis::{FileLumiRecord, FileLumisQuery};
pub use parents::{FileParentRecord, FileParentsQuery};

use crate::error::{AppError, AppResult};

/// The `logical_file_name` parameter the lineage and lumi queries require.
pub(crate) fn required_lfn(lfn: &str) -> AppResult<()> {
    if lfn.trim().is_empty() {
        return Err(AppError::BadRequest("logical_file_name is required".to_string()));
    }
    Ok(())
}
