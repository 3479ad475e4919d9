pub use super::file_access_logs::Entity as FileAccessLogs;
pub use super::shared_files::Entity as SharedFiles;
