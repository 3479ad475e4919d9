pub mod prelude;

pub mod file_access_logs;
pub mod shared_files;
