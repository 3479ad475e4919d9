pub mod access_gate;
pub mod access_log;
pub mod file_repository;
pub mod share_service;
pub mod storage;
pub mod sweeper;
