pub mod config;
pub mod error;
pub mod format;
pub mod qc;
pub mod storage;
pub mod timing;
