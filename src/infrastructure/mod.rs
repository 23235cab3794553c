pub mod downloader;
pub mod redis;
pub mod storage;
