//! `taskdeck` — local-first task list with cloud sync.

pub mod config;
pub mod feed;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod transfer;
