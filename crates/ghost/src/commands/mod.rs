//! Command implementations that operate on the filesystem before any storage exists.

pub mod init;
