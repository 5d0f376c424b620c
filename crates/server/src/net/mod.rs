//! TCP front end: the accept loop, the per-session I/O task, and the
//! packet handlers it drives.

pub mod connection;
pub mod handler;
pub mod listener;
