//! # VFR Core
//!
//! Process-level entry point of the Virtual File Repository.
//!
//! This crate resolves configuration once at startup ([`ManagerConfig`]) and hands out
//! [`vfr_files::Repository`] handles through a [`RepositoryManager`]. All storage behaviour lives
//! in `vfr_files`; this crate only decides where repositories live and which quota defaults apply.
//!
//! **No presentation concerns**: argument parsing and output formatting belong in `vfr-cli`.

pub mod config;
pub mod constants;
mod error;
mod manager;

pub use config::ManagerConfig;
pub use error::{CoreError, CoreResult};
pub use manager::RepositoryManager;
