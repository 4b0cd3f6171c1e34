//! Bookstore service library
//!
//! Holds the service modules and the bootstrap sequence shared by the
//! `bookstore` binary and the CLI.

pub mod app;
pub mod modules;

pub use app::Application;
