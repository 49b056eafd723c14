//! Todotree library
//!
//! Multi-tenant hierarchical todo lists (todo, task, subtask) served over
//! HTTP, with interchangeable storage backends. Exposed as a library for
//! integration testing.

pub mod api;
pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod tree;
