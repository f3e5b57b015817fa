//! flatdb - A flat-file relational store in Rust
//!
//! This crate provides a minimal SQL-like store with:
//! - statement parsing (lexer, parser, AST)
//! - a schema catalog and row store kept as delimited text files
//! - statement execution with key and reference checks
//! - deferred-log transactions with commit replay
//! - pluggable storage engines (disk and memory)
//! - SQL dump and ERD reports

pub mod config;
pub mod error;
pub mod export;
pub mod sql;
pub mod storage;
