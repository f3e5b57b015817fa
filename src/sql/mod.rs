//! Statement processing module
//!
//! This module provides:
//! - `parser`: lexer and parser
//! - `types`: row encoding and field checks
//! - `schema`: table and column schema definitions
//! - `executor`: statement execution
//! - `engine`: catalog/row store trait, session and transactions

pub mod engine;
pub mod executor;
pub mod parser;
pub mod schema;
pub mod types;
