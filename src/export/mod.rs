//! Read-only reports over a stored database
//!
//! - `dump`: SQL script that recreates the database
//! - `erd`: entity-relationship text report

pub mod dump;
pub mod erd;

pub use dump::dump;
pub use erd::erd;

use crate::{
    error::{Error, Result},
    sql::engine::Engine,
};

fn must_database<E: Engine>(engine: &E, db: &str) -> Result<()> {
    if !engine.database_exists(db) {
        return Err(Error::NotFound(format!("database {}", db)));
    }
    Ok(())
}
