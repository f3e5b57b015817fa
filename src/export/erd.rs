use std::collections::HashSet;

use crate::{
    error::Result,
    sql::{engine::Engine, schema::Table},
};

use super::must_database;

const SEPARATOR: &str = "***************************";

/// Renders the entity-relationship report of `db`
///
/// ```text
/// Table : orders
/// Cardinality : customers 1-to-N orders
///     id int pk
///     customer_id int references customers.id (Relation: orders places customers)
/// ***************************
/// ```
pub fn erd<E: Engine>(engine: &E, db: &str) -> Result<String> {
    must_database(engine, db)?;
    let mut out = String::new();
    for name in engine.list_tables(db)? {
        let table = engine.must_get_table(db, &name)?;
        out.push_str(&format!("Table : {}\n", table.name));
        for (i, col) in table.columns.iter().enumerate() {
            if let Some(fk) = &col.references {
                out.push_str(&format!(
                    "Cardinality : {} {} {}\n",
                    fk.table,
                    cardinality(engine, db, &table, i)?,
                    table.name
                ));
            }
        }
        for col in &table.columns {
            out.push_str(&format!("\t{}\n", col));
        }
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    Ok(out)
}

/// 1-to-N when the referencing column repeats a value, otherwise 1-to-1
fn cardinality<E: Engine>(engine: &E, db: &str, table: &Table, column: usize) -> Result<&'static str> {
    let mut seen = HashSet::new();
    for row in engine.scan_rows(db, &table.name)?.skip(1) {
        if let Some(value) = row?.get(column) {
            if !seen.insert(value.clone()) {
                return Ok("1-to-N");
            }
        }
    }
    Ok("1-to-1")
}
