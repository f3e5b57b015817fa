use std::fmt::Write;

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Engine,
        schema::{Column, Table},
    },
};

use super::must_database;

/// Renders a SQL script that recreates `db` with its rows
///
/// Tables are emitted after the tables they reference, so the script can be
/// replayed statement by statement.
pub fn dump<E: Engine>(engine: &E, db: &str) -> Result<String> {
    must_database(engine, db)?;
    let mut out = String::new();
    writeln!(out, "CREATE DATABASE {};", db).map_err(fmt_error)?;
    writeln!(out, "USE {};", db).map_err(fmt_error)?;

    for table in dependency_order(engine, db)? {
        out.push('\n');
        write_table(engine, db, &table, &mut out)?;
    }
    Ok(out)
}

fn write_table<E: Engine>(engine: &E, db: &str, table: &Table, out: &mut String) -> Result<()> {
    let columns: Vec<String> = table.columns.iter().map(column_definition).collect();
    writeln!(out, "CREATE TABLE {} (\n    {}\n);", table.name, columns.join(",\n    "))
        .map_err(fmt_error)?;

    let header = table.header().join(", ");
    let mut count = 0;
    for row in engine.scan_rows(db, &table.name)?.skip(1) {
        let values: Vec<String> = row?.iter().map(|v| literal(v)).collect();
        writeln!(out, "INSERT INTO {} ({}) VALUES ({});", table.name, header, values.join(", "))
            .map_err(fmt_error)?;
        count += 1;
    }
    debug!("dumped {} row(s) of {}", count, table.name);
    Ok(())
}

/// Column definition as accepted by CREATE TABLE
fn column_definition(col: &Column) -> String {
    let mut def = format!("{} {}", col.name, col.datatype);
    if col.primary_key {
        def.push_str(" pk");
    }
    if let Some(fk) = &col.references {
        def.push_str(&format!(" references {}.{}", fk.table, fk.column));
        if let Some(rel) = &fk.relation {
            def.push_str(&format!(" {}", literal_string(&rel.label)));
        }
    }
    def
}

/// Plain integers (`-?[0-9]+`) are written bare, everything else single-quoted
fn literal(value: &str) -> String {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        value.to_string()
    } else {
        literal_string(value)
    }
}

fn literal_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Orders tables so that referenced tables come first; cycles keep name order
fn dependency_order<E: Engine>(engine: &E, db: &str) -> Result<Vec<Table>> {
    let mut remaining = engine
        .list_tables(db)?
        .iter()
        .map(|t| engine.must_get_table(db, t))
        .collect::<Result<Vec<_>>>()?;
    let mut ordered: Vec<Table> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|t| {
            t.columns.iter().filter_map(|c| c.references.as_ref()).all(|fk| {
                fk.table == t.name
                    || ordered.iter().any(|o| o.name == fk.table)
                    || !remaining.iter().any(|r| r.name == fk.table)
            })
        });
        ordered.push(remaining.remove(ready.unwrap_or(0)));
    }
    Ok(ordered)
}

fn fmt_error(err: std::fmt::Error) -> Error {
    Error::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{dump, literal};
    use crate::{
        error::{Error, Result},
        sql::{
            engine::{Context, FlatEngine, Session},
            executor::ResultSet,
        },
        storage::memory::MemoryEngine,
    };

    fn session() -> Result<Session<FlatEngine<MemoryEngine>>> {
        Session::new(FlatEngine::new(MemoryEngine::new()), Context::new("relates to"))
    }

    #[test]
    fn test_dump() -> Result<()> {
        let mut s = session()?;
        for sql in [
            "CREATE DATABASE shop",
            "USE shop",
            "CREATE TABLE customers (id int pk, name varchar(20))",
            "CREATE TABLE ab_orders (id int pk, customer_id int references customers.id 'belongs to')",
            "INSERT INTO customers (id, name) VALUES (1, 'O''Brien')",
            "INSERT INTO ab_orders (id, customer_id) VALUES (10, 1)",
        ] {
            s.execute(sql)?;
        }

        let script = dump(s.engine(), "shop")?;
        assert_eq!(
            script,
            "CREATE DATABASE shop;\n\
             USE shop;\n\
             \n\
             CREATE TABLE customers (\n    id int pk,\n    name varchar(20)\n);\n\
             INSERT INTO customers (id, name) VALUES (1, 'O''Brien');\n\
             \n\
             CREATE TABLE ab_orders (\n    id int pk,\n    customer_id int references customers.id 'belongs to'\n);\n\
             INSERT INTO ab_orders (id, customer_id) VALUES (10, 1);\n"
        );

        // the script recreates the same database elsewhere
        let mut copy = session()?;
        for stmt in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            copy.execute(stmt)?;
        }
        assert_eq!(dump(copy.engine(), "shop")?, script);
        assert!(matches!(
            copy.execute("SELECT name FROM customers")?,
            ResultSet::Select { rows, .. } if rows == vec![vec!["O'Brien".to_string()]]
        ));
        Ok(())
    }

    #[test]
    fn test_literal() {
        assert_eq!(literal("42"), "42");
        assert_eq!(literal("-7"), "-7");
        assert_eq!(literal("+5"), "'+5'");
        assert_eq!(literal("-"), "'-'");
        assert_eq!(literal("2024-01-01"), "'2024-01-01'");
        assert_eq!(literal(""), "''");
    }

    #[test]
    fn test_dump_unknown_database() -> Result<()> {
        let s = session()?;
        assert!(matches!(dump(s.engine(), "shop"), Err(Error::NotFound(_))));
        Ok(())
    }
}
