use tracing::info;

use crate::{
    error::{Error, Result},
    sql::{
        engine::{Context, Engine},
        executor::{Executor, ResultSet},
        parser::ast,
        schema::{Column, ForeignKey, Relation, Table},
    },
};

/// CREATE DATABASE executor
pub struct CreateDatabase {
    name: String,
}

impl CreateDatabase {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl<E: Engine> Executor<E> for CreateDatabase {
    fn execute(self: Box<Self>, engine: &mut E, _ctx: &mut Context) -> Result<ResultSet> {
        engine.create_database(&self.name)?;
        info!("database {} created", self.name);
        Ok(ResultSet::CreateDatabase { name: self.name })
    }
}

/// CREATE TABLE executor
pub struct CreateTable {
    name: String,
    columns: Vec<ast::Column>,
}

impl CreateTable {
    pub fn new(name: String, columns: Vec<ast::Column>) -> Box<Self> {
        Box::new(Self { name, columns })
    }
}

impl<E: Engine> Executor<E> for CreateTable {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        let db = ctx.must_database()?;
        let name = self.name;
        // Each reference carries a relation descriptor: <this> <label> <referenced>
        let columns = self
            .columns
            .into_iter()
            .map(|c| Column {
                references: c.references.map(|(table, column)| ForeignKey {
                    relation: Some(Relation {
                        from: name.clone(),
                        label: c.relation.unwrap_or_else(|| ctx.default_relation.clone()),
                        to: table.clone(),
                    }),
                    table,
                    column,
                }),
                name: c.name,
                datatype: c.datatype,
                primary_key: c.primary_key,
            })
            .collect();

        engine.create_table(db, Table { name: name.clone(), columns })?;
        info!("table {} created in {}", name, db);
        Ok(ResultSet::CreateTable { table_name: name })
    }
}

/// USE executor, switches the active database
pub struct Use {
    name: String,
}

impl Use {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl<E: Engine> Executor<E> for Use {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        if !engine.database_exists(&self.name) {
            return Err(Error::NotFound(format!("database {}", self.name)));
        }
        ctx.database = Some(self.name.clone());
        Ok(ResultSet::Use { database: self.name })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    table_name: String,
}

impl DropTable {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl<E: Engine> Executor<E> for DropTable {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        let db = ctx.must_database()?;
        engine.drop_table(db, &self.table_name)?;
        info!("table {} dropped from {}", self.table_name, db);
        Ok(ResultSet::DropTable { table_name: self.table_name })
    }
}
