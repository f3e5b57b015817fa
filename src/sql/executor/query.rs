use crate::{
    error::Result,
    sql::{
        engine::{Context, Engine},
        executor::{mutation::matches, Executor, ResultSet},
        parser::ast::Projection,
    },
};

/// SELECT executor: full scan, optional equality filter, projection
pub struct Select {
    table_name: String,
    projection: Projection,
    filter: Option<(String, String)>,
}

impl Select {
    pub fn new(
        table_name: String,
        projection: Projection,
        filter: Option<(String, String)>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            projection,
            filter,
        })
    }
}

impl<E: Engine> Executor<E> for Select {
    fn execute(self: Box<Self>, engine: &mut E, ctx: &mut Context) -> Result<ResultSet> {
        let db = ctx.must_database()?;
        let table = engine.must_get_table(db, &self.table_name)?;

        let indexes = match &self.projection {
            Projection::All => (0..table.columns.len()).collect::<Vec<_>>(),
            Projection::Columns(cols) => cols
                .iter()
                .map(|c| engine.find_column_index(db, &self.table_name, c))
                .collect::<Result<Vec<_>>>()?,
        };
        let filter = match &self.filter {
            Some((field, value)) => {
                Some((engine.find_column_index(db, &self.table_name, field)?, value.as_str()))
            }
            None => None,
        };

        let mut rows = Vec::new();
        for row in engine.scan_rows(db, &self.table_name)?.skip(1) {
            let row = row?;
            if let Some((i, value)) = filter {
                if !matches(&row, i, value) {
                    continue;
                }
            }
            rows.push(
                indexes
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect(),
            );
        }

        Ok(ResultSet::Select {
            columns: indexes
                .iter()
                .filter_map(|&i| table.columns.get(i).map(|c| c.name.clone()))
                .collect(),
            rows,
        })
    }
}
