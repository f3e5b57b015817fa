use std::fmt::Display;

use crate::{
    error::{Error, Result},
    sql::types::{column_position, Row},
};

/// Table schema definition
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Validates table schema
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::Parse(format!("table {} has no columns", self.name)));
        }

        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name.eq_ignore_ascii_case(&col.name)) {
                return Err(Error::Parse(format!(
                    "duplicate column {} in table {}",
                    col.name, self.name
                )));
            }
        }

        if self.columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(Error::Parse(format!(
                "multiple primary keys for table {}",
                self.name
            )));
        }

        Ok(())
    }

    /// Returns the primary key column, if one is declared
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Returns the column index for a given column name (case-insensitive)
    pub fn get_col_index(&self, col_name: &str) -> Result<usize> {
        column_position(&self.header(), col_name)
            .ok_or_else(|| Error::NotFound(format!("column {} in table {}", col_name, self.name)))
    }

    /// The ordered column names, i.e. the first line of the row store
    pub fn header(&self) -> Row {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Encodes the schema as catalog lines, terminated by a blank separator
    pub fn to_metadata(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        lines.push(String::new());
        lines
    }

    /// Decodes catalog lines; blank lines are separators and are skipped
    pub fn from_metadata<I>(name: &str, lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let columns = lines
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| Column::parse(&l))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name: name.to_string(), columns })
    }
}

/// Column schema definition
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Declared type token, kept as written (e.g. `int`, `varchar(20)`)
    pub datatype: String,
    /// Whether this column is the primary key
    pub primary_key: bool,
    pub references: Option<ForeignKey>,
}

/// Foreign key declared on a column
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub relation: Option<Relation>,
}

/// Relationship descriptor recorded next to a foreign key,
/// e.g. `(Relation: orders 1-to-N customers)`
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub from: String,
    pub label: String,
    pub to: String,
}

impl Column {
    /// Parses one catalog line:
    /// `<name> <type> [pk] [references <table>.<column> [(Relation: <a> <label> <b>)]]`
    pub fn parse(line: &str) -> Result<Self> {
        let (def, relation) = match line.find("(Relation:") {
            Some(pos) => (&line[..pos], Some(Relation::parse(&line[pos..])?)),
            None => (line, None),
        };

        let mut parts = def.split_whitespace();
        let (Some(name), Some(datatype)) = (parts.next(), parts.next()) else {
            return Err(Error::Internal(format!("malformed column definition: {}", line)));
        };

        let mut column = Column {
            name: name.to_string(),
            datatype: datatype.to_string(),
            primary_key: false,
            references: None,
        };

        while let Some(part) = parts.next() {
            if part.eq_ignore_ascii_case("pk") {
                column.primary_key = true;
            } else if part.eq_ignore_ascii_case("references") {
                let target = parts.next().unwrap_or_default();
                let Some((table, col)) = target.split_once('.') else {
                    return Err(Error::Internal(format!("malformed reference in: {}", line)));
                };
                column.references = Some(ForeignKey {
                    table: table.to_string(),
                    column: col.to_string(),
                    relation: None,
                });
            } else {
                return Err(Error::Internal(format!(
                    "unexpected token {} in column definition: {}",
                    part, line
                )));
            }
        }

        match (&mut column.references, relation) {
            (Some(fk), relation) => fk.relation = relation,
            (None, Some(_)) => {
                return Err(Error::Internal(format!("relation without reference: {}", line)));
            }
            (None, None) => {}
        }
        Ok(column)
    }
}

impl Relation {
    fn parse(text: &str) -> Result<Self> {
        let malformed = || Error::Internal(format!("malformed relation: {}", text));
        let inner = text
            .trim()
            .strip_prefix("(Relation:")
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let words: Vec<&str> = inner.split_whitespace().collect();
        if words.len() < 3 {
            return Err(malformed());
        }
        Ok(Self {
            from: words[0].to_string(),
            label: words[1..words.len() - 1].join(" "),
            to: words[words.len() - 1].to_string(),
        })
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.datatype)?;
        if self.primary_key {
            write!(f, " pk")?;
        }
        if let Some(fk) = &self.references {
            write!(f, " references {}.{}", fk.table, fk.column)?;
            if let Some(rel) = &fk.relation {
                write!(f, " {}", rel)?;
            }
        }
        Ok(())
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(Relation: {} {} {})", self.from, self.label, self.to)
    }
}
