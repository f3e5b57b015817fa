use std::iter::Peekable;

use crate::error::{Error, Result};
use crate::sql::parser::ast::{Projection, StatementKind};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};

pub mod ast;
mod lexer;

/// Statement parser - converts tokens into an AST
///
/// Keywords are case-insensitive, identifiers keep their case and a trailing
/// semicolon is optional.
pub struct Parser<'a> {
    text: &'a str,
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given statement text
    pub fn new(input: &'a str) -> Self {
        Parser { text: input, lexer: Lexer::new(input).peekable() }
    }

    /// Parses the input into a single statement
    pub fn parse(&mut self) -> Result<ast::Statement> {
        let stmt = self.parse_statement()?;
        self.next_if_token(Token::Semicolon);
        // No tokens allowed after the statement
        if let Some(token) = self.peek()? {
            return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
        }
        Ok(stmt)
    }

    /// Classifies the statement by its leading keywords without parsing the body
    ///
    /// Fails with `UnsupportedStatement` when no statement shape matches.
    pub fn statement_kind(&mut self) -> Result<StatementKind> {
        let text = self.text;
        let unsupported = || Error::UnsupportedStatement(text.trim().to_string());
        let first = match self.lexer.next() {
            Some(Ok(Token::Keyword(keyword))) => keyword,
            _ => return Err(unsupported()),
        };
        let second = self.lexer.next().and_then(|t| t.ok());
        Ok(match (first, second) {
            (Keyword::Create, Some(Token::Keyword(Keyword::Database))) => StatementKind::CreateDatabase,
            (Keyword::Create, Some(Token::Keyword(Keyword::Table))) => StatementKind::CreateTable,
            (Keyword::Drop, Some(Token::Keyword(Keyword::Table))) => StatementKind::DropTable,
            (Keyword::Use, _) => StatementKind::Use,
            (Keyword::Insert, _) => StatementKind::Insert,
            (Keyword::Select, _) => StatementKind::Select,
            (Keyword::Update, _) => StatementKind::Update,
            (Keyword::Delete, _) => StatementKind::Delete,
            (Keyword::Begin, _) => StatementKind::Begin,
            (Keyword::Commit, _) => StatementKind::Commit,
            (Keyword::Rollback, _) => StatementKind::Rollback,
            _ => return Err(unsupported()),
        })
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<ast::Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_ddl(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_drop_table(),
            Some(Token::Keyword(Keyword::Use)) => self.parse_use(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(Token::Keyword(Keyword::Begin)) => self.parse_transaction(ast::Statement::Begin),
            Some(Token::Keyword(Keyword::Commit)) => self.parse_transaction(ast::Statement::Commit),
            Some(Token::Keyword(Keyword::Rollback)) => {
                self.parse_transaction(ast::Statement::Rollback)
            }
            Some(_) => Err(Error::UnsupportedStatement(self.text.trim().to_string())),
            None => Err(Error::Parse("[Parser] Unexpected end of input".to_string())),
        }
    }

    /// Parses CREATE DATABASE and CREATE TABLE
    fn parse_ddl(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        match self.next()? {
            Token::Keyword(Keyword::Database) => Ok(ast::Statement::CreateDatabase {
                name: self.next_ident()?,
            }),
            Token::Keyword(Keyword::Table) => self.parse_ddl_create_table(),
            token => Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
        }
    }

    /// Parses CREATE TABLE statement
    fn parse_ddl_create_table(&mut self) -> Result<ast::Statement> {
        let table_name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_ddl_column()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        self.next_expect(Token::CloseParen)?;
        Ok(ast::Statement::CreateTable { name: table_name, columns })
    }

    /// Parses column definition in CREATE TABLE
    fn parse_ddl_column(&mut self) -> Result<ast::Column> {
        let mut column = ast::Column {
            name: self.next_ident()?,
            datatype: self.parse_datatype()?,
            primary_key: false,
            references: None,
            relation: None,
        };

        // Parse column constraints (PK, PRIMARY KEY, REFERENCES t.c ['label'])
        while let Some(Token::Keyword(keyword)) = self.next_if_keyword() {
            match keyword {
                Keyword::Pk => column.primary_key = true,
                Keyword::Primary => {
                    self.next_expect(Token::Keyword(Keyword::Key))?;
                    column.primary_key = true;
                }
                Keyword::References => {
                    let table = self.next_ident()?;
                    self.next_expect(Token::Period)?;
                    let col = self.next_ident()?;
                    column.references = Some((table, col));
                    if let Some(Token::String(label)) = self.next_if(|t| matches!(t, Token::String(_))) {
                        column.relation = Some(Self::relation_label(&label)?);
                    }
                }
                k => return Err(Error::Parse(format!("[Parser] Unexpected keyword {}", k))),
            }
        }

        Ok(column)
    }

    /// Normalizes a relationship label so it fits on one catalog line
    fn relation_label(label: &str) -> Result<String> {
        if label.contains(['\n', '\r', '(', ')']) {
            return Err(Error::Parse(format!(
                "[Parser] Relation label {:?} contains a line break or parenthesis",
                label
            )));
        }
        let words: Vec<&str> = label.split_whitespace().collect();
        if words.is_empty() {
            return Err(Error::Parse("[Parser] Relation label is empty".to_string()));
        }
        Ok(words.join(" "))
    }

    /// Parses a type token such as `int`, `varchar(20)` or `decimal(10,2)`
    fn parse_datatype(&mut self) -> Result<String> {
        let mut datatype = match self.next()? {
            Token::Ident(ident) => ident,
            token => {
                return Err(Error::Parse(format!("[Parser] Expected type, got token {}", token)));
            }
        };
        if self.next_if_token(Token::OpenParen).is_some() {
            let mut args = Vec::new();
            loop {
                match self.next()? {
                    Token::Number(n) => args.push(n),
                    token => {
                        return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                    }
                }
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                    }
                }
            }
            datatype = format!("{}({})", datatype, args.join(","));
        }
        Ok(datatype)
    }

    /// Parses DROP TABLE statement
    fn parse_drop_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Drop))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        Ok(ast::Statement::DropTable { table_name: self.next_ident()? })
    }

    /// Parses USE statement
    fn parse_use(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Use))?;
        Ok(ast::Statement::Use { name: self.next_ident()? })
    }

    /// Parses BEGIN, COMMIT and ROLLBACK
    fn parse_transaction(&mut self, stmt: ast::Statement) -> Result<ast::Statement> {
        self.next()?;
        Ok(stmt)
    }

    /// Parses SELECT statement
    fn parse_select(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;

        let projection = if self.next_if_token(Token::Asterisk).is_some() {
            Projection::All
        } else {
            Projection::Columns(self.parse_ident_list()?)
        };

        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;
        let where_clause = match self.next_if_token(Token::Keyword(Keyword::Where)) {
            Some(_) => Some(self.parse_condition()?),
            None => None,
        };
        Ok(ast::Statement::Select { projection, table_name, where_clause })
    }

    /// Parses INSERT statement
    fn parse_insert(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;
        let table_name = self.next_ident()?;

        self.next_expect(Token::OpenParen)?;
        let columns = self.parse_ident_list()?;
        self.next_expect(Token::CloseParen)?;

        self.next_expect(Token::Keyword(Keyword::Values))?;
        self.next_expect(Token::OpenParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_value()?);
            match self.next()? {
                Token::CloseParen => break,
                Token::Comma => {}
                token => {
                    return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                }
            }
        }

        Ok(ast::Statement::Insert { table_name, columns, values })
    }

    /// Parses UPDATE statement
    fn parse_update(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Update))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Set))?;

        let mut columns: Vec<(String, String)> = Vec::new();
        loop {
            let (col, value) = self.parse_condition()?;
            // Setting the same column twice in one statement is ambiguous
            if columns.iter().any(|(c, _)| c.eq_ignore_ascii_case(&col)) {
                return Err(Error::Parse(format!(
                    "[Parser] Duplicate column {} for update",
                    col
                )));
            }
            columns.push((col, value));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }

        self.next_expect(Token::Keyword(Keyword::Where))?;
        Ok(ast::Statement::Update {
            table_name,
            columns,
            where_clause: self.parse_condition()?,
        })
    }

    /// Parses DELETE statement
    fn parse_delete(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Where))?;
        Ok(ast::Statement::Delete {
            table_name,
            where_clause: self.parse_condition()?,
        })
    }

    /// Parses `column = value`
    fn parse_condition(&mut self) -> Result<(String, String)> {
        let col = self.next_ident()?;
        self.next_expect(Token::Equal)?;
        let value = self.parse_value()?;
        Ok((col, value))
    }

    /// Parses a literal: quoted string, number, or bare word
    fn parse_value(&mut self) -> Result<String> {
        match self.next()? {
            Token::String(s) | Token::Number(s) | Token::Word(s) | Token::Ident(s) => Ok(s),
            t => Err(Error::Parse(format!("[Parser] Unexpected value token {}", t))),
        }
    }

    /// Parses `ident [, ident]*`
    fn parse_ident_list(&mut self) -> Result<Vec<String>> {
        let mut idents = Vec::new();
        loop {
            idents.push(self.next_ident()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(idents)
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer.peek().cloned().transpose()
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .unwrap_or_else(|| Err(Error::Parse("[Parser] Unexpected end of input".to_string())))
    }

    /// Expects and consumes a name
    ///
    /// Keywords are accepted too, since a name position never expects one;
    /// they are taken in lowercase.
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            Token::Keyword(keyword) => Ok(keyword.to_str().to_lowercase()),
            token => Err(Error::Parse(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Parse(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it's a keyword
    fn next_if_keyword(&mut self) -> Option<Token> {
        self.next_if(|t| matches!(t, Token::Keyword(_)))
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Error, Result},
        sql::parser::ast::{self, Projection, Statement, StatementKind},
    };

    use super::Parser;

    #[test]
    fn test_parser_create_table() -> Result<()> {
        let sql1 = "
            create table orders (
                id int pk,
                customer_id int references customers.id 'belongs to',
                note varchar(20)
            );
        ";
        let stmt1 = Parser::new(sql1).parse()?;

        let sql2 = "
        CREATE            TABLE orders (
            id int    PK,
            customer_id int REFERENCES customers . id 'belongs to'   ,
            note    varchar( 20 )
        )
        ";
        let stmt2 = Parser::new(sql2).parse()?;
        assert_eq!(stmt1, stmt2);

        assert_eq!(
            stmt1,
            Statement::CreateTable {
                name: "orders".to_string(),
                columns: vec![
                    ast::Column {
                        name: "id".to_string(),
                        datatype: "int".to_string(),
                        primary_key: true,
                        references: None,
                        relation: None,
                    },
                    ast::Column {
                        name: "customer_id".to_string(),
                        datatype: "int".to_string(),
                        primary_key: false,
                        references: Some(("customers".to_string(), "id".to_string())),
                        relation: Some("belongs to".to_string()),
                    },
                    ast::Column {
                        name: "note".to_string(),
                        datatype: "varchar(20)".to_string(),
                        primary_key: false,
                        references: None,
                        relation: None,
                    },
                ],
            }
        );

        let stmt3 = Parser::new("create table t (id int primary key)").parse()?;
        assert!(matches!(stmt3, Statement::CreateTable { columns, .. } if columns[0].primary_key));

        assert!(Parser::new("create table t ()").parse().is_err());
        assert!(Parser::new("create table t (id)").parse().is_err());
        assert!(Parser::new("create table t (id pk)").parse().is_err());
        Ok(())
    }

    #[test]
    fn test_parser_relation_label() -> Result<()> {
        let label = |sql: &str| -> Result<Option<String>> {
            match Parser::new(sql).parse()? {
                Statement::CreateTable { mut columns, .. } => Ok(columns.remove(0).relation),
                stmt => panic!("unexpected statement {:?}", stmt),
            }
        };
        assert_eq!(label("create table o (c int references t.id '  owned   by ')")?, Some("owned by".into()));
        assert_eq!(label("create table o (c int references t.id)")?, None);

        for sql in [
            "create table o (c int references t.id '')",
            "create table o (c int references t.id '   ')",
            "create table o (c int references t.id 'owned\nby')",
            "create table o (c int references t.id 'a (b)')",
        ] {
            assert!(matches!(Parser::new(sql).parse(), Err(Error::Parse(_))), "{sql:?}");
        }
        Ok(())
    }

    #[test]
    fn test_parser_keywords_as_names() -> Result<()> {
        assert_eq!(
            Parser::new("CREATE TABLE k (key int pk, value varchar, commit int)").parse()?,
            Statement::CreateTable {
                name: "k".to_string(),
                columns: ["key", "value", "commit"]
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ast::Column {
                        name: name.to_string(),
                        datatype: if i == 1 { "varchar" } else { "int" }.to_string(),
                        primary_key: i == 0,
                        references: None,
                        relation: None,
                    })
                    .collect(),
            }
        );
        assert_eq!(
            Parser::new("update k set value = set where key = key").parse()?,
            Statement::Update {
                table_name: "k".to_string(),
                columns: vec![("value".to_string(), "set".to_string())],
                where_clause: ("key".to_string(), "key".to_string()),
            }
        );
        assert_eq!(
            Parser::new("select key, table from k").parse()?,
            Statement::Select {
                projection: Projection::Columns(vec!["key".to_string(), "table".to_string()]),
                table_name: "k".to_string(),
                where_clause: None,
            }
        );
        Ok(())
    }

    #[test]
    fn test_parser_database_statements() -> Result<()> {
        assert_eq!(
            Parser::new("CREATE DATABASE shop;").parse()?,
            Statement::CreateDatabase { name: "shop".to_string() }
        );
        assert_eq!(Parser::new("use shop").parse()?, Statement::Use { name: "shop".to_string() });
        assert_eq!(
            Parser::new("drop table items;").parse()?,
            Statement::DropTable { table_name: "items".to_string() }
        );
        assert_eq!(Parser::new("begin").parse()?, Statement::Begin);
        assert_eq!(Parser::new("COMMIT;").parse()?, Statement::Commit);
        assert_eq!(Parser::new("Rollback").parse()?, Statement::Rollback);
        Ok(())
    }

    #[test]
    fn test_parser_insert() -> Result<()> {
        let stmt = Parser::new("INSERT INTO items (id, name, price) VALUES (1, 'pen', -2.5);").parse()?;
        assert_eq!(
            stmt,
            Statement::Insert {
                table_name: "items".to_string(),
                columns: vec!["id".to_string(), "name".to_string(), "price".to_string()],
                values: vec!["1".to_string(), "pen".to_string(), "-2.5".to_string()],
            }
        );

        let bare = Parser::new("insert into events (id, day, mail) values (7, 2024-01-01, a@b.com)").parse()?;
        assert!(matches!(
            bare,
            Statement::Insert { values, .. } if values == vec!["7", "2024-01-01", "a@b.com"]
        ));
        let bare = Parser::new("delete from events where mail = a@b.com;").parse()?;
        assert!(matches!(
            bare,
            Statement::Delete { where_clause: (_, ref v), .. } if v == "a@b.com"
        ));

        assert!(Parser::new("insert into items values (1, 'pen')").parse().is_err());
        assert!(Parser::new("insert into items (id) values (1, , 2)").parse().is_err());
        assert!(Parser::new("insert into items (id) values (1").parse().is_err());
        Ok(())
    }

    #[test]
    fn test_parser_select() -> Result<()> {
        assert_eq!(
            Parser::new("select * from items;").parse()?,
            Statement::Select {
                projection: Projection::All,
                table_name: "items".to_string(),
                where_clause: None,
            }
        );

        let quoted = Parser::new("SELECT name, id FROM items WHERE name = 'blue pen'").parse()?;
        assert_eq!(
            quoted,
            Statement::Select {
                projection: Projection::Columns(vec!["name".to_string(), "id".to_string()]),
                table_name: "items".to_string(),
                where_clause: Some(("name".to_string(), "blue pen".to_string())),
            }
        );

        let bare = Parser::new("SELECT name FROM items WHERE id=1;").parse()?;
        assert!(matches!(
            bare,
            Statement::Select { where_clause: Some((_, ref v)), .. } if v == "1"
        ));

        assert!(Parser::new("select from items").parse().is_err());
        assert!(Parser::new("select * from items; select * from items").parse().is_err());
        Ok(())
    }

    #[test]
    fn test_parser_update() -> Result<()> {
        let stmt = Parser::new("UPDATE items SET name='ink', price = '3' WHERE id='1';").parse()?;
        assert_eq!(
            stmt,
            Statement::Update {
                table_name: "items".to_string(),
                columns: vec![
                    ("name".to_string(), "ink".to_string()),
                    ("price".to_string(), "3".to_string()),
                ],
                where_clause: ("id".to_string(), "1".to_string()),
            }
        );

        let dup = Parser::new("update items set a='1', A='2' where id='1'").parse();
        assert!(matches!(dup, Err(Error::Parse(_))));
        // exactly one WHERE clause is required
        assert!(Parser::new("update items set a='1'").parse().is_err());
        Ok(())
    }

    #[test]
    fn test_parser_delete() -> Result<()> {
        assert_eq!(
            Parser::new("delete from items where name='pen'").parse()?,
            Statement::Delete {
                table_name: "items".to_string(),
                where_clause: ("name".to_string(), "pen".to_string()),
            }
        );
        assert!(Parser::new("delete from items").parse().is_err());
        Ok(())
    }

    #[test]
    fn test_statement_kind() -> Result<()> {
        assert_eq!(Parser::new("create database x").statement_kind()?, StatementKind::CreateDatabase);
        assert_eq!(Parser::new("CREATE TABLE t (").statement_kind()?, StatementKind::CreateTable);
        assert_eq!(Parser::new("insert garbage").statement_kind()?, StatementKind::Insert);
        assert_eq!(Parser::new("drop table t").statement_kind()?, StatementKind::DropTable);

        for sql in ["alter table t", "drop database x", "", "   ", "42", "create index i"] {
            assert!(
                matches!(Parser::new(sql).statement_kind(), Err(Error::UnsupportedStatement(_))),
                "{sql:?} should be unsupported"
            );
        }
        assert!(matches!(
            Parser::new("truncate items").parse(),
            Err(Error::UnsupportedStatement(_))
        ));
        Ok(())
    }
}
