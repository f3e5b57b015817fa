//! SQL Lexer - Tokenizes statement text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::Chars};

use crate::error::{Error, Result};

/// Represents a single lexical token in the statement text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Reserved keyword
    Keyword(Keyword),
    /// Identifier such as a database, table or column name (case preserved)
    Ident(String),
    /// String literal, quotes stripped
    String(String),
    /// Numeric literal, kept as written
    Number(String),
    /// Unquoted value such as `2024-01-01` or `a@b.com`
    Word(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Asterisk,
    Period,
    Equal,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Token::Keyword(keyword) => keyword.to_str(),
            Token::Ident(ident) => ident,
            Token::String(v) => v,
            Token::Number(n) => n,
            Token::Word(w) => w,
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Asterisk => "*",
            Token::Period => ".",
            Token::Equal => "=",
        })
    }
}

/// Reserved keywords
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keyword {
    // DDL keywords
    Create,
    Database,
    Table,
    Drop,
    Use,
    // DML keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    // Constraint keywords
    Pk,
    Primary,
    Key,
    References,
    // Transaction control
    Begin,
    Commit,
    Rollback,
}

impl Keyword {
    /// Attempts to parse a string as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_uppercase().as_ref() {
            "CREATE" => Keyword::Create,
            "DATABASE" => Keyword::Database,
            "TABLE" => Keyword::Table,
            "DROP" => Keyword::Drop,
            "USE" => Keyword::Use,
            "SELECT" => Keyword::Select,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DELETE" => Keyword::Delete,
            "PK" => Keyword::Pk,
            "PRIMARY" => Keyword::Primary,
            "KEY" => Keyword::Key,
            "REFERENCES" => Keyword::References,
            "BEGIN" => Keyword::Begin,
            "COMMIT" => Keyword::Commit,
            "ROLLBACK" => Keyword::Rollback,
            _ => return None,
        })
    }

    /// Returns the uppercase string representation of the keyword
    pub fn to_str(&self) -> &'static str {
        match self {
            Keyword::Create => "CREATE",
            Keyword::Database => "DATABASE",
            Keyword::Table => "TABLE",
            Keyword::Drop => "DROP",
            Keyword::Use => "USE",
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Delete => "DELETE",
            Keyword::Pk => "PK",
            Keyword::Primary => "PRIMARY",
            Keyword::Key => "KEY",
            Keyword::References => "REFERENCES",
            Keyword::Begin => "BEGIN",
            Keyword::Commit => "COMMIT",
            Keyword::Rollback => "ROLLBACK",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Lexical analyzer
///
/// Tracks whether the next token sits in value position, i.e. right after
/// `=` or inside the parentheses of a VALUES list. There any run of
/// characters up to whitespace or `,;()='` is a single bare value.
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
    values_pending: bool,
    in_values: bool,
    expect_value: bool,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(token)) => {
                self.track_position(&token);
                Some(Ok(token))
            }
            Ok(None) => self
                .iter
                .peek()
                .map(|c| Err(Error::Parse(format!("[Lexer] Unexpected character {}", c)))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given statement text
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.chars().peekable(),
            values_pending: false,
            in_values: false,
            expect_value: false,
        }
    }

    /// Updates the value-position state after emitting `token`
    fn track_position(&mut self, token: &Token) {
        self.expect_value = match token {
            Token::Equal => true,
            Token::OpenParen if self.values_pending => {
                self.in_values = true;
                true
            }
            Token::Comma => self.in_values,
            Token::CloseParen => {
                self.in_values = false;
                false
            }
            _ => false,
        };
        self.values_pending = *token == Token::Keyword(Keyword::Values);
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Peeks and consumes if the character maps to a token (for single-char tokens)
    fn next_if_token<F: Fn(char) -> Option<Token>>(&mut self, predicate: F) -> Option<Token> {
        let token = self.iter.peek().and_then(|c| predicate(*c))?;
        self.iter.next();
        Some(token)
    }

    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        if self.expect_value {
            if let Some(word) = self.scan_bare_value() {
                return Ok(Some(word));
            }
        }
        match self.iter.peek() {
            Some('\'') => self.scan_string(),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Scans an unquoted value; plain integers stay numbers
    fn scan_bare_value(&mut self) -> Option<Token> {
        let word = self.next_while(|c| !c.is_whitespace() && !",;()='".contains(c))?;
        if word.chars().all(|c| c.is_ascii_digit()) {
            return Some(Token::Number(word));
        }
        Some(Token::Word(word))
    }

    /// Scans a string literal (enclosed in single quotes, `''` escapes a quote)
    fn scan_string(&mut self) -> Result<Option<Token>> {
        self.iter.next();
        let mut val = String::new();

        loop {
            match self.iter.next() {
                Some('\'') if self.next_if(|c| c == '\'').is_some() => val.push('\''),
                Some('\'') => break,
                Some(c) => val.push(c),
                None => return Err(Error::Parse("[Lexer] Unexpected end of string".to_string())),
            }
        }
        Ok(Some(Token::String(val)))
    }

    /// Scans a numeric literal (integer or decimal)
    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        Some(Token::Number(val))
    }

    /// Scans an identifier or keyword
    fn scan_ident(&mut self) -> Option<Token> {
        let mut val = self.next_if(|c| c.is_alphabetic() || c == '_')?.to_string();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_') {
            val.push(c);
        }
        Some(Keyword::from_str(&val).map_or(Token::Ident(val), Token::Keyword))
    }

    /// Scans a single-character symbol token
    fn scan_symbol(&mut self) -> Option<Token> {
        self.next_if_token(|c| match c {
            '*' => Some(Token::Asterisk),
            '(' => Some(Token::OpenParen),
            ')' => Some(Token::CloseParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '.' => Some(Token::Period),
            '=' => Some(Token::Equal),
            _ => None,
        })
    }
}
