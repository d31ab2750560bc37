//! Recursive-descent SQL parser implementation.

use super::error::ParseError;
use super::pratt::{infix_binding_power, token_to_binary_op};
use crate::ast::{
    AlterDatabaseStatement, CreateDatabaseStatement, DeleteStatement, DropDatabaseStatement, Expr,
    FieldRef, InsertStatement, JoinClause, JoinType, Literal, SelectColumn, SelectStatement,
    Statement, UpdateAssignment, UpdateStatement, UseDatabaseStatement,
};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Recursive-descent SQL parser with a Pratt expression parser for the
/// WHERE-clause precedence chain (OR, AND, comparison, atom).
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::new(TokenKind::Eof, Span::default()),
        }
    }

    /// Parses a single SQL statement, consuming an optional trailing
    /// semicolon.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` naming the offending token when the
    /// grammar is violated.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let stmt = match &self.current.kind {
            TokenKind::Keyword(Keyword::Select) => {
                Statement::Select(self.parse_select_statement()?)
            }
            TokenKind::Keyword(Keyword::Insert) => {
                Statement::Insert(self.parse_insert_statement()?)
            }
            TokenKind::Keyword(Keyword::Update) => {
                Statement::Update(self.parse_update_statement()?)
            }
            TokenKind::Keyword(Keyword::Delete) => {
                Statement::Delete(self.parse_delete_statement()?)
            }
            TokenKind::Keyword(Keyword::Create) => self.parse_create_database()?,
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop_database()?,
            TokenKind::Keyword(Keyword::Alter) => self.parse_alter_database()?,
            TokenKind::Keyword(Keyword::Use) => self.parse_use_database()?,
            _ => {
                return Err(ParseError::unexpected(
                    "SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, ALTER, or USE",
                    self.current.kind.clone(),
                    self.current.span,
                ));
            }
        };

        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }

        Ok(stmt)
    }

    // ---- DDL ------------------------------------------------------

    fn parse_create_database(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Database)?;
        let name = self.expect_identifier()?;
        Ok(Statement::CreateDatabase(CreateDatabaseStatement { name }))
    }

    fn parse_drop_database(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Database)?;
        let name = self.expect_identifier()?;
        Ok(Statement::DropDatabase(DropDatabaseStatement { name }))
    }

    fn parse_alter_database(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Alter)?;
        self.expect_keyword(Keyword::Database)?;
        let name = self.expect_identifier()?;
        self.expect_keyword(Keyword::Rename)?;
        self.expect_keyword(Keyword::To)?;
        let new_name = self.expect_identifier()?;
        Ok(Statement::AlterDatabase(AlterDatabaseStatement {
            name,
            new_name,
        }))
    }

    fn parse_use_database(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Use)?;
        self.expect_keyword(Keyword::Database)?;
        let name = self.expect_identifier()?;
        Ok(Statement::UseDatabase(UseDatabaseStatement { name }))
    }

    // ---- SELECT -----------------------------------------------------

    fn parse_select_statement(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let columns = self.parse_select_columns()?;
        self.expect_keyword(Keyword::From)?;
        let from = self.expect_identifier()?;

        let mut joins = Vec::new();
        while self.starts_join() {
            joins.push(self.parse_join_clause()?);
        }

        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        Ok(SelectStatement {
            columns,
            from,
            joins,
            where_clause,
        })
    }

    fn parse_select_columns(&mut self) -> Result<Vec<SelectColumn>, ParseError> {
        if self.check(&TokenKind::Star) {
            self.advance();
            return Ok(vec![SelectColumn::All]);
        }

        let mut columns = vec![SelectColumn::Field(self.parse_field_ref()?)];
        while self.check(&TokenKind::Comma) {
            self.advance();
            columns.push(SelectColumn::Field(self.parse_field_ref()?));
        }
        Ok(columns)
    }

    fn parse_field_ref(&mut self) -> Result<FieldRef, ParseError> {
        let first = self.expect_identifier()?;
        if self.check(&TokenKind::Dot) {
            self.advance();
            let column = self.expect_identifier()?;
            Ok(FieldRef::qualified(first, column))
        } else {
            Ok(FieldRef::unqualified(first))
        }
    }

    fn starts_join(&self) -> bool {
        matches!(
            &self.current.kind,
            TokenKind::Keyword(
                Keyword::Join | Keyword::Inner | Keyword::Left | Keyword::Right | Keyword::Full
            )
        )
    }

    fn parse_join_clause(&mut self) -> Result<JoinClause, ParseError> {
        let join_type = match &self.current.kind {
            TokenKind::Keyword(Keyword::Join) => JoinType::Inner,
            TokenKind::Keyword(Keyword::Inner) => {
                self.advance();
                JoinType::Inner
            }
            TokenKind::Keyword(Keyword::Left) => {
                self.advance();
                JoinType::Left
            }
            TokenKind::Keyword(Keyword::Right) => {
                self.advance();
                JoinType::Right
            }
            TokenKind::Keyword(Keyword::Full) => {
                self.advance();
                JoinType::Full
            }
            _ => {
                return Err(ParseError::unexpected(
                    "INNER, LEFT, RIGHT, FULL, or JOIN",
                    self.current.kind.clone(),
                    self.current.span,
                ));
            }
        };

        if self.check_keyword(Keyword::Outer) {
            self.advance();
        }
        self.expect_keyword(Keyword::Join)?;
        let table = self.expect_identifier()?;
        self.expect_keyword(Keyword::On)?;
        let on = self.parse_expression(0)?;

        Ok(JoinClause {
            join_type,
            table,
            on,
        })
    }

    // ---- INSERT -------------------------------------------------------

    fn parse_insert_statement(&mut self) -> Result<InsertStatement, ParseError> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier()?;

        let columns = if self.check(&TokenKind::LeftParen) {
            self.advance();
            let mut cols = vec![self.expect_identifier()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                cols.push(self.expect_identifier()?);
            }
            self.expect(&TokenKind::RightParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        self.expect(&TokenKind::LeftParen)?;
        let mut values = vec![self.parse_literal_expr()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            values.push(self.parse_literal_expr()?);
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(InsertStatement {
            table,
            columns,
            values,
        })
    }

    // ---- UPDATE -------------------------------------------------------

    fn parse_update_statement(&mut self) -> Result<UpdateStatement, ParseError> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.expect_identifier()?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = vec![self.parse_update_assignment()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            assignments.push(self.parse_update_assignment()?);
        }

        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
        })
    }

    fn parse_update_assignment(&mut self) -> Result<UpdateAssignment, ParseError> {
        let column = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_literal_expr()?;
        Ok(UpdateAssignment { column, value })
    }

    // ---- DELETE -------------------------------------------------------

    fn parse_delete_statement(&mut self) -> Result<DeleteStatement, ParseError> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_identifier()?;

        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    // ---- Expressions ----------------------------------------------------

    /// Parses a WHERE-clause expression using Pratt precedence climbing.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_atom()?;

        loop {
            let (l_bp, r_bp) = match infix_binding_power(&self.current.kind) {
                Some(bp) => bp,
                None => break,
            };
            if l_bp < min_bp {
                break;
            }
            let Some(op) = token_to_binary_op(&self.current.kind) else {
                break;
            };
            self.advance();
            let rhs = self.parse_expression(r_bp)?;
            lhs = Expr::Binary {
                left: Box::new(lhs),
                op,
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    /// Parses an atom: literal, identifier, qualified identifier,
    /// parenthesized expression, or typed literal.
    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();

        match &token.kind {
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Identifier(_) => {
                let field = self.parse_field_ref()?;
                Ok(Expr::Field(field, token.span))
            }
            _ => self.parse_literal_expr(),
        }
    }

    /// Parses a literal, including typed literals (`DATE`/`TIME`/`EMAIL`).
    /// Used both by WHERE-clause atoms and by INSERT/UPDATE literal
    /// positions.
    fn parse_literal_expr(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();

        let literal = match &token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Literal::Integer(*n)
            }
            TokenKind::Float(f) => {
                self.advance();
                Literal::Float(*f)
            }
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Literal::String(value)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Literal::Boolean(true)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Literal::Boolean(false)
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Literal::Null
            }
            TokenKind::Keyword(Keyword::Date) => {
                self.advance();
                let raw = self.expect_string_literal("DATE")?;
                validate_date(&raw)
                    .map_err(|reason| {
                        ParseError::invalid_typed_literal("DATE", raw.clone(), reason, token.span)
                    })
                    .map(|()| Literal::Date(raw))?
            }
            TokenKind::Keyword(Keyword::Time) => {
                self.advance();
                let raw = self.expect_string_literal("TIME")?;
                validate_time(&raw)
                    .map_err(|reason| {
                        ParseError::invalid_typed_literal("TIME", raw.clone(), reason, token.span)
                    })
                    .map(|()| Literal::Time(raw))?
            }
            TokenKind::Keyword(Keyword::Email) => {
                self.advance();
                let raw = self.expect_string_literal("EMAIL")?;
                validate_email(&raw)
                    .map_err(|reason| {
                        ParseError::invalid_typed_literal("EMAIL", raw.clone(), reason, token.span)
                    })
                    .map(|()| Literal::Email(raw))?
            }
            _ => {
                return Err(ParseError::unexpected(
                    "a literal",
                    token.kind,
                    token.span,
                ));
            }
        };

        Ok(Expr::Literal(literal))
    }

    fn expect_string_literal(&mut self, introducer: &'static str) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(ParseError::unexpected(
                format!("a string literal after {introducer}"),
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    // ---- Token-stream helpers -------------------------------------------

    fn advance(&mut self) {
        self.previous = core::mem::replace(&mut self.current, self.lexer.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current.kind) == core::mem::discriminant(kind)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current.kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                format!("{kind:?}"),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                keyword.as_str(),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::unexpected(
                "identifier",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }
}

/// Validates `YYYY-MM-DD`.
pub(crate) fn validate_date(s: &str) -> Result<(), String> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err("expected YYYY-MM-DD".to_string());
    }
    let year = &s[0..4];
    let month = &s[5..7];
    let day = &s[8..10];
    if !year.bytes().all(|b| b.is_ascii_digit())
        || !month.bytes().all(|b| b.is_ascii_digit())
        || !day.bytes().all(|b| b.is_ascii_digit())
    {
        return Err("expected YYYY-MM-DD".to_string());
    }
    let month_n: u32 = month.parse().unwrap_or(0);
    let day_n: u32 = day.parse().unwrap_or(0);
    if !(1..=12).contains(&month_n) {
        return Err(format!("month {month_n} out of range"));
    }
    if !(1..=31).contains(&day_n) {
        return Err(format!("day {day_n} out of range"));
    }
    Ok(())
}

/// Validates `HH:MM[:SS]`.
pub(crate) fn validate_time(s: &str) -> Result<(), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err("expected HH:MM[:SS]".to_string());
    }
    for (i, part) in parts.iter().enumerate() {
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err("expected HH:MM[:SS]".to_string());
        }
        let n: u32 = part.parse().unwrap_or(99);
        let max = if i == 0 { 23 } else { 59 };
        if n > max {
            return Err(format!("component {n} out of range"));
        }
    }
    Ok(())
}

/// Validates `local@domain` where `domain` contains a `.`.
pub(crate) fn validate_email(s: &str) -> Result<(), String> {
    let Some((local, domain)) = s.split_once('@') else {
        return Err("missing '@'".to_string());
    };
    if local.is_empty() || domain.is_empty() {
        return Err("empty local or domain part".to_string());
    }
    if !domain.contains('.') {
        return Err("domain missing '.'".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn parse(sql: &str) -> Result<Statement, ParseError> {
        Parser::new(sql).parse_statement()
    }

    #[test]
    fn test_simple_select() {
        let stmt = parse("SELECT id, name FROM users").unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }

    #[test]
    fn test_select_star() {
        let stmt = parse("SELECT * FROM users").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected select");
        };
        assert_eq!(select.columns, vec![SelectColumn::All]);
    }

    #[test]
    fn test_select_with_where() {
        let stmt = parse("SELECT * FROM users WHERE id = 1").unwrap();
        if let Statement::Select(select) = stmt {
            assert!(select.where_clause.is_some());
        } else {
            panic!("Expected SELECT statement");
        }
    }

    #[test]
    fn test_select_with_qualified_columns_and_join() {
        let stmt =
            parse("SELECT users.username, orders.product FROM users LEFT JOIN orders ON users.id = orders.user_id")
                .unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected select");
        };
        assert_eq!(select.joins.len(), 1);
        assert_eq!(select.joins[0].join_type, JoinType::Left);
        assert_eq!(select.joins[0].table, "orders");
    }

    #[test]
    fn test_bare_join_is_inner() {
        let stmt = parse("SELECT * FROM a JOIN b ON a.id = b.a_id").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected select");
        };
        assert_eq!(select.joins[0].join_type, JoinType::Inner);
    }

    #[test]
    fn test_left_outer_join() {
        let stmt = parse("SELECT * FROM a LEFT OUTER JOIN b ON a.id = b.a_id").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected select");
        };
        assert_eq!(select.joins[0].join_type, JoinType::Left);
    }

    #[test]
    fn test_expression_precedence_or_and_comparison() {
        // a = 1 AND b = 2 OR c = 3  =>  (a=1 AND b=2) OR (c=3)
        let stmt = parse("SELECT * FROM t WHERE a = 1 AND b = 2 OR c = 3").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected select");
        };
        let Some(Expr::Binary { op, left, .. }) = select.where_clause else {
            panic!("expected top-level binary expr");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(
            *left,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_insert_values() {
        let stmt = parse("INSERT INTO users (name, email) VALUES ('Alice', 'alice@example.com')")
            .unwrap();
        if let Statement::Insert(insert) = stmt {
            assert_eq!(insert.table, "users");
            assert_eq!(insert.columns, Some(vec!["name".to_string(), "email".to_string()]));
            assert_eq!(insert.values.len(), 2);
        } else {
            panic!("Expected INSERT statement");
        }
    }

    #[test]
    fn test_insert_without_column_list() {
        let stmt = parse("INSERT INTO t VALUES (1, 'a')").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("expected insert");
        };
        assert_eq!(insert.columns, None);
    }

    #[test]
    fn test_insert_typed_literals() {
        let stmt = parse(
            "INSERT INTO people (born, wakes, contact) VALUES (DATE '2024-01-05', TIME '08:30', EMAIL 'a@b.co')",
        )
        .unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("expected insert");
        };
        assert_eq!(
            insert.values[0],
            Expr::Literal(Literal::Date("2024-01-05".to_string()))
        );
        assert_eq!(
            insert.values[1],
            Expr::Literal(Literal::Time("08:30".to_string()))
        );
        assert_eq!(
            insert.values[2],
            Expr::Literal(Literal::Email("a@b.co".to_string()))
        );
    }

    #[test]
    fn test_invalid_date_literal_fails() {
        let err = parse("INSERT INTO t (d) VALUES (DATE '2024-13-40')").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTypedLiteral { kind: "DATE", .. }));
    }

    #[test]
    fn test_invalid_email_literal_fails() {
        let err = parse("INSERT INTO t (e) VALUES (EMAIL 'not-an-email')").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTypedLiteral { kind: "EMAIL", .. }));
    }

    #[test]
    fn test_update() {
        let stmt = parse("UPDATE users SET name = 'Bob' WHERE id = 1").unwrap();
        if let Statement::Update(update) = stmt {
            assert_eq!(update.table, "users");
            assert_eq!(update.assignments.len(), 1);
            assert!(update.where_clause.is_some());
        } else {
            panic!("Expected UPDATE statement");
        }
    }

    #[test]
    fn test_delete() {
        let stmt = parse("DELETE FROM users WHERE id = 1").unwrap();
        if let Statement::Delete(delete) = stmt {
            assert_eq!(delete.table, "users");
            assert!(delete.where_clause.is_some());
        } else {
            panic!("Expected DELETE statement");
        }
    }

    #[test]
    fn test_delete_without_where() {
        let stmt = parse("DELETE FROM users").unwrap();
        let Statement::Delete(delete) = stmt else {
            panic!("expected delete");
        };
        assert!(delete.where_clause.is_none());
    }

    #[test]
    fn test_create_drop_alter_use_database() {
        assert!(matches!(
            parse("CREATE DATABASE shop").unwrap(),
            Statement::CreateDatabase(_)
        ));
        assert!(matches!(
            parse("DROP DATABASE shop").unwrap(),
            Statement::DropDatabase(_)
        ));
        assert!(matches!(
            parse("USE DATABASE shop").unwrap(),
            Statement::UseDatabase(_)
        ));
        let Statement::AlterDatabase(alter) =
            parse("ALTER DATABASE shop RENAME TO store").unwrap()
        else {
            panic!("expected alter database");
        };
        assert_eq!(alter.name, "shop");
        assert_eq!(alter.new_name, "store");
    }

    #[test]
    fn test_trailing_semicolon_optional() {
        assert!(parse("SELECT * FROM t;").is_ok());
        assert!(parse("SELECT * FROM t").is_ok());
    }

    #[test]
    fn test_identifiers_are_case_insensitive_and_lowered() {
        let stmt = parse("SELECT * FROM Users").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected select");
        };
        assert_eq!(select.from, "users");
    }

    #[test]
    fn test_parse_error_names_offending_token() {
        let err = parse("SELECT FROM").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Eof") || message.contains("expected"));
    }
}
