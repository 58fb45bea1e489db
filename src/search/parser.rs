//! # Filter Parser
//!
//! Recursive descent over the token stream. Precedence, loosest first:
//!
//! ```text
//! |        right associative
//! ,
//! or
//! and
//! == != < <= > >=   non associative
//! + -
//! * / %
//! unary -
//! postfix: .name ."name" [expr] [] ?
//! ```
//!
//! Nesting, operator chains and postfix chains all count towards
//! `MAX_DEPTH`, which bounds the depth of the resulting tree.

use serde_json::Value;

use super::ast::{BinaryOp, Expr, ObjectKey};
use super::builtins;
use super::errors::{FilterError, FilterResult};
use super::lexer::{tokenize, Spanned, Token};
use super::value::number;

/// Deepest expression tree accepted
pub const MAX_DEPTH: usize = 128;

/// Parse a filter expression
pub fn parse(source: &str) -> FilterResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_pipe()?;
    parser.expect(Token::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// One level deeper; callers restore `depth` once their subtree is built
    fn descend(&mut self) -> FilterResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FilterError::parse(
                self.position(),
                "filter nested too deeply",
            ));
        }
        Ok(())
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn position(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].position
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Token::Ident(name) if name == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> FilterResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", token.describe())))
        }
    }

    fn unexpected(&self, context: &str) -> FilterError {
        FilterError::parse(
            self.position(),
            format!("{}, found {}", context, self.peek().describe()),
        )
    }

    fn parse_pipe(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        self.descend()?;
        let lhs = self.parse_comma()?;
        let expr = if self.eat(&Token::Pipe) {
            let rhs = self.parse_pipe()?;
            Expr::Pipe(Box::new(lhs), Box::new(rhs))
        } else {
            lhs
        };
        self.depth = depth;
        Ok(expr)
    }

    fn parse_comma(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_or()?;
        while self.eat(&Token::Comma) {
            self.descend()?;
            let rhs = self.parse_or()?;
            lhs = Expr::Comma(Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_or(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            self.descend()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_comparison()?;
        while self.eat_keyword("and") {
            self.descend()?;
            let rhs = self.parse_comparison()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Token::Eq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        self.descend()?;
        let rhs = self.parse_additive()?;

        if matches!(
            self.peek(),
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge
        ) {
            return Err(self.unexpected("comparisons cannot be chained"));
        }

        self.depth = depth;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.advance();
            self.descend()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.advance();
            self.descend()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> FilterResult<Expr> {
        if self.eat(&Token::Minus) {
            let depth = self.depth;
            self.descend()?;
            let operand = self.parse_unary()?;
            self.depth = depth;
            return Ok(match operand {
                Expr::Literal(Value::Number(n)) => {
                    Expr::Literal(number(-n.as_f64().unwrap_or_default()))
                }
                other => Expr::Neg(Box::new(other)),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(
                self.peek(),
                Token::Field(_) | Token::Dot | Token::LBracket | Token::Question
            ) {
                self.descend()?;
            }
            expr = match self.peek().clone() {
                Token::Field(name) => {
                    self.advance();
                    Expr::Field {
                        target: Box::new(expr),
                        name,
                    }
                }
                Token::Dot => {
                    self.advance();
                    match self.peek().clone() {
                        Token::Str(name) => {
                            self.advance();
                            Expr::Field {
                                target: Box::new(expr),
                                name,
                            }
                        }
                        Token::LBracket => self.parse_bracket_suffix(expr)?,
                        _ => return Err(self.unexpected("expected field name after '.'")),
                    }
                }
                Token::LBracket => self.parse_bracket_suffix(expr)?,
                Token::Question => {
                    self.advance();
                    Expr::Try(Box::new(expr))
                }
                _ => {
                    self.depth = depth;
                    return Ok(expr);
                }
            };
        }
    }

    /// `[]` or `[expr]` following a term
    fn parse_bracket_suffix(&mut self, target: Expr) -> FilterResult<Expr> {
        self.expect(Token::LBracket)?;
        if self.eat(&Token::RBracket) {
            return Ok(Expr::Iterate {
                target: Box::new(target),
            });
        }
        let index = self.parse_pipe()?;
        self.expect(Token::RBracket)?;
        Ok(Expr::Index {
            target: Box::new(target),
            index: Box::new(index),
        })
    }

    fn parse_primary(&mut self) -> FilterResult<Expr> {
        let position = self.position();
        match self.advance() {
            Token::Dot => match self.peek().clone() {
                Token::Str(name) => {
                    self.advance();
                    Ok(Expr::Field {
                        target: Box::new(Expr::Identity),
                        name,
                    })
                }
                _ => Ok(Expr::Identity),
            },
            Token::Field(name) => Ok(Expr::Field {
                target: Box::new(Expr::Identity),
                name,
            }),
            Token::Num(n) => Ok(Expr::Literal(number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::LParen => {
                let inner = self.parse_pipe()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::Array(None));
                }
                let inner = self.parse_pipe()?;
                self.expect(Token::RBracket)?;
                Ok(Expr::Array(Some(Box::new(inner))))
            }
            Token::LBrace => self.parse_object(),
            Token::Ident(name) => self.parse_identifier(name, position),
            other => Err(FilterError::parse(
                position,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn parse_identifier(&mut self, name: String, position: usize) -> FilterResult<Expr> {
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            "and" | "or" => {
                return Err(FilterError::parse(
                    position,
                    format!("unexpected keyword '{}'", name),
                ))
            }
            _ => {}
        }

        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                args.push(self.parse_pipe()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Semicolon)?;
            }
        }

        match builtins::arity(&name) {
            Some(arity) if arity == args.len() => Ok(Expr::Call { name, args }),
            _ => Err(FilterError::parse(
                position,
                format!("{}/{} is not defined", name, args.len()),
            )),
        }
    }

    fn parse_object(&mut self) -> FilterResult<Expr> {
        let depth = self.depth;
        self.descend()?;
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            self.depth = depth;
            return Ok(Expr::Object(entries));
        }

        loop {
            let key = match self.peek().clone() {
                Token::Ident(name) | Token::Str(name) => {
                    self.advance();
                    ObjectKey::Literal(name)
                }
                Token::LParen => {
                    self.advance();
                    let key = self.parse_pipe()?;
                    self.expect(Token::RParen)?;
                    ObjectKey::Computed(key)
                }
                _ => return Err(self.unexpected("expected object key")),
            };

            let value = if self.eat(&Token::Colon) {
                self.parse_or()?
            } else {
                match &key {
                    ObjectKey::Literal(name) => Expr::Field {
                        target: Box::new(Expr::Identity),
                        name: name.clone(),
                    },
                    ObjectKey::Computed(_) => {
                        return Err(self.unexpected("expected ':' after computed key"))
                    }
                }
            };
            entries.push((key, value));

            if self.eat(&Token::RBrace) {
                self.depth = depth;
                return Ok(Expr::Object(entries));
            }
            self.expect(Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(target: Expr, name: &str) -> Expr {
        Expr::Field {
            target: Box::new(target),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_identity() {
        assert_eq!(parse(".").unwrap(), Expr::Identity);
    }

    #[test]
    fn test_field_chain() {
        assert_eq!(
            parse(".a.b").unwrap(),
            field(field(Expr::Identity, "a"), "b")
        );
        assert_eq!(parse(".\"a b\"").unwrap(), field(Expr::Identity, "a b"));
        assert_eq!(
            parse(".[\"a\"]").unwrap(),
            Expr::Index {
                target: Box::new(Expr::Identity),
                index: Box::new(Expr::Literal(json!("a"))),
            }
        );
    }

    #[test]
    fn test_optional_and_iterate() {
        assert_eq!(
            parse(".a?").unwrap(),
            Expr::Try(Box::new(field(Expr::Identity, "a")))
        );
        assert_eq!(
            parse(".[]").unwrap(),
            Expr::Iterate {
                target: Box::new(Expr::Identity)
            }
        );
    }

    #[test]
    fn test_pipe_binds_loosest() {
        let expr = parse(".a, .b | .c").unwrap();
        assert!(matches!(expr, Expr::Pipe(lhs, _) if matches!(*lhs, Expr::Comma(_, _))));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op, rhs, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_literal() {
        assert_eq!(parse("-3").unwrap(), Expr::Literal(json!(-3)));
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            parse("select(.v > 1)").unwrap(),
            Expr::Call {
                name: "select".to_string(),
                args: vec![Expr::Binary {
                    op: BinaryOp::Gt,
                    lhs: Box::new(field(Expr::Identity, "v")),
                    rhs: Box::new(Expr::Literal(json!(1))),
                }],
            }
        );
        assert!(matches!(parse("length").unwrap(), Expr::Call { .. }));
    }

    #[test]
    fn test_object_construction() {
        let expr = parse("{name, \"n\": .x, (.k): 1}").unwrap();
        match expr {
            Expr::Object(entries) => {
                assert_eq!(entries.len(), 3);
                assert_eq!(entries[0].0, ObjectKey::Literal("name".to_string()));
                assert_eq!(entries[0].1, field(Expr::Identity, "name"));
                assert!(matches!(entries[2].0, ObjectKey::Computed(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_function() {
        let err = parse("frobnicate(.)").unwrap_err();
        assert!(err.to_string().contains("frobnicate/1 is not defined"));
    }

    #[test]
    fn test_wrong_arity() {
        assert!(parse("select").is_err());
        assert!(parse("length(.)").is_err());
    }

    fn assert_too_deep(source: &str) {
        match parse(source) {
            Err(FilterError::Parse { message, .. }) => {
                assert_eq!(message, "filter nested too deeply")
            }
            other => panic!("expected depth error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let depth = 10_000;
        assert_too_deep(&format!("{}.{}", "(".repeat(depth), ")".repeat(depth)));
        assert_too_deep(&format!("{}1{}", "[".repeat(depth), "]".repeat(depth)));
        assert_too_deep(&format!("{}1{}", "{a:".repeat(depth), "}".repeat(depth)));
        assert_too_deep(&format!("{}1", "select(".repeat(depth)));
        assert_too_deep(&vec!["."; depth].join(" | "));
        assert_too_deep(&vec!["1"; depth].join(" + "));
        assert_too_deep(&vec!["."; depth].join(", "));
        assert_too_deep(&".a".repeat(depth));
        assert_too_deep(&format!("{}1", "-".repeat(depth)));
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let depth = 50;
        assert!(parse(&format!("{}.{}", "(".repeat(depth), ")".repeat(depth))).is_ok());
        assert!(parse(&".a".repeat(depth)).is_ok());
        assert!(parse(&vec!["1"; depth].join(" + ")).is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["", ".a |", "(.a", ".a ==", "[1,", "{a:}", ".a == 1 == 2", ") ."] {
            assert!(
                matches!(parse(source), Err(FilterError::Parse { .. })),
                "expected parse error for {:?}",
                source
            );
        }
    }
}
