use super::Parser;
use crate::ast::{Expr, ExprKind, ObjectEntry};
use crate::error::Diagnostic;
use crate::lexer::Token;

/// Words that start a statement and can never be an expression.
const RESERVED: &[&str] = &["const", "let", "type"];

impl<'a> Parser<'a> {
    // -- Expression parsing -------------------------------------

    pub(super) fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        let line = self.cur_line();
        let kind = match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            Token::Num(n) => {
                self.advance();
                ExprKind::Num(n)
            }
            Token::Template(parts) => {
                self.advance();
                ExprKind::Template(parts)
            }
            Token::LBrace => {
                self.advance();
                self.parse_object_literal()?
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_list(Token::RBracket, "]")?;
                ExprKind::Array(items)
            }
            Token::LParen => {
                self.advance();
                self.expect(Token::RParen, ")")?;
                self.expect(Token::Arrow, "=>")?;
                self.expect(Token::LBrace, "{")?;
                self.expect(Token::RBrace, "}")?;
                ExprKind::Arrow
            }
            Token::Word(w) if RESERVED.contains(&w.as_str()) => {
                return Err(self.err(format!("expression expected, got '{}'", w)));
            }
            Token::Word(w) => {
                self.advance();
                match w.as_str() {
                    "true" => ExprKind::Bool(true),
                    "false" => ExprKind::Bool(false),
                    "null" => ExprKind::Null,
                    "undefined" => ExprKind::Undefined,
                    "new" => {
                        let name = self.take_word()?;
                        self.expect(Token::LParen, "(")?;
                        self.expect(Token::RParen, ")")?;
                        ExprKind::New(name)
                    }
                    _ => self.parse_ident_tail(w)?,
                }
            }
            other => return Err(self.err(format!("expression expected, got {:?}", other))),
        };
        Ok(Expr { kind, line })
    }

    /// What follows an identifier: a method call, a call with an optional
    /// type argument, or nothing.
    fn parse_ident_tail(&mut self, name: String) -> Result<ExprKind, Diagnostic> {
        match self.peek() {
            Token::Dot => {
                self.advance();
                let method = self.take_word()?;
                self.expect(Token::LParen, "(")?;
                let args = self.parse_list(Token::RParen, ")")?;
                Ok(ExprKind::Method {
                    receiver: name,
                    method,
                    args,
                })
            }
            Token::Lt => {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(Token::Gt, ">")?;
                self.expect(Token::LParen, "(")?;
                let args = self.parse_list(Token::RParen, ")")?;
                Ok(ExprKind::Call {
                    callee: name,
                    type_arg: Some(ty),
                    args,
                })
            }
            Token::LParen => {
                self.advance();
                let args = self.parse_list(Token::RParen, ")")?;
                Ok(ExprKind::Call {
                    callee: name,
                    type_arg: None,
                    args,
                })
            }
            _ => Ok(ExprKind::Ident(name)),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: Token, shown: &str) -> Result<Vec<Expr>, Diagnostic> {
        let mut items = Vec::new();
        while self.peek() != &close {
            items.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close, shown)?;
        Ok(items)
    }

    fn parse_object_literal(&mut self) -> Result<ExprKind, Diagnostic> {
        let mut entries = Vec::new();
        while self.peek() != &Token::RBrace {
            let line = self.cur_line();
            let key = self.take_key()?;
            self.expect(Token::Colon, ":")?;
            let value = self.parse_expr()?;
            entries.push(ObjectEntry { key, value, line });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "}")?;
        Ok(ExprKind::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, Stmt};
    use crate::lexer::lex;
    use crate::parser::parse;

    fn expr_of(src: &str) -> ExprKind {
        let tokens = lex(src, "t.bind").unwrap();
        match parse(&tokens, "t.bind").unwrap().remove(0) {
            Stmt::Expr(e) => e.kind,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn object_literal_with_nested_values() {
        let kind = expr_of("{ a: 1, \"b c\": [true, null], f: () => {} }");
        let ExprKind::Object(entries) = kind else {
            panic!("expected object")
        };
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b c", "f"]);
    }

    #[test]
    fn arrow_and_new() {
        assert_eq!(expr_of("() => {}"), ExprKind::Arrow);
        assert_eq!(expr_of("new Placeholder()"), ExprKind::New("Placeholder".into()));
    }

    #[test]
    fn context_call_with_relative_path() {
        let kind = expr_of("m.get(\"city\", ctx)");
        let ExprKind::Method { receiver, method, args } = kind else {
            panic!("expected method call")
        };
        assert_eq!(receiver, "m");
        assert_eq!(method, "get");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].kind, ExprKind::Ident("ctx".into()));
    }
}
