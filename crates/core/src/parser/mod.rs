/// Recursive-descent parser for `.bind` sample files.
/// Statements carry the line of their first token; no name resolution or
/// type checking is done here.
use crate::ast::Stmt;
use crate::error::Diagnostic;
use crate::lexer::{Spanned, Token};

mod expressions;
mod types;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
}

/// Parse a token stream into statements. The first syntax error stops the
/// file.
pub fn parse(tokens: &[Spanned], filename: &str) -> Result<Vec<Stmt>, Diagnostic> {
    let mut p = Parser::new(tokens, filename);
    p.parse_file()
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    /// Token `n` positions ahead of the current one.
    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: Token, shown: &str) -> Result<(), Diagnostic> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("'{}' expected, got {:?}", shown, self.peek())))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn err(&self, msg: impl Into<String>) -> Diagnostic {
        Diagnostic::parse(&self.filename, self.cur_line(), msg)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn take_word(&mut self) -> Result<String, Diagnostic> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("identifier expected, got {:?}", self.peek())))
        }
    }

    /// A member name: identifier or quoted string.
    fn take_key(&mut self) -> Result<String, Diagnostic> {
        match self.peek().clone() {
            Token::Word(w) | Token::Str(w) => {
                self.advance();
                Ok(w)
            }
            Token::Num(n) if n.fract() == 0.0 && n >= 0.0 => {
                self.advance();
                Ok(format!("{}", n as u64))
            }
            other => Err(self.err(format!("property name expected, got {:?}", other))),
        }
    }

    // -- Statements ---------------------------------------------

    fn parse_file(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        let mut stmts = Vec::new();
        while self.peek() != &Token::Eof {
            if self.eat(&Token::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
            self.eat(&Token::Semi);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let line = self.cur_line();
        if self.is_word("type") && matches!(self.peek_at(1), Token::Word(_)) {
            self.advance();
            let name = self.take_word()?;
            self.expect(Token::Eq, "=")?;
            let ty = self.parse_type()?;
            return Ok(Stmt::TypeAlias { name, ty, line });
        }
        if (self.is_word("const") || self.is_word("let")) && matches!(self.peek_at(1), Token::Word(_))
        {
            let mutable = self.is_word("let");
            self.advance();
            let name = self.take_word()?;
            let annotation = if self.eat(&Token::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            self.expect(Token::Eq, "=")?;
            let value = self.parse_expr()?;
            return Ok(Stmt::Binding {
                name,
                mutable,
                annotation,
                value,
                line,
            });
        }
        if matches!(self.peek(), Token::Word(_)) && self.peek_at(1) == &Token::Eq {
            let name = self.take_word()?;
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { name, value, line });
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, RawMember, RawType};
    use crate::lexer::lex;

    fn parse_src(src: &str) -> Result<Vec<Stmt>, Diagnostic> {
        let tokens = lex(src, "t.bind")?;
        parse(&tokens, "t.bind")
    }

    #[test]
    fn parses_alias_binding_and_call() {
        let stmts = parse_src(
            "type Address = { street: string; city?: string }\n\
             const m = model<Address>();\n\
             m.get(\"/street\")",
        )
        .unwrap();
        assert_eq!(stmts.len(), 3);
        match &stmts[0] {
            Stmt::TypeAlias { name, ty, line } => {
                assert_eq!(name, "Address");
                assert_eq!(*line, 1);
                assert_eq!(
                    ty,
                    &RawType::Record(vec![
                        RawMember {
                            name: "street".into(),
                            optional: false,
                            ty: RawType::String,
                            line: 1
                        },
                        RawMember {
                            name: "city".into(),
                            optional: true,
                            ty: RawType::String,
                            line: 1
                        },
                    ])
                );
            }
            other => panic!("expected alias, got {:?}", other),
        }
        match &stmts[1] {
            Stmt::Binding {
                mutable, value, ..
            } => {
                assert!(!mutable);
                assert!(matches!(
                    &value.kind,
                    ExprKind::Call { callee, type_arg: Some(RawType::Ref { .. }), args }
                        if callee == "model" && args.is_empty()
                ));
            }
            other => panic!("expected binding, got {:?}", other),
        }
        assert_eq!(stmts[2].line(), 3);
    }

    #[test]
    fn assignment_versus_expression() {
        let stmts = parse_src("x = 1; m.set(\"/a\", [1, 2])").unwrap();
        assert!(matches!(&stmts[0], Stmt::Assign { name, .. } if name == "x"));
        assert!(matches!(
            &stmts[1],
            Stmt::Expr(e) if matches!(&e.kind, ExprKind::Method { method, args, .. }
                if method == "set" && args.len() == 2)
        ));
    }

    #[test]
    fn union_array_and_tuple_types() {
        let stmts = parse_src("type T = (string | number)[] | [boolean, null] | Array<string>").unwrap();
        let Stmt::TypeAlias { ty, .. } = &stmts[0] else {
            panic!("expected alias")
        };
        assert_eq!(
            ty,
            &RawType::Union(vec![
                RawType::Array(Box::new(RawType::Union(vec![RawType::String, RawType::Number]))),
                RawType::Tuple(vec![RawType::Boolean, RawType::Null]),
                RawType::Array(Box::new(RawType::String)),
            ])
        );
    }

    #[test]
    fn syntax_error_stops_the_file() {
        let err = parse_src("const x = \nconst y = 1").unwrap_err();
        assert_eq!(err.code, crate::error::codes::TOKEN_EXPECTED);
        assert_eq!(err.line, 2);
    }
}
