use super::Parser;
use crate::ast::{RawMember, RawType};
use crate::error::Diagnostic;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Type parsing -------------------------------------------

    pub(super) fn parse_type(&mut self) -> Result<RawType, Diagnostic> {
        // A leading '|' is allowed, as in multi-line unions.
        self.eat(&Token::Pipe);
        let mut members = vec![self.parse_intersection()?];
        while self.eat(&Token::Pipe) {
            members.push(self.parse_intersection()?);
        }
        Ok(if members.len() == 1 {
            members.remove(0)
        } else {
            RawType::Union(members)
        })
    }

    fn parse_intersection(&mut self) -> Result<RawType, Diagnostic> {
        let mut parts = vec![self.parse_postfix_type()?];
        while self.eat(&Token::Amp) {
            parts.push(self.parse_postfix_type()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            RawType::Intersection(parts)
        })
    }

    fn parse_postfix_type(&mut self) -> Result<RawType, Diagnostic> {
        let mut ty = self.parse_primary_type()?;
        while self.peek() == &Token::LBracket && self.peek_at(1) == &Token::RBracket {
            self.advance();
            self.advance();
            ty = RawType::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_primary_type(&mut self) -> Result<RawType, Diagnostic> {
        let line = self.cur_line();
        match self.peek().clone() {
            Token::Word(w) => {
                self.advance();
                let ty = match w.as_str() {
                    "string" => RawType::String,
                    "number" => RawType::Number,
                    "boolean" => RawType::Boolean,
                    "null" => RawType::Null,
                    "undefined" | "void" => RawType::Undefined,
                    "symbol" => RawType::Symbol,
                    "unknown" => RawType::Unknown,
                    "any" => RawType::Any,
                    "never" => RawType::Never,
                    "object" => RawType::Object,
                    "function" => RawType::Function,
                    "true" => RawType::BoolLit(true),
                    "false" => RawType::BoolLit(false),
                    "Array" if self.peek() == &Token::Lt => {
                        self.advance();
                        let element = self.parse_type()?;
                        self.expect(Token::Gt, ">")?;
                        RawType::Array(Box::new(element))
                    }
                    _ => RawType::Ref { name: w, line },
                };
                Ok(ty)
            }
            Token::Str(s) => {
                self.advance();
                Ok(RawType::StrLit(s))
            }
            Token::Num(n) => {
                self.advance();
                Ok(RawType::NumLit(n))
            }
            Token::Template(parts) => {
                self.advance();
                Ok(RawType::Template(parts))
            }
            Token::LBrace => {
                self.advance();
                self.parse_record_type()
            }
            Token::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while self.peek() != &Token::RBracket {
                    items.push(self.parse_type()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket, "]")?;
                Ok(RawType::Tuple(items))
            }
            Token::LParen => {
                self.advance();
                if self.eat(&Token::RParen) {
                    // `() => T`: callables are opaque, the return type is dropped
                    self.expect(Token::Arrow, "=>")?;
                    self.parse_type()?;
                    return Ok(RawType::Function);
                }
                let inner = self.parse_type()?;
                self.expect(Token::RParen, ")")?;
                Ok(inner)
            }
            other => Err(self.err(format!("type expected, got {:?}", other))),
        }
    }

    fn parse_record_type(&mut self) -> Result<RawType, Diagnostic> {
        let mut members = Vec::new();
        while self.peek() != &Token::RBrace {
            let line = self.cur_line();
            let name = self.take_key()?;
            let optional = self.eat(&Token::Question);
            self.expect(Token::Colon, ":")?;
            let ty = self.parse_type()?;
            members.push(RawMember {
                name,
                optional,
                ty,
                line,
            });
            if !(self.eat(&Token::Comma) || self.eat(&Token::Semi)) {
                break;
            }
        }
        self.expect(Token::RBrace, "}")?;
        Ok(RawType::Record(members))
    }
}
