use crate::error::{codes, Diagnostic};
use crate::shape::TemplatePart;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, distinguished in the parser
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    Num(f64),
    /// Backtick literal, split into text and `${string}` / `${number}` holes
    Template(Vec<TemplatePart>),
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Semi,
    Comma,
    Dot,
    Question,
    Eq,
    Arrow, // =>
    Lt,
    Gt,
    Pipe,
    Amp,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

pub fn lex(src: &str, filename: &str) -> Result<Vec<Spanned>, Diagnostic> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment (annotations live here)
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '*' {
            let start_line = line;
            pos += 2;
            loop {
                if pos >= chars.len() {
                    return Err(Diagnostic::new(
                        filename,
                        start_line,
                        codes::TOKEN_EXPECTED,
                        "'*/' expected",
                    ));
                }
                if chars[pos] == '\n' {
                    line += 1;
                }
                if chars[pos] == '*' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        // Whitespace
        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            pos += 1;
            continue;
        }

        let tok_line = line;

        // String literal, single or double quoted
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() || chars[pos] == '\n' {
                    return Err(Diagnostic::new(
                        filename,
                        tok_line,
                        codes::UNTERMINATED_LITERAL,
                        "unterminated string literal",
                    ));
                }
                let sc = chars[pos];
                if sc == quote {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    if pos >= chars.len() {
                        return Err(Diagnostic::new(
                            filename,
                            tok_line,
                            codes::UNTERMINATED_LITERAL,
                            "unterminated escape in string",
                        ));
                    }
                    match chars[pos] {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => s.push(other),
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
            });
            continue;
        }

        // Template literal
        if c == '`' {
            pos += 1;
            let mut parts = Vec::new();
            let mut text = String::new();
            loop {
                if pos >= chars.len() || chars[pos] == '\n' {
                    return Err(Diagnostic::new(
                        filename,
                        tok_line,
                        codes::UNTERMINATED_LITERAL,
                        "unterminated template literal",
                    ));
                }
                let tc = chars[pos];
                if tc == '`' {
                    pos += 1;
                    break;
                }
                if tc == '$' && pos + 1 < chars.len() && chars[pos + 1] == '{' {
                    let close = chars[pos..]
                        .iter()
                        .position(|&ch| ch == '}' || ch == '\n')
                        .map(|off| pos + off);
                    let Some(end) = close.filter(|&e| chars[e] == '}') else {
                        return Err(Diagnostic::new(
                            filename,
                            tok_line,
                            codes::TOKEN_EXPECTED,
                            "'}' expected in template literal",
                        ));
                    };
                    let hole: String = chars[pos + 2..end].iter().collect();
                    let part = match hole.trim() {
                        "string" => TemplatePart::String,
                        "number" => TemplatePart::Number,
                        other => {
                            return Err(Diagnostic::new(
                                filename,
                                tok_line,
                                codes::TOKEN_EXPECTED,
                                format!("'string' or 'number' expected in template hole, got '{}'", other),
                            ))
                        }
                    };
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    parts.push(part);
                    pos = end + 1;
                    continue;
                }
                text.push(tc);
                pos += 1;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(text));
            }
            tokens.push(Spanned {
                token: Token::Template(parts),
                line: tok_line,
            });
            continue;
        }

        // Number
        if c.is_ascii_digit()
            || (c == '-' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit())
        {
            let start = pos;
            pos += 1;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos + 1 < chars.len() && chars[pos] == '.' && chars[pos + 1].is_ascii_digit() {
                pos += 1; // consume '.'
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            let s: String = chars[start..pos].iter().collect();
            let n: f64 = s.parse().map_err(|_| {
                Diagnostic::new(
                    filename,
                    tok_line,
                    codes::INVALID_CHARACTER,
                    format!("invalid number '{}'", s),
                )
            })?;
            tokens.push(Spanned {
                token: Token::Num(n),
                line: tok_line,
            });
            continue;
        }

        let single = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ':' => Some(Token::Colon),
            ';' => Some(Token::Semi),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            '?' => Some(Token::Question),
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            '|' => Some(Token::Pipe),
            '&' => Some(Token::Amp),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(Spanned {
                token,
                line: tok_line,
            });
            pos += 1;
            continue;
        }

        if c == '=' {
            if pos + 1 < chars.len() && chars[pos + 1] == '>' {
                tokens.push(Spanned {
                    token: Token::Arrow,
                    line: tok_line,
                });
                pos += 2;
            } else {
                tokens.push(Spanned {
                    token: Token::Eq,
                    line: tok_line,
                });
                pos += 1;
            }
            continue;
        }

        // Identifier / keyword
        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '$')
            {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                line: tok_line,
            });
            continue;
        }

        return Err(Diagnostic::new(
            filename,
            tok_line,
            codes::INVALID_CHARACTER,
            format!("invalid character '{}'", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}
