use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Str(String),
    Bool(bool),
    // Identifiers
    Ident(String),
    // Keywords
    Let,
    If,
    Else,
    In,
    TyInt,
    TyString,
    TyBool,
    TyDate,
    // Operators
    Assign,  // =
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    EqEq,    // ==
    NotEq,   // !=
    Gt,      // >
    Gte,     // >=
    Lt,      // <
    Lte,     // <=
    And,     // &&
    Or,      // ||
    Bang,    // !
    // Punctuation
    Semicolon,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

fn keyword(s: &str) -> Option<TokenKind> {
    match s {
        "let" => Some(TokenKind::Let),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "in" => Some(TokenKind::In),
        "int" => Some(TokenKind::TyInt),
        "string" => Some(TokenKind::TyString),
        "bool" => Some(TokenKind::TyBool),
        "date" => Some(TokenKind::TyDate),
        "true" => Some(TokenKind::Bool(true)),
        "false" => Some(TokenKind::Bool(false)),
        _ => None,
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message: msg.into(),
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();

        while self.pos < self.chars.len() {
            self.scan_token(&mut tokens)?;
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
        });

        Ok(tokens)
    }

    fn scan_token(&mut self, tokens: &mut Vec<Token>) -> Result<(), SyntaxError> {
        let ch = match self.current() {
            Some(c) => c,
            None => return Ok(()),
        };

        if ch.is_whitespace() {
            self.advance();
            return Ok(());
        }

        if ch == '/' && self.peek() == Some('/') {
            self.skip_comment();
            return Ok(());
        }

        if ch == '"' {
            let tok = self.scan_string()?;
            tokens.push(tok);
            return Ok(());
        }

        if ch.is_ascii_digit() {
            let tok = self.scan_number()?;
            tokens.push(tok);
            return Ok(());
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            tokens.push(self.scan_identifier());
            return Ok(());
        }

        let tok = self.scan_operator()?;
        tokens.push(tok);
        Ok(())
    }

    fn skip_comment(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos] != '\n' {
            self.advance();
        }
    }

    fn scan_string(&mut self) -> Result<Token, SyntaxError> {
        let line = self.line;
        self.advance(); // consume opening "

        let mut text = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(SyntaxError {
                        line,
                        message: "Unterminated string literal".to_string(),
                    })
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                // No escape processing: backslashes are literal characters.
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        Ok(Token {
            kind: TokenKind::Str(text),
            line,
        })
    }

    fn scan_number(&mut self) -> Result<Token, SyntaxError> {
        let line = self.line;
        let mut num_str = String::new();

        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let n: i64 = num_str
            .parse()
            .map_err(|_| self.error(format!("Integer literal out of range: {}", num_str)))?;
        Ok(Token {
            kind: TokenKind::Int(n),
            line,
        })
    }

    fn scan_identifier(&mut self) -> Token {
        let line = self.line;
        let mut ident = String::new();

        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = keyword(&ident).unwrap_or(TokenKind::Ident(ident));
        Token { kind, line }
    }

    fn scan_operator(&mut self) -> Result<Token, SyntaxError> {
        let line = self.line;
        let ch = match self.advance() {
            Some(c) => c,
            None => return Err(self.error("Unexpected end of input")),
        };

        let kind = match ch {
            '=' if self.current() == Some('=') => {
                self.advance();
                TokenKind::EqEq
            }
            '=' => TokenKind::Assign,
            '!' if self.current() == Some('=') => {
                self.advance();
                TokenKind::NotEq
            }
            '!' => TokenKind::Bang,
            '>' if self.current() == Some('=') => {
                self.advance();
                TokenKind::Gte
            }
            '>' => TokenKind::Gt,
            '<' if self.current() == Some('=') => {
                self.advance();
                TokenKind::Lte
            }
            '<' => TokenKind::Lt,
            '&' if self.current() == Some('&') => {
                self.advance();
                TokenKind::And
            }
            '&' => return Err(self.error("Unexpected character '&' (did you mean '&&'?)")),
            '|' if self.current() == Some('|') => {
                self.advance();
                TokenKind::Or
            }
            '|' => return Err(self.error("Unexpected character '|' (did you mean '||'?)")),
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            other => return Err(self.error(format!("Unknown character: {:?}", other))),
        };

        Ok(Token { kind, line })
    }
}
