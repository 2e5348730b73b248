use crate::ast::{BinOp, Expr, Literal, Stmt, UnaryOp};
use crate::error::SyntaxError;
use crate::lexer::{Token, TokenKind};
use crate::types::Type;

/// Recursive-descent parser: tokens → statement list.
///
/// Predictive with single-token lookahead, except for the assignment rule
/// which peeks one further to distinguish `name = ...;` from an expression
/// statement starting with an identifier.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn error(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.current().line,
            message: msg.into(),
        }
    }

    fn current(&self) -> &Token {
        if self.pos < self.tokens.len() {
            &self.tokens[self.pos]
        } else {
            // tokenize() always terminates the stream with Eof
            self.tokens.last().expect("token stream is never empty")
        }
    }

    fn peek(&self, offset: usize) -> &Token {
        let idx = self.pos + offset;
        if idx < self.tokens.len() {
            &self.tokens[idx]
        } else {
            self.tokens.last().expect("token stream is never empty")
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    /// Consume the current token if it matches `kind`.
    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "Expected {:?}, found {:?}",
                kind,
                self.current().kind
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, SyntaxError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected {}, found {:?}", what, other))),
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut program = Vec::new();
        while !self.is_eof() {
            program.push(self.parse_stmt()?);
        }
        Ok(program)
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match &self.current().kind {
            TokenKind::Let => self.parse_var_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Ident(_) if self.peek(1).kind == TokenKind::Assign => {
                self.parse_assignment()
            }
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect(&TokenKind::Let)?;
        let name = self.expect_ident("variable name after 'let'")?;
        self.expect(&TokenKind::Colon)?;
        let annotation = self.parse_type_anno()?;
        self.expect(&TokenKind::Assign)?;
        let init = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Stmt::VarDecl {
            name,
            annotation,
            init,
        })
    }

    fn parse_type_anno(&mut self) -> Result<Type, SyntaxError> {
        let base = match &self.current().kind {
            TokenKind::TyInt => Type::Int,
            TokenKind::TyString => Type::String,
            TokenKind::TyBool => Type::Bool,
            TokenKind::TyDate => Type::Date,
            other => {
                return Err(self.error(format!("Expected type annotation, found {:?}", other)))
            }
        };
        self.advance();

        if self.matches(&TokenKind::LBracket) {
            self.expect(&TokenKind::RBracket)?;
            Ok(Type::List(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let then = Box::new(self.parse_stmt()?);
        let otherwise = if self.matches(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_block(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Stmt::Block(stmts))
    }

    fn parse_assignment(&mut self) -> Result<Stmt, SyntaxError> {
        let name = self.expect_ident("assignment target")?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Stmt::Assign { name, value })
    }

    /// The trailing `;` is optional only when the statement closes the
    /// program or a block (implicit-return position).
    fn parse_expr_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let expr = self.parse_expr()?;
        if !self.matches(&TokenKind::Semicolon)
            && !self.check(&TokenKind::RBrace)
            && !self.is_eof()
        {
            return Err(self.error(format!(
                "Expected ';' after expression, found {:?}",
                self.current().kind
            )));
        }
        Ok(Stmt::Expr(expr))
    }

    // -------------------------------------------------------------------------
    // Expressions — precedence ladder, all binary operators left-associative
    // -------------------------------------------------------------------------

    pub fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_and()?;
            expr = Expr::Binary(BinOp::Or, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_equality()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_equality()?;
            expr = Expr::Binary(BinOp::And, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Neq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Gte => BinOp::Gte,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Lte => BinOp::Lte,
                TokenKind::In => BinOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.current().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    /// Calls, member access, and the member-call macro form.
    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(&TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.matches(&TokenKind::Dot) {
                let prop = self.expect_ident("property name after '.'")?;
                if self.check(&TokenKind::LParen) {
                    // List macro: xs.exists(n, body) / xs.all(n, body).
                    // The first argument must be a bare identifier — it is the
                    // lambda parameter, not an expression.
                    self.advance();
                    let param = self.expect_ident("macro parameter name")?;
                    self.expect(&TokenKind::Comma)?;
                    let body = self.parse_expr()?;
                    self.expect(&TokenKind::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(Expr::Member(Box::new(expr), prop)),
                        args: vec![Expr::Lambda {
                            param,
                            body: Box::new(body),
                        }],
                    };
                } else {
                    expr = Expr::Member(Box::new(expr), prop);
                }
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.current().kind.clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::Bool(b) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(b)))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Variable(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            other => Err(self.error(format!("Unexpected token {:?}", other))),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expr()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::List(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = self.expect_ident("property name")?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                fields.push((key, value));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Object(fields))
    }
}
