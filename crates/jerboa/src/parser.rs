//! Recursive-descent parser producing the [`crate::ast`] node set.
//!
//! Operator precedence follows first-edition ECMAScript. `include "x.js";`
//! directives are resolved here, at parse time: they are legal only at the
//! top of a file before any other statement, must name a `.js` file, and are
//! inlined as a `Block` node. Include cycles are detected and rejected.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    ast::{
        AssignOp, BinaryOp, FunctionNode, Literal, MemberKey, Name, Node, NodeKind, Param, Pos,
        UnaryOp, UpdateOp, VarDecl,
    },
    lexer::{Lexer, ParseError, Tok, Token},
    value::number_to_string,
};

type PResult<T> = Result<T, ParseError>;

/// Parses a program read from a file, resolving `include` directives
/// relative to the file's directory.
pub fn parse_program(source: &str, path: &str) -> PResult<Rc<Node>> {
    let mut include_stack = Vec::new();
    if let Ok(canonical) = Path::new(path).canonicalize() {
        include_stack.push(canonical);
    }
    parse_inner(source, path, true, &mut include_stack)
}

/// Parses source handed to `eval`: same grammar, but `include` directives
/// are rejected.
pub fn parse_eval(source: &str, path: &str) -> PResult<Rc<Node>> {
    let mut include_stack = Vec::new();
    parse_inner(source, path, false, &mut include_stack)
}

fn parse_inner(
    source: &str,
    path: &str,
    allow_includes: bool,
    include_stack: &mut Vec<PathBuf>,
) -> PResult<Rc<Node>> {
    let mut parser = Parser::new(source, path, allow_includes)?;
    parser.parse_program_node(include_stack)
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    peeked: Option<Token>,
    path: Rc<str>,
    allow_includes: bool,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, path: &str, allow_includes: bool) -> PResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            peeked: None,
            path: Rc::from(path),
            allow_includes,
        })
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.current.line,
            column: self.current.column,
            path: Rc::clone(&self.path),
        }
    }

    fn advance(&mut self) -> PResult<Token> {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek(&mut self) -> PResult<&Tok> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(&self.peeked.as_ref().expect("just filled").tok)
    }

    fn check(&self, tok: &Tok) -> bool {
        self.current.tok == *tok
    }

    fn eat(&mut self, tok: &Tok) -> PResult<bool> {
        if self.check(tok) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, tok: &Tok) -> PResult<()> {
        if self.check(tok) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", tok.describe())))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        ParseError::new(
            format!("Unexpected {}: {context}", self.current.tok.describe()),
            self.current.line,
            self.current.column,
        )
    }

    /// Statement terminator: a semicolon, or tolerated before `}` / EOF.
    fn expect_semi(&mut self) -> PResult<()> {
        if self.eat(&Tok::Semi)? {
            return Ok(());
        }
        if self.check(&Tok::RBrace) || self.check(&Tok::Eof) {
            return Ok(());
        }
        Err(self.unexpected("expected ';'"))
    }

    fn expect_identifier(&mut self) -> PResult<Name> {
        if let Tok::Identifier(name) = &self.current.tok {
            let name: Name = Rc::from(name.as_str());
            self.advance()?;
            Ok(name)
        } else {
            Err(self.unexpected("expected identifier"))
        }
    }

    // ------------------------------------------------------------------
    // Program / includes
    // ------------------------------------------------------------------

    fn parse_program_node(&mut self, include_stack: &mut Vec<PathBuf>) -> PResult<Rc<Node>> {
        let pos = self.pos();
        let mut body = Vec::new();
        while self.check(&Tok::Include) {
            let node = self.parse_include(include_stack)?;
            body.push(node);
        }
        while !self.check(&Tok::Eof) {
            if self.check(&Tok::Include) {
                return Err(self.unexpected(
                    "include directives must appear at the top of the file before any statement",
                ));
            }
            body.push(self.parse_statement()?);
        }
        Ok(Rc::new(Node::new(NodeKind::Program { body }, pos)))
    }

    fn parse_include(&mut self, include_stack: &mut Vec<PathBuf>) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.advance()?;
        let Tok::Str(rel) = &self.current.tok else {
            return Err(self.unexpected("expected string after 'include'"));
        };
        let rel = rel.clone();
        self.advance()?;
        self.expect_semi()?;

        if !self.allow_includes {
            return Err(ParseError::new(
                "include is not allowed here",
                pos.line,
                pos.column,
            ));
        }
        if !rel.ends_with(".js") {
            return Err(ParseError::new(
                format!("include path must end with .js: \"{rel}\""),
                pos.line,
                pos.column,
            ));
        }

        let resolved = resolve_include_path(&self.path, &rel);
        let canonical = resolved.canonicalize().unwrap_or_else(|_| resolved.clone());
        if include_stack.contains(&canonical) {
            return Err(ParseError::new(
                format!("include cycle detected: \"{rel}\""),
                pos.line,
                pos.column,
            ));
        }
        let source = std::fs::read_to_string(&resolved).map_err(|err| {
            ParseError::new(
                format!("could not read include \"{rel}\": {err}"),
                pos.line,
                pos.column,
            )
        })?;

        include_stack.push(canonical);
        let program = parse_inner(&source, &resolved.to_string_lossy(), true, include_stack)?;
        include_stack.pop();

        let NodeKind::Program { body } = &program.kind else {
            unreachable!("parse_inner always yields a Program node");
        };
        let block = Node::new(
            NodeKind::Block {
                body: body.clone(),
            },
            pos,
        );
        Ok(Rc::new(block))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        if matches!(self.current.tok, Tok::Identifier(_)) && *self.peek()? == Tok::Colon {
            return self.parse_labeled();
        }
        match &self.current.tok {
            Tok::LBrace => self.parse_block(),
            Tok::Semi => {
                self.advance()?;
                Ok(Rc::new(Node::new(NodeKind::Block { body: vec![] }, pos)))
            }
            Tok::Var => {
                let stmt = self.parse_var_statement()?;
                self.expect_semi()?;
                Ok(stmt)
            }
            Tok::If => self.parse_if(),
            Tok::While => self.parse_while(None),
            Tok::Do => self.parse_do_while(None),
            Tok::For => self.parse_for(None),
            Tok::Switch => self.parse_switch(None),
            Tok::Break => {
                self.advance()?;
                let label = self.optional_label()?;
                self.expect_semi()?;
                Ok(Rc::new(Node::new(NodeKind::Break { label }, pos)))
            }
            Tok::Continue => {
                self.advance()?;
                let label = self.optional_label()?;
                self.expect_semi()?;
                Ok(Rc::new(Node::new(NodeKind::Continue { label }, pos)))
            }
            Tok::Return => {
                self.advance()?;
                let expr = if self.check(&Tok::Semi) || self.check(&Tok::RBrace) || self.check(&Tok::Eof)
                {
                    None
                } else {
                    Some(self.parse_expression(false)?)
                };
                self.expect_semi()?;
                Ok(Rc::new(Node::new(NodeKind::Return { expr }, pos)))
            }
            Tok::With => self.parse_with(),
            Tok::Throw => {
                self.advance()?;
                let expr = self.parse_expression(false)?;
                self.expect_semi()?;
                Ok(Rc::new(Node::new(NodeKind::Throw { expr }, pos)))
            }
            Tok::Try => self.parse_try(),
            Tok::Function => self.parse_function_declaration(),
            _ => {
                let expr = self.parse_expression(false)?;
                self.expect_semi()?;
                Ok(Rc::new(Node::new(NodeKind::ExprStmt { expr }, pos)))
            }
        }
    }

    fn optional_label(&mut self) -> PResult<Option<Name>> {
        if let Tok::Identifier(name) = &self.current.tok {
            let name: Name = Rc::from(name.as_str());
            self.advance()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_block(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&Tok::RBrace) {
            if self.check(&Tok::Eof) {
                return Err(self.unexpected("expected '}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(Rc::new(Node::new(NodeKind::Block { body }, pos)))
    }

    /// Parses `var a = 1, b, c = 2` without the trailing semicolon, so the
    /// same routine serves statements and `for` initializers.
    fn parse_var_statement(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::Var)?;
        let mut decls = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&Tok::Assign)? {
                Some(self.parse_assignment(false)?)
            } else {
                None
            };
            decls.push(VarDecl { name, init });
            if !self.eat(&Tok::Comma)? {
                break;
            }
        }
        Ok(Rc::new(Node::new(NodeKind::Var { decls }, pos)))
    }

    fn parse_if(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::If)?;
        self.expect(&Tok::LParen)?;
        let cond = self.parse_expression(false)?;
        self.expect(&Tok::RParen)?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat(&Tok::Else)? {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(Rc::new(Node::new(
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            },
            pos,
        )))
    }

    fn parse_while(&mut self, label: Option<Name>) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::While)?;
        self.expect(&Tok::LParen)?;
        let cond = self.parse_expression(false)?;
        self.expect(&Tok::RParen)?;
        let body = self.parse_statement()?;
        Ok(Rc::new(Node::new(NodeKind::While { cond, body, label }, pos)))
    }

    fn parse_do_while(&mut self, label: Option<Name>) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::Do)?;
        let body = self.parse_statement()?;
        self.expect(&Tok::While)?;
        self.expect(&Tok::LParen)?;
        let cond = self.parse_expression(false)?;
        self.expect(&Tok::RParen)?;
        self.expect_semi()?;
        Ok(Rc::new(Node::new(NodeKind::DoWhile { body, cond, label }, pos)))
    }

    fn parse_for(&mut self, label: Option<Name>) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::For)?;
        self.expect(&Tok::LParen)?;

        // for-in / for-of with a `var` target
        if self.check(&Tok::Var) {
            let var_stmt = self.parse_var_statement()?;
            if self.check(&Tok::In) || self.check(&Tok::Of) {
                let of = self.check(&Tok::Of);
                let NodeKind::Var { decls } = &var_stmt.kind else {
                    unreachable!("parse_var_statement yields a Var node");
                };
                if decls.len() != 1 || decls[0].init.is_some() {
                    return Err(self.unexpected("invalid for-in declaration"));
                }
                let target = Rc::new(Node::new(
                    NodeKind::Identifier {
                        name: Rc::clone(&decls[0].name),
                    },
                    var_stmt.pos.clone(),
                ));
                self.advance()?;
                return self.finish_for_in(pos, target, true, of, label);
            }
            return self.finish_plain_for(pos, Some(var_stmt), label);
        }

        if self.eat(&Tok::Semi)? {
            return self.finish_plain_for_after_init(pos, None, label);
        }

        let init_expr = self.parse_expression(true)?;
        if self.check(&Tok::In) || self.check(&Tok::Of) {
            let of = self.check(&Tok::Of);
            if !matches!(
                init_expr.kind,
                NodeKind::Identifier { .. } | NodeKind::Member { .. }
            ) {
                return Err(self.unexpected("invalid for-in target"));
            }
            self.advance()?;
            return self.finish_for_in(pos, init_expr, false, of, label);
        }
        let init = Rc::new(Node::new(
            NodeKind::ExprStmt {
                expr: Rc::clone(&init_expr),
            },
            init_expr.pos.clone(),
        ));
        self.finish_plain_for(pos, Some(init), label)
    }

    fn finish_plain_for(
        &mut self,
        pos: Pos,
        init: Option<Rc<Node>>,
        label: Option<Name>,
    ) -> PResult<Rc<Node>> {
        self.expect(&Tok::Semi)?;
        self.finish_plain_for_after_init(pos, init, label)
    }

    fn finish_plain_for_after_init(
        &mut self,
        pos: Pos,
        init: Option<Rc<Node>>,
        label: Option<Name>,
    ) -> PResult<Rc<Node>> {
        let test = if self.check(&Tok::Semi) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect(&Tok::Semi)?;
        let update = if self.check(&Tok::RParen) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect(&Tok::RParen)?;
        let body = self.parse_statement()?;
        Ok(Rc::new(Node::new(
            NodeKind::For {
                init,
                test,
                update,
                body,
                label,
            },
            pos,
        )))
    }

    fn finish_for_in(
        &mut self,
        pos: Pos,
        target: Rc<Node>,
        is_var: bool,
        of: bool,
        label: Option<Name>,
    ) -> PResult<Rc<Node>> {
        let object = self.parse_expression(false)?;
        self.expect(&Tok::RParen)?;
        let body = self.parse_statement()?;
        let kind = if of {
            NodeKind::ForOf {
                target,
                is_var,
                object,
                body,
                label,
            }
        } else {
            NodeKind::ForIn {
                target,
                is_var,
                object,
                body,
                label,
            }
        };
        Ok(Rc::new(Node::new(kind, pos)))
    }

    fn parse_switch(&mut self, label: Option<Name>) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::Switch)?;
        self.expect(&Tok::LParen)?;
        let disc = self.parse_expression(false)?;
        self.expect(&Tok::RParen)?;
        self.expect(&Tok::LBrace)?;
        let mut cases = Vec::new();
        let mut saw_default = false;
        while !self.eat(&Tok::RBrace)? {
            let case_pos = self.pos();
            let test = if self.eat(&Tok::Case)? {
                Some(self.parse_expression(false)?)
            } else if self.eat(&Tok::Default)? {
                if saw_default {
                    return Err(ParseError::new(
                        "duplicate default clause in switch",
                        case_pos.line,
                        case_pos.column,
                    ));
                }
                saw_default = true;
                None
            } else {
                return Err(self.unexpected("expected 'case' or 'default'"));
            };
            self.expect(&Tok::Colon)?;
            let mut body = Vec::new();
            while !self.check(&Tok::Case)
                && !self.check(&Tok::Default)
                && !self.check(&Tok::RBrace)
            {
                body.push(self.parse_statement()?);
            }
            cases.push(Rc::new(Node::new(NodeKind::Case { test, body }, case_pos)));
        }
        Ok(Rc::new(Node::new(NodeKind::Switch { disc, cases, label }, pos)))
    }

    fn parse_with(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::With)?;
        self.expect(&Tok::LParen)?;
        let object = self.parse_expression(false)?;
        self.expect(&Tok::RParen)?;
        let body = self.parse_statement()?;
        Ok(Rc::new(Node::new(NodeKind::With { object, body }, pos)))
    }

    fn parse_try(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::Try)?;
        let block = self.parse_block()?;
        let catch = if self.eat(&Tok::Catch)? {
            self.expect(&Tok::LParen)?;
            let name = self.expect_identifier()?;
            self.expect(&Tok::RParen)?;
            Some((name, self.parse_block()?))
        } else {
            None
        };
        let finally = if self.eat(&Tok::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("expected 'catch' or 'finally'"));
        }
        Ok(Rc::new(Node::new(
            NodeKind::Try {
                block,
                catch,
                finally,
            },
            pos,
        )))
    }

    fn parse_labeled(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        let name = self.expect_identifier()?;
        self.expect(&Tok::Colon)?;
        let body = match &self.current.tok {
            Tok::While => self.parse_while(Some(Rc::clone(&name)))?,
            Tok::Do => self.parse_do_while(Some(Rc::clone(&name)))?,
            Tok::For => self.parse_for(Some(Rc::clone(&name)))?,
            Tok::Switch => self.parse_switch(Some(Rc::clone(&name)))?,
            _ => self.parse_statement()?,
        };
        Ok(Rc::new(Node::new(NodeKind::Label { name, body }, pos)))
    }

    fn parse_function_declaration(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::Function)?;
        let name = self.expect_identifier()?;
        let func = self.parse_function_rest(Some(name))?;
        Ok(Rc::new(Node::new(NodeKind::FunctionDecl { func }, pos)))
    }

    fn parse_function_rest(&mut self, name: Option<Name>) -> PResult<Rc<FunctionNode>> {
        self.expect(&Tok::LParen)?;
        let mut params = Vec::new();
        if !self.check(&Tok::RParen) {
            loop {
                let param_name = self.expect_identifier()?;
                let default = if self.eat(&Tok::Assign)? {
                    Some(self.parse_assignment(false)?)
                } else {
                    None
                };
                params.push(Param {
                    name: param_name,
                    default,
                });
                if !self.eat(&Tok::Comma)? {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        let body = self.parse_block()?;
        Ok(Rc::new(FunctionNode { name, params, body }))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self, no_in: bool) -> PResult<Rc<Node>> {
        let mut expr = self.parse_assignment(no_in)?;
        while self.check(&Tok::Comma) {
            let pos = self.pos();
            self.advance()?;
            let right = self.parse_assignment(no_in)?;
            expr = Rc::new(Node::new(
                NodeKind::Binary {
                    op: BinaryOp::Comma,
                    left: expr,
                    right,
                },
                pos,
            ));
        }
        Ok(expr)
    }

    fn parse_assignment(&mut self, no_in: bool) -> PResult<Rc<Node>> {
        let expr = self.parse_conditional(no_in)?;
        let op = match &self.current.tok {
            Tok::Assign => AssignOp::Assign,
            Tok::PlusAssign => AssignOp::Add,
            Tok::MinusAssign => AssignOp::Sub,
            Tok::StarAssign => AssignOp::Mul,
            Tok::SlashAssign => AssignOp::Div,
            Tok::PercentAssign => AssignOp::Rem,
            Tok::BitAndAssign => AssignOp::BitAnd,
            Tok::BitOrAssign => AssignOp::BitOr,
            Tok::BitXorAssign => AssignOp::BitXor,
            Tok::ShlAssign => AssignOp::Shl,
            Tok::ShrAssign => AssignOp::Shr,
            Tok::UShrAssign => AssignOp::UShr,
            _ => return Ok(expr),
        };
        if !matches!(
            expr.kind,
            NodeKind::Identifier { .. } | NodeKind::Member { .. }
        ) {
            return Err(self.unexpected("invalid assignment target"));
        }
        let pos = self.pos();
        self.advance()?;
        let value = self.parse_assignment(no_in)?;
        Ok(Rc::new(Node::new(
            NodeKind::Assign {
                op,
                target: expr,
                value,
            },
            pos,
        )))
    }

    fn parse_conditional(&mut self, no_in: bool) -> PResult<Rc<Node>> {
        let cond = self.parse_binary(1, no_in)?;
        if !self.check(&Tok::Question) {
            return Ok(cond);
        }
        let pos = self.pos();
        self.advance()?;
        let then_expr = self.parse_assignment(false)?;
        self.expect(&Tok::Colon)?;
        let else_expr = self.parse_assignment(no_in)?;
        Ok(Rc::new(Node::new(
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            },
            pos,
        )))
    }

    fn binary_op(&self, no_in: bool) -> Option<(BinaryOp, u8)> {
        let entry = match &self.current.tok {
            Tok::OrOr => (BinaryOp::LogicalOr, 1),
            Tok::AndAnd => (BinaryOp::LogicalAnd, 2),
            Tok::BitOr => (BinaryOp::BitOr, 3),
            Tok::BitXor => (BinaryOp::BitXor, 4),
            Tok::BitAnd => (BinaryOp::BitAnd, 5),
            Tok::Eq => (BinaryOp::Eq, 6),
            Tok::NotEq => (BinaryOp::NotEq, 6),
            Tok::StrictEq => (BinaryOp::StrictEq, 6),
            Tok::StrictNotEq => (BinaryOp::StrictNotEq, 6),
            Tok::Lt => (BinaryOp::Lt, 7),
            Tok::LtEq => (BinaryOp::LtEq, 7),
            Tok::Gt => (BinaryOp::Gt, 7),
            Tok::GtEq => (BinaryOp::GtEq, 7),
            Tok::InstanceOf => (BinaryOp::InstanceOf, 7),
            Tok::In if !no_in => (BinaryOp::In, 7),
            Tok::Shl => (BinaryOp::Shl, 8),
            Tok::Shr => (BinaryOp::Shr, 8),
            Tok::UShr => (BinaryOp::UShr, 8),
            Tok::Plus => (BinaryOp::Add, 9),
            Tok::Minus => (BinaryOp::Sub, 9),
            Tok::Star => (BinaryOp::Mul, 10),
            Tok::Slash => (BinaryOp::Div, 10),
            Tok::Percent => (BinaryOp::Rem, 10),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> PResult<Rc<Node>> {
        let mut left = self.parse_unary(no_in)?;
        while let Some((op, prec)) = self.binary_op(no_in) {
            if prec < min_prec {
                break;
            }
            let pos = self.pos();
            self.advance()?;
            let right = self.parse_binary(prec + 1, no_in)?;
            left = Rc::new(Node::new(NodeKind::Binary { op, left, right }, pos));
        }
        Ok(left)
    }

    fn parse_unary(&mut self, no_in: bool) -> PResult<Rc<Node>> {
        let pos = self.pos();
        let op = match &self.current.tok {
            Tok::Not => Some(UnaryOp::Not),
            Tok::BitNot => Some(UnaryOp::BitNot),
            Tok::Plus => Some(UnaryOp::Plus),
            Tok::Minus => Some(UnaryOp::Minus),
            Tok::TypeOf => Some(UnaryOp::TypeOf),
            Tok::Void => Some(UnaryOp::Void),
            Tok::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let expr = self.parse_unary(no_in)?;
            return Ok(Rc::new(Node::new(NodeKind::Unary { op, expr }, pos)));
        }
        if self.check(&Tok::PlusPlus) || self.check(&Tok::MinusMinus) {
            let op = if self.check(&Tok::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance()?;
            let expr = self.parse_unary(no_in)?;
            if !matches!(
                expr.kind,
                NodeKind::Identifier { .. } | NodeKind::Member { .. }
            ) {
                return Err(self.unexpected("invalid increment target"));
            }
            return Ok(Rc::new(Node::new(
                NodeKind::Update {
                    op,
                    prefix: true,
                    expr,
                },
                pos,
            )));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Rc<Node>> {
        let expr = self.parse_left_hand_side()?;
        if self.check(&Tok::PlusPlus) || self.check(&Tok::MinusMinus) {
            let pos = self.pos();
            let op = if self.check(&Tok::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            if !matches!(
                expr.kind,
                NodeKind::Identifier { .. } | NodeKind::Member { .. }
            ) {
                return Err(self.unexpected("invalid increment target"));
            }
            self.advance()?;
            return Ok(Rc::new(Node::new(
                NodeKind::Update {
                    op,
                    prefix: false,
                    expr,
                },
                pos,
            )));
        }
        Ok(expr)
    }

    fn parse_left_hand_side(&mut self) -> PResult<Rc<Node>> {
        let mut expr = if self.check(&Tok::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            match &self.current.tok {
                Tok::Dot => {
                    let pos = self.pos();
                    self.advance()?;
                    let name = self.expect_identifier()?;
                    expr = Rc::new(Node::new(
                        NodeKind::Member {
                            object: expr,
                            key: MemberKey::Name(name),
                        },
                        pos,
                    ));
                }
                Tok::LBracket => {
                    let pos = self.pos();
                    self.advance()?;
                    let key = self.parse_expression(false)?;
                    self.expect(&Tok::RBracket)?;
                    expr = Rc::new(Node::new(
                        NodeKind::Member {
                            object: expr,
                            key: MemberKey::Computed(key),
                        },
                        pos,
                    ));
                }
                Tok::LParen => {
                    let pos = self.pos();
                    let args = self.parse_arguments()?;
                    expr = Rc::new(Node::new(NodeKind::Call { callee: expr, args }, pos));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `new Expr(...)` — the callee takes member suffixes but not calls, so
    /// `new a.b.C(1)` parses as constructing `a.b.C`.
    fn parse_new(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::New)?;
        let mut callee = if self.check(&Tok::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            match &self.current.tok {
                Tok::Dot => {
                    let member_pos = self.pos();
                    self.advance()?;
                    let name = self.expect_identifier()?;
                    callee = Rc::new(Node::new(
                        NodeKind::Member {
                            object: callee,
                            key: MemberKey::Name(name),
                        },
                        member_pos,
                    ));
                }
                Tok::LBracket => {
                    let member_pos = self.pos();
                    self.advance()?;
                    let key = self.parse_expression(false)?;
                    self.expect(&Tok::RBracket)?;
                    callee = Rc::new(Node::new(
                        NodeKind::Member {
                            object: callee,
                            key: MemberKey::Computed(key),
                        },
                        member_pos,
                    ));
                }
                _ => break,
            }
        }
        let args = if self.check(&Tok::LParen) {
            self.parse_arguments()?
        } else {
            vec![]
        };
        Ok(Rc::new(Node::new(NodeKind::New { callee, args }, pos)))
    }

    fn parse_arguments(&mut self) -> PResult<Vec<Rc<Node>>> {
        self.expect(&Tok::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Tok::RParen) {
            loop {
                args.push(self.parse_assignment(false)?);
                if !self.eat(&Tok::Comma)? {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        match &self.current.tok {
            Tok::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Rc::new(Node::new(
                    NodeKind::Literal {
                        value: Literal::Number(value),
                    },
                    pos,
                )))
            }
            Tok::Str(text) => {
                let text: Rc<str> = Rc::from(text.as_str());
                self.advance()?;
                Ok(Rc::new(Node::new(
                    NodeKind::Literal {
                        value: Literal::Str(text),
                    },
                    pos,
                )))
            }
            Tok::True | Tok::False => {
                let value = self.check(&Tok::True);
                self.advance()?;
                Ok(Rc::new(Node::new(
                    NodeKind::Literal {
                        value: Literal::Bool(value),
                    },
                    pos,
                )))
            }
            Tok::Null => {
                self.advance()?;
                Ok(Rc::new(Node::new(
                    NodeKind::Literal {
                        value: Literal::Null,
                    },
                    pos,
                )))
            }
            Tok::This => {
                self.advance()?;
                Ok(Rc::new(Node::new(NodeKind::This, pos)))
            }
            Tok::Identifier(name) => {
                // `undefined` is an identifier, resolved through the global
                // binding like any other name.
                let name: Name = Rc::from(name.as_str());
                self.advance()?;
                Ok(Rc::new(Node::new(NodeKind::Identifier { name }, pos)))
            }
            Tok::Function => {
                self.advance()?;
                let name = if let Tok::Identifier(n) = &self.current.tok {
                    let n: Name = Rc::from(n.as_str());
                    self.advance()?;
                    Some(n)
                } else {
                    None
                };
                let func = self.parse_function_rest(name)?;
                Ok(Rc::new(Node::new(NodeKind::FunctionExpr { func }, pos)))
            }
            Tok::LParen => {
                self.advance()?;
                let expr = self.parse_expression(false)?;
                self.expect(&Tok::RParen)?;
                Ok(expr)
            }
            Tok::LBracket => self.parse_array_literal(),
            Tok::LBrace => self.parse_object_literal(),
            _ => Err(self.unexpected("expected expression")),
        }
    }

    fn parse_array_literal(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::LBracket)?;
        let mut items = Vec::new();
        loop {
            if self.eat(&Tok::RBracket)? {
                break;
            }
            if self.eat(&Tok::Comma)? {
                // elision: hole before this comma
                items.push(None);
                continue;
            }
            items.push(Some(self.parse_assignment(false)?));
            if self.eat(&Tok::Comma)? {
                continue;
            }
            self.expect(&Tok::RBracket)?;
            break;
        }
        Ok(Rc::new(Node::new(NodeKind::ArrayLiteral { items }, pos)))
    }

    fn parse_object_literal(&mut self) -> PResult<Rc<Node>> {
        let pos = self.pos();
        self.expect(&Tok::LBrace)?;
        let mut props = Vec::new();
        if !self.check(&Tok::RBrace) {
            loop {
                let key: Name = match &self.current.tok {
                    Tok::Identifier(name) => Rc::from(name.as_str()),
                    Tok::Str(text) => Rc::from(text.as_str()),
                    Tok::Number(value) => Rc::from(number_to_string(*value).as_str()),
                    tok if keyword_as_key(tok).is_some() => {
                        Rc::from(keyword_as_key(tok).expect("checked above"))
                    }
                    _ => return Err(self.unexpected("expected property name")),
                };
                self.advance()?;
                self.expect(&Tok::Colon)?;
                let value = self.parse_assignment(false)?;
                props.push((key, value));
                if !self.eat(&Tok::Comma)? {
                    break;
                }
                if self.check(&Tok::RBrace) {
                    break;
                }
            }
        }
        self.expect(&Tok::RBrace)?;
        Ok(Rc::new(Node::new(NodeKind::ObjectLiteral { props }, pos)))
    }
}

/// Keywords are legal property names in object literals (`{ new: 1 }`).
fn keyword_as_key(tok: &Tok) -> Option<&'static str> {
    let name = match tok {
        Tok::Var => "var",
        Tok::If => "if",
        Tok::Else => "else",
        Tok::While => "while",
        Tok::Do => "do",
        Tok::For => "for",
        Tok::In => "in",
        Tok::Of => "of",
        Tok::Switch => "switch",
        Tok::Case => "case",
        Tok::Default => "default",
        Tok::Function => "function",
        Tok::Return => "return",
        Tok::Break => "break",
        Tok::Continue => "continue",
        Tok::With => "with",
        Tok::Try => "try",
        Tok::Catch => "catch",
        Tok::Finally => "finally",
        Tok::Throw => "throw",
        Tok::New => "new",
        Tok::InstanceOf => "instanceof",
        Tok::True => "true",
        Tok::False => "false",
        Tok::Null => "null",
        Tok::This => "this",
        Tok::TypeOf => "typeof",
        Tok::Void => "void",
        Tok::Delete => "delete",
        Tok::Include => "include",
        _ => return None,
    };
    Some(name)
}

fn resolve_include_path(including: &str, rel: &str) -> PathBuf {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return rel_path.to_path_buf();
    }
    match Path::new(including).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(rel_path),
        _ => rel_path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Rc<Node> {
        parse_eval(src, "test.js").expect("parse failure")
    }

    fn body(node: &Rc<Node>) -> &Vec<Rc<Node>> {
        match &node.kind {
            NodeKind::Program { body } => body,
            other => panic!("expected program, got {other:?}"),
        }
    }

    #[test]
    fn precedence_mul_over_add() {
        let program = parse("1 + 2 * 3;");
        let NodeKind::ExprStmt { expr } = &body(&program)[0].kind else {
            panic!("expected expression statement");
        };
        let NodeKind::Binary { op, right, .. } = &expr.kind else {
            panic!("expected binary node");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.kind,
            NodeKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse("a = b = 1;");
        let NodeKind::ExprStmt { expr } = &body(&program)[0].kind else {
            panic!("expected expression statement");
        };
        let NodeKind::Assign { value, .. } = &expr.kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, NodeKind::Assign { .. }));
    }

    #[test]
    fn new_binds_member_chain() {
        let program = parse("new a.b(1);");
        let NodeKind::ExprStmt { expr } = &body(&program)[0].kind else {
            panic!("expected expression statement");
        };
        let NodeKind::New { callee, args } = &expr.kind else {
            panic!("expected new expression");
        };
        assert!(matches!(callee.kind, NodeKind::Member { .. }));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn for_in_with_var() {
        let program = parse("for (var k in obj) {}");
        assert!(matches!(
            body(&program)[0].kind,
            NodeKind::ForIn { is_var: true, .. }
        ));
    }

    #[test]
    fn labeled_loop_records_label() {
        let program = parse("outer: while (true) { break outer; }");
        let NodeKind::Label { name, body: inner } = &body(&program)[0].kind else {
            panic!("expected label node");
        };
        assert_eq!(&**name, "outer");
        let NodeKind::While { label, .. } = &inner.kind else {
            panic!("expected while loop");
        };
        assert_eq!(label.as_deref(), Some("outer"));
    }

    #[test]
    fn array_elisions_are_holes() {
        let program = parse("[1, , 3];");
        let NodeKind::ExprStmt { expr } = &body(&program)[0].kind else {
            panic!("expected expression statement");
        };
        let NodeKind::ArrayLiteral { items } = &expr.kind else {
            panic!("expected array literal");
        };
        assert_eq!(items.len(), 3);
        assert!(items[0].is_some());
        assert!(items[1].is_none());
        assert!(items[2].is_some());
    }

    #[test]
    fn include_rejected_in_eval() {
        assert!(parse_eval("include \"x.js\";", "test.js").is_err());
    }

    #[test]
    fn include_must_lead_the_file() {
        let err = parse_eval("var a = 1; include \"x.js\";", "test.js");
        assert!(err.is_err());
    }

    #[test]
    fn keywords_as_object_keys() {
        let program = parse("var o = { new: 1, delete: 2 };");
        assert!(matches!(body(&program)[0].kind, NodeKind::Var { .. }));
    }
}
