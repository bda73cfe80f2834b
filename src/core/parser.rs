use crate::core::{STACK_GROW_SIZE, STACK_RED_ZONE, ScriptId, Statement, StatementKind, Token, TokenData, tokenize_with_offset};
use crate::ic::{AllocationSite, FeedbackSlotKind};
use crate::js_function::FunctionTemplate;
use crate::{JSError, raise_parse_error, raise_parse_error_with_token};
use std::rc::Rc;

/// Runtime intrinsics reachable through `%Name(...)`.
pub const INTRINSICS: &[&str] = &[
    "GetFeedback",
    "PrepareFunctionForOptimization",
    "HasSmiElements",
    "HasDoubleElements",
    "HasObjectElements",
    "HasHoleyElements",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    TypeOf,
    Void,
}

#[derive(Debug, Clone)]
pub enum PropertyName {
    Static(String),
    Computed(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    This,
    Var(String),
    Array(Vec<Option<Expr>>, Rc<AllocationSite>),
    Object(Vec<(PropertyName, Expr)>),
    Function(Rc<FunctionTemplate>),
    Property(Box<Expr>, String),
    /// Keyed load; the `usize` is the feedback slot.
    Index(Box<Expr>, Box<Expr>, usize),
    Call(Box<Expr>, Vec<Expr>),
    New(Box<Expr>, Vec<Expr>, Rc<AllocationSite>),
    Assign(Box<Expr>, Box<Expr>),
    /// Keyed store; the `usize` is the feedback slot.
    AssignIndex(Box<Expr>, Box<Expr>, Box<Expr>, usize),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    LogicalAnd(Box<Expr>, Box<Expr>),
    LogicalOr(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Delete(Box<Expr>),
    Update { name: String, delta: f64, prefix: bool },
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Await(Box<Expr>),
    Intrinsic(String, Vec<Expr>),
}

/// What kind of source is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseGoal {
    /// Classic script: no top-level `await` or `using`.
    Script,
    /// REPL-mode evaluation: top-level `await` and `using` allowed.
    Repl,
    /// Evaluation on a paused call frame, same allowances as REPL mode.
    DebugEvaluate,
    /// Body of a compiled function: `return` and `using` allowed, `await` not.
    FunctionBody,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub script_id: ScriptId,
    pub goal: ParseGoal,
    pub line_offset: usize,
    pub column_offset: usize,
    pub params: Vec<String>,
    pub allow_natives_syntax: bool,
}

impl CompileOptions {
    pub fn new(script_id: ScriptId, goal: ParseGoal) -> Self {
        CompileOptions {
            script_id,
            goal,
            line_offset: 0,
            column_offset: 0,
            params: Vec::new(),
            allow_natives_syntax: false,
        }
    }
}

struct FunctionContext {
    is_async: bool,
    is_strict: bool,
    slots: Vec<FeedbackSlotKind>,
    block_depth: usize,
    loop_depth: usize,
    top_level_using: bool,
    allow_return: bool,
}

impl FunctionContext {
    fn function(is_async: bool, is_strict: bool) -> Self {
        FunctionContext {
            is_async,
            is_strict,
            slots: Vec::new(),
            block_depth: 0,
            loop_depth: 0,
            top_level_using: true,
            allow_return: true,
        }
    }
}

pub struct Parser {
    tokens: Vec<TokenData>,
    pos: usize,
    script_id: ScriptId,
    allow_natives_syntax: bool,
    contexts: Vec<FunctionContext>,
}

/// Compiles a whole source text into the template of its top-level code.
pub fn parse_program(source: &str, options: &CompileOptions) -> Result<Rc<FunctionTemplate>, JSError> {
    let tokens = tokenize_with_offset(source, options.line_offset, options.column_offset)?;
    let mut parser = Parser::new(tokens, options.script_id, options.allow_natives_syntax);
    let (is_async, top_level_using, allow_return) = match options.goal {
        ParseGoal::Script => (false, false, false),
        ParseGoal::Repl | ParseGoal::DebugEvaluate => (true, true, false),
        ParseGoal::FunctionBody => (false, true, true),
    };
    parser.contexts.push(FunctionContext {
        top_level_using,
        allow_return,
        ..FunctionContext::function(is_async, false)
    });
    let strict = parser.has_use_strict_directive();
    parser.current_context_mut().is_strict = strict;
    let mut body = Vec::new();
    while !parser.at_end() {
        body.push(parser.parse_statement()?);
    }
    let ctx = parser.pop_context();
    log::trace!("parsed {:?} with {} statements, {} feedback slots", options.goal, body.len(), ctx.slots.len());
    Ok(Rc::new(FunctionTemplate::new(
        String::new(),
        options.params.clone(),
        body,
        is_async,
        false,
        ctx.is_strict,
        options.script_id,
        (options.line_offset, options.column_offset),
        ctx.slots,
    )))
}

impl Parser {
    pub fn new(tokens: Vec<TokenData>, script_id: ScriptId, allow_natives_syntax: bool) -> Self {
        Parser {
            tokens,
            pos: 0,
            script_id,
            allow_natives_syntax,
            contexts: Vec::new(),
        }
    }

    // ---- token helpers ----

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    pub(crate) fn advance(&mut self) -> Option<TokenData> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Current position, or the end of the last token at end of input.
    pub(crate) fn position(&self) -> (usize, usize) {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(t) => (t.line, t.column),
            None => (0, 0),
        }
    }

    pub(crate) fn error_here(&self, message: impl std::fmt::Display) -> JSError {
        match self.tokens.get(self.pos) {
            Some(t) => raise_parse_error_with_token!(message, t),
            None => {
                let (line, column) = self.position();
                raise_parse_error!(format!("{message} (unexpected end of input)"), line, column)
            }
        }
    }

    pub(crate) fn unexpected(&self) -> JSError {
        match self.peek() {
            Some(t) => self.error_here(format!("Unexpected token {:?}", t)),
            None => self.error_here("Unexpected end of input"),
        }
    }

    pub(crate) fn expect(&mut self, token: &Token) -> Result<(), JSError> {
        if self.eat(token) { Ok(()) } else { Err(self.unexpected()) }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, JSError> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(Token::Async) => {
                self.pos += 1;
                Ok("async".to_string())
            }
            _ => Err(self.unexpected()),
        }
    }

    /// True when the token at `offset` starts a new source line.
    pub(crate) fn newline_before(&self, offset: usize) -> bool {
        let idx = self.pos + offset;
        match (idx.checked_sub(1).and_then(|p| self.tokens.get(p)), self.tokens.get(idx)) {
            (Some(prev), Some(cur)) => cur.line > prev.line,
            _ => false,
        }
    }

    /// Automatic semicolon insertion at a statement end.
    pub(crate) fn consume_semicolon(&mut self) -> Result<(), JSError> {
        if self.eat(&Token::Semicolon) || self.at_end() || self.check(&Token::RBrace) || self.newline_before(0) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // ---- function contexts ----

    fn current_context_mut(&mut self) -> &mut FunctionContext {
        let last = self.contexts.len() - 1;
        &mut self.contexts[last]
    }

    fn pop_context(&mut self) -> FunctionContext {
        self.contexts.pop().unwrap_or_else(|| FunctionContext::function(false, false))
    }

    pub(crate) fn await_allowed(&self) -> bool {
        self.contexts.last().is_some_and(|c| c.is_async)
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.contexts.last().is_some_and(|c| c.is_strict)
    }

    pub(crate) fn using_allowed(&self) -> bool {
        self.contexts.last().is_some_and(|c| c.block_depth > 0 || c.top_level_using)
    }

    pub(crate) fn return_allowed(&self) -> bool {
        self.contexts.last().is_some_and(|c| c.allow_return)
    }

    pub(crate) fn in_loop(&self) -> bool {
        self.contexts.last().is_some_and(|c| c.loop_depth > 0)
    }

    pub(crate) fn enter_block(&mut self) {
        self.current_context_mut().block_depth += 1;
    }

    pub(crate) fn leave_block(&mut self) {
        self.current_context_mut().block_depth -= 1;
    }

    pub(crate) fn enter_loop(&mut self) {
        self.current_context_mut().loop_depth += 1;
    }

    pub(crate) fn leave_loop(&mut self) {
        self.current_context_mut().loop_depth -= 1;
    }

    fn allocate_slot(&mut self, kind: FeedbackSlotKind) -> usize {
        let ctx = self.current_context_mut();
        ctx.slots.push(kind);
        ctx.slots.len() - 1
    }

    /// Whether the directive prologue ahead contains `"use strict"`. The
    /// directives themselves are still parsed as expression statements.
    fn has_use_strict_directive(&self) -> bool {
        let mut i = self.pos;
        while let Some(TokenData {
            token: Token::StringLit(s), ..
        }) = self.tokens.get(i)
        {
            if s == "use strict" {
                return true;
            }
            i += 1;
            if self.tokens.get(i).map(|t| &t.token) == Some(&Token::Semicolon) {
                i += 1;
            }
        }
        false
    }

    // ---- functions ----

    /// Parses `(params) { body }` after the function name.
    pub(crate) fn parse_function_rest(&mut self, name: String, is_async: bool, start: (usize, usize)) -> Result<Rc<FunctionTemplate>, JSError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.eat(&Token::RParen) {
            params.push(self.expect_identifier()?);
            if !self.check(&Token::RParen) {
                self.expect(&Token::Comma)?;
            }
        }
        self.parse_function_body(name, params, is_async, false, start)
    }

    fn parse_function_body(
        &mut self,
        name: String,
        params: Vec<String>,
        is_async: bool,
        is_arrow: bool,
        start: (usize, usize),
    ) -> Result<Rc<FunctionTemplate>, JSError> {
        self.expect(&Token::LBrace)?;
        let inherited_strict = self.is_strict();
        self.contexts.push(FunctionContext::function(is_async, inherited_strict));
        let result = self.parse_function_statements();
        let ctx = self.pop_context();
        let body = result?;
        Ok(Rc::new(FunctionTemplate::new(
            name,
            params,
            body,
            is_async,
            is_arrow,
            ctx.is_strict,
            self.script_id,
            start,
            ctx.slots,
        )))
    }

    fn parse_function_statements(&mut self) -> Result<Vec<Statement>, JSError> {
        if self.has_use_strict_directive() {
            self.current_context_mut().is_strict = true;
        }
        let mut body = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.at_end() {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_arrow_body(&mut self, params: Vec<String>, is_async: bool, start: (usize, usize)) -> Result<Expr, JSError> {
        self.expect(&Token::Arrow)?;
        if self.check(&Token::LBrace) {
            let template = self.parse_function_body(String::new(), params, is_async, true, start)?;
            return Ok(Expr::Function(template));
        }
        let inherited_strict = self.is_strict();
        self.contexts.push(FunctionContext::function(is_async, inherited_strict));
        let (line, column) = self.position();
        let result = self.parse_assignment();
        let ctx = self.pop_context();
        let expr = result?;
        let body = vec![Statement {
            kind: StatementKind::Return(Some(expr)),
            line,
            column,
        }];
        Ok(Expr::Function(Rc::new(FunctionTemplate::new(
            String::new(),
            params,
            body,
            is_async,
            true,
            ctx.is_strict,
            self.script_id,
            start,
            ctx.slots,
        ))))
    }

    /// Index of the `)` matching the `(` at `open`.
    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, t) in self.tokens.iter().enumerate().skip(open) {
            match t.token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn try_parse_arrow(&mut self) -> Result<Option<Expr>, JSError> {
        let start = self.position();
        let is_async = self.check(&Token::Async)
            && !self.newline_before(1)
            && matches!(self.peek_at(1), Some(Token::Identifier(_)) | Some(Token::LParen));
        let offset = usize::from(is_async);
        match self.peek_at(offset) {
            Some(Token::Identifier(name)) if self.peek_at(offset + 1) == Some(&Token::Arrow) => {
                let name = name.clone();
                self.pos += offset + 1;
                self.parse_arrow_body(vec![name], is_async, start).map(Some)
            }
            Some(Token::LParen) => {
                let Some(close) = self.matching_paren(self.pos + offset) else {
                    return Ok(None);
                };
                if self.tokens.get(close + 1).map(|t| &t.token) != Some(&Token::Arrow) {
                    return Ok(None);
                }
                self.pos += offset + 1;
                let mut params = Vec::new();
                while !self.eat(&Token::RParen) {
                    params.push(self.expect_identifier()?);
                    if !self.check(&Token::RParen) {
                        self.expect(&Token::Comma)?;
                    }
                }
                self.parse_arrow_body(params, is_async, start).map(Some)
            }
            _ => Ok(None),
        }
    }

    // ---- expressions ----

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, JSError> {
        self.parse_assignment()
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, JSError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.parse_assignment_inner())
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, JSError> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        let lhs = self.parse_conditional()?;
        if !self.check(&Token::Assign) {
            return Ok(lhs);
        }
        let assign_token = self.advance();
        let rhs = self.parse_assignment()?;
        match lhs {
            Expr::Var(_) | Expr::Property(..) => Ok(Expr::Assign(Box::new(lhs), Box::new(rhs))),
            Expr::Index(obj, key, slot) => {
                let strict = self.is_strict();
                self.current_context_mut().slots[slot] = FeedbackSlotKind::store(strict);
                Ok(Expr::AssignIndex(obj, key, Box::new(rhs), slot))
            }
            _ => Err(match assign_token {
                Some(t) => raise_parse_error_with_token!("Invalid left-hand side in assignment", t),
                None => self.error_here("Invalid left-hand side in assignment"),
            }),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, JSError> {
        let cond = self.parse_logical_or()?;
        if !self.eat(&Token::QuestionMark) {
            return Ok(cond);
        }
        let then = self.parse_assignment()?;
        self.expect(&Token::Colon)?;
        let otherwise = self.parse_assignment()?;
        Ok(Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn parse_logical_or(&mut self) -> Result<Expr, JSError> {
        let mut left = self.parse_logical_and()?;
        while self.eat(&Token::LogicalOr) {
            let right = self.parse_logical_and()?;
            left = Expr::LogicalOr(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, JSError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::LogicalAnd) {
            let right = self.parse_equality()?;
            left = Expr::LogicalAnd(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Parser) -> Result<Expr, JSError>,
    ) -> Result<Expr, JSError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_equality(&mut self) -> Result<Expr, JSError> {
        self.parse_binary_level(
            &[
                (Token::StrictEqual, BinaryOp::StrictEqual),
                (Token::StrictNotEqual, BinaryOp::StrictNotEqual),
                (Token::Equal, BinaryOp::Equal),
                (Token::NotEqual, BinaryOp::NotEqual),
            ],
            Parser::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, JSError> {
        self.parse_binary_level(
            &[
                (Token::LessThan, BinaryOp::LessThan),
                (Token::GreaterThan, BinaryOp::GreaterThan),
                (Token::LessEqual, BinaryOp::LessEqual),
                (Token::GreaterEqual, BinaryOp::GreaterEqual),
            ],
            Parser::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, JSError> {
        self.parse_binary_level(&[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)], Parser::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, JSError> {
        self.parse_binary_level(
            &[(Token::Multiply, BinaryOp::Mul), (Token::Divide, BinaryOp::Div), (Token::Mod, BinaryOp::Mod)],
            Parser::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, JSError> {
        let op = match self.peek() {
            Some(Token::LogicalNot) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::TypeOf) => UnaryOp::TypeOf,
            Some(Token::Void) => UnaryOp::Void,
            Some(Token::Delete) => {
                self.pos += 1;
                let target = self.parse_unary()?;
                return Ok(Expr::Delete(Box::new(target)));
            }
            Some(Token::Await) => {
                if !self.await_allowed() {
                    return Err(self.error_here("await is only valid in async functions and the top level bodies of modules"));
                }
                self.pos += 1;
                let operand = self.parse_unary()?;
                return Ok(Expr::Await(Box::new(operand)));
            }
            Some(Token::Increment) | Some(Token::Decrement) => {
                let delta = if self.check(&Token::Increment) { 1.0 } else { -1.0 };
                self.pos += 1;
                let name = self.expect_identifier()?;
                return Ok(Expr::Update { name, delta, prefix: true });
            }
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, JSError> {
        let expr = self.parse_call_member()?;
        let delta = match self.peek() {
            Some(Token::Increment) if !self.newline_before(0) => 1.0,
            Some(Token::Decrement) if !self.newline_before(0) => -1.0,
            _ => return Ok(expr),
        };
        match expr {
            Expr::Var(name) => {
                self.pos += 1;
                Ok(Expr::Update { name, delta, prefix: false })
            }
            _ => Err(self.error_here("Invalid left-hand side expression in postfix operation")),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, JSError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.eat(&Token::RParen) {
            args.push(self.parse_assignment()?);
            if !self.check(&Token::RParen) {
                self.expect(&Token::Comma)?;
            }
        }
        Ok(args)
    }

    fn at_member_suffix(&self) -> bool {
        matches!(self.peek(), Some(Token::Dot) | Some(Token::LBracket))
    }

    /// `.name` or `[key]` applied to `expr`.
    fn parse_member_suffix(&mut self, expr: Expr) -> Result<Expr, JSError> {
        if self.eat(&Token::Dot) {
            let name = match self.advance() {
                Some(t) => match t.token.as_identifier_string() {
                    Some(name) => name,
                    None => return Err(raise_parse_error_with_token!("Unexpected token after '.'", t)),
                },
                None => return Err(self.unexpected()),
            };
            return Ok(Expr::Property(Box::new(expr), name));
        }
        self.expect(&Token::LBracket)?;
        let key = self.parse_expression()?;
        self.expect(&Token::RBracket)?;
        let slot = self.allocate_slot(FeedbackSlotKind::LoadKeyed);
        Ok(Expr::Index(Box::new(expr), Box::new(key), slot))
    }

    fn parse_call_member(&mut self) -> Result<Expr, JSError> {
        let mut expr = if self.check(&Token::New) { self.parse_new()? } else { self.parse_primary()? };
        loop {
            if self.check(&Token::LParen) {
                let args = self.parse_arguments()?;
                expr = Expr::Call(Box::new(expr), args);
            } else if self.at_member_suffix() {
                expr = self.parse_member_suffix(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_new(&mut self) -> Result<Expr, JSError> {
        self.expect(&Token::New)?;
        let mut callee = if self.check(&Token::New) { self.parse_new()? } else { self.parse_primary()? };
        while self.at_member_suffix() {
            callee = self.parse_member_suffix(callee)?;
        }
        let args = if self.check(&Token::LParen) { self.parse_arguments()? } else { Vec::new() };
        Ok(Expr::New(Box::new(callee), args, Rc::new(AllocationSite::new())))
    }

    fn parse_primary(&mut self) -> Result<Expr, JSError> {
        let start = self.position();
        let Some(t) = self.advance() else {
            return Err(self.unexpected());
        };
        match t.token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::StringLit(s) => Ok(Expr::String(s)),
            Token::True => Ok(Expr::Boolean(true)),
            Token::False => Ok(Expr::Boolean(false)),
            Token::Null => Ok(Expr::Null),
            Token::This => Ok(Expr::This),
            Token::Identifier(name) => Ok(Expr::Var(name)),
            Token::Async if self.check(&Token::Function) && !self.newline_before(0) => {
                self.pos += 1;
                let name = self.optional_function_name();
                Ok(Expr::Function(self.parse_function_rest(name, true, start)?))
            }
            Token::Async => Ok(Expr::Var("async".to_string())),
            Token::Function => {
                let name = self.optional_function_name();
                Ok(Expr::Function(self.parse_function_rest(name, false, start)?))
            }
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            Token::Mod if self.allow_natives_syntax => {
                let name = self.expect_identifier()?;
                if !INTRINSICS.contains(&name.as_str()) {
                    return Err(raise_parse_error_with_token!(format!("Unknown runtime function %{name}"), t));
                }
                let args = self.parse_arguments()?;
                Ok(Expr::Intrinsic(name, args))
            }
            _ => Err(raise_parse_error_with_token!(format!("Unexpected token {:?}", t.token), t)),
        }
    }

    fn optional_function_name(&mut self) -> String {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                name
            }
            _ => String::new(),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, JSError> {
        let mut elements = Vec::new();
        loop {
            if self.eat(&Token::RBracket) {
                break;
            }
            if self.eat(&Token::Comma) {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment()?));
            if self.eat(&Token::RBracket) {
                break;
            }
            self.expect(&Token::Comma)?;
        }
        Ok(Expr::Array(elements, Rc::new(AllocationSite::new())))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, JSError> {
        let mut properties = Vec::new();
        while !self.eat(&Token::RBrace) {
            let start = self.position();
            let is_async = self.check(&Token::Async)
                && !matches!(
                    self.peek_at(1),
                    Some(Token::Colon) | Some(Token::LParen) | Some(Token::Comma) | Some(Token::RBrace)
                );
            if is_async {
                self.pos += 1;
            }
            let Some(t) = self.advance() else {
                return Err(self.unexpected());
            };
            let (key, method_name) = match &t.token {
                Token::StringLit(s) => (PropertyName::Static(s.clone()), s.clone()),
                Token::Number(n) => {
                    let name = crate::core::format_js_number(*n);
                    (PropertyName::Static(name.clone()), name)
                }
                Token::LBracket => {
                    let expr = self.parse_assignment()?;
                    self.expect(&Token::RBracket)?;
                    let name = computed_name_hint(&expr);
                    (PropertyName::Computed(expr), name)
                }
                other => match other.as_identifier_string() {
                    Some(name) => (PropertyName::Static(name.clone()), name),
                    None => return Err(raise_parse_error_with_token!(format!("Unexpected token {:?}", other), t)),
                },
            };
            let value = if self.check(&Token::LParen) {
                Expr::Function(self.parse_function_rest(method_name, is_async, start)?)
            } else if self.eat(&Token::Colon) {
                self.parse_assignment()?
            } else {
                match (&key, &t.token) {
                    (PropertyName::Static(name), Token::Identifier(_)) => Expr::Var(name.clone()),
                    _ => return Err(self.unexpected()),
                }
            };
            properties.push((key, value));
            if !self.check(&Token::RBrace) {
                self.expect(&Token::Comma)?;
            }
        }
        Ok(Expr::Object(properties))
    }
}

/// Function name given to a method with a computed key, e.g. `[Symbol.dispose]`.
fn computed_name_hint(expr: &Expr) -> String {
    fn path(expr: &Expr) -> Option<String> {
        match expr {
            Expr::Var(name) => Some(name.clone()),
            Expr::Property(obj, name) => path(obj).map(|p| format!("{p}.{name}")),
            Expr::String(s) => Some(s.clone()),
            _ => None,
        }
    }
    match expr {
        Expr::String(s) => s.clone(),
        other => path(other).map(|p| format!("[{p}]")).unwrap_or_default(),
    }
}
