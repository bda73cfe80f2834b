use crate::JSError;
use crate::core::{Expr, Parser, STACK_GROW_SIZE, STACK_RED_ZONE, Token};
use std::rc::Rc;

use crate::js_function::FunctionTemplate;

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Var(Vec<(String, Option<Expr>)>),
    Let(Vec<(String, Option<Expr>)>),
    Const(Vec<(String, Expr)>),
    Using(Vec<(String, Expr)>),
    AwaitUsing(Vec<(String, Expr)>),
    FunctionDeclaration(Rc<FunctionTemplate>),
    Expr(Expr),
    Return(Option<Expr>),
    If(Expr, Vec<Statement>, Option<Vec<Statement>>),
    While(Expr, Vec<Statement>),
    For(Option<Box<Statement>>, Option<Expr>, Option<Expr>, Vec<Statement>),
    Block(Vec<Statement>),
    Break,
    Continue,
    TryCatch {
        body: Vec<Statement>,
        param: Option<String>,
        handler: Option<Vec<Statement>>,
        finalizer: Option<Vec<Statement>>,
    },
    Throw(Expr),
    Debugger,
    Empty,
}

impl Statement {
    /// Whether execution can stop at the start of this statement.
    pub fn is_breakable(&self) -> bool {
        !matches!(
            self.kind,
            StatementKind::FunctionDeclaration(_) | StatementKind::Block(_) | StatementKind::Empty
        )
    }
}

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, JSError> {
        let (line, column) = self.position();
        let kind = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.parse_statement_kind())?;
        log::trace!("parsed statement at {}:{}", line, column);
        Ok(Statement { kind, line, column })
    }

    fn parse_statement_kind(&mut self) -> Result<StatementKind, JSError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };
        match token {
            Token::LBrace => Ok(StatementKind::Block(self.parse_block()?)),
            Token::Semicolon => {
                self.advance();
                Ok(StatementKind::Empty)
            }
            Token::Var | Token::Let | Token::Const => {
                let kind = self.parse_lexical_declaration()?;
                self.consume_semicolon()?;
                Ok(kind)
            }
            Token::Identifier(ref word) if word == "using" && self.starts_using_declaration(1) => {
                if !self.using_allowed() {
                    return Err(self.error_here("Using declaration is not allowed at the top level of a script"));
                }
                self.advance();
                let bindings = self.parse_initialized_bindings("using")?;
                self.consume_semicolon()?;
                Ok(StatementKind::Using(bindings))
            }
            Token::Await if self.peek_at(1) == Some(&Token::Identifier("using".into())) && self.starts_using_declaration(2) => {
                if !self.await_allowed() {
                    return Err(self.error_here("await is only valid in async functions and the top level bodies of modules"));
                }
                if !self.using_allowed() {
                    return Err(self.error_here("Using declaration is not allowed at the top level of a script"));
                }
                self.advance();
                self.advance();
                let bindings = self.parse_initialized_bindings("await using")?;
                self.consume_semicolon()?;
                Ok(StatementKind::AwaitUsing(bindings))
            }
            Token::Function => {
                let start = self.position();
                self.advance();
                let name = self.expect_identifier()?;
                Ok(StatementKind::FunctionDeclaration(self.parse_function_rest(name, false, start)?))
            }
            Token::Async if self.peek_at(1) == Some(&Token::Function) && !self.newline_before(1) => {
                let start = self.position();
                self.advance();
                self.advance();
                let name = self.expect_identifier()?;
                Ok(StatementKind::FunctionDeclaration(self.parse_function_rest(name, true, start)?))
            }
            Token::Return => {
                if !self.return_allowed() {
                    return Err(self.error_here("Illegal return statement"));
                }
                self.advance();
                let value = if self.check(&Token::Semicolon) || self.check(&Token::RBrace) || self.at_end() || self.newline_before(0) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(StatementKind::Return(value))
            }
            Token::If => {
                self.advance();
                self.expect(&Token::LParen)?;
                let cond = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                let then = self.parse_nested_body()?;
                let otherwise = if self.eat(&Token::Else) { Some(self.parse_nested_body()?) } else { None };
                Ok(StatementKind::If(cond, then, otherwise))
            }
            Token::While => {
                self.advance();
                self.expect(&Token::LParen)?;
                let cond = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                self.enter_loop();
                let body = self.parse_nested_body();
                self.leave_loop();
                Ok(StatementKind::While(cond, body?))
            }
            Token::For => self.parse_for(),
            Token::Break | Token::Continue => {
                if !self.in_loop() {
                    return Err(self.error_here(format!("Illegal {} statement", if token == Token::Break { "break" } else { "continue" })));
                }
                self.advance();
                self.consume_semicolon()?;
                Ok(if token == Token::Break { StatementKind::Break } else { StatementKind::Continue })
            }
            Token::Try => self.parse_try(),
            Token::Throw => {
                self.advance();
                if self.newline_before(0) {
                    return Err(self.error_here("Illegal newline after throw"));
                }
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(StatementKind::Throw(value))
            }
            Token::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                Ok(StatementKind::Debugger)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(StatementKind::Expr(expr))
            }
        }
    }

    /// `using` followed by a binding name on the same line.
    fn starts_using_declaration(&self, name_offset: usize) -> bool {
        matches!(self.peek_at(name_offset), Some(Token::Identifier(_))) && !self.newline_before(name_offset)
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, JSError> {
        self.expect(&Token::LBrace)?;
        self.enter_block();
        let mut body = Vec::new();
        let result = loop {
            if self.eat(&Token::RBrace) {
                break Ok(());
            }
            if self.at_end() {
                break Err(self.unexpected());
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(e) => break Err(e),
            }
        };
        self.leave_block();
        result.map(|_| body)
    }

    /// Body of `if`/`while`/`for`: a block or a single statement.
    fn parse_nested_body(&mut self) -> Result<Vec<Statement>, JSError> {
        if self.check(&Token::LBrace) {
            let (line, column) = self.position();
            let body = self.parse_block()?;
            return Ok(vec![Statement {
                kind: StatementKind::Block(body),
                line,
                column,
            }]);
        }
        if self.starts_lexical_declaration() {
            return Err(self.error_here("Lexical declaration cannot appear in a single-statement context"));
        }
        Ok(vec![self.parse_statement()?])
    }

    /// `let`, `const`, `using` or `await using` at the current token.
    fn starts_lexical_declaration(&self) -> bool {
        match self.peek() {
            Some(Token::Let | Token::Const) => true,
            Some(Token::Identifier(word)) if word == "using" => self.starts_using_declaration(1),
            Some(Token::Await) => self.peek_at(1) == Some(&Token::Identifier("using".into())) && self.starts_using_declaration(2),
            _ => false,
        }
    }

    fn parse_lexical_declaration(&mut self) -> Result<StatementKind, JSError> {
        let Some(keyword) = self.advance() else {
            return Err(self.unexpected());
        };
        if keyword.token == Token::Const {
            return Ok(StatementKind::Const(self.parse_initialized_bindings("const")?));
        }
        let mut bindings = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&Token::Assign) { Some(self.parse_assignment()?) } else { None };
            bindings.push((name, init));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(if keyword.token == Token::Var {
            StatementKind::Var(bindings)
        } else {
            StatementKind::Let(bindings)
        })
    }

    fn parse_initialized_bindings(&mut self, what: &str) -> Result<Vec<(String, Expr)>, JSError> {
        let mut bindings = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            if !self.eat(&Token::Assign) {
                return Err(self.error_here(format!("Missing initializer in {what} declaration")));
            }
            bindings.push((name, self.parse_assignment()?));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(bindings)
    }

    fn parse_for(&mut self) -> Result<StatementKind, JSError> {
        self.expect(&Token::For)?;
        self.expect(&Token::LParen)?;
        let init = if self.eat(&Token::Semicolon) {
            None
        } else {
            let (line, column) = self.position();
            let kind = if matches!(self.peek(), Some(Token::Var) | Some(Token::Let) | Some(Token::Const)) {
                self.parse_lexical_declaration()?
            } else {
                StatementKind::Expr(self.parse_expression()?)
            };
            self.expect(&Token::Semicolon)?;
            Some(Box::new(Statement { kind, line, column }))
        };
        let cond = if self.check(&Token::Semicolon) { None } else { Some(self.parse_expression()?) };
        self.expect(&Token::Semicolon)?;
        let update = if self.check(&Token::RParen) { None } else { Some(self.parse_expression()?) };
        self.expect(&Token::RParen)?;
        self.enter_loop();
        let body = self.parse_nested_body();
        self.leave_loop();
        Ok(StatementKind::For(init, cond, update, body?))
    }

    fn parse_try(&mut self) -> Result<StatementKind, JSError> {
        self.expect(&Token::Try)?;
        let body = self.parse_block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat(&Token::Catch) {
            if self.eat(&Token::LParen) {
                param = Some(self.expect_identifier()?);
                self.expect(&Token::RParen)?;
            }
            handler = Some(self.parse_block()?);
        }
        let finalizer = if self.eat(&Token::Finally) { Some(self.parse_block()?) } else { None };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here("Missing catch or finally after try"));
        }
        Ok(StatementKind::TryCatch {
            body,
            param,
            handler,
            finalizer,
        })
    }
}

/// `var` names declared in `body`, not looking into nested functions.
pub fn collect_var_names(body: &[Statement], names: &mut Vec<String>) {
    for stmt in body {
        match &stmt.kind {
            StatementKind::Var(bindings) => {
                for (name, _) in bindings {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
            StatementKind::If(_, then, otherwise) => {
                collect_var_names(then, names);
                if let Some(otherwise) = otherwise {
                    collect_var_names(otherwise, names);
                }
            }
            StatementKind::While(_, body) | StatementKind::Block(body) => collect_var_names(body, names),
            StatementKind::For(init, _, _, body) => {
                if let Some(init) = init {
                    collect_var_names(std::slice::from_ref(init.as_ref()), names);
                }
                collect_var_names(body, names);
            }
            StatementKind::TryCatch {
                body, handler, finalizer, ..
            } => {
                collect_var_names(body, names);
                for block in [handler, finalizer].into_iter().flatten() {
                    collect_var_names(block, names);
                }
            }
            _ => {}
        }
    }
}

/// Start positions of breakable statements in `body`, nested function bodies
/// included.
pub fn collect_breakable_locations(body: &[Statement], out: &mut Vec<(usize, usize)>) {
    for stmt in body {
        if stmt.is_breakable() {
            out.push((stmt.line, stmt.column));
        }
        match &stmt.kind {
            StatementKind::FunctionDeclaration(template) => collect_breakable_locations(&template.body, out),
            StatementKind::If(cond, then, otherwise) => {
                collect_expr_functions(cond, out);
                collect_breakable_locations(then, out);
                if let Some(otherwise) = otherwise {
                    collect_breakable_locations(otherwise, out);
                }
            }
            StatementKind::While(cond, body) => {
                collect_expr_functions(cond, out);
                collect_breakable_locations(body, out);
            }
            StatementKind::Block(body) => collect_breakable_locations(body, out),
            StatementKind::For(init, cond, update, body) => {
                if let Some(init) = init {
                    collect_breakable_locations(std::slice::from_ref(init.as_ref()), out);
                }
                for e in [cond, update].into_iter().flatten() {
                    collect_expr_functions(e, out);
                }
                collect_breakable_locations(body, out);
            }
            StatementKind::TryCatch {
                body, handler, finalizer, ..
            } => {
                collect_breakable_locations(body, out);
                for block in [handler, finalizer].into_iter().flatten() {
                    collect_breakable_locations(block, out);
                }
            }
            StatementKind::Var(bindings) | StatementKind::Let(bindings) => {
                for (_, init) in bindings {
                    if let Some(init) = init {
                        collect_expr_functions(init, out);
                    }
                }
            }
            StatementKind::Const(bindings) | StatementKind::Using(bindings) | StatementKind::AwaitUsing(bindings) => {
                for (_, init) in bindings {
                    collect_expr_functions(init, out);
                }
            }
            StatementKind::Expr(e) | StatementKind::Throw(e) | StatementKind::Return(Some(e)) => collect_expr_functions(e, out),
            _ => {}
        }
    }
}

/// Function literals nested in an expression contribute their bodies.
fn collect_expr_functions(expr: &Expr, out: &mut Vec<(usize, usize)>) {
    match expr {
        Expr::Function(template) => collect_breakable_locations(&template.body, out),
        Expr::Array(elements, _) => {
            for e in elements.iter().flatten() {
                collect_expr_functions(e, out);
            }
        }
        Expr::Object(props) => {
            for (key, value) in props {
                if let crate::core::PropertyName::Computed(k) = key {
                    collect_expr_functions(k, out);
                }
                collect_expr_functions(value, out);
            }
        }
        Expr::Property(obj, _) => collect_expr_functions(obj, out),
        Expr::Index(a, b, _) | Expr::Assign(a, b) | Expr::Binary(_, a, b) | Expr::LogicalAnd(a, b) | Expr::LogicalOr(a, b) => {
            collect_expr_functions(a, out);
            collect_expr_functions(b, out);
        }
        Expr::AssignIndex(a, b, c, _) | Expr::Conditional(a, b, c) => {
            for e in [a, b, c] {
                collect_expr_functions(e, out);
            }
        }
        Expr::Call(callee, args) | Expr::New(callee, args, _) => {
            collect_expr_functions(callee, out);
            for arg in args {
                collect_expr_functions(arg, out);
            }
        }
        Expr::Intrinsic(_, args) => {
            for arg in args {
                collect_expr_functions(arg, out);
            }
        }
        Expr::Unary(_, e) | Expr::Delete(e) | Expr::Await(e) => collect_expr_functions(e, out),
        _ => {}
    }
}
