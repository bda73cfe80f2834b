use crate::{JSError, raise_tokenize_error};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    StringLit(String),
    Identifier(String),
    Plus,
    Minus,
    Multiply,
    Divide,
    Mod,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Dot,
    Comma,
    Semicolon,
    QuestionMark,
    Assign,
    Equal,
    StrictEqual,
    NotEqual,
    StrictNotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    LogicalNot,
    LogicalAnd,
    LogicalOr,
    Increment,
    Decrement,
    Arrow,
    Var,
    Let,
    Const,
    Function,
    Async,
    Await,
    Return,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    Delete,
    TypeOf,
    Void,
    This,
    True,
    False,
    Null,
    Debugger,
}

impl Token {
    /// The identifier spelling of a token usable as a property name.
    pub fn as_identifier_string(&self) -> Option<String> {
        let name = match self {
            Token::Identifier(name) => return Some(name.clone()),
            Token::Var => "var",
            Token::Let => "let",
            Token::Const => "const",
            Token::Function => "function",
            Token::Async => "async",
            Token::Await => "await",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Finally => "finally",
            Token::Throw => "throw",
            Token::New => "new",
            Token::Delete => "delete",
            Token::TypeOf => "typeof",
            Token::Void => "void",
            Token::This => "this",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Debugger => "debugger",
            _ => return None,
        };
        Some(name.to_string())
    }

    fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "var" => Token::Var,
            "let" => Token::Let,
            "const" => Token::Const,
            "function" => Token::Function,
            "async" => Token::Async,
            "await" => Token::Await,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "try" => Token::Try,
            "catch" => Token::Catch,
            "finally" => Token::Finally,
            "throw" => Token::Throw,
            "new" => Token::New,
            "delete" => Token::Delete,
            "typeof" => Token::TypeOf,
            "void" => Token::Void,
            "this" => Token::This,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "debugger" => Token::Debugger,
            _ => return None,
        };
        Some(token)
    }
}

/// A token with its zero-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenData {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<TokenData>, JSError> {
    tokenize_with_offset(source, 0, 0)
}

/// Tokenizes `source` as if it started at `line_offset`/`column_offset` of a
/// larger resource. The column offset only applies to the first line.
pub fn tokenize_with_offset(source: &str, line_offset: usize, column_offset: usize) -> Result<Vec<TokenData>, JSError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 0;
    let mut line_start = 0;

    let position = |line: usize, line_start: usize, at: usize| {
        let column = at - line_start;
        if line == 0 {
            (line_offset, column_offset + column)
        } else {
            (line_offset + line, column)
        }
    };

    while i < chars.len() {
        let start = i;
        let (tok_line, tok_column) = position(line, line_start, start);
        let push = |token: Token, tokens: &mut Vec<TokenData>| {
            tokens.push(TokenData {
                token,
                line: tok_line,
                column: tok_column,
            })
        };
        let next = chars.get(i + 1).copied();
        match chars[i] {
            '\n' => {
                i += 1;
                line += 1;
                line_start = i;
            }
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                i += 2;
                loop {
                    if i + 1 >= chars.len() {
                        return Err(raise_tokenize_error!("Unterminated comment", tok_line, tok_column));
                    }
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        break;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                        line_start = i + 1;
                    }
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = chars[i];
                i += 1;
                let mut value = String::new();
                loop {
                    let Some(&c) = chars.get(i) else {
                        return Err(raise_tokenize_error!("Unterminated string literal", tok_line, tok_column));
                    };
                    if c == '\n' {
                        return Err(raise_tokenize_error!("Invalid or unexpected token", tok_line, tok_column));
                    }
                    i += 1;
                    if c == quote {
                        break;
                    }
                    if c == '\\' {
                        let Some(&escaped) = chars.get(i) else {
                            return Err(raise_tokenize_error!("Unterminated string literal", tok_line, tok_column));
                        };
                        i += 1;
                        value.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        });
                    } else {
                        value.push(c);
                    }
                }
                push(Token::StringLit(value), &mut tokens);
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| raise_tokenize_error!(format!("Invalid number literal '{text}'"), tok_line, tok_column))?;
                push(Token::Number(n), &mut tokens);
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = Token::keyword(&word).unwrap_or(Token::Identifier(word));
                push(token, &mut tokens);
            }
            c => {
                let (token, width) = match (c, next, chars.get(i + 2).copied()) {
                    ('=', Some('='), Some('=')) => (Token::StrictEqual, 3),
                    ('!', Some('='), Some('=')) => (Token::StrictNotEqual, 3),
                    ('=', Some('='), _) => (Token::Equal, 2),
                    ('!', Some('='), _) => (Token::NotEqual, 2),
                    ('=', Some('>'), _) => (Token::Arrow, 2),
                    ('<', Some('='), _) => (Token::LessEqual, 2),
                    ('>', Some('='), _) => (Token::GreaterEqual, 2),
                    ('&', Some('&'), _) => (Token::LogicalAnd, 2),
                    ('|', Some('|'), _) => (Token::LogicalOr, 2),
                    ('+', Some('+'), _) => (Token::Increment, 2),
                    ('-', Some('-'), _) => (Token::Decrement, 2),
                    ('=', _, _) => (Token::Assign, 1),
                    ('!', _, _) => (Token::LogicalNot, 1),
                    ('<', _, _) => (Token::LessThan, 1),
                    ('>', _, _) => (Token::GreaterThan, 1),
                    ('+', _, _) => (Token::Plus, 1),
                    ('-', _, _) => (Token::Minus, 1),
                    ('*', _, _) => (Token::Multiply, 1),
                    ('/', _, _) => (Token::Divide, 1),
                    ('%', _, _) => (Token::Mod, 1),
                    ('(', _, _) => (Token::LParen, 1),
                    (')', _, _) => (Token::RParen, 1),
                    ('[', _, _) => (Token::LBracket, 1),
                    (']', _, _) => (Token::RBracket, 1),
                    ('{', _, _) => (Token::LBrace, 1),
                    ('}', _, _) => (Token::RBrace, 1),
                    (':', _, _) => (Token::Colon, 1),
                    ('.', _, _) => (Token::Dot, 1),
                    (',', _, _) => (Token::Comma, 1),
                    (';', _, _) => (Token::Semicolon, 1),
                    ('?', _, _) => (Token::QuestionMark, 1),
                    (other, _, _) => {
                        return Err(raise_tokenize_error!(format!("Invalid or unexpected token '{other}'"), tok_line, tok_column));
                    }
                };
                i += width;
                push(token, &mut tokens);
            }
        }
    }
    log::trace!("tokenized {} tokens", tokens.len());
    Ok(tokens)
}
