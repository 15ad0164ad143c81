//! 语法分析（优先级爬升）

use super::lexer::{tokenize, TemplatePart, Token, TokenKind};
use super::{SyntaxError, Value};

/// 语法树最大嵌套深度
const MAX_DEPTH: usize = 512;

/// 重新进入完整表达式（括号、条件、模板插值）一次计入的深度，
/// 约等于经过的递归帧数，使 64 层括号即达到上限
const EXPRESSION_WEIGHT: usize = 8;

/// `**` 右侧每层经过 exponent 与 primary 两帧
const EXPONENT_WEIGHT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Plus,
    Not,
    Typeof,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    StrictEq,
    StrictNe,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Text(Vec<u16>),
    Substitution(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Template(Vec<Segment>),
    Ident(String),
    Symbol(Option<Box<Expr>>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Expr(Expr),
    Throw(Expr),
}

/// 编译后的脚本
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Program {
    pub(crate) body: Vec<Stmt>,
}

/// 由低到高的二元运算优先级，`**` 单独处理
const LEVELS: [&[(&str, BinaryOp)]; 6] = [
    &[("||", BinaryOp::Or)],
    &[("&&", BinaryOp::And)],
    &[
        ("===", BinaryOp::StrictEq),
        ("!==", BinaryOp::StrictNe),
        ("==", BinaryOp::Eq),
        ("!=", BinaryOp::Ne),
    ],
    &[
        ("<", BinaryOp::Lt),
        (">", BinaryOp::Gt),
        ("<=", BinaryOp::Le),
        (">=", BinaryOp::Ge),
    ],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
];

pub(crate) fn parse_program(source: &str) -> Result<Program, SyntaxError> {
    let mut parser = Parser::new(tokenize(source)?, 0);
    let mut body = Vec::new();
    loop {
        while parser.eat(";") {}
        if parser.at_eof() {
            return Ok(Program { body });
        }
        body.push(parser.statement()?);
        // 分号、结尾或换行都可以结束语句
        if !(parser.eat(";") || parser.at_eof() || parser.peek().newline_before) {
            return Err(parser.unexpected());
        }
    }
}

fn parse_substitution(source: &str, depth: usize) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(tokenize(source)?, depth);
    let expr = parser.expression()?;
    if !parser.at_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth,
        }
    }

    fn peek(&self) -> &Token {
        // 词法分析保证末尾总有 Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, punct: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p == punct)
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(ident) if ident == name)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.check(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), SyntaxError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> SyntaxError {
        match &self.peek().kind {
            TokenKind::Eof => SyntaxError::new("Unexpected end of input"),
            TokenKind::Number(_) => SyntaxError::new("Unexpected number"),
            TokenKind::String(_) => SyntaxError::new("Unexpected string"),
            TokenKind::Template(_) => SyntaxError::new("Unexpected template string"),
            TokenKind::Ident(name) => SyntaxError::new(format!("Unexpected identifier '{}'", name)),
            TokenKind::Punct(p) => SyntaxError::new(format!("Unexpected token '{}'", p)),
        }
    }

    fn nested<T>(
        &mut self,
        weight: usize,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth + weight > MAX_DEPTH {
            return Err(SyntaxError::new("Maximum nesting depth exceeded"));
        }
        self.depth += weight;
        let result = f(self);
        self.depth -= weight;
        result
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        if self.check_ident("throw") {
            self.advance();
            if self.at_eof() || self.peek().newline_before {
                return Err(SyntaxError::new("Illegal newline after throw"));
            }
            return Ok(Stmt::Throw(self.expression()?));
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.binary(0)?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.nested(EXPRESSION_WEIGHT, Self::expression)?;
        self.expect(":")?;
        let alternate = self.nested(EXPRESSION_WEIGHT, Self::expression)?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn binary(&mut self, level: usize) -> Result<Expr, SyntaxError> {
        let Some(ops) = LEVELS.get(level) else {
            return self.exponent();
        };
        let mut left = self.binary(level + 1)?;
        let saved = self.depth;
        while let Some(op) = self.binary_op(ops) {
            self.advance();
            // 左结合链同样计入深度
            if self.depth >= MAX_DEPTH {
                return Err(SyntaxError::new("Maximum nesting depth exceeded"));
            }
            self.depth += 1;
            let right = self.binary(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = saved;
        Ok(left)
    }

    fn binary_op(&self, ops: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        match self.peek().kind {
            TokenKind::Punct(p) => ops.iter().find(|(text, _)| *text == p).map(|(_, op)| *op),
            _ => None,
        }
    }

    /// `**` 右结合，左侧不能是未加括号的一元表达式
    fn exponent(&mut self) -> Result<Expr, SyntaxError> {
        if self.unary_op().is_some() {
            let expr = self.unary()?;
            if self.check("**") {
                return Err(SyntaxError::new(
                    "Unary operator used immediately before exponentiation expression",
                ));
            }
            return Ok(expr);
        }
        let base = self.primary()?;
        if self.eat("**") {
            let exponent = self.nested(EXPONENT_WEIGHT, Self::exponent)?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn unary_op(&self) -> Option<UnaryOp> {
        match &self.peek().kind {
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Ident(name) if name == "typeof" => Some(UnaryOp::Typeof),
            TokenKind::Ident(name) if name == "void" => Some(UnaryOp::Void),
            _ => None,
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        match self.unary_op() {
            Some(op) => {
                self.advance();
                let operand = self.nested(1, Self::unary)?;
                Ok(Expr::Unary(op, Box::new(operand)))
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.pos;
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::String(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Template(parts) => {
                let mut segments = Vec::with_capacity(parts.len());
                for part in parts {
                    segments.push(match part {
                        TemplatePart::Text(text) => Segment::Text(text),
                        TemplatePart::Substitution(source) => {
                            Segment::Substitution(self.nested(EXPRESSION_WEIGHT, |parser| {
                                parse_substitution(&source, parser.depth)
                            })?)
                        }
                    });
                }
                Ok(Expr::Template(segments))
            }
            TokenKind::Punct("(") => {
                let expr = self.nested(EXPRESSION_WEIGHT, Self::expression)?;
                self.expect(")")?;
                Ok(expr)
            }
            TokenKind::Ident(name) => self.identifier(name),
            _ => {
                self.pos = start;
                Err(self.unexpected())
            }
        }
    }

    fn identifier(&mut self, name: String) -> Result<Expr, SyntaxError> {
        let literal = match name.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            "undefined" => Value::Undefined,
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            "Symbol" if self.check("(") => {
                self.advance();
                if self.eat(")") {
                    return Ok(Expr::Symbol(None));
                }
                let description = self.nested(EXPRESSION_WEIGHT, Self::expression)?;
                self.expect(")")?;
                return Ok(Expr::Symbol(Some(Box::new(description))));
            }
            "throw" | "typeof" | "void" => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
            _ => return Ok(Expr::Ident(name)),
        };
        Ok(Expr::Literal(literal))
    }
}
