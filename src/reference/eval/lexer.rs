//! 词法分析

use super::SyntaxError;

/// 按最长匹配排列
const PUNCTUATORS: [&str; 23] = [
    "===", "!==", "**", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!",
    "?", ":", "(", ")", ";", ",",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    String(Vec<u16>),
    Template(Vec<TemplatePart>),
    Ident(String),
    Punct(&'static str),
    Eof,
}

/// 模板字符串片段，`${...}` 内的源码留给语法分析递归处理
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplatePart {
    Text(Vec<u16>),
    Substitution(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 与上一个记号之间是否有换行（用于自动分号）
    pub newline_before: bool,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let newline_before = self.skip_trivia()?;
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    newline_before,
                });
                return Ok(tokens);
            };

            let starts_number = c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()));
            let kind = if starts_number {
                self.number()?
            } else if c == '\'' || c == '"' {
                self.string(c)?
            } else if c == '`' {
                self.template()?
            } else if is_ident_start(c) {
                self.ident()
            } else {
                self.punct(c)?
            };
            tokens.push(Token {
                kind,
                newline_before,
            });
        }
    }

    /// 跳过空白与注释，返回途中是否遇到换行
    fn skip_trivia(&mut self) -> Result<bool, SyntaxError> {
        let mut newline = false;
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                newline = true;
                self.pos += 1;
            } else if c.is_whitespace() || c == '\u{FEFF}' {
                self.pos += 1;
            } else if c == '/' && self.peek_at(1) == Some('/') {
                while self.peek().is_some_and(|c| !is_line_terminator(c)) {
                    self.pos += 1;
                }
            } else if c == '/' && self.peek_at(1) == Some('*') {
                self.pos += 2;
                loop {
                    match self.bump() {
                        None => return Err(SyntaxError::new("Unterminated comment")),
                        Some('*') if self.peek() == Some('/') => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            if is_line_terminator(c) {
                                newline = true;
                            }
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                Some('b' | 'B') => 2,
                _ => 10,
            };
            if radix != 10 {
                self.pos += 2;
                let mut value = 0f64;
                let mut any = false;
                while let Some(digit) = self.peek().and_then(|c| c.to_digit(radix)) {
                    value = value * f64::from(radix) + f64::from(digit);
                    any = true;
                    self.pos += 1;
                }
                if !any {
                    return Err(SyntaxError::new("Invalid or unexpected token"));
                }
                return self.finish_number(value);
            }
        }

        self.digits();
        if self.peek() == Some('.') {
            self.pos += 1;
            self.digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(SyntaxError::new("Invalid or unexpected token"));
            }
            self.digits();
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let value = text
            .parse::<f64>()
            .map_err(|_| SyntaxError::new(format!("Invalid number literal '{}'", text)))?;
        self.finish_number(value)
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn finish_number(&mut self, value: f64) -> Result<TokenKind, SyntaxError> {
        if self.peek().is_some_and(is_ident_part) {
            return Err(SyntaxError::new(
                "Invalid or unexpected token (identifier starts immediately after numeric literal)",
            ));
        }
        Ok(TokenKind::Number(value))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, SyntaxError> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(TokenKind::String(out)),
                Some('\\') => self.escape(&mut out)?,
                Some('\n' | '\r') | None => {
                    return Err(SyntaxError::new("Invalid or unexpected token (unterminated string)"))
                }
                Some(c) => push_char(&mut out, c),
            }
        }
    }

    fn escape(&mut self, out: &mut Vec<u16>) -> Result<(), SyntaxError> {
        let c = self
            .bump()
            .ok_or_else(|| SyntaxError::new("Invalid or unexpected token (unterminated string)"))?;
        match c {
            'n' => out.push(0x0A),
            't' => out.push(0x09),
            'r' => out.push(0x0D),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'v' => out.push(0x0B),
            '0' if !self.peek().is_some_and(|d| d.is_ascii_digit()) => out.push(0),
            'x' => {
                let unit = self.hex_digits(2)?;
                out.push(unit as u16);
            }
            'u' if self.peek() == Some('{') => {
                self.pos += 1;
                let mut code = 0u32;
                let mut any = false;
                while let Some(digit) = self.peek().and_then(|c| c.to_digit(16)) {
                    code = code * 16 + digit;
                    if code > 0x10FFFF {
                        return Err(SyntaxError::new("Undefined Unicode code-point"));
                    }
                    any = true;
                    self.pos += 1;
                }
                if !any || self.bump() != Some('}') {
                    return Err(SyntaxError::new("Invalid Unicode escape sequence"));
                }
                push_code_point(out, code);
            }
            'u' => {
                let unit = self.hex_digits(4)?;
                out.push(unit as u16);
            }
            // 续行
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            c if is_line_terminator(c) => {}
            c => push_char(out, c),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, SyntaxError> {
        let mut value = 0;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| SyntaxError::new("Invalid hexadecimal escape sequence"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn template(&mut self) -> Result<TokenKind, SyntaxError> {
        self.pos += 1;
        let mut parts = Vec::new();
        let mut text = Vec::new();
        loop {
            match self.bump() {
                None => return Err(SyntaxError::new("Unterminated template literal")),
                Some('`') => break,
                Some('\\') => self.escape(&mut text)?,
                Some('$') if self.peek() == Some('{') => {
                    self.pos += 1;
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    parts.push(TemplatePart::Substitution(self.substitution()?));
                }
                Some('\r') => {
                    if self.peek() == Some('\n') {
                        self.pos += 1;
                    }
                    text.push(0x0A);
                }
                Some(c) => push_char(&mut text, c),
            }
        }
        if !text.is_empty() || parts.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(TokenKind::Template(parts))
    }

    /// `${` 之后直到配对 `}` 的源码
    fn substitution(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let c = self
                .bump()
                .ok_or_else(|| SyntaxError::new("Unterminated template literal"))?;
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => break,
                '}' => depth -= 1,
                '\'' | '"' => {
                    self.pos -= 1;
                    self.string(c)?;
                }
                '`' => {
                    self.pos -= 1;
                    self.template()?;
                }
                _ => {}
            }
        }
        Ok(self.chars[start..self.pos - 1].iter().collect())
    }

    fn ident(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.pos += 1;
        }
        TokenKind::Ident(self.chars[start..self.pos].iter().collect())
    }

    fn punct(&mut self, c: char) -> Result<TokenKind, SyntaxError> {
        for punct in PUNCTUATORS {
            if punct
                .chars()
                .enumerate()
                .all(|(i, expected)| self.peek_at(i) == Some(expected))
            {
                self.pos += punct.len();
                return Ok(TokenKind::Punct(punct));
            }
        }
        Err(SyntaxError::new(format!("Invalid or unexpected token '{}'", c)))
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}

fn push_char(out: &mut Vec<u16>, c: char) {
    let mut buf = [0u16; 2];
    out.extend_from_slice(c.encode_utf16(&mut buf));
}

/// 单独的代理项按原样保留
fn push_code_point(out: &mut Vec<u16>, code: u32) {
    match char::from_u32(code) {
        Some(c) => push_char(out, c),
        None => out.push(code as u16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_longest_punctuator_wins() {
        assert_eq!(
            kinds("a !== b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct("!=="),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("2**3")[1], TokenKind::Punct("**"));
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(kinds(".5")[0], TokenKind::Number(0.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Number(1000.0));
        assert_eq!(kinds("0xff")[0], TokenKind::Number(255.0));
        assert!(tokenize("0x").is_err());
        assert!(tokenize("1e").is_err());
    }

    #[test]
    fn test_newline_tracking() {
        let tokens = tokenize("1\n2 /* a\nb */ 3").unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
        assert_eq!(flags, vec![false, true, true, false]);
    }

    #[test]
    fn test_template_parts() {
        assert_eq!(
            kinds("`x${ {a} }y`")[0],
            TokenKind::Template(vec![
                TemplatePart::Text(vec![b'x' as u16]),
                TemplatePart::Substitution(" {a} ".into()),
                TemplatePart::Text(vec![b'y' as u16]),
            ])
        );
    }

    #[test]
    fn test_escaped_lone_surrogate_is_kept() {
        assert_eq!(kinds(r"'\uD800'")[0], TokenKind::String(vec![0xD800]));
    }
}
