/// Restricted arithmetic/boolean expression evaluator
///
/// Backs the `javascript` / `expression` requirement type. Input is first
/// reduced to a whitelist of characters, then tokenized and parsed with a small
/// recursive-descent grammar. Nothing here can call functions, touch
/// variables or loop, so evaluation is bounded by the input length.
///
/// **Grammar:**
/// ```text
/// expr       := or
/// or         := and ( "||" and )*
/// and        := equality ( "&&" equality )*
/// equality   := relational ( ("==" | "!=") relational )*
/// relational := additive ( ("<" | ">" | "<=" | ">=") additive )*
/// additive   := term ( ("+" | "-") term )*
/// term       := unary ( ("*" | "/" | "%") unary )*
/// unary      := ("-" | "+" | "!") unary | primary
/// primary    := number | "(" expr ")"
/// ```
///
/// Booleans are numbers (`true` = 1, `false` = 0); the final value is true
/// when it is non-zero.

use std::fmt;

/// Maximum sanitized expression length in characters
pub const MAX_EXPRESSION_LENGTH: usize = 512;

/// Maximum parenthesis / unary nesting depth
pub const MAX_NESTED_DEPTH: usize = 32;

/// Token types for lexical analysis
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Logic
    And, // &&
    Or,  // ||
    Not, // !

    // Comparison
    Equal,        // ==
    NotEqual,     // !=
    Greater,      // >
    Less,         // <
    GreaterEqual, // >=
    LessEqual,    // <=

    LeftParen,
    RightParen,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::Greater => write!(f, ">"),
            Token::Less => write!(f, "<"),
            Token::GreaterEqual => write!(f, ">="),
            Token::LessEqual => write!(f, "<="),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Keep only digits, whitespace, `.` and operator characters.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/()%<>=!&|.".contains(*c))
        .collect()
}

/// Reject runs of three or more `=`, `!`, `&` or `|`.
pub fn has_suspicious_runs(input: &str) -> bool {
    let mut prev = '\0';
    let mut run = 0;
    for c in input.chars() {
        if c == prev {
            run += 1;
        } else {
            prev = c;
            run = 1;
        }
        if run >= 3 && matches!(c, '=' | '!' | '&' | '|') {
            return true;
        }
    }
    false
}

/// Tokenizer for sanitized expressions
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        self.position += 1;
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<f64, String> {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() || ch == '.' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map_err(|_| format!("Invalid number literal '{}'", text))
    }

    /// Consume a second character if it matches, producing `double`, else `single`.
    fn pair(&mut self, second: char, double: Token, single: Option<Token>) -> Result<Token, String> {
        let first = self.advance().unwrap_or('\0');
        if self.current() == Some(second) {
            self.advance();
            Ok(double)
        } else {
            single.ok_or_else(|| format!("Expected '{}{}', found single '{}'", first, second, first))
        }
    }

    pub fn next_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let token = match self.current() {
            None => Token::Eof,
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('(') => {
                self.advance();
                Token::LeftParen
            }
            Some(')') => {
                self.advance();
                Token::RightParen
            }
            Some('&') => self.pair('&', Token::And, None)?,
            Some('|') => self.pair('|', Token::Or, None)?,
            Some('=') => self.pair('=', Token::Equal, None)?,
            Some('!') => self.pair('=', Token::NotEqual, Some(Token::Not))?,
            Some('>') => self.pair('=', Token::GreaterEqual, Some(Token::Greater))?,
            Some('<') => self.pair('=', Token::LessEqual, Some(Token::Less))?,
            Some(ch) if ch.is_ascii_digit() || ch == '.' => Token::Number(self.read_number()?),
            Some(ch) => return Err(format!("Unexpected character: '{}'", ch)),
        };
        Ok(token)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

/// Recursive-descent evaluator. Parsing and evaluation happen in one pass.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

fn truth(v: f64) -> f64 {
    if v != 0.0 && !v.is_nan() {
        1.0
    } else {
        0.0
    }
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("Expected {}, found {}", expected, self.current()))
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTED_DEPTH {
            return Err(format!("Expression nested deeper than {}", MAX_NESTED_DEPTH));
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(n)
            }
            Token::LeftParen => {
                self.advance();
                self.enter()?;
                let value = self.parse_or()?;
                self.depth -= 1;
                self.expect(Token::RightParen)?;
                Ok(value)
            }
            token => Err(format!("Unexpected token in expression: {}", token)),
        }
    }

    fn parse_unary(&mut self) -> Result<f64, String> {
        let op = self.current().clone();
        match op {
            Token::Minus | Token::Plus | Token::Not => {
                self.advance();
                self.enter()?;
                let value = self.parse_unary()?;
                self.depth -= 1;
                Ok(match op {
                    Token::Minus => -value,
                    Token::Plus => value,
                    _ => 1.0 - truth(value),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = self.current().clone();
            if !matches!(op, Token::Star | Token::Slash | Token::Percent) {
                break;
            }
            self.advance();
            let right = self.parse_unary()?;
            left = match op {
                Token::Star => left * right,
                Token::Slash => {
                    if right == 0.0 {
                        return Err("Division by zero".to_string());
                    }
                    left / right
                }
                _ => {
                    // Integer modulo, truncating both operands.
                    let (l, r) = (left.trunc() as i64, right.trunc() as i64);
                    if r == 0 {
                        return Err("Modulo by zero".to_string());
                    }
                    l.wrapping_rem(r) as f64
                }
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        while matches!(self.current(), Token::Plus | Token::Minus) {
            let plus = *self.current() == Token::Plus;
            self.advance();
            let right = self.parse_term()?;
            left = if plus { left + right } else { left - right };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<f64, String> {
        let mut left = self.parse_additive()?;
        while let Token::Greater | Token::Less | Token::GreaterEqual | Token::LessEqual = self.current() {
            let op = self.current().clone();
            self.advance();
            let right = self.parse_additive()?;
            let result = match op {
                Token::Greater => left > right,
                Token::Less => left < right,
                Token::GreaterEqual => left >= right,
                _ => left <= right,
            };
            left = if result { 1.0 } else { 0.0 };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<f64, String> {
        let mut left = self.parse_relational()?;
        while let Token::Equal | Token::NotEqual = self.current() {
            let equal = *self.current() == Token::Equal;
            self.advance();
            let right = self.parse_relational()?;
            let same = left == right;
            left = if same == equal { 1.0 } else { 0.0 };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<f64, String> {
        let mut left = self.parse_equality()?;
        while matches!(self.current(), Token::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = truth(left) * truth(right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<f64, String> {
        let mut left = self.parse_and()?;
        while matches!(self.current(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = truth(truth(left) + truth(right));
        }
        Ok(left)
    }

    /// Evaluate the whole token stream.
    pub fn evaluate(&mut self) -> Result<f64, String> {
        let value = self.parse_or()?;
        if !matches!(self.current(), Token::Eof) {
            return Err(format!("Unexpected token after expression: {}", self.current()));
        }
        Ok(value)
    }
}

/// Evaluate an already placeholder-resolved expression.
///
/// Returns `Err` for anything that is not a well-formed expression after
/// sanitizing; callers treat that as a failed requirement.
pub fn evaluate_expression(raw: &str) -> Result<bool, String> {
    let safe = sanitize(raw);
    if safe.trim().is_empty() {
        return Err("Expression is empty".to_string());
    }
    if safe.chars().count() > MAX_EXPRESSION_LENGTH {
        return Err(format!("Expression longer than {} characters", MAX_EXPRESSION_LENGTH));
    }
    if has_suspicious_runs(&safe) {
        return Err("Expression contains repeated operator runs".to_string());
    }
    let tokens = Tokenizer::new(&safe).tokenize()?;
    let value = Parser::new(tokens).evaluate()?;
    Ok(truth(value) == 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> Option<bool> {
        evaluate_expression(s).ok()
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = Tokenizer::new("&& || == != > < >= <= !").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::And,
                Token::Or,
                Token::Equal,
                Token::NotEqual,
                Token::Greater,
                Token::Less,
                Token::GreaterEqual,
                Token::LessEqual,
                Token::Not,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3 == 7"), Some(true));
        assert_eq!(eval("(1 + 2) * 3 == 9"), Some(true));
        assert_eq!(eval("10 % 3 == 1"), Some(true));
        assert_eq!(eval("1 < 2 && 3 > 4 || 5 >= 5"), Some(true));
        assert_eq!(eval("-2 + 2"), Some(false));
        assert_eq!(eval("!0"), Some(true));
    }

    #[test]
    fn test_placeholder_style_inputs() {
        // Resolved placeholder values become plain numbers.
        assert_eq!(eval("1500 >= 1000"), Some(true));
        assert_eq!(eval("12.5 < 3"), Some(false));
    }

    #[test]
    fn test_sanitizer_strips_letters() {
        assert_eq!(sanitize("system('rm') || 1"), "() || 1");
        // Letters vanish, leaving a parse error rather than code execution.
        assert_eq!(eval("exec(1)"), Some(true));
        assert_eq!(eval("abc"), None);
    }

    #[test]
    fn test_rejects_operator_runs() {
        assert!(has_suspicious_runs("1 === 1"));
        assert!(has_suspicious_runs("1 &&& 1"));
        assert!(!has_suspicious_runs("1 == 1 && 2 != 3"));
        assert_eq!(eval("1 === 1"), None);
    }

    #[test]
    fn test_equality_is_exact() {
        assert_eq!(eval("0.0000000000000001 == 0"), Some(false));
        assert_eq!(eval("0.0000000000000001 != 0"), Some(true));
        assert_eq!(eval("0.1 + 0.2 == 0.3"), Some(false));
        assert_eq!(eval("0.5 + 0.25 == 0.75"), Some(true));
    }

    #[test]
    fn test_errors_fail() {
        assert_eq!(eval("1 / 0"), None);
        assert_eq!(eval("5 % 0"), None);
        assert_eq!(eval("1 = 1"), None);
        assert_eq!(eval("(1"), None);
        assert_eq!(eval("1 2"), None);
        assert_eq!(eval("1.2.3 > 0"), None);
        assert_eq!(eval(""), None);
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_NESTED_DEPTH + 1), ")".repeat(MAX_NESTED_DEPTH + 1));
        assert_eq!(eval(&deep), None);
        let ok = format!("{}1{}", "(".repeat(4), ")".repeat(4));
        assert_eq!(eval(&ok), Some(true));
    }
}
