//! Formula tokenizer
//!
//! Turns formula text into a flat token stream. Unrecognised characters do
//! not stop the scan: each one is recorded as a [`LexicalError`] and skipped.

use std::fmt;

use sheetwalk_core::ErrorValue;

use crate::error::LexicalError;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(ErrorValue),

    // Identifiers and references
    /// Function name, named cell/range, or bare column letters
    Identifier(String),
    /// A1 reference like `B5` or `$B$5`
    CellRef(String),
    /// `R[-1]C`, `RC[2]`, `RC`
    RelativeCell {
        row_offset: Option<i64>,
        col_offset: Option<i64>,
    },
    /// `R5C2`
    AbsoluteCell { row: i64, column: i64 },
    /// An R1C1 reference mixing relative and absolute parts (`R5C[-1]`)
    MixedCell(String),
    /// `$A`, only meaningful in a column range
    ColumnLabel(String),
    /// `$5`, only meaningful in a row range
    RowLabel(i64),
    /// `Sheet1!`, `'My Sheet'!`, `[Book.xlsx]Sheet1!`
    SheetRef {
        workbook: Option<String>,
        sheet: String,
    },

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Token::Error(e) => write!(f, "{}", e),
            Token::Identifier(s) => write!(f, "name '{}'", s),
            Token::CellRef(s) => write!(f, "cell {}", s),
            Token::RelativeCell {
                row_offset,
                col_offset,
            } => {
                f.write_str("R")?;
                if let Some(r) = row_offset {
                    write!(f, "[{}]", r)?;
                }
                f.write_str("C")?;
                if let Some(c) = col_offset {
                    write!(f, "[{}]", c)?;
                }
                Ok(())
            }
            Token::AbsoluteCell { row, column } => write!(f, "R{}C{}", row, column),
            Token::MixedCell(s) => f.write_str(s),
            Token::ColumnLabel(s) => f.write_str(s),
            Token::RowLabel(n) => write!(f, "${}", n),
            Token::SheetRef {
                workbook: Some(book),
                sheet,
            } => write!(f, "[{}]{}!", book, sheet),
            Token::SheetRef {
                workbook: None,
                sheet,
            } => write!(f, "{}!", sheet),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Ampersand => f.write_str("'&'"),
            Token::Equal => f.write_str("'='"),
            Token::NotEqual => f.write_str("'<>'"),
            Token::LessThan => f.write_str("'<'"),
            Token::LessEqual => f.write_str("'<='"),
            Token::GreaterThan => f.write_str("'>'"),
            Token::GreaterEqual => f.write_str("'>='"),
            Token::Colon => f.write_str("':'"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::LeftBracket => f.write_str("'['"),
            Token::RightBracket => f.write_str("']'"),
            Token::LeftBrace => f.write_str("'{'"),
            Token::RightBrace => f.write_str("'}'"),
            Token::Eof => f.write_str("end of formula"),
        }
    }
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Output of [`tokenize`]: the token stream (always ending in
/// [`Token::Eof`]) and any characters that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokens {
    pub tokens: Vec<Spanned>,
    pub diagnostics: Vec<LexicalError>,
}

/// Tokenize formula text
///
/// # Example
/// ```rust
/// use sheetwalk_formula::lexer::{tokenize, Token};
///
/// let out = tokenize("=R[-1]C+1");
/// assert_eq!(out.tokens[1].token, Token::RelativeCell { row_offset: Some(-1), col_offset: None });
/// assert!(out.diagnostics.is_empty());
/// ```
pub fn tokenize(input: &str) -> Tokens {
    let mut lexer = Lexer {
        input,
        pos: 0,
        diagnostics: Vec::new(),
    };

    let mut tokens = Vec::new();
    loop {
        let (position, token) = lexer.next_token();
        let done = token == Token::Eof;
        tokens.push(Spanned { token, position });
        if done {
            break;
        }
    }

    Tokens {
        tokens,
        diagnostics: lexer.diagnostics,
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    diagnostics: Vec<LexicalError>,
}

impl<'a> Lexer<'a> {
    fn next_token(&mut self) -> (usize, Token) {
        loop {
            self.skip_whitespace();
            let start = self.pos;

            let Some(c) = self.peek_char() else {
                return (start, Token::Eof);
            };

            if let Some(token) = self.scan_token(c) {
                return (start, token);
            }
        }
    }

    /// Scan one token starting with `c`; `None` means nothing was produced
    /// (a comment, or a skipped character) and the caller should retry.
    fn scan_token(&mut self, c: char) -> Option<Token> {
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '&' => Some(Token::Ampersand),
            '=' => Some(Token::Equal),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ']' => Some(Token::RightBracket),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            _ => None,
        };
        if single.is_some() {
            self.advance();
            return single;
        }

        match c {
            '<' => {
                self.advance();
                Some(match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                })
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Some(Token::GreaterEqual)
                } else {
                    Some(Token::GreaterThan)
                }
            }
            '"' => self.scan_string(),
            '#' => self.scan_error_or_comment(),
            '\'' => self.scan_quoted_sheet(),
            '[' => Some(self.scan_bracket()),
            '$' => self.scan_dollar(),
            c if c.is_ascii_digit() => Some(self.scan_number()),
            '.' if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                Some(self.scan_number())
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
            _ => {
                self.illegal(c);
                None
            }
        }
    }

    fn illegal(&mut self, character: char) {
        self.diagnostics.push(LexicalError {
            character,
            position: self.pos,
        });
        self.advance();
    }

    // === Literals ===

    fn scan_string(&mut self) -> Option<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => {
                    // Unterminated: report the quote and rescan what followed it
                    self.pos = start;
                    self.illegal('"');
                    return None;
                }
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Some(Token::String(s));
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some('"') => s.push('"'),
                        Some(other) => {
                            s.push('\\');
                            s.push(other);
                        }
                        None => continue,
                    }
                    self.advance();
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // `0<digits>h` is a hexadecimal literal
        if self.peek_char() == Some('0') {
            let digits = self.input[start + 1..]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            let after = start + 1 + digits;
            if digits > 0 && self.input[after..].starts_with('h') {
                let hex_digits = &self.input[start + 1..after];
                if let Ok(value) = i64::from_str_radix(hex_digits, 16) {
                    let next = self.input[after + 1..].chars().next();
                    if !next.is_some_and(is_word_char) {
                        self.pos = after + 1;
                        return Token::Number(value as f64);
                    }
                }
            }
        }

        // Integer part
        self.skip_digits();

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // Exponent part
        if self.peek_char().is_some_and(|c| c == 'e' || c == 'E') {
            let save = self.pos;
            self.advance();
            if self.peek_char().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.skip_digits();
            } else {
                self.pos = save;
            }
        }

        let text = &self.input[start..self.pos];
        Token::Number(text.parse().unwrap_or(0.0))
    }

    fn scan_error_or_comment(&mut self) -> Option<Token> {
        let rest = &self.input[self.pos..];
        let matched = ErrorValue::ALL.into_iter().find(|e| {
            let text = e.as_str();
            rest.len() >= text.len()
                && rest.is_char_boundary(text.len())
                && rest[..text.len()].eq_ignore_ascii_case(text)
        });

        if let Some(error) = matched {
            self.pos += error.as_str().len();
            return Some(Token::Error(error));
        }

        // Line comment
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        None
    }

    // === References ===

    /// `'Quoted Name'!` or `'[Book]Sheet'!`
    fn scan_quoted_sheet(&mut self) -> Option<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => break,
            }
        }

        if self.peek_char() != Some('!') {
            self.pos = start;
            self.illegal('\'');
            return None;
        }
        self.advance();

        let (workbook, sheet) = split_external(&name);
        Some(Token::SheetRef { workbook, sheet })
    }

    /// `[Book.xlsx]Sheet!` when it fits, a plain `[` otherwise
    fn scan_bracket(&mut self) -> Token {
        let rest = &self.input[self.pos..];
        if let Some(close) = rest.find(']') {
            let book = &rest[1..close];
            let sheet_len = rest[close + 1..]
                .chars()
                .take_while(|&c| is_word_char(c))
                .map(char::len_utf8)
                .sum::<usize>();
            let bang = close + 1 + sheet_len;
            let plain_book = !book.is_empty() && !book.contains(['[', '\'', '"']);
            if plain_book && sheet_len > 0 && rest[bang..].starts_with('!') {
                let token = Token::SheetRef {
                    workbook: Some(book.to_string()),
                    sheet: rest[close + 1..bang].to_string(),
                };
                self.pos += bang + 1;
                return token;
            }
        }

        self.advance();
        Token::LeftBracket
    }

    /// `$A$1`, `$A`, `$5`
    fn scan_dollar(&mut self) -> Option<Token> {
        match self.peek_char_at(1) {
            Some(c) if c.is_ascii_digit() => {
                self.advance();
                let start = self.pos;
                self.skip_digits();
                match self.input[start..self.pos].parse() {
                    Ok(row) => Some(Token::RowLabel(row)),
                    Err(_) => {
                        self.pos = start - 1;
                        self.illegal('$');
                        None
                    }
                }
            }
            Some(c) if c.is_ascii_alphabetic() => self.scan_word(),
            _ => {
                self.illegal('$');
                None
            }
        }
    }

    /// Identifiers, A1 references, R1C1 references, sheet prefixes, booleans
    fn scan_word(&mut self) -> Option<Token> {
        let start = self.pos;

        if self.peek_char() == Some('R') {
            if let Some(token) = self.scan_r1c1() {
                return Some(token);
            }
            self.pos = start;
        }

        while self.peek_char().is_some_and(|c| is_word_char(c) || c == '$') {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('!') && !text.contains('$') {
            self.advance();
            let (workbook, sheet) = split_external(text);
            return Some(Token::SheetRef { workbook, sheet });
        }

        let followed_by_paren = self.peek_char() == Some('(');

        // TRUE/FALSE unless used as a function call
        if !followed_by_paren {
            if text.eq_ignore_ascii_case("TRUE") {
                return Some(Token::Boolean(true));
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Some(Token::Boolean(false));
            }
        }

        // LOG10(…) is a call, LOG10 alone is a cell
        if is_a1_reference(text) && !followed_by_paren {
            return Some(Token::CellRef(text.to_string()));
        }

        if let Some(letters) = text.strip_prefix('$') {
            if !letters.is_empty() && letters.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Some(Token::ColumnLabel(text.to_string()));
            }
        }

        // A `$` that fits no reference shape ends the word
        match text.find('$') {
            Some(0) => {
                self.pos = start;
                self.illegal('$');
                None
            }
            Some(dollar) => {
                self.pos = start + dollar;
                Some(Token::Identifier(text[..dollar].to_string()))
            }
            None => Some(Token::Identifier(text.to_string())),
        }
    }

    /// `R` already peeked. Returns `None` when the word is not R1C1.
    fn scan_r1c1(&mut self) -> Option<Token> {
        let start = self.pos;
        self.advance(); // R

        let row = self.scan_r1c1_part()?;
        if self.peek_char() != Some('C') {
            return None;
        }
        self.advance();
        let col = self.scan_r1c1_part()?;

        if self.peek_char().is_some_and(|c| is_word_char(c) || c == '(' || c == '!') {
            return None;
        }

        let text = &self.input[start..self.pos];
        Some(match (row, col) {
            (Part::Relative(row_offset), Part::Relative(col_offset)) => Token::RelativeCell {
                row_offset,
                col_offset,
            },
            (Part::Absolute(row), Part::Absolute(column)) => Token::AbsoluteCell { row, column },
            // RC1 and friends are also plain A1 cells
            _ if is_a1_reference(text) => return None,
            _ => Token::MixedCell(text.to_string()),
        })
    }

    fn scan_r1c1_part(&mut self) -> Option<Part> {
        match self.peek_char() {
            Some('[') => {
                let rest = &self.input[self.pos + 1..];
                let close = rest.find(']')?;
                let offset: i64 = rest[..close].trim().parse().ok()?;
                self.pos += close + 2;
                Some(Part::Relative(Some(offset)))
            }
            Some(c) if c.is_ascii_digit() => {
                let digits_start = self.pos;
                self.skip_digits();
                self.input[digits_start..self.pos]
                    .parse()
                    .ok()
                    .map(Part::Absolute)
            }
            _ => Some(Part::Relative(None)),
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Relative(Option<i64>),
    Absolute(i64),
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// `[Book.xlsx]Sheet1` → (Some("Book.xlsx"), "Sheet1")
fn split_external(name: &str) -> (Option<String>, String) {
    if let Some(rest) = name.strip_prefix('[') {
        if let Some(close) = rest.find(']') {
            return (
                Some(rest[..close].to_string()),
                rest[close + 1..].to_string(),
            );
        }
    }
    (None, name.to_string())
}

/// `[$]letters[$]digits`
pub(crate) fn is_a1_reference(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }

    let letter_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letter_start {
        return false;
    }

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }

    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }

    i > digit_start && i == bytes.len()
}
