//! Lexer for TypeScript-style declaration files.
//!
//! The lexer is pull-based: each call to [`Lexer::next_token`] classifies
//! exactly one token. It has no notion of grammar; `declare`, `class` and
//! friends come out as plain identifiers and the parser resolves them with
//! [`Keyword::from_ident`].

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::Serialize;

/// Token kinds for declaration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Identifier,
    Number,
    BracketOpen,      // {
    BracketClose,     // }
    Definer,          // :
    Equality,         // =
    LambdaFunction,   // =>
    InstructionEnd,   // ;
    ParenthesisOpen,  // (
    ParenthesisClose, // )
    Interrogation,    // ?
    Comma,            // ,
    String,
    Unknown,
    EndOfInput,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::BracketOpen => "bracket-open",
            TokenKind::BracketClose => "bracket-close",
            TokenKind::Definer => "definer",
            TokenKind::Equality => "equality",
            TokenKind::LambdaFunction => "lambda",
            TokenKind::InstructionEnd => "instruction-end",
            TokenKind::ParenthesisOpen => "parenthesis-open",
            TokenKind::ParenthesisClose => "parenthesis-close",
            TokenKind::Interrogation => "interrogation",
            TokenKind::Comma => "comma",
            TokenKind::String => "string",
            TokenKind::Unknown => "unknown",
            TokenKind::EndOfInput => "end-of-input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token with its kind, source text and byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub start: usize,
    pub end: usize,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, text: &'src str, start: usize, end: usize) -> Self {
        Self {
            kind,
            text,
            start,
            end,
        }
    }

    /// The floating-point value of a `Number` token.
    ///
    /// Returns `None` for other kinds and for digit/dot runs that are not a
    /// valid float, such as `.` or `1.2.3`.
    pub fn number_value(&self) -> Option<f64> {
        if self.kind != TokenKind::Number {
            return None;
        }
        self.text.parse().ok()
    }

    /// The keyword this identifier spells, if any.
    pub fn keyword(&self) -> Option<Keyword> {
        if self.kind != TokenKind::Identifier {
            return None;
        }
        Keyword::from_ident(self.text)
    }
}

/// Identifiers with a grammatical meaning somewhere in a declaration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Declare,
    Module,
    Export,
    Default,
    Abstract,
    Class,
    Static,
    Extends,
    Public,
    Private,
    Protected,
}

impl Keyword {
    pub fn from_ident(s: &str) -> Option<Self> {
        match s {
            "declare" => Some(Keyword::Declare),
            "module" => Some(Keyword::Module),
            "export" => Some(Keyword::Export),
            "default" => Some(Keyword::Default),
            "abstract" => Some(Keyword::Abstract),
            "class" => Some(Keyword::Class),
            "static" => Some(Keyword::Static),
            "extends" => Some(Keyword::Extends),
            "public" => Some(Keyword::Public),
            "private" => Some(Keyword::Private),
            "protected" => Some(Keyword::Protected),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Declare => "declare",
            Keyword::Module => "module",
            Keyword::Export => "export",
            Keyword::Default => "default",
            Keyword::Abstract => "abstract",
            Keyword::Class => "class",
            Keyword::Static => "static",
            Keyword::Extends => "extends",
            Keyword::Public => "public",
            Keyword::Private => "private",
            Keyword::Protected => "protected",
        }
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

fn is_number_char(ch: char) -> bool {
    ch == '.' || ch.is_ascii_digit()
}

/// Lexer for declaration files.
pub struct Lexer<'src> {
    src: &'src str,
    chars: Peekable<CharIndices<'src>>,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Byte offset of the cursor.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Whether the cursor has consumed the whole buffer.
    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// The character under the cursor, without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Consume and return the character under the cursor.
    pub fn advance(&mut self) -> Option<char> {
        if let Some((pos, ch)) = self.chars.next() {
            self.pos = pos + ch.len_utf8();
            Some(ch)
        } else {
            None
        }
    }

    /// Move past the character under the cursor.
    pub fn bump(&mut self) {
        self.advance();
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if pred(ch) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(is_whitespace);
    }

    // No escape processing: the first `"` closes the literal, and an
    // unterminated literal runs to the end of the buffer.
    fn read_string(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '"' {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'src> {
        Token::new(kind, &self.src[start..self.pos], start, self.pos)
    }

    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace();

        let start = self.pos;
        let ch = match self.advance() {
            Some(c) => c,
            None => return self.token(TokenKind::EndOfInput, start),
        };

        let kind = match ch {
            c if is_ident_start(c) => {
                self.eat_while(is_ident_continue);
                TokenKind::Identifier
            }
            '{' => TokenKind::BracketOpen,
            '}' => TokenKind::BracketClose,
            c if is_number_char(c) => {
                self.eat_while(is_number_char);
                TokenKind::Number
            }
            ':' => TokenKind::Definer,
            '=' => {
                if self.peek() == Some('>') {
                    self.bump();
                    TokenKind::LambdaFunction
                } else {
                    TokenKind::Equality
                }
            }
            ';' => TokenKind::InstructionEnd,
            '(' => TokenKind::ParenthesisOpen,
            ')' => TokenKind::ParenthesisClose,
            '?' => TokenKind::Interrogation,
            ',' => TokenKind::Comma,
            '"' => {
                self.read_string();
                TokenKind::String
            }
            _ => TokenKind::Unknown,
        };

        self.token(kind, start)
    }

    /// Pull tokens until an identifier turns up.
    ///
    /// Everything that is not an identifier is discarded. Returns `None` once
    /// the input is exhausted.
    pub fn next_identifier(&mut self) -> Option<Token<'src>> {
        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Identifier => return Some(token),
                TokenKind::EndOfInput => return None,
                _ => {}
            }
        }
    }

    /// Collect all tokens into a vector, ending with `EndOfInput`.
    pub fn tokenize(mut self) -> Vec<Token<'src>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_end = token.kind == TokenKind::EndOfInput;
            tokens.push(token);
            if is_end {
                break;
            }
        }
        tokens
    }
}
