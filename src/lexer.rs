use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    source: &'src [u8],
    file_id: u16,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u16) -> Self {
        Self {
            source: source.as_bytes(),
            file_id,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit() {
                return self.scan_number();
            }

            if ch == b'"' {
                return self.scan_string(start);
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol recorded an error and consumed the bad byte; keep going
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'/'
            {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'*'
            {
                let start = self.pos;
                self.pos += 2;
                let mut closed = false;
                while self.pos + 1 < self.source.len() {
                    if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                        self.pos += 2;
                        closed = true;
                        break;
                    }
                    self.pos += 1;
                }
                if !closed {
                    self.pos = self.source.len();
                    self.diagnostics.push(Diagnostic::error(
                        "unterminated block comment".to_string(),
                        Span::new(self.file_id, start as u32, self.pos as u32),
                    ));
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        match text.parse::<i64>() {
            Ok(n) => self.make_token(Lexeme::Integer(n), start, self.pos),
            Err(_) => {
                self.diagnostics.push(Diagnostic::error(
                    format!("integer literal '{}' is out of range", text),
                    Span::new(self.file_id, start as u32, self.pos as u32),
                ));
                self.make_token(Lexeme::Integer(0), start, self.pos)
            }
        }
    }

    /// Scan a `"..."` or `"""..."""` string literal, handling `\"`, `\\`, `\n`, `\t` escapes.
    fn scan_string(&mut self, start: usize) -> Spanned<Lexeme> {
        let triple = self.source[self.pos..].starts_with(b"\"\"\"");
        self.pos += if triple { 3 } else { 1 };

        let body_start = self.pos;
        let mut buf = String::new();
        loop {
            if self.pos >= self.source.len() {
                self.diagnostics.push(Diagnostic::error(
                    "unterminated string literal".to_string(),
                    Span::new(self.file_id, start as u32, self.pos as u32),
                ));
                break;
            }
            if triple {
                if self.source[self.pos..].starts_with(b"\"\"\"") {
                    self.pos += 3;
                    break;
                }
            } else if self.source[self.pos] == b'"' {
                self.pos += 1;
                break;
            } else if self.source[self.pos] == b'\n' {
                self.diagnostics.push(Diagnostic::error(
                    "unterminated string literal".to_string(),
                    Span::new(self.file_id, start as u32, self.pos as u32),
                ));
                break;
            }

            if self.source[self.pos] == b'\\' && self.pos + 1 < self.source.len() {
                self.pos += 1;
                let escaped = match self.source[self.pos] {
                    b'"' => '"',
                    b'\\' => '\\',
                    b'n' => '\n',
                    b't' => '\t',
                    other => other as char,
                };
                buf.push(escaped);
                self.pos += 1;
                continue;
            }

            // Best-effort UTF-8 decode one char at a time.
            let rest = std::str::from_utf8(&self.source[self.pos..]).unwrap_or("");
            if let Some(c) = rest.chars().next() {
                buf.push(c);
                self.pos += c.len_utf8();
            } else {
                self.pos += 1;
            }
        }

        let _ = body_start;
        let token = if triple {
            Lexeme::TripleStr(buf)
        } else {
            Lexeme::Str(buf)
        };
        self.make_token(token, start, self.pos)
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b',' => Lexeme::Comma,
            b':' => Lexeme::Colon,
            b';' => Lexeme::Semicolon,
            b'.' => Lexeme::Dot,
            b'+' => Lexeme::Plus,
            b'-' => Lexeme::Minus,
            b'*' => Lexeme::Star,
            b'/' => Lexeme::Slash,
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::EqEq
                } else {
                    Lexeme::Eq
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::Le
                } else {
                    Lexeme::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    Lexeme::Ge
                } else {
                    Lexeme::Gt
                }
            }
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    format!("unexpected character '{}' (U+{:04X})", ch as char, ch),
                    Span::new(self.file_id, start as u32, self.pos as u32),
                ));
                return None;
            }
        };

        Some(self.make_token(token, start, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(self.file_id, start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Lexeme> {
        let (tokens, diags) = Lexer::new(source, 0).tokenize();
        assert!(diags.is_empty(), "unexpected errors: {:?}", diags);
        tokens.into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("class extends def if elif else while return typecase and or not true false none this");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Class,
                Lexeme::Extends,
                Lexeme::Def,
                Lexeme::If,
                Lexeme::Elif,
                Lexeme::Else,
                Lexeme::While,
                Lexeme::Return,
                Lexeme::Typecase,
                Lexeme::And,
                Lexeme::Or,
                Lexeme::Not,
                Lexeme::True,
                Lexeme::False,
                Lexeme::None_,
                Lexeme::This,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_symbols() {
        let tokens = lex("( ) { } , : ; . = == <= >= < > + - * /");
        assert_eq!(
            tokens,
            vec![
                Lexeme::LParen,
                Lexeme::RParen,
                Lexeme::LBrace,
                Lexeme::RBrace,
                Lexeme::Comma,
                Lexeme::Colon,
                Lexeme::Semicolon,
                Lexeme::Dot,
                Lexeme::Eq,
                Lexeme::EqEq,
                Lexeme::Le,
                Lexeme::Ge,
                Lexeme::Lt,
                Lexeme::Gt,
                Lexeme::Plus,
                Lexeme::Minus,
                Lexeme::Star,
                Lexeme::Slash,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_integers() {
        let tokens = lex("0 1 42");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Integer(0),
                Lexeme::Integer(1),
                Lexeme::Integer(42),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("foo bar_baz x1 _underscore");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("foo".into()),
                Lexeme::Ident("bar_baz".into()),
                Lexeme::Ident("x1".into()),
                Lexeme::Ident("_underscore".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex(r#""hello, world""#);
        assert_eq!(tokens, vec![Lexeme::Str("hello, world".into()), Lexeme::Eof]);
    }

    #[test]
    fn test_string_escape() {
        let tokens = lex(r#""a\"b\n""#);
        assert_eq!(tokens, vec![Lexeme::Str("a\"b\n".into()), Lexeme::Eof]);
    }

    #[test]
    fn test_triple_string() {
        let tokens = lex("\"\"\"hello\nworld\"\"\"");
        assert_eq!(
            tokens,
            vec![Lexeme::TripleStr("hello\nworld".into()), Lexeme::Eof]
        );
    }

    #[test]
    fn test_line_comment() {
        let tokens = lex("foo // this is a comment\nbar");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("foo".into()),
                Lexeme::Ident("bar".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_block_comment() {
        let tokens = lex("foo /* skip\nthis */ bar");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("foo".into()),
                Lexeme::Ident("bar".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_class_header() {
        let tokens = lex("class Pair(a: Int, b: Int) extends Obj {");
        assert_eq!(tokens[0], Lexeme::Class);
        assert_eq!(tokens[1], Lexeme::Ident("Pair".into()));
        assert_eq!(tokens[2], Lexeme::LParen);
    }

    #[test]
    fn test_error_unexpected_character() {
        let (_tokens, diags) = {
            let (t, d) = Lexer::new("@", 0).tokenize();
            (t, d)
        };
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("unexpected character '@'"));
    }

    #[test]
    fn test_error_unterminated_string() {
        let (_tokens, diags) = Lexer::new("\"abc", 0).tokenize();
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("unterminated string"));
    }

    #[test]
    fn test_error_unterminated_block_comment() {
        let (_tokens, diags) = Lexer::new("/* never closed", 0).tokenize();
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("unterminated block comment"));
    }
}
