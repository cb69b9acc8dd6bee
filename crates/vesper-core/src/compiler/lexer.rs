//! Tokenizer
//!
//! Splits source text into lexemes. Comments (`//` and nestable `/* */`) are
//! dropped. Two-character operators are formed only from adjacent characters:
//! `=` completes a preceding `+ - * / % < = > !`, and `+ - & ^ |` double up.
//! A minus sign is always a token of its own.

use super::token::Token;
use crate::error::{CompileError, CompileResult};

/// What the characters currently in the buffer look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Other,
    Word,
    Number,
    Fraction,
    Global,
}

struct Lexer {
    tokens: Vec<Token>,
    buf: String,
    buf_line: u32,
    line: u32,
    run: Run,

    in_string: bool,
    escape: bool,

    /// 0 none, 1 after `/`, 2 line comment, 3+ block comment state
    comment: usize,
}

/// Tokenize a whole source text
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    let mut lexer = Lexer {
        tokens: Vec::new(),
        buf: String::new(),
        buf_line: 1,
        line: 1,
        run: Run::Other,
        in_string: false,
        escape: false,
        comment: 0,
    };

    for c in source.chars() {
        lexer.feed(c);
        if c == '\n' {
            lexer.line += 1;
        }
    }

    match lexer.comment {
        0 | 2 => {}
        // A lone trailing '/' is an operator, not a comment
        1 => {
            lexer.flush();
            lexer.push_char('/');
        }
        _ => return Err(CompileError::UnterminatedComment),
    }
    lexer.flush();

    Ok(lexer.tokens)
}

impl Lexer {
    fn feed(&mut self, c: char) {
        match self.comment {
            0 => {}
            1 => match c {
                '/' => {
                    self.comment = 2;
                    return;
                }
                '*' => {
                    self.comment = 3;
                    return;
                }
                _ => {
                    self.comment = 0;
                    self.push_char('/');
                }
            },
            2 => {
                if c == '\n' {
                    self.comment = 0;
                }
                return;
            }
            n => {
                // Three states per nesting level: body, after '*', after '/'
                match (n - 3) % 3 {
                    0 => match c {
                        '*' => self.comment += 1,
                        '/' => self.comment += 2,
                        _ => {}
                    },
                    1 => match c {
                        '/' => self.comment -= 4,
                        '*' => {}
                        _ => self.comment -= 1,
                    },
                    _ => match c {
                        '*' => self.comment += 1,
                        '/' => {}
                        _ => self.comment -= 2,
                    },
                }
                return;
            }
        }

        if self.in_string {
            self.feed_string(c);
            return;
        }

        match c {
            '/' => {
                self.flush();
                self.comment = 1;
                self.run = Run::Other;
            }
            c if c.is_whitespace() => {
                self.flush();
                self.run = Run::Other;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                if self.run != Run::Word {
                    self.flush();
                }
                self.push_char(c);
                self.run = Run::Word;
            }
            '@' => {
                self.flush();
                self.push_char(c);
                self.run = Run::Global;
            }
            c if c.is_ascii_digit() => {
                if self.run == Run::Other {
                    self.flush();
                    self.run = Run::Number;
                }
                self.push_char(c);
            }
            '.' => {
                if self.run == Run::Number {
                    self.run = Run::Fraction;
                } else {
                    self.flush();
                    self.run = Run::Other;
                }
                self.push_char(c);
            }
            '"' => {
                self.flush();
                self.run = Run::Other;
                self.in_string = true;
                self.push_char(c);
            }
            '=' => {
                if self.flush() && self.last_is_one_of("+-*/%<=>!") {
                    self.extend_last(c);
                } else {
                    self.push_char(c);
                }
                self.run = Run::Other;
            }
            '+' | '-' | '&' | '^' | '|' => {
                if self.flush() && self.last_is_one_of(&c.to_string()) {
                    self.extend_last(c);
                } else {
                    self.push_char(c);
                }
                self.run = Run::Other;
            }
            // Brackets, separators, remaining operators and stray characters
            _ => {
                self.flush();
                self.push_char(c);
                self.run = Run::Other;
            }
        }
    }

    fn feed_string(&mut self, c: char) {
        match c {
            '\\' if !self.escape => self.escape = true,
            '"' if !self.escape => {
                self.buf.push(c);
                self.in_string = false;
                self.flush();
            }
            '\r' => {}
            // An unescaped newline closes the lexeme without a quote
            '\n' if !self.escape => {
                self.in_string = false;
                self.flush();
            }
            _ => {
                self.buf.push(c);
                self.escape = false;
            }
        }
    }

    fn push_char(&mut self, c: char) {
        if self.buf.is_empty() {
            self.buf_line = self.line;
        }
        self.buf.push(c);
    }

    /// Emit the buffered lexeme, if any. Returns whether one was emitted.
    fn flush(&mut self) -> bool {
        if self.buf.is_empty() {
            return false;
        }
        let text = std::mem::take(&mut self.buf);
        self.tokens.push(Token::new(text, self.buf_line));
        true
    }

    /// Whether the last token is a single character from `set`
    fn last_is_one_of(&self, set: &str) -> bool {
        let Some(last) = self.tokens.last() else {
            return false;
        };
        let mut chars = last.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => set.contains(c),
            _ => false,
        }
    }

    fn extend_last(&mut self, c: char) {
        if let Some(last) = self.tokens.last_mut() {
            last.text.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn splits_statements() {
        assert_eq!(
            texts("a = b+1;"),
            vec!["a", "=", "b", "+", "1", ";"]
        );
        assert_eq!(
            texts("print(\"x y\");"),
            vec!["print", "(", "\"x y\"", ")", ";"]
        );
    }

    #[test]
    fn merges_two_character_operators() {
        assert_eq!(
            texts("a+=1 b==c d!=e f<=g x++ y-- p&&q r||s t^^u v/=2 w%=3"),
            vec![
                "a", "+=", "1", "b", "==", "c", "d", "!=", "e", "f", "<=", "g", "x", "++", "y",
                "--", "p", "&&", "q", "r", "||", "s", "t", "^^", "u", "v", "/=", "2", "w", "%=", "3"
            ]
        );
    }

    #[test]
    fn operators_merge_only_when_adjacent() {
        assert_eq!(texts("a + = b"), vec!["a", "+", "=", "b"]);
        assert_eq!(texts("+++"), vec!["++", "+"]);
        assert_eq!(texts("a+-b"), vec!["a", "+", "-", "b"]);
        assert_eq!(texts("a<<b"), vec!["a", "<", "<", "b"]);
    }

    #[test]
    fn minus_is_never_part_of_a_number() {
        assert_eq!(texts("x=-5"), vec!["x", "=", "-", "5"]);
        assert_eq!(texts("1.5.2"), vec!["1.5", ".", "2"]);
    }

    #[test]
    fn words_numbers_and_globals() {
        assert_eq!(texts("a1 1a @3x"), vec!["a1", "1", "a", "@3", "x"]);
    }

    #[test]
    fn comments_are_dropped_and_nest() {
        assert_eq!(texts("a // c\nb"), vec!["a", "b"]);
        assert_eq!(texts("a /* x /* y */ z */ b"), vec!["a", "b"]);
        assert_eq!(texts("a/b"), vec!["a", "/", "b"]);
        assert_eq!(texts("a /"), vec!["a", "/"]);
    }

    #[test]
    fn unterminated_block_comment_fails() {
        assert!(matches!(
            tokenize("a /* x /* y */"),
            Err(CompileError::UnterminatedComment)
        ));
    }

    #[test]
    fn string_escapes_keep_the_next_character() {
        assert_eq!(texts(r#""a\"b\\c""#), vec![r#""a"b\c""#]);
        assert_eq!(texts("\"a\r\nb\""), vec!["\"a", "b", "\""]);
    }

    #[test]
    fn tokens_record_their_line() {
        let tokens = tokenize("a\n\n  b /*\n*/ c").unwrap();
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }
}
