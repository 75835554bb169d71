use crate::token::Token;

pub struct Lexer {
    input: String,
    position: usize,
    read_position: usize,
    ch: u8,
}

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_token())
    }
}

impl Lexer {
    pub fn new(input: String) -> Self {
        let mut lexer = Self {
            input,
            position: 0,
            read_position: 0,
            ch: 0,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        self.ch = *self.input.as_bytes().get(self.read_position).unwrap_or(&0);
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> u8 {
        *self.input.as_bytes().get(self.read_position).unwrap_or(&0)
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let token = match self.ch {
            b'=' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    Token::Eq
                } else {
                    Token::Assign
                }
            }
            b'!' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    Token::NotEq
                } else {
                    Token::Bang
                }
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Asterisk,
            b'/' => Token::Slash,
            b'^' => Token::Caret,
            b'<' => Token::LT,
            b'>' => Token::GT,
            b';' => Token::Semicolon,
            b',' => Token::Comma,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'"' => return self.read_string(),
            0 if self.at_end() => Token::Eof,
            c => {
                if is_letter(c) {
                    return Token::from(self.read_identifier());
                } else if c.is_ascii_digit() {
                    return Token::Int(self.read_number().to_owned());
                } else {
                    let ch = self
                        .input
                        .get(self.position..)
                        .and_then(|rest| rest.chars().next())
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    tracing::trace!(%ch, position = self.position, "illegal character");
                    // Leave the last byte of the character to the read below.
                    for _ in 1..ch.len_utf8() {
                        self.read_char();
                    }
                    Token::Illegal(ch)
                }
            }
        };
        self.read_char();
        token
    }

    fn read_identifier(&mut self) -> &str {
        let start = self.position;
        while is_letter(self.ch) {
            self.read_char()
        }
        &self.input[start..self.position]
    }

    fn read_number(&mut self) -> &str {
        let start = self.position;
        while self.ch.is_ascii_digit() {
            self.read_char()
        }
        &self.input[start..self.position]
    }

    // Called with the opening quote as the current character; leaves the
    // lexer on the character after the closing quote.
    fn read_string(&mut self) -> Token {
        let start = self.position;
        let mut bytes = Vec::new();

        loop {
            self.read_char();
            if self.at_end() {
                return Token::UnterminatedString(start);
            }
            match self.ch {
                b'\\' if self.peek_char() == b'"' => {
                    self.read_char();
                    bytes.push(b'"');
                }
                b'"' => break,
                c => bytes.push(c),
            }
        }
        self.read_char();

        Token::String(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while is_whitespace(self.ch) {
                self.read_char();
            }

            if self.ch == b'/' && self.peek_char() == b'/' {
                while !self.at_end() && self.ch != b'\n' && self.ch != b'\r' {
                    self.read_char();
                }
            } else {
                return;
            }
        }
    }
}
