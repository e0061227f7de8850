//! Tokenizer for the Basil dialect.
//!
//! Produces a restartable stream of tokens annotated with (line, column)
//! positions. Reserved words are case-insensitive; identifiers may carry a
//! trailing type sigil (`%` `&` `!` `#` `$`); physical newlines are
//! significant (statement terminators) and everything else between tokens
//! is insignificant whitespace. `REM ...` and `' ...` comments run to end
//! of line; a lone ` _` before a newline continues the logical line.

use basil_core::Locus;
use std::fmt;

/// Token ids for the non-keyword classes. Keywords use their own
/// uppercase name as id (`"PRINT"`, `"IF"`, ...), punctuation its text.
pub const ID_IDENTIFIER: &str = "identifier";
pub const ID_INTEGER: &str = "integer";
pub const ID_FLOAT: &str = "float";
pub const ID_STRING: &str = "string";
pub const ID_NEWLINE: &str = "newline";
pub const ID_EOF: &str = "(eof)";

/// Reserved words of the dialect. Everything else that looks like a word
/// is an identifier, including the system routine names (CLS, LOCATE,
/// RND, ...), which are resolved by the code generator, not the grammar.
const KEYWORDS: &[&str] = &[
    "AND", "APPEND", "AS", "BASE", "CALL", "CLOSE", "DATA", "DECLARE", "DEFDBL", "DEFINT",
    "DEFLNG", "DEFSNG", "DEFSTR", "DIM", "DO", "DOUBLE", "ELSE", "ELSEIF", "END", "FOR",
    "FUNCTION", "GOSUB", "GOTO", "IF", "INPUT", "INTEGER", "LET", "LONG", "LOOP", "MOD", "NEXT",
    "NOT", "OPEN", "OPTION", "OR", "OUTPUT", "PRINT", "READ", "RESTORE", "RETURN", "SHARED",
    "SINGLE", "STEP", "STRING", "SUB", "TAB", "THEN", "TO", "TYPE", "UNTIL", "USING", "WEND",
    "WHILE", "WRITE",
];

/// Multi-character operators first so `<=` wins over `<`.
const OPERATORS: &[&str] = &[
    "<=", ">=", "<>", "<", ">", "=", "+", "-", "*", "/", "^", "(", ")", ",", ";", ":", ".", "#",
];

/// A lexed token: symbol id, matched text, source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: &'static str,
    pub text: String,
    pub locus: Locus,
}

impl Token {
    pub fn eof(locus: Locus) -> Self {
        Token { id: ID_EOF, text: String::new(), locus }
    }

    pub fn is_eof(&self) -> bool {
        self.id == ID_EOF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "end of input")
        } else if self.id == ID_NEWLINE {
            write!(f, "end of line")
        } else {
            write!(f, "'{}'", self.text)
        }
    }
}

/// Lexical error: an unrecognized byte or an unterminated string.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    BadCharacter { ch: char, locus: Locus },
    UnterminatedString { locus: Locus },
}

impl LexError {
    pub fn locus(&self) -> Locus {
        match self {
            LexError::BadCharacter { locus, .. } => *locus,
            LexError::UnterminatedString { locus } => *locus,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::BadCharacter { locus, .. } => write!(f, "Bad character at {}", locus),
            LexError::UnterminatedString { locus } => {
                write!(f, "Unterminated string at {}", locus)
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Restartable tokenizer over a source string.
pub struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer { chars: source.chars().peekable(), line: 1, column: 1 }
    }

    /// Restart a tokenizer at a given source position: the prefix up to
    /// (line, column) is consumed without producing tokens.
    pub fn starting_at(source: &'a str, line: u32, column: u32) -> Self {
        let mut t = Tokenizer::new(source);
        while t.line < line || (t.line == line && t.column < column) {
            if t.bump().is_none() {
                break;
            }
        }
        t
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn here(&self) -> Locus {
        Locus::new(self.line, self.column)
    }

    /// Skip spaces, tabs, carriage returns, comments and line
    /// continuations. Newlines are NOT skipped; they are tokens.
    fn skip_insignificant(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('\'') => self.skip_to_eol(),
                Some('_') => {
                    // Line continuation: `_` directly before the newline.
                    let mut probe = self.chars.clone();
                    probe.next();
                    match probe.peek() {
                        Some('\n') | Some('\r') => {
                            self.bump(); // _
                            while matches!(self.peek(), Some('\r')) {
                                self.bump();
                            }
                            self.bump(); // newline
                        }
                        _ => return,
                    }
                }
                _ => return,
            }
        }
    }

    fn skip_to_eol(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                return;
            }
            self.bump();
        }
    }

    /// Pull the next token. EOF repeats once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_insignificant();
        let locus = self.here();
        let c = match self.peek() {
            None => return Ok(Token::eof(locus)),
            Some(c) => c,
        };

        if c == '\n' {
            self.bump();
            return Ok(Token { id: ID_NEWLINE, text: "\n".to_string(), locus });
        }

        if c.is_ascii_alphabetic() {
            let word = self.lex_word();
            let upper = word.to_ascii_uppercase();
            if upper == "REM" {
                self.skip_to_eol();
                return self.next_token();
            }
            if let Some(kw) = KEYWORDS.iter().find(|k| **k == upper) {
                return Ok(Token { id: *kw, text: word, locus });
            }
            return Ok(Token { id: ID_IDENTIFIER, text: word, locus });
        }

        if c.is_ascii_digit() || (c == '.' && self.starts_fraction()) {
            return Ok(self.lex_number(locus));
        }

        if c == '"' {
            return self.lex_string(locus);
        }

        for op in OPERATORS {
            if self.match_operator(op) {
                // Operator ids are their own text.
                return Ok(Token { id: op, text: (*op).to_string(), locus });
            }
        }

        Err(LexError::BadCharacter { ch: c, locus })
    }

    /// Collect every remaining token, EOF included as the final entry.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.is_eof();
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn lex_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // Attach a trailing sigil to the identifier it types.
        if let Some(c) = self.peek() {
            if matches!(c, '%' | '&' | '!' | '#' | '$') {
                word.push(c);
                self.bump();
            }
        }
        word
    }

    fn starts_fraction(&mut self) -> bool {
        let mut probe = self.chars.clone();
        probe.next();
        matches!(probe.peek(), Some(d) if d.is_ascii_digit())
    }

    fn lex_number(&mut self, locus: Locus) -> Token {
        let mut text = String::new();
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
                self.bump();
            } else if (c == 'e' || c == 'E') && self.exponent_follows() {
                is_float = true;
                text.push(c);
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.bump();
                }
            } else {
                break;
            }
        }
        let id = if is_float { ID_FLOAT } else { ID_INTEGER };
        Token { id, text, locus }
    }

    fn exponent_follows(&mut self) -> bool {
        let mut probe = self.chars.clone();
        probe.next(); // the e/E
        match probe.peek() {
            Some(d) if d.is_ascii_digit() => true,
            Some('+') | Some('-') => {
                probe.next();
                matches!(probe.peek(), Some(d) if d.is_ascii_digit())
            }
            _ => false,
        }
    }

    fn lex_string(&mut self, locus: Locus) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(LexError::UnterminatedString { locus }),
                Some('"') => {
                    self.bump();
                    return Ok(Token { id: ID_STRING, text, locus });
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn match_operator(&mut self, op: &str) -> bool {
        let mut probe = self.chars.clone();
        for expected in op.chars() {
            if probe.next() != Some(expected) {
                return false;
            }
        }
        for _ in op.chars() {
            self.bump();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(src: &str) -> Vec<&'static str> {
        Tokenizer::new(src).tokenize().unwrap().iter().map(|t| t.id).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(ids("print Print PRINT"), vec!["PRINT", "PRINT", "PRINT", ID_EOF]);
    }

    #[test]
    fn identifiers_keep_their_sigils() {
        let toks = Tokenizer::new("name$ count% x# y").tokenize().unwrap();
        assert_eq!(toks[0].text, "name$");
        assert_eq!(toks[1].text, "count%");
        assert_eq!(toks[2].text, "x#");
        assert_eq!(toks[3].text, "y");
        assert!(toks.iter().take(4).all(|t| t.id == ID_IDENTIFIER));
    }

    #[test]
    fn numbers_split_into_integer_and_float() {
        assert_eq!(
            ids("1 42 3.14 .5 1e6"),
            vec![ID_INTEGER, ID_INTEGER, ID_FLOAT, ID_FLOAT, ID_FLOAT, ID_EOF]
        );
    }

    #[test]
    fn multichar_operators_win_over_single() {
        assert_eq!(
            ids("a <= b <> c"),
            vec![ID_IDENTIFIER, "<=", ID_IDENTIFIER, "<>", ID_IDENTIFIER, ID_EOF]
        );
    }

    #[test]
    fn newlines_are_tokens_and_comments_are_not() {
        assert_eq!(
            ids("PRINT 1 ' trailing\nREM whole line\nPRINT 2"),
            vec!["PRINT", ID_INTEGER, ID_NEWLINE, ID_NEWLINE, "PRINT", ID_INTEGER, ID_EOF]
        );
    }

    #[test]
    fn line_continuation_joins_lines() {
        assert_eq!(ids("PRINT _\n 1"), vec!["PRINT", ID_INTEGER, ID_EOF]);
    }

    #[test]
    fn string_literals_have_no_escapes() {
        let toks = Tokenizer::new("\"a b\"").tokenize().unwrap();
        assert_eq!(toks[0].id, ID_STRING);
        assert_eq!(toks[0].text, "a b");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            Tokenizer::new("\"oops").tokenize(),
            Err(LexError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn bad_character_reports_its_locus() {
        match Tokenizer::new("PRINT @").tokenize() {
            Err(LexError::BadCharacter { ch: '@', locus }) => {
                assert_eq!(locus, Locus::new(1, 7));
            }
            other => panic!("expected bad character, got {:?}", other),
        }
    }

    #[test]
    fn token_text_matches_source_at_locus() {
        // Round-trip property: every token's text is literally what the
        // source holds at its position (comments and whitespace aside).
        let src = "FOR I = 1 TO 3\n  PRINT I\nNEXT I\n";
        let lines: Vec<&str> = src.lines().collect();
        for tok in Tokenizer::new(src).tokenize().unwrap() {
            if tok.id == ID_NEWLINE || tok.is_eof() {
                continue;
            }
            let line = lines[(tok.locus.line - 1) as usize];
            let col = (tok.locus.column - 1) as usize;
            assert!(line[col..].starts_with(&tok.text), "{:?} not at {}", tok, tok.locus);
        }
    }

    #[test]
    fn restart_resumes_mid_source() {
        let src = "PRINT 1\nPRINT 2\n";
        let mut t = Tokenizer::starting_at(src, 2, 1);
        let tok = t.next_token().unwrap();
        assert_eq!(tok.id, "PRINT");
        assert_eq!(tok.locus, Locus::new(2, 1));
    }

    #[test]
    fn file_channel_hash_is_a_token_but_sigils_attach() {
        // `#` after WRITE is punctuation; `X#` is one identifier.
        assert_eq!(ids("WRITE #1"), vec!["WRITE", "#", ID_INTEGER, ID_EOF]);
        let toks = Tokenizer::new("X# = 1").tokenize().unwrap();
        assert_eq!(toks[0].text, "X#");
    }
}
