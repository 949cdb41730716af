//! Line-oriented lexer for free- and fixed-form Fortran.
//!
//! Produces the token stream the dependency parser works on. Comments are
//! dropped, continuation lines are joined into one statement, and every
//! preprocessor line becomes a single [`FortranToken::Directive`] followed by
//! an end of statement.

use std::path::Path;

use crate::error::ScanError;
use crate::fortran::token::{Directive, FortranToken, Token};

/// Source layout of a Fortran file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceForm {
    /// Free form (`.f90` and later).
    Free,
    /// Fixed form (`.f`, `.for`, ...): column 1 comments, column 6
    /// continuation markers.
    Fixed,
}

impl SourceForm {
    /// The form implied by a file extension, if it implies one.
    pub fn from_path(path: &Path) -> Option<SourceForm> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "f" | "for" | "ftn" | "f77" | "fpp" => Some(SourceForm::Fixed),
            "f90" | "f95" | "f03" | "f08" | "f18" => Some(SourceForm::Free),
            _ => None,
        }
    }
}

/// Lexes Fortran source text. `path` is only used for error reporting.
///
/// The returned stream always ends with [`FortranToken::EndOfStatement`]
/// unless it is empty.
pub fn lex(source: &str, form: SourceForm, path: &Path) -> Result<Vec<Token>, ScanError> {
    let mut lexer = Lexer {
        path,
        form,
        tokens: Vec::new(),
        continued: false,
        open_string: None,
    };
    let mut last_line = 0;
    for (idx, line) in source.lines().enumerate() {
        last_line = idx as u32 + 1;
        lexer.lex_line(line, last_line)?;
    }
    if let Some(open) = &lexer.open_string {
        return Err(lexer.error(open.start_line, "unterminated character constant"));
    }
    lexer.end_statement(last_line);
    Ok(lexer.tokens)
}

struct OpenString {
    quote: u8,
    content: Vec<u8>,
    start_line: u32,
}

struct Lexer<'a> {
    path: &'a Path,
    form: SourceForm,
    tokens: Vec<Token>,
    continued: bool,
    open_string: Option<OpenString>,
}

impl Lexer<'_> {
    fn push(&mut self, kind: FortranToken, line: u32) {
        self.tokens.push(Token { kind, line });
    }

    fn end_statement(&mut self, line: u32) {
        match self.tokens.last() {
            None | Some(Token {
                kind: FortranToken::EndOfStatement,
                ..
            }) => {}
            Some(_) => self.push(FortranToken::EndOfStatement, line),
        }
    }

    fn error(&self, line: u32, reason: &str) -> ScanError {
        ScanError::Parse {
            path: self.path.to_path_buf(),
            line,
            reason: reason.to_string(),
        }
    }

    fn lex_line(&mut self, line: &str, line_no: u32) -> Result<(), ScanError> {
        let bytes = line.as_bytes();
        let trimmed = line.trim_start();

        if self.open_string.is_none() {
            if let Some(directive) = trimmed.strip_prefix('#') {
                self.continued = false;
                self.end_statement(line_no);
                self.push(FortranToken::Directive(parse_directive(directive)), line_no);
                self.push(FortranToken::EndOfStatement, line_no);
                return Ok(());
            }
            if let Some(name) = alternate_include(trimmed) {
                self.continued = false;
                self.end_statement(line_no);
                self.push(FortranToken::Directive(Directive::Include(name)), line_no);
                self.push(FortranToken::EndOfStatement, line_no);
                return Ok(());
            }
        }

        let mut pos = 0;
        match self.form {
            SourceForm::Fixed => {
                if matches!(bytes.first(), Some(b'c' | b'C' | b'*' | b'd' | b'D')) {
                    return Ok(());
                }
                let continuation = bytes.len() >= 6
                    && bytes[..5].iter().all(|b| *b == b' ')
                    && !matches!(bytes[5], b' ' | b'0');
                if continuation {
                    if let Some(Token {
                        kind: FortranToken::EndOfStatement,
                        ..
                    }) = self.tokens.last()
                    {
                        self.tokens.pop();
                    }
                    pos = 6;
                }
            }
            SourceForm::Free => {
                if self.continued {
                    if trimmed.is_empty() || trimmed.starts_with('!') {
                        return Ok(());
                    }
                    pos = bytes.len() - trimmed.len();
                    if bytes.get(pos) == Some(&b'&') {
                        pos += 1;
                    }
                }
            }
        }
        self.continued = false;

        if let Some(open) = self.open_string.take() {
            pos = self.lex_string(bytes, pos, open, line_no)?;
            if self.open_string.is_some() {
                return Ok(());
            }
        }

        while pos < bytes.len() {
            let b = bytes[pos];
            match b {
                b' ' | b'\t' | b'\r' => pos += 1,
                b'!' => break,
                b';' => {
                    self.end_statement(line_no);
                    pos += 1;
                }
                b'&' if self.form == SourceForm::Free => {
                    let rest = line[pos + 1..].trim_start();
                    if rest.is_empty() || rest.starts_with('!') {
                        self.continued = true;
                        break;
                    }
                    self.push(FortranToken::Other, line_no);
                    pos += 1;
                }
                b'\'' | b'"' => {
                    let open = OpenString {
                        quote: b,
                        content: Vec::new(),
                        start_line: line_no,
                    };
                    pos = self.lex_string(bytes, pos + 1, open, line_no)?;
                    if self.open_string.is_some() {
                        return Ok(());
                    }
                }
                b':' => {
                    if bytes.get(pos + 1) == Some(&b':') {
                        self.push(FortranToken::DoubleColon, line_no);
                        pos += 2;
                    } else {
                        self.push(FortranToken::Colon, line_no);
                        pos += 1;
                    }
                }
                b',' => {
                    self.push(FortranToken::Comma, line_no);
                    pos += 1;
                }
                b'(' => {
                    self.push(FortranToken::LParen, line_no);
                    pos += 1;
                }
                b')' => {
                    self.push(FortranToken::RParen, line_no);
                    pos += 1;
                }
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    let start = pos;
                    while pos < bytes.len()
                        && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'_' | b'$'))
                    {
                        pos += 1;
                    }
                    self.push(FortranToken::Word(line[start..pos].to_string()), line_no);
                }
                b if b.is_ascii_digit() => {
                    while pos < bytes.len()
                        && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'.' | b'_'))
                    {
                        pos += 1;
                    }
                    self.push(FortranToken::Other, line_no);
                }
                _ => {
                    self.push(FortranToken::Other, line_no);
                    pos += 1;
                }
            }
        }

        if !self.continued {
            self.end_statement(line_no);
        }
        Ok(())
    }

    /// Consumes a character constant body starting at `pos`, returning the
    /// position after the closing quote.
    ///
    /// A free-form constant ending the line with `&` stays open and continues
    /// on the next line; a fixed-form constant is closed at end of line.
    fn lex_string(
        &mut self,
        bytes: &[u8],
        mut pos: usize,
        mut open: OpenString,
        line_no: u32,
    ) -> Result<usize, ScanError> {
        while pos < bytes.len() {
            let b = bytes[pos];
            if b == open.quote {
                if bytes.get(pos + 1) == Some(&open.quote) {
                    open.content.push(b);
                    pos += 2;
                    continue;
                }
                let text = String::from_utf8_lossy(&open.content).into_owned();
                self.push(FortranToken::Str(text), open.start_line);
                return Ok(pos + 1);
            }
            open.content.push(b);
            pos += 1;
        }
        match self.form {
            SourceForm::Fixed => {
                let text = String::from_utf8_lossy(&open.content).into_owned();
                self.push(FortranToken::Str(text), open.start_line);
                Ok(pos)
            }
            SourceForm::Free => {
                while open.content.last().is_some_and(|b| b.is_ascii_whitespace()) {
                    open.content.pop();
                }
                if open.content.last() != Some(&b'&') {
                    return Err(self.error(line_no, "unterminated character constant"));
                }
                open.content.pop();
                self.open_string = Some(open);
                self.continued = true;
                Ok(pos)
            }
        }
    }
}

/// Parses the text after `#` on a preprocessor line.
fn parse_directive(text: &str) -> Directive {
    let text = text.trim_start();
    let keyword_len = text.bytes().take_while(u8::is_ascii_alphabetic).count();
    let (keyword, args) = text.split_at(keyword_len);
    let args = args.trim_start();
    let name_len = args
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let name = args[..name_len].to_string();
    match keyword {
        "include" => match delimited(args) {
            Some(file) => Directive::Include(file),
            None => Directive::Other,
        },
        "define" if !name.is_empty() => Directive::Define(name),
        "undef" if !name.is_empty() => Directive::Undef(name),
        "ifdef" => Directive::Ifdef(name),
        "ifndef" => Directive::Ifndef(name),
        "if" => Directive::If,
        "elif" => Directive::Elif,
        "else" => Directive::Else,
        "endif" => Directive::Endif,
        _ => Directive::Other,
    }
}

/// Returns the text between a leading `"`/`<`/`'` and its closing delimiter.
fn delimited(text: &str) -> Option<String> {
    let close = match text.chars().next()? {
        '"' => '"',
        '\'' => '\'',
        '<' => '>',
        _ => return None,
    };
    let body = &text[1..];
    let end = body.find(close)?;
    Some(body[..end].to_string())
}

/// Recognizes `$include 'file'` and `??include 'file'` lines.
fn alternate_include(line: &str) -> Option<String> {
    let rest = match line.strip_prefix("??") {
        Some(rest) => rest,
        None => line.strip_prefix('$')?.trim_start(),
    };
    let keyword = rest.get(..7)?;
    if !keyword.eq_ignore_ascii_case("include") {
        return None;
    }
    delimited(rest[7..].trim_start())
}
