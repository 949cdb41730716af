//! Token types for the Fortran dependency lexer.
//!
//! Only the shapes that matter for dependencies are distinguished; numbers,
//! operators and everything else collapse into [`FortranToken::Other`].

/// A Fortran token kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FortranToken {
    /// An identifier or keyword, as spelled in the source.
    Word(String),
    /// A character constant, without its delimiters.
    Str(String),
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `::`
    DoubleColon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// Any other lexeme.
    Other,
    /// A newline or `;` ending a statement.
    EndOfStatement,
    /// A preprocessor directive occupying a whole line.
    Directive(Directive),
}

/// A preprocessor or include directive.
///
/// `#include`, `$include` and `??include` all become [`Directive::Include`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Include the named file.
    Include(String),
    /// `#define NAME`
    Define(String),
    /// `#undef NAME`
    Undef(String),
    /// `#ifdef NAME`
    Ifdef(String),
    /// `#ifndef NAME`
    Ifndef(String),
    /// `#if ...`
    If,
    /// `#elif ...`
    Elif,
    /// `#else`
    Else,
    /// `#endif`
    Endif,
    /// Any other directive (`#line`, `#pragma`, line markers, ...).
    Other,
}

/// A token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: FortranToken,
    /// 1-based line number.
    pub line: u32,
}

impl FortranToken {
    /// Returns `true` if this is a word equal to `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, FortranToken::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// The spelling of a word token.
    pub fn word(&self) -> Option<&str> {
        match self {
            FortranToken::Word(w) => Some(w),
            _ => None,
        }
    }
}
