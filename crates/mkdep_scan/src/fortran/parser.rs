//! Statement recognition and conditional compilation state.
//!
//! The parser does not build a syntax tree. Each statement is classified by
//! its leading tokens into one of the few shapes that carry dependency
//! information; everything else is ignored.

use crate::fortran::token::FortranToken;

/// A statement relevant to dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// A module is used; the name is lower-cased.
    Use(String),
    /// A module is defined; the name is lower-cased.
    Module(String),
    /// A submodule is defined; holds its lower-cased ancestor module.
    Submodule(String),
    /// `END MODULE` or `END SUBMODULE`.
    ModuleEnd,
    /// A bare `END`, which may close a module.
    End,
    /// A Fortran `INCLUDE` line.
    Include(String),
    /// Start of an interface block.
    InterfaceStart,
    /// End of an interface block.
    InterfaceEnd,
    /// Anything else.
    Ignored,
}

/// Classifies one statement, given its tokens without the terminator.
pub fn classify(tokens: &[FortranToken]) -> Statement {
    use FortranToken as T;

    let kw = |tok: &str, keyword: &str| tok.eq_ignore_ascii_case(keyword);
    match tokens {
        [T::Word(a), T::Word(b), ..] if kw(a, "end") && kw(b, "interface") => {
            Statement::InterfaceEnd
        }
        [T::Word(a), ..] if kw(a, "endinterface") => Statement::InterfaceEnd,
        [T::Word(a), T::Word(b), ..]
            if kw(a, "end") && (kw(b, "module") || kw(b, "submodule")) =>
        {
            Statement::ModuleEnd
        }
        [T::Word(a), ..] if kw(a, "endmodule") || kw(a, "endsubmodule") => Statement::ModuleEnd,
        [T::Word(a)] if kw(a, "end") => Statement::End,
        [T::Word(a), T::Word(b), ..] if kw(a, "abstract") && kw(b, "interface") => {
            Statement::InterfaceStart
        }
        [T::Word(a)] | [T::Word(a), T::Word(_), ..] if kw(a, "interface") => {
            Statement::InterfaceStart
        }
        [T::Word(u), T::Word(name), ..] if kw(u, "use") => Statement::Use(name.to_ascii_lowercase()),
        [T::Word(u), T::DoubleColon, T::Word(name), ..] if kw(u, "use") => {
            Statement::Use(name.to_ascii_lowercase())
        }
        [T::Word(u), T::Comma, T::Word(nature), T::DoubleColon, T::Word(name), ..]
            if kw(u, "use") =>
        {
            if kw(nature, "non_intrinsic") {
                Statement::Use(name.to_ascii_lowercase())
            } else {
                Statement::Ignored
            }
        }
        [T::Word(m), T::Word(name), ..] if kw(m, "module") => {
            if ["function", "procedure", "subroutine"]
                .iter()
                .any(|k| kw(name, k))
            {
                Statement::Ignored
            } else {
                Statement::Module(name.to_ascii_lowercase())
            }
        }
        [T::Word(s), T::LParen, T::Word(parent), T::RParen, T::Word(_), ..]
        | [T::Word(s), T::LParen, T::Word(parent), T::Colon, T::Word(_), T::RParen, T::Word(_), ..]
            if kw(s, "submodule") =>
        {
            Statement::Submodule(parent.to_ascii_lowercase())
        }
        [T::Word(i), T::Str(file), ..] if kw(i, "include") => Statement::Include(file.clone()),
        _ => Statement::Ignored,
    }
}

/// Preprocessor conditional state.
///
/// `false_depth` counts how deep inside a skipped branch the reader is; zero
/// means statements are live. `skip_to_end` has one entry per open
/// conditional and is set once a branch of it has been taken, so later
/// alternatives are skipped. `#if` and `#elif` conditions are not evaluated:
/// those branches are always taken.
#[derive(Debug, Default)]
pub struct Conditionals {
    false_depth: u32,
    skip_to_end: Vec<bool>,
}

impl Conditionals {
    /// Returns `true` if statements at the current position are live.
    pub fn is_active(&self) -> bool {
        self.false_depth == 0
    }

    /// Number of open conditionals.
    pub fn depth(&self) -> usize {
        self.skip_to_end.len()
    }

    /// `#ifdef`/`#ifndef` whose condition evaluated to `taken`.
    pub fn enter(&mut self, taken: bool) {
        self.skip_to_end.push(false);
        if self.false_depth > 0 {
            self.false_depth += 1;
        } else if !taken {
            self.false_depth = 1;
        } else if let Some(top) = self.skip_to_end.last_mut() {
            *top = true;
        }
    }

    /// `#if` with an unevaluated condition.
    pub fn enter_unevaluated(&mut self) {
        self.skip_to_end.push(false);
        if self.false_depth > 0 {
            self.false_depth += 1;
        }
    }

    /// `#elif` or `#else`.
    pub fn alternative(&mut self) -> Result<(), &'static str> {
        let Some(taken_before) = self.skip_to_end.last() else {
            return Err("#else or #elif without matching #if");
        };
        if self.false_depth > 1 {
            return Ok(());
        }
        self.false_depth = u32::from(*taken_before);
        Ok(())
    }

    /// `#endif`.
    pub fn leave(&mut self) -> Result<(), &'static str> {
        if self.skip_to_end.pop().is_none() {
            return Err("#endif without matching #if");
        }
        if self.false_depth > 0 {
            self.false_depth -= 1;
        }
        Ok(())
    }
}
