//! Embedded expectation blocks and the assertion language they contain.
//!
//! A test file asserts on its own outcome from inside `//#` comment lines,
//! which the compiler under test treats as ordinary comments:
//!
//! ```text
//! //# expect
//! //# (and (status compile-error)
//! //#      (error 0412))
//! //# end
//! ```
//!
//! The `expect` / `end` marker words are matched case-insensitively and with
//! arbitrary surrounding whitespace. Everything between them (with the `//#`
//! prefix stripped) is the predicate source. A file without a block gets the
//! default predicate `(status success)`.
//!
//! The language is deliberately tiny: it parses into an [`Assertion`] tree
//! and is walked against the run's [`RunResult`]. Nothing in a block can
//! execute outside that tree, and nothing in a block can abort the batch —
//! a predicate that fails to parse or evaluate becomes that one test's
//! failure message.
//!
//! Forms:
//!
//! ```text
//! (status success|test-error|compile-error|misc-error|timeout)
//! (error 0412)            diagnostic with that code is present
//! (warning 0007)
//! (errors >= 2)           count comparison: == != < <= > >=
//! (warnings == 0)
//! (title "pattern")       some diagnostic title matches the regex
//! (body "pattern")        some diagnostic body matches the regex
//! (and ...) (or ...) (not x)
//! ```

use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Severity};
use crate::run_result::{RunResult, RunStatus};

/// Comment prefix carrying harness directives inside a test file.
pub const BLOCK_PREFIX: &str = "//#";

/// A predicate that failed to parse. Reported as the owning test's failure,
/// never propagated.
#[derive(Debug, Error)]
pub enum ExpectError {
    #[error("expectation syntax error: {0}")]
    Syntax(String),

    #[error("invalid pattern in expectation: {0}")]
    Pattern(#[from] regex::Error),
}

/// Extracts the expectation source between the `expect` and `end` markers.
/// Returns `None` when the file carries no block at all.
pub fn extract_block(source: &str) -> Option<String> {
    let mut opened = false;
    let mut in_block = false;
    let mut lines = Vec::new();

    for line in source.lines() {
        let Some(rest) = line.trim().strip_prefix(BLOCK_PREFIX) else {
            continue;
        };
        let word = rest.trim();
        if word.eq_ignore_ascii_case("expect") && !opened {
            opened = true;
            in_block = true;
        } else if word.eq_ignore_ascii_case("end") && in_block {
            in_block = false;
        } else if in_block {
            lines.push(rest.to_string());
        }
    }

    opened.then(|| lines.join("\n"))
}

// =====================
// Assertion AST
// =====================

/// Comparison operator in a count clause.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparison {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl Comparison {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(Comparison::Eq),
            "!=" => Some(Comparison::Neq),
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Leq),
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Geq),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Neq => "!=",
            Comparison::Lt => "<",
            Comparison::Leq => "<=",
            Comparison::Gt => ">",
            Comparison::Geq => ">=",
        }
    }

    pub fn check(self, actual: usize, bound: usize) -> bool {
        match self {
            Comparison::Eq => actual == bound,
            Comparison::Neq => actual != bound,
            Comparison::Lt => actual < bound,
            Comparison::Leq => actual <= bound,
            Comparison::Gt => actual > bound,
            Comparison::Geq => actual >= bound,
        }
    }
}

/// One node of the assertion tree.
#[derive(Debug)]
pub enum Assertion {
    Status(RunStatus),
    HasDiagnostic(Severity, u16),
    Count(Severity, Comparison, usize),
    TitleMatches(Regex),
    BodyMatches(Regex),
    All(Vec<Assertion>),
    Any(Vec<Assertion>),
    Not(Box<Assertion>),
}

impl Assertion {
    /// Walks the tree against a result. `Err` carries the message for the
    /// first failing clause.
    fn check(&self, result: &RunResult) -> Result<(), String> {
        match self {
            Assertion::Status(expected) => {
                if result.status == *expected {
                    Ok(())
                } else {
                    Err(format!(
                        "expected status {expected}, got {}",
                        result.status
                    ))
                }
            }
            Assertion::HasDiagnostic(severity, code) => {
                let pool = severity_pool(result, *severity);
                if pool.iter().any(|d| d.code == *code) {
                    Ok(())
                } else {
                    Err(format!(
                        "no {} with code {}-{:04}; saw [{}]",
                        severity.as_str(),
                        severity.code_prefix(),
                        code,
                        list_codes(pool)
                    ))
                }
            }
            Assertion::Count(severity, comparison, bound) => {
                let actual = severity_pool(result, *severity).len();
                if comparison.check(actual, *bound) {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} count {} {bound}, got {actual}",
                        severity.as_str(),
                        comparison.symbol()
                    ))
                }
            }
            Assertion::TitleMatches(pattern) => {
                if all_diagnostics(result).any(|d| pattern.is_match(&d.title)) {
                    Ok(())
                } else {
                    Err(format!("no diagnostic title matches `{pattern}`"))
                }
            }
            Assertion::BodyMatches(pattern) => {
                if all_diagnostics(result).any(|d| pattern.is_match(&d.body)) {
                    Ok(())
                } else {
                    Err(format!("no diagnostic body matches `{pattern}`"))
                }
            }
            Assertion::All(clauses) => {
                for clause in clauses {
                    clause.check(result)?;
                }
                Ok(())
            }
            Assertion::Any(clauses) => {
                if clauses.is_empty() {
                    return Err("empty (or) can never hold".to_string());
                }
                let mut failures = Vec::new();
                for clause in clauses {
                    match clause.check(result) {
                        Ok(()) => return Ok(()),
                        Err(message) => failures.push(message),
                    }
                }
                Err(format!("no alternative held: {}", failures.join("; ")))
            }
            Assertion::Not(inner) => match inner.check(result) {
                Ok(()) => Err("negated assertion held".to_string()),
                Err(_) => Ok(()),
            },
        }
    }
}

fn severity_pool(result: &RunResult, severity: Severity) -> &[Diagnostic] {
    match severity {
        Severity::Error => &result.errors,
        Severity::Warning => &result.warnings,
    }
}

fn all_diagnostics(result: &RunResult) -> impl Iterator<Item = &Diagnostic> {
    result.errors.iter().chain(result.warnings.iter())
}

fn list_codes(pool: &[Diagnostic]) -> String {
    pool.iter()
        .map(|d| d.display_code())
        .collect::<Vec<_>>()
        .join(", ")
}

// =====================
// Expectation
// =====================

/// A predicate over one run's outcome, ready to evaluate.
pub struct Expectation {
    root: Assertion,
}

impl Expectation {
    /// The implicit predicate for files without a block.
    pub fn default_success() -> Self {
        Expectation {
            root: Assertion::Status(RunStatus::Success),
        }
    }

    /// Parses an extracted block. Consecutive top-level forms are an
    /// implicit `(and ...)`, so multi-line blocks read naturally.
    pub fn parse(block: &str) -> Result<Self, ExpectError> {
        let tokens = tokenize(block)?;
        let mut parser = Parser { tokens, pos: 0 };
        let mut clauses = Vec::new();
        while !parser.at_end() {
            clauses.push(parser.parse_assertion()?);
        }
        let root = match clauses.len() {
            0 => return Err(ExpectError::Syntax("empty expectation block".to_string())),
            1 => clauses.pop().unwrap_or(Assertion::All(Vec::new())),
            _ => Assertion::All(clauses),
        };
        Ok(Expectation { root })
    }

    /// Builds the expectation for a test file: the embedded block if one
    /// exists, otherwise the default.
    pub fn for_file(source: &str) -> Result<Self, ExpectError> {
        match extract_block(source) {
            Some(block) => Self::parse(&block),
            None => Ok(Self::default_success()),
        }
    }

    /// Evaluates against a result. `Err` is the test's failure message.
    pub fn check(&self, result: &RunResult) -> Result<(), String> {
        self.root.check(result)
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expectation").field(&self.root).finish()
    }
}

// =====================
// Tokenizer and parser
// =====================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    Atom(String),
    Str(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpectError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        // Only the quote and the backslash itself need
                        // escaping; everything else (say, a regex `\d`)
                        // passes through untouched.
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => text.push(escaped),
                            Some(other) => {
                                text.push('\\');
                                text.push(other);
                            }
                            None => {
                                return Err(ExpectError::Syntax(
                                    "unterminated string".to_string(),
                                ))
                            }
                        },
                        Some(other) => text.push(other),
                        None => {
                            return Err(ExpectError::Syntax("unterminated string".to_string()))
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn next(&mut self) -> Result<Token, ExpectError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ExpectError::Syntax("unexpected end of expectation".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expect_close(&mut self) -> Result<(), ExpectError> {
        match self.next()? {
            Token::RParen => Ok(()),
            other => Err(ExpectError::Syntax(format!(
                "expected `)`, found {}",
                describe_token(&other)
            ))),
        }
    }

    fn atom(&mut self) -> Result<String, ExpectError> {
        match self.next()? {
            Token::Atom(atom) => Ok(atom),
            other => Err(ExpectError::Syntax(format!(
                "expected a word, found {}",
                describe_token(&other)
            ))),
        }
    }

    fn string(&mut self) -> Result<String, ExpectError> {
        match self.next()? {
            Token::Str(text) => Ok(text),
            other => Err(ExpectError::Syntax(format!(
                "expected a quoted pattern, found {}",
                describe_token(&other)
            ))),
        }
    }

    fn parse_assertion(&mut self) -> Result<Assertion, ExpectError> {
        match self.next()? {
            Token::LParen => {}
            other => {
                return Err(ExpectError::Syntax(format!(
                    "expected `(`, found {}",
                    describe_token(&other)
                )))
            }
        }

        let head = self.atom()?;
        let assertion = match head.as_str() {
            "status" => {
                let name = self.atom()?;
                let status = RunStatus::from_name(&name).ok_or_else(|| {
                    ExpectError::Syntax(format!("unknown status `{name}`"))
                })?;
                Assertion::Status(status)
            }
            "error" => Assertion::HasDiagnostic(Severity::Error, self.code()?),
            "warning" => Assertion::HasDiagnostic(Severity::Warning, self.code()?),
            "errors" => self.parse_count(Severity::Error)?,
            "warnings" => self.parse_count(Severity::Warning)?,
            "title" => Assertion::TitleMatches(Regex::new(&self.string()?)?),
            "body" => Assertion::BodyMatches(Regex::new(&self.string()?)?),
            "and" => Assertion::All(self.parse_until_close()?),
            "or" => Assertion::Any(self.parse_until_close()?),
            "not" => {
                let inner = self.parse_assertion()?;
                Assertion::Not(Box::new(inner))
            }
            other => {
                return Err(ExpectError::Syntax(format!("unknown assertion `{other}`")))
            }
        };

        // `and`/`or` consume their own closing paren.
        if !matches!(assertion, Assertion::All(_) | Assertion::Any(_)) {
            self.expect_close()?;
        }
        Ok(assertion)
    }

    fn code(&mut self) -> Result<u16, ExpectError> {
        let atom = self.atom()?;
        atom.parse()
            .map_err(|_| ExpectError::Syntax(format!("`{atom}` is not a diagnostic code")))
    }

    fn parse_count(&mut self, severity: Severity) -> Result<Assertion, ExpectError> {
        let op = self.atom()?;
        let comparison = Comparison::from_symbol(&op)
            .ok_or_else(|| ExpectError::Syntax(format!("`{op}` is not a comparison")))?;
        let bound_atom = self.atom()?;
        let bound = bound_atom
            .parse()
            .map_err(|_| ExpectError::Syntax(format!("`{bound_atom}` is not a count")))?;
        Ok(Assertion::Count(severity, comparison, bound))
    }

    fn parse_until_close(&mut self) -> Result<Vec<Assertion>, ExpectError> {
        let mut clauses = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(clauses);
                }
                Some(_) => clauses.push(self.parse_assertion()?),
                None => {
                    return Err(ExpectError::Syntax(
                        "unexpected end of expectation".to_string(),
                    ))
                }
            }
        }
    }
}

fn describe_token(token: &Token) -> String {
    match token {
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
        Token::Atom(atom) => format!("`{atom}`"),
        Token::Str(text) => format!("\"{text}\""),
    }
}
