use crate::source_manager::{SourceManager, SourceSpan};

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Note,
}

/// Pipeline stage a diagnostic originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Semantic,
    Codegen,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Semantic => "semantic",
            Stage::Codegen => "codegen",
        };
        f.write_str(name)
    }
}

/// Individual diagnostic with source context
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub stage: Option<Stage>,
    pub message: String,
    pub location: SourceSpan,
}

impl Default for Diagnostic {
    fn default() -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            stage: None,
            message: String::new(),
            location: SourceSpan::empty(),
        }
    }
}

/// Lexical errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, location: SourceSpan },

    #[error("Invalid integer literal '{text}'")]
    InvalidLiteral { text: String, location: SourceSpan },

    #[error("Unterminated block comment")]
    UnterminatedComment { location: SourceSpan },
}

impl LexError {
    pub fn location(&self) -> SourceSpan {
        match self {
            LexError::UnexpectedCharacter { location, .. } => *location,
            LexError::InvalidLiteral { location, .. } => *location,
            LexError::UnterminatedComment { location } => *location,
        }
    }
}

/// Parse errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: SourceSpan,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEndOfInput { expected: String, location: SourceSpan },

    #[error("Integer constant '{text}' is too large for type int")]
    IntegerOutOfRange { text: String, location: SourceSpan },
}

impl ParseError {
    pub fn location(&self) -> SourceSpan {
        match self {
            ParseError::UnexpectedToken { location, .. } => *location,
            ParseError::UnexpectedEndOfInput { location, .. } => *location,
            ParseError::IntegerOutOfRange { location, .. } => *location,
        }
    }
}

/// Semantic errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("Undeclared variable '{name}'")]
    UndeclaredVariable { name: String, location: SourceSpan },

    #[error("Duplicate declaration of '{name}' in the same scope")]
    DuplicateDeclaration {
        name: String,
        first_def: SourceSpan,
        second_def: SourceSpan,
    },

    #[error("Function '{name}' does not return a value on every path")]
    MissingReturn { name: String, location: SourceSpan },

    #[error("'{keyword}' statement not within a loop")]
    InvalidBreakOrContinue { keyword: &'static str, location: SourceSpan },

    #[error("Call to undeclared function '{name}'")]
    UndeclaredFunction { name: String, location: SourceSpan },

    #[error("Redefinition of function '{name}'")]
    FunctionRedefinition {
        name: String,
        first_def: SourceSpan,
        second_def: SourceSpan,
    },

    #[error("Conflicting declaration of function '{name}'")]
    ConflictingDeclaration { name: String, location: SourceSpan },

    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        found: usize,
        location: SourceSpan,
    },

    #[error("Called object '{name}' is not a function")]
    NotAFunction { name: String, location: SourceSpan },

    #[error("Expression is not assignable")]
    InvalidLvalue { location: SourceSpan },

    #[error("Void value of call to '{name}' used in an expression")]
    VoidValueUsed { name: String, location: SourceSpan },

    #[error("Return statement does not match the return type of '{name}'")]
    ReturnValueMismatch { name: String, location: SourceSpan },
}

impl SemanticError {
    pub fn location(&self) -> SourceSpan {
        match self {
            SemanticError::UndeclaredVariable { location, .. } => *location,
            SemanticError::DuplicateDeclaration { second_def, .. } => *second_def,
            SemanticError::MissingReturn { location, .. } => *location,
            SemanticError::InvalidBreakOrContinue { location, .. } => *location,
            SemanticError::UndeclaredFunction { location, .. } => *location,
            SemanticError::FunctionRedefinition { second_def, .. } => *second_def,
            SemanticError::ConflictingDeclaration { location, .. } => *location,
            SemanticError::ArgumentCountMismatch { location, .. } => *location,
            SemanticError::NotAFunction { location, .. } => *location,
            SemanticError::InvalidLvalue { location } => *location,
            SemanticError::VoidValueUsed { location, .. } => *location,
            SemanticError::ReturnValueMismatch { location, .. } => *location,
        }
    }

    /// Span of an earlier definition this error refers back to
    pub fn related_location(&self) -> Option<SourceSpan> {
        match self {
            SemanticError::DuplicateDeclaration { first_def, .. }
            | SemanticError::FunctionRedefinition { first_def, .. } => Some(*first_def),
            _ => None,
        }
    }
}

/// Code generation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodegenError {
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("Malformed IR: {0}")]
    MalformedIr(String),
}

impl From<LexError> for Diagnostic {
    fn from(error: LexError) -> Self {
        Diagnostic {
            stage: Some(Stage::Lex),
            message: error.to_string(),
            location: error.location(),
            ..Default::default()
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic {
            stage: Some(Stage::Parse),
            message: error.to_string(),
            location: error.location(),
            ..Default::default()
        }
    }
}

impl From<SemanticError> for Diagnostic {
    fn from(error: SemanticError) -> Self {
        Diagnostic {
            stage: Some(Stage::Semantic),
            message: error.to_string(),
            location: error.location(),
            ..Default::default()
        }
    }
}

impl From<CodegenError> for Diagnostic {
    fn from(error: CodegenError) -> Self {
        Diagnostic {
            stage: Some(Stage::Codegen),
            message: error.to_string(),
            ..Default::default()
        }
    }
}

/// Collects diagnostics reported by the pipeline stages
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.diagnostics.push(diagnostic.into());
    }

    /// Report a semantic error, attaching a note for the earlier definition it conflicts with
    pub fn report_semantic_error(&mut self, error: SemanticError) {
        let related = error.related_location();
        self.report(error);
        if let Some(location) = related {
            self.report_note("previous declaration is here".to_string(), location);
        }
    }

    pub fn report_note(&mut self, message: String, location: SourceSpan) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Note,
            message,
            location,
            ..Default::default()
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Renders diagnostics with a caret line under the offending source text
#[derive(Debug, Default)]
pub struct ErrorFormatter;

impl ErrorFormatter {
    /// Format a single diagnostic with source code context
    pub fn format_diagnostic(&self, diag: &Diagnostic, source_manager: &SourceManager) -> String {
        let level_str = match diag.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Note => "note",
        };

        let mut result = match diag.stage {
            Some(stage) => format!("{}: {} error: {}", level_str, stage, diag.message),
            None => format!("{}: {}", level_str, diag.message),
        };

        let location = diag.location;
        let file_info = source_manager.get_file_info(location.source_id);
        let line_column = source_manager.get_line_column(location.source_id, location.start);

        if let (Some(file_info), Some((line, column))) = (file_info, line_column) {
            result.push_str(&format!("\n --> {}:{}:{}", file_info.path.display(), line, column));

            if let Some(line_text) = source_manager.get_line_text(location.source_id, line) {
                let gutter = format!(" {} | ", line);
                let width = (location.len() as usize).clamp(1, line_text.len().saturating_sub(column as usize - 1).max(1));
                result.push_str(&format!(
                    "\n{}{}\n{}{}",
                    gutter,
                    line_text,
                    " ".repeat(gutter.len() + column as usize - 1),
                    "^".repeat(width)
                ));
            }
        }

        result
    }

    /// Format multiple diagnostics
    pub fn format_diagnostics(&self, diagnostics: &[Diagnostic], source_manager: &SourceManager) -> String {
        diagnostics
            .iter()
            .map(|diag| self.format_diagnostic(diag, source_manager))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Print all diagnostics to stderr
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source_manager: &SourceManager) {
        for diag in diagnostics {
            eprintln!("{}", self.format_diagnostic(diag, source_manager));
        }
    }
}
