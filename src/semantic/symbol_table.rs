//! Symbol table management and scope handling.
//!
//! Variables live in a stack of block scopes; lookups walk from the innermost
//! scope outwards. Functions live in a single program-wide table.

use hashbrown::HashMap;
use log::trace;

use crate::ast::{FunctionDecl, ReturnType};
use crate::diagnostic::SemanticError;
use crate::ir::TempId;
use crate::source_manager::SourceSpan;

/// A resolved local variable or parameter
#[derive(Debug, Clone, PartialEq)]
pub struct VarInfo {
    /// Program-unique name such as `x.3`
    pub unique_name: String,
    pub temp: TempId,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub param_count: usize,
    pub return_type: ReturnType,
    pub defined: bool,
    /// Span of the definition if there is one, else of the first declaration
    pub span: SourceSpan,
}

#[derive(Debug, Default)]
struct Scope {
    variables: HashMap<String, VarInfo>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    functions: HashMap<String, FunctionSignature>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
        trace!("push_scope: depth {}", self.scopes.len());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        trace!("pop_scope: depth {}", self.scopes.len());
    }

    /// Innermost scope, opening one if none is active
    fn innermost_scope(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        let innermost = self.scopes.len() - 1;
        &mut self.scopes[innermost]
    }

    /// Bind `name` in the innermost scope
    pub fn declare_variable(&mut self, name: &str, info: VarInfo) -> Result<(), SemanticError> {
        let scope = self.innermost_scope();
        if let Some(existing) = scope.variables.get(name) {
            return Err(SemanticError::DuplicateDeclaration {
                name: name.to_string(),
                first_def: existing.span,
                second_def: info.span,
            });
        }
        scope.variables.insert(name.to_string(), info);
        Ok(())
    }

    /// Resolve `name` to the nearest enclosing declaration
    pub fn lookup_variable(&self, name: &str) -> Option<&VarInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.variables.get(name))
    }

    /// Record a function prototype or definition
    pub fn declare_function(&mut self, decl: &FunctionDecl) -> Result<(), SemanticError> {
        let defined = decl.body.is_some();
        match self.functions.get_mut(&decl.name) {
            Some(existing) => {
                if existing.param_count != decl.params.len() || existing.return_type != decl.return_type {
                    return Err(SemanticError::ConflictingDeclaration {
                        name: decl.name.clone(),
                        location: decl.span,
                    });
                }
                if existing.defined && defined {
                    return Err(SemanticError::FunctionRedefinition {
                        name: decl.name.clone(),
                        first_def: existing.span,
                        second_def: decl.span,
                    });
                }
                if defined {
                    existing.defined = true;
                    existing.span = decl.span;
                }
            }
            None => {
                self.functions.insert(
                    decl.name.clone(),
                    FunctionSignature {
                        param_count: decl.params.len(),
                        return_type: decl.return_type,
                        defined,
                        span: decl.span,
                    },
                );
            }
        }
        Ok(())
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }
}
