/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AssemblyError {
    #[error("Syntax Error: {0}")]
    PestError(#[from] pest::error::Error<crate::parser::Rule>),

    #[error("Structural Error on line {line}: {reason}")]
    StructuralError { line: usize, reason: String },

    #[error("Semantic Error on line {line}: {reason}")]
    SemanticError { line: usize, reason: String },

    #[error("Semantic Error: {reason}")]
    SemanticErrorNoLine { reason: String },
}

impl AssemblyError {
    pub fn structural(line: usize, reason: impl Into<String>) -> Self {
        AssemblyError::StructuralError {
            line,
            reason: reason.into(),
        }
    }

    pub fn semantic(line: usize, reason: impl Into<String>) -> Self {
        AssemblyError::SemanticError {
            line,
            reason: reason.into(),
        }
    }

    pub fn semantic_no_line(reason: impl Into<String>) -> Self {
        AssemblyError::SemanticErrorNoLine {
            reason: reason.into(),
        }
    }

    /// Line numbers propagate once set and are never overwritten: only a
    /// line-less error gets the traversing visitor's current line attached.
    pub fn with_line(self, line: usize) -> Self {
        match self {
            AssemblyError::SemanticErrorNoLine { reason } => {
                AssemblyError::SemanticError { line, reason }
            }
            other => other,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            AssemblyError::StructuralError { line, .. } => Some(*line),
            AssemblyError::SemanticError { line, .. } => Some(*line),
            _ => None,
        }
    }
}
