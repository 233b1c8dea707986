use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath parse error in '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Namespace prefix '{prefix}' is not bound")]
    UnresolvedPrefix { prefix: String },

    #[error("Function '{function}' expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Type error: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Function '{function}' error: {message}")]
    InvalidArgument { function: String, message: String },

    #[error("Variable '${0}' not found")]
    UnknownVariable(String),

    #[error("Context node required")]
    NoContextNode,

    #[error("{0} is not a valid XPathResult type")]
    InvalidResultType(u16),
}

impl XPathError {
    pub fn parse(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
