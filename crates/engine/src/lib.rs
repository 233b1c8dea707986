//! An XPath 1.0 evaluator over any tree implementing [`TreeNode`], with the
//! XForms, ODK and JavaRosa function libraries.

pub mod ast;
pub mod axes;
pub mod context;
pub mod engine;
pub mod error;
pub mod functions;
pub mod namespaces;
pub mod nodeset;
pub mod operators;
pub mod parser;
pub mod result;
pub mod tree;
pub mod value;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, Step};
pub use context::{EvaluationContext, FormHost};
pub use engine::evaluate;
pub use error::XPathError;
pub use functions::{
    FunctionCall, FunctionImplementation, FunctionLibrary, FunctionLibraryCollection, Parameter,
    Signature, TypeHint,
};
pub use namespaces::{FnResolver, NamespaceResolver};
pub use nodeset::LocationPathEvaluation;
pub use parser::parse_expression;
pub use result::{XPathResult, XPathResultType};
pub use tree::{NodeType, QName, TreeNode};
pub use value::{Evaluation, ValueType};

pub use xforms_xpath_datetime::TimeZone;
