//! XPath 1.0 for XForms documents.
//!
//! [`Evaluator`] parses and evaluates expression text against any
//! [`TreeNode`]; [`xml`] provides one over `roxmltree` documents.
//!
//! ```no_run
//! use xforms_xpath::{XPathResultType, evaluate, xml::XmlDocument};
//!
//! let doc = XmlDocument::parse("<root><a>3</a><b/></root>").unwrap();
//! let result = evaluate("/root/a + 1", doc.root_node(), None, XPathResultType::Number).unwrap();
//! assert_eq!(result.number_value().unwrap(), 4.0);
//! ```

pub mod config;
pub mod evaluator;
pub mod xml;

pub use config::EvaluatorConfig;
pub use evaluator::{Evaluator, evaluate};
pub use xforms_xpath_engine::{
    Evaluation, FnResolver, FormHost, FunctionCall, FunctionImplementation, FunctionLibrary,
    FunctionLibraryCollection, NamespaceResolver, NodeType, Parameter, QName, Signature,
    TimeZone, TreeNode, TypeHint, ValueType, XPathError, XPathResult, XPathResultType,
};

/// The engine's full API, for callers that walk parsed expressions themselves.
pub use xforms_xpath_engine as engine;
