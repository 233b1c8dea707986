//! JavaRosa extensions.

use super::{FunctionCall, FunctionLibrary, Parameter, Signature, TypeHint};
use crate::error::XPathError;
use crate::namespaces::JAVAROSA_NAMESPACE;
use crate::tree::TreeNode;
use crate::value::Evaluation;

pub fn library<'a, N: TreeNode<'a>>() -> FunctionLibrary<'a, N> {
    let mut lib = FunctionLibrary::new(JAVAROSA_NAMESPACE);
    lib.register(
        "itext",
        Signature::new(vec![Parameter::required(TypeHint::String)]),
        itext,
    );
    lib
}

/// The host's translation for an itext id, or `''`.
fn itext<'a, N: TreeNode<'a>>(
    call: &FunctionCall<'_, 'a, '_, N>,
) -> Result<Evaluation<'a, N>, XPathError> {
    let id = call.string(0)?;
    let text = match call.e_ctx.host {
        Some(host) => host.itext(&id, call.context_node()?),
        None => None,
    };
    Ok(Evaluation::String(text.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EvaluationContext, FormHost};
    use crate::engine::evaluate;
    use crate::functions::FunctionLibraryCollection;
    use crate::functions::test_support::string;
    use crate::nodeset::LocationPathEvaluation;
    use crate::parser::parse_expression;
    use crate::tree::mock::{MockNode, MockTree};
    use std::collections::HashMap;
    use std::rc::Rc;

    struct Translations;

    impl<'a> FormHost<'a, MockNode<'a>> for Translations {
        fn itext(&self, id: &str, _context: MockNode<'a>) -> Option<String> {
            (id == "greeting").then(|| "Hello".to_string())
        }
    }

    #[test]
    fn test_itext_uses_host() {
        let mut b = MockTree::builder();
        b.leaf("root", "");
        let tree = b.finish();
        let root = tree.root();

        assert_eq!(string(root, "jr:itext('greeting')"), "");

        let functions = FunctionLibraryCollection::standard();
        let variables = HashMap::new();
        let host = Translations;
        let e_ctx = EvaluationContext::new(root, &functions, &variables).with_host(&host);
        let scope = Rc::new(LocationPathEvaluation::single(root, None));
        let eval = |text: &str| {
            evaluate(&parse_expression(text).unwrap(), &e_ctx, &scope)
                .unwrap()
                .to_string()
        };
        assert_eq!(eval("jr:itext('greeting')"), "Hello");
        assert_eq!(eval("jr:itext('missing')"), "");
    }
}
