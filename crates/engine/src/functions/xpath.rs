//! The XPath 1.0 core function library.

use super::{FunctionCall, FunctionLibrary, Parameter, Signature, TypeHint};
use crate::error::XPathError;
use crate::namespaces::FN_NAMESPACE;
use crate::nodeset::LocationPathEvaluation;
use crate::tree::{NodeType, TreeNode, XML_NAMESPACE, sort_document_order};
use crate::value::{Evaluation, string_to_number};
use std::rc::Rc;
use xforms_xpath_iter::IteratorExt;

type Output<'a, N> = Result<Evaluation<'a, N>, XPathError>;

fn sig(parameters: &[Parameter]) -> Signature {
    Signature::new(parameters.to_vec())
}

pub fn library<'a, N: TreeNode<'a>>() -> FunctionLibrary<'a, N> {
    use TypeHint::*;
    let req = Parameter::required;
    let opt = Parameter::optional;

    let mut lib = FunctionLibrary::new(FN_NAMESPACE);
    // Node-set
    lib.register("last", sig(&[]), last);
    lib.register("position", sig(&[]), position);
    lib.register("count", sig(&[req(NodeSet)]), count);
    lib.register("id", sig(&[req(Any)]), id);
    lib.register("local-name", sig(&[opt(NodeSet)]), local_name);
    lib.register("namespace-uri", sig(&[opt(NodeSet)]), namespace_uri);
    lib.register("name", sig(&[opt(NodeSet)]), name);
    // String
    lib.register("string", sig(&[opt(Any)]), string);
    lib.register(
        "concat",
        sig(&[req(String), req(String), Parameter::variadic(String)]),
        concat,
    );
    lib.register("starts-with", sig(&[req(String), req(String)]), starts_with);
    lib.register("contains", sig(&[req(String), req(String)]), contains);
    lib.register("substring-before", sig(&[req(String), req(String)]), substring_before);
    lib.register("substring-after", sig(&[req(String), req(String)]), substring_after);
    lib.register("substring", sig(&[req(String), req(Number), opt(Number)]), substring);
    lib.register("string-length", sig(&[opt(String)]), string_length);
    lib.register("normalize-space", sig(&[opt(String)]), normalize_space);
    lib.register("translate", sig(&[req(String), req(String), req(String)]), translate);
    // Boolean
    lib.register("boolean", sig(&[req(Any)]), boolean);
    lib.register("not", sig(&[req(Boolean)]), not);
    lib.register("true", sig(&[]), true_fn);
    lib.register("false", sig(&[]), false_fn);
    lib.register("lang", sig(&[req(String)]), lang);
    // Number
    lib.register("number", sig(&[opt(Any)]), number);
    lib.register("sum", sig(&[req(NodeSet)]), sum);
    lib.register("floor", sig(&[req(Number)]), floor);
    lib.register("ceiling", sig(&[req(Number)]), ceiling);
    lib.register("round", sig(&[req(Number)]), round);
    lib
}

/// XPath `round()`: the closest integer, halves towards positive infinity.
pub fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        // `n + 0.5` would round 0.49999999999999994 up.
        let floor = n.floor();
        if n - floor >= 0.5 { floor + 1.0 } else { floor }
    }
}

pub(crate) fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

// --- Node-set ---

fn last<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.scope.context_size() as f64))
}

pub(crate) fn position<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.scope.context_position() as f64))
}

fn count<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.node_set(0)?.context_size() as f64))
}

fn id<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let tokens: Vec<String> = match call.arg(0)? {
        Evaluation::Node(set) => set
            .context_nodes()
            .flat_map(|n| {
                n.string_value()
                    .split(is_xml_space)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect(),
        other => other
            .to_string()
            .split(is_xml_space)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    };
    let anchor = call.e_ctx.root_node;
    let mut nodes: Vec<N> = tokens
        .iter()
        .filter_map(|token| anchor.element_by_id(token))
        .distinct()
        .collect();
    sort_document_order(&mut nodes);
    Ok(Evaluation::Node(LocationPathEvaluation::from_nodes(
        nodes,
        Some(Rc::clone(call.scope)),
    )))
}

fn local_name<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let node = call.node_or_context(0)?;
    let name = node
        .and_then(|n| n.name())
        .map(|q| q.local_part.to_string())
        .unwrap_or_default();
    Ok(Evaluation::String(name))
}

fn namespace_uri<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let node = call.node_or_context(0)?;
    let uri = node
        .filter(|n| matches!(n.node_type(), NodeType::Element | NodeType::Attribute))
        .and_then(|n| n.namespace_uri())
        .unwrap_or_default();
    Ok(Evaluation::String(uri.to_string()))
}

fn name<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let node = call.node_or_context(0)?;
    let name = node
        .and_then(|n| n.name())
        .map(|q| q.to_string())
        .unwrap_or_default();
    Ok(Evaluation::String(name))
}

// --- String ---

fn string<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    call.string_or_context(0).map(Evaluation::String)
}

fn concat<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let mut out = String::new();
    for i in 0..call.arg_count() {
        out.push_str(&call.string(i)?);
    }
    Ok(Evaluation::String(out))
}

fn starts_with<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(call.string(0)?.starts_with(&call.string(1)?)))
}

fn contains<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(call.string(0)?.contains(&call.string(1)?)))
}

fn substring_before<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let (s, pattern) = (call.string(0)?, call.string(1)?);
    let before = s.split_once(&pattern).map(|(b, _)| b).unwrap_or("");
    Ok(Evaluation::String(before.to_string()))
}

fn substring_after<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let (s, pattern) = (call.string(0)?, call.string(1)?);
    let after = s.split_once(&pattern).map(|(_, a)| a).unwrap_or("");
    Ok(Evaluation::String(after.to_string()))
}

/// Characters at 1-based positions `p` with
/// `round(start) <= p < round(start) + round(length)`.
fn substring<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let s = call.string(0)?;
    let first = xpath_round(call.number(1)?);
    let end = match call.arg_opt(2)? {
        Some(length) => first + xpath_round(length.to_number()),
        None => f64::INFINITY,
    };
    let out: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= first && p < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Evaluation::String(out))
}

fn string_length<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let s = call.string_or_context(0)?;
    Ok(Evaluation::Number(s.chars().count() as f64))
}

fn normalize_space<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let s = call.string_or_context(0)?;
    let words: Vec<&str> = s.split(is_xml_space).filter(|w| !w.is_empty()).collect();
    Ok(Evaluation::String(words.join(" ")))
}

fn translate<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let s = call.string(0)?;
    let from: Vec<char> = call.string(1)?.chars().collect();
    let to: Vec<char> = call.string(2)?.chars().collect();
    let out: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Evaluation::String(out))
}

// --- Boolean ---

fn boolean<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    call.boolean(0).map(Evaluation::Boolean)
}

fn not<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(!call.boolean(0)?))
}

fn true_fn<'a, N: TreeNode<'a>>(_call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(true))
}

fn false_fn<'a, N: TreeNode<'a>>(_call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(false))
}

/// True if the nearest `xml:lang` at or above the context node is `lang`
/// or a sublanguage of it, ignoring case.
fn lang<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let wanted = call.string(0)?.to_ascii_lowercase();
    let declared = std::iter::successors(Some(call.context_node()?), |n| n.parent())
        .filter(|n| n.node_type() == NodeType::Element)
        .find_map(|n| {
            n.attributes().find(|attr| {
                attr.name().is_some_and(|q| q.local_part == "lang")
                    && attr.namespace_uri() == Some(XML_NAMESPACE)
            })
        })
        .map(|attr| attr.string_value().to_ascii_lowercase());
    let matches = declared.is_some_and(|value| {
        value == wanted
            || value
                .strip_prefix(&wanted)
                .is_some_and(|rest| rest.starts_with('-'))
    });
    Ok(Evaluation::Boolean(matches))
}

// --- Number ---

fn number<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    match call.arg_opt(0)? {
        Some(value) => Ok(Evaluation::Number(value.to_number())),
        None => {
            let value = call.context_node()?.string_value();
            Ok(Evaluation::Number(string_to_number(&value)))
        }
    }
}

fn sum<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let total = call
        .node_set(0)?
        .context_nodes()
        .map(|n| string_to_number(&n.string_value()))
        .sum();
    Ok(Evaluation::Number(total))
}

fn floor<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.number(0)?.floor()))
}

fn ceiling<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.number(0)?.ceil()))
}

pub(crate) fn round<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(xpath_round(call.number(0)?)))
}
