//! XForms 1.1 and ODK XForms functions.

use super::xpath::{is_xml_space, xpath_round};
use super::{FunctionCall, FunctionLibrary, Parameter, Signature, TypeHint, dates};
use crate::error::XPathError;
use crate::namespaces::XFORMS_NAMESPACE;
use crate::nodeset::LocationPathEvaluation;
use crate::tree::{NodeType, TreeNode};
use crate::value::{Evaluation, string_to_number};
use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;
use std::rc::Rc;

type Output<'a, N> = Result<Evaluation<'a, N>, XPathError>;

fn sig(parameters: &[Parameter]) -> Signature {
    Signature::new(parameters.to_vec())
}

pub fn library<'a, N: TreeNode<'a>>() -> FunctionLibrary<'a, N> {
    use TypeHint::*;
    let req = Parameter::required;
    let opt = Parameter::optional;
    let var = Parameter::variadic;

    let mut lib = FunctionLibrary::new(XFORMS_NAMESPACE);
    // Control
    lib.register("if", sig(&[req(Boolean), req(Any), req(Any)]), if_fn);
    lib.register("coalesce", sig(&[req(Any), req(Any), var(Any)]), coalesce);
    lib.register("once", sig(&[req(Any)]), once);
    // Strings and lists
    lib.register("boolean-from-string", sig(&[req(String)]), boolean_from_string);
    lib.register("concat", sig(&[var(Any)]), concat);
    lib.register("join", sig(&[req(String), var(Any)]), join);
    lib.register("count-non-empty", sig(&[req(NodeSet)]), count_non_empty);
    lib.register("count-selected", sig(&[req(String)]), count_selected);
    lib.register("selected", sig(&[req(String), req(String)]), selected);
    lib.register("selected-at", sig(&[req(String), req(Number)]), selected_at);
    lib.register("substr", sig(&[req(String), req(Number), opt(Number)]), substr);
    lib.register("ends-with", sig(&[req(String), req(String)]), ends_with);
    lib.register("regex", sig(&[req(String), req(String)]), regex);
    // Numbers
    lib.register("int", sig(&[req(Number)]), int);
    lib.register("round", sig(&[req(Number), opt(Number)]), round);
    lib.register("pow", sig(&[req(Number), req(Number)]), pow);
    lib.register("abs", sig(&[req(Number)]), abs);
    lib.register("sqrt", sig(&[req(Number)]), sqrt);
    lib.register("exp", sig(&[req(Number)]), exp);
    lib.register("exp10", sig(&[req(Number)]), exp10);
    lib.register("log", sig(&[req(Number)]), log);
    lib.register("log10", sig(&[req(Number)]), log10);
    lib.register("sin", sig(&[req(Number)]), sin);
    lib.register("cos", sig(&[req(Number)]), cos);
    lib.register("tan", sig(&[req(Number)]), tan);
    lib.register("asin", sig(&[req(Number)]), asin);
    lib.register("acos", sig(&[req(Number)]), acos);
    lib.register("atan", sig(&[req(Number)]), atan);
    lib.register("atan2", sig(&[req(Number), req(Number)]), atan2);
    lib.register("pi", sig(&[]), pi);
    lib.register("min", sig(&[req(Any), var(Any)]), min);
    lib.register("max", sig(&[req(Any), var(Any)]), max);
    lib.register("random", sig(&[]), random);
    lib.register("uuid", sig(&[opt(Number)]), uuid);
    // Nodes
    lib.register("position", sig(&[opt(NodeSet)]), position);
    lib.register("current", sig(&[]), current);
    lib.register("instance", sig(&[req(String)]), instance);
    lib.register("checklist", sig(&[req(Number), req(Number), var(Any)]), checklist);
    lib.register(
        "weighted-checklist",
        sig(&[req(Number), req(Number), var(Any)]),
        weighted_checklist,
    );
    lib.register("randomize", sig(&[req(NodeSet), opt(Number)]), randomize);

    dates::register(&mut lib);
    lib
}

/// One value out of a list of arguments where node-set arguments count as
/// one value per node.
enum Item<'a, N: TreeNode<'a>> {
    Node(N),
    Scalar(Evaluation<'a, N>),
}

impl<'a, N: TreeNode<'a>> Item<'a, N> {
    fn string(&self) -> String {
        match self {
            Item::Node(node) => node.string_value(),
            Item::Scalar(value) => value.to_string(),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Item::Node(node) => string_to_number(&node.string_value()),
            Item::Scalar(value) => value.to_number(),
        }
    }

    /// Node values are read like `boolean-from-string()`.
    fn truth(&self) -> bool {
        match self {
            Item::Node(node) => is_true_string(&node.string_value()),
            Item::Scalar(value) => value.to_boolean(),
        }
    }
}

fn flatten<'a, N: TreeNode<'a>>(
    call: &FunctionCall<'_, 'a, '_, N>,
    from: usize,
) -> Result<Vec<Item<'a, N>>, XPathError> {
    let mut items = Vec::new();
    for i in from..call.arg_count() {
        match call.arg(i)? {
            Evaluation::Node(set) => items.extend(set.context_nodes().map(Item::Node)),
            scalar => items.push(Item::Scalar(scalar)),
        }
    }
    Ok(items)
}

fn is_true_string(s: &str) -> bool {
    let s = s.trim_matches(is_xml_space);
    s.eq_ignore_ascii_case("true") || s == "1"
}

fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(is_xml_space).filter(|t| !t.is_empty())
}

// --- Control ---

fn if_fn<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    if call.boolean(0)? { call.arg(1) } else { call.arg(2) }
}

/// The first argument whose string value is not empty.
fn coalesce<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let last = call.arg_count() - 1;
    for i in 0..last {
        let value = call.arg(i)?;
        if !value.to_string().is_empty() {
            return Ok(value);
        }
    }
    call.arg(last)
}

/// Keeps the context node's value once it has one.
fn once<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let current = call.context_node()?.string_value();
    if current.is_empty() {
        call.arg(0)
    } else {
        Ok(Evaluation::String(current))
    }
}

// --- Strings and lists ---

fn boolean_from_string<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(is_true_string(&call.string(0)?)))
}

fn concat<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let joined: String = flatten(call, 0)?.iter().map(Item::string).collect();
    Ok(Evaluation::String(joined))
}

fn join<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let separator = call.string(0)?;
    let parts: Vec<String> = flatten(call, 1)?.iter().map(Item::string).collect();
    Ok(Evaluation::String(parts.join(&separator)))
}

fn count_non_empty<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let count = call
        .node_set(0)?
        .context_nodes()
        .filter(|n| !n.string_value().is_empty())
        .count();
    Ok(Evaluation::Number(count as f64))
}

fn count_selected<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(tokens(&call.string(0)?).count() as f64))
}

fn selected<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let list = call.string(0)?;
    let value = call.string(1)?;
    let value = value.trim_matches(is_xml_space);
    Ok(Evaluation::Boolean(tokens(&list).any(|t| t == value)))
}

/// The 0-based `index`th space-separated token, or `""`.
fn selected_at<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let list = call.string(0)?;
    let index = call.number(1)?;
    let token = if index >= 0.0 && index.fract() == 0.0 {
        tokens(&list).nth(index as usize).unwrap_or("")
    } else {
        ""
    };
    Ok(Evaluation::String(token.to_string()))
}

/// 0-based `[start, end)` slice of the characters. Negative bounds count
/// from the end.
fn substr<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let chars: Vec<char> = call.string(0)?.chars().collect();
    let len = chars.len() as f64;
    let clamp = |n: f64| -> usize {
        let n = if n.is_nan() { 0.0 } else { n.trunc() };
        let n = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
        n as usize
    };
    let start = clamp(call.number(1)?);
    let end = match call.arg_opt(2)? {
        Some(end) => clamp(end.to_number()),
        None => chars.len(),
    };
    let out: String = if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    };
    Ok(Evaluation::String(out))
}

fn ends_with<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Boolean(call.string(0)?.ends_with(&call.string(1)?)))
}

fn regex<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let value = call.string(0)?;
    let pattern = call.string(1)?;
    let re = Regex::new(&pattern).map_err(|e| call.invalid(e.to_string()))?;
    Ok(Evaluation::Boolean(re.is_match(&value)))
}

// --- Numbers ---

fn int<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.number(0)?.trunc()))
}

const MAX_ROUND_DIGITS: f64 = 308.0;

/// With `digits`, rounds half away from zero at that many decimal places
/// (negative values round to tens, hundreds and so on).
fn round<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let n = call.number(0)?;
    let Some(digits) = call.arg_opt(1)? else {
        return Ok(Evaluation::Number(xpath_round(n)));
    };
    let digits = digits.to_number();
    if n.is_nan() || digits.is_nan() || n.is_infinite() {
        return Ok(Evaluation::Number(if digits.is_nan() { f64::NAN } else { n }));
    }
    // Beyond the f64 exponent range the factor stops being representable.
    let digits = digits.trunc().clamp(-MAX_ROUND_DIGITS, MAX_ROUND_DIGITS);
    let factor = 10f64.powi(digits as i32);
    let rounded = (n * factor).round() / factor;
    Ok(Evaluation::Number(if rounded.is_finite() { rounded } else { n }))
}

fn unary<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>, f: fn(f64) -> f64) -> Output<'a, N> {
    Ok(Evaluation::Number(f(call.number(0)?)))
}

fn pow<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.number(0)?.powf(call.number(1)?)))
}

fn abs<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::abs)
}

fn sqrt<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::sqrt)
}

fn exp<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::exp)
}

fn exp10<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, |n| 10f64.powf(n))
}

fn log<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::ln)
}

fn log10<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::log10)
}

fn sin<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::sin)
}

fn cos<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::cos)
}

fn tan<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::tan)
}

fn asin<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::asin)
}

fn acos<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::acos)
}

fn atan<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    unary(call, f64::atan)
}

fn atan2<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(call.number(0)?.atan2(call.number(1)?)))
}

fn pi<'a, N: TreeNode<'a>>(_call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(std::f64::consts::PI))
}

/// Folds every value with `pick`. Empty input or any `NaN` gives `NaN`.
fn extreme<'a, N: TreeNode<'a>>(
    call: &FunctionCall<'_, 'a, '_, N>,
    pick: fn(f64, f64) -> f64,
) -> Output<'a, N> {
    let values: Vec<f64> = flatten(call, 0)?.iter().map(Item::number).collect();
    let result = if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        f64::NAN
    } else {
        values.into_iter().reduce(pick).unwrap_or(f64::NAN)
    };
    Ok(Evaluation::Number(result))
}

fn min<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    extreme(call, f64::min)
}

fn max<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    extreme(call, f64::max)
}

fn random<'a, N: TreeNode<'a>>(_call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    Ok(Evaluation::Number(rand::random::<f64>()))
}

/// A version 4 UUID, or `length` random alphanumerics when given.
fn uuid<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let Some(length) = call.arg_opt(0)? else {
        return Ok(Evaluation::String(uuid::Uuid::new_v4().to_string()));
    };
    let length = length.to_number();
    if !length.is_finite() || length < 0.0 {
        return Err(call.invalid(format!("invalid length {}", length)));
    }
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length as usize)
        .map(char::from)
        .collect();
    Ok(Evaluation::String(id))
}

// --- Nodes ---

/// Without an argument, the context position. With one, the 1-based index
/// of the node among its parent's children of the same name.
fn position<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    if call.arg_count() == 0 {
        return super::xpath::position(call);
    }
    let Some(node) = call.node_set(0)?.first() else {
        return Err(call.invalid("the node-set is empty"));
    };
    let Some(parent) = node.parent().filter(|_| node.node_type() == NodeType::Element) else {
        return Ok(Evaluation::Number(1.0));
    };
    let name = node.name();
    let index = parent
        .children()
        .filter(|sibling| sibling.node_type() == NodeType::Element && sibling.name() == name)
        .position(|sibling| sibling == node)
        .map_or(1, |i| i + 1);
    Ok(Evaluation::Number(index as f64))
}

/// The context node of the outermost expression.
fn current<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let node = call
        .scope
        .origin()
        .context_node()
        .unwrap_or(call.e_ctx.context_node);
    Ok(Evaluation::Node(LocationPathEvaluation::single(
        node,
        Some(Rc::clone(call.scope)),
    )))
}

/// The root of a secondary instance: from the host when it has one,
/// otherwise the document's `instance` element with that `id`.
fn instance<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let id = call.string(0)?;
    let hosted = call.e_ctx.host.and_then(|host| host.instance(&id));
    let found = hosted.or_else(|| {
        crate::axes::Descendants::new(call.e_ctx.root_node).find(|n| {
            n.node_type() == NodeType::Element
                && n.name().is_some_and(|q| q.local_part == "instance")
                && n.attributes().any(|attr| {
                    attr.name().is_some_and(|q| q.local_part == "id" && q.prefix.is_none())
                        && attr.string_value() == id
                })
        })
    });
    let nodes: Vec<N> = found.into_iter().collect();
    Ok(Evaluation::Node(LocationPathEvaluation::from_nodes(
        nodes,
        Some(Rc::clone(call.scope)),
    )))
}

/// True if the number of true values lies within `[min, max]`. `-1` leaves
/// a bound open.
fn checklist<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let (min, max) = (call.number(0)?, call.number(1)?);
    let count = flatten(call, 2)?.iter().filter(|item| item.truth()).count() as f64;
    Ok(Evaluation::Boolean(within(count, min, max)))
}

/// Like `checklist`, summing the weight paired with each true value.
/// Arguments after the bounds alternate value, weight.
fn weighted_checklist<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let (min, max) = (call.number(0)?, call.number(1)?);
    if (call.arg_count() - 2) % 2 != 0 {
        return Err(call.invalid("values and weights must come in pairs"));
    }
    let mut total = 0.0;
    for i in (2..call.arg_count()).step_by(2) {
        let values = flatten_one(call, i)?;
        let weights = flatten_one(call, i + 1)?;
        if values.len() != weights.len() {
            return Err(call.invalid("each value needs exactly one weight"));
        }
        total += values
            .iter()
            .zip(&weights)
            .filter(|(value, _)| value.truth())
            .map(|(_, weight)| weight.number())
            .sum::<f64>();
    }
    Ok(Evaluation::Boolean(within(total, min, max)))
}

fn flatten_one<'a, N: TreeNode<'a>>(
    call: &FunctionCall<'_, 'a, '_, N>,
    index: usize,
) -> Result<Vec<Item<'a, N>>, XPathError> {
    Ok(match call.arg(index)? {
        Evaluation::Node(set) => set.context_nodes().map(Item::Node).collect(),
        scalar => vec![Item::Scalar(scalar)],
    })
}

fn within(value: f64, min: f64, max: f64) -> bool {
    (min == -1.0 || value >= min) && (max == -1.0 || value <= max)
}

/// Shuffles a node-set. With a seed the order is reproducible.
fn randomize<'a, N: TreeNode<'a>>(call: &FunctionCall<'_, 'a, '_, N>) -> Output<'a, N> {
    let mut nodes = call.node_set(0)?.to_vec();
    match call.arg_opt(1)? {
        Some(seed) => {
            let seed = seed.to_number();
            if !seed.is_finite() {
                return Err(call.invalid(format!("invalid seed {}", seed)));
            }
            let mut rng = ParkMiller::new(seed);
            shuffle(&mut nodes, || rng.next_float());
        }
        None => {
            let mut rng = rand::rng();
            shuffle(&mut nodes, || rng.random::<f64>());
        }
    }
    Ok(Evaluation::Node(LocationPathEvaluation::from_nodes(
        nodes,
        Some(Rc::clone(call.scope)),
    )))
}

/// Fisher-Yates driven by a source of floats in `[0, 1)`.
fn shuffle<T>(items: &mut [T], mut next: impl FnMut() -> f64) {
    for i in (1..items.len()).rev() {
        let j = (next() * (i + 1) as f64).floor() as usize;
        items.swap(i, j.min(i));
    }
}

/// The Park-Miller minimal standard generator.
struct ParkMiller {
    state: i64,
}

impl ParkMiller {
    const MODULUS: i64 = 2_147_483_647;

    fn new(seed: f64) -> Self {
        let mut state = (seed.trunc() as i64) % Self::MODULUS;
        if state <= 0 {
            state += Self::MODULUS - 1;
        }
        Self { state }
    }

    fn next(&mut self) -> i64 {
        self.state = self.state * 16_807 % Self::MODULUS;
        self.state
    }

    fn next_float(&mut self) -> f64 {
        (self.next() - 1) as f64 / (Self::MODULUS - 1) as f64
    }
}
