use thiserror::Error;

use crate::environment::{Binding, Environment};
use crate::source::Span;
use crate::types::{Keyword, Node, Sexpr};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expression cannot be evaluated")]
    InvalidValue(Span),
    #[error("unknown binary operator")]
    UnknownBinaryOp(Span),
    #[error("variable `{0}` is not bound")]
    VariableNotFound(String, Span),
    #[error("illegal list operation")]
    IllegalOperation(Span),
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
    #[error("expected {expected} argument(s), got {found}")]
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::InvalidValue(span)
            | EvalError::UnknownBinaryOp(span)
            | EvalError::IllegalOperation(span)
            | EvalError::VariableNotFound(_, span)
            | EvalError::TypeMismatch { span, .. }
            | EvalError::ArityMismatch { span, .. } => *span,
        }
    }
}

pub type EvalResult<T = Node> = Result<T, EvalError>;

/// Evaluates one expression against the environment. A `define` form yields
/// the `Nil` marker rather than a printable value; everything the evaluator
/// synthesizes along the way is owned by the call frames and dropped when
/// they unwind, on errors included.
pub fn evaluate(node: &Node, env: &mut Environment) -> EvalResult {
    match &node.kind {
        Sexpr::Number(_) => Ok(node.clone()),
        Sexpr::Symbol(name) => evaluate_symbol(name, node.span, env),
        Sexpr::List(elements) => evaluate_list(node, elements, env),
        // operator tags, booleans, and nil are not evaluable on their own
        Sexpr::Keyword(_) | Sexpr::Boolean(_) | Sexpr::Nil => {
            Err(EvalError::InvalidValue(node.span))
        }
    }
}

fn evaluate_symbol(name: &str, span: Span, env: &Environment) -> EvalResult {
    match env.resolve(name) {
        Some(value) => Ok(value.clone()),
        None => Err(EvalError::VariableNotFound(name.to_string(), span)),
    }
}

fn evaluate_list(node: &Node, elements: &[Node], env: &mut Environment) -> EvalResult {
    let Some(head) = elements.first() else {
        return Err(EvalError::InvalidValue(node.span));
    };
    let operands = &elements[1..];
    match &head.kind {
        Sexpr::Keyword(keyword) => match keyword {
            Keyword::Plus | Keyword::Minus | Keyword::Multiply | Keyword::Divide => {
                evaluate_arithmetic(*keyword, operands, env, node.span)
            }
            Keyword::Less | Keyword::Greater | Keyword::Equal => {
                evaluate_comparison(*keyword, operands, env, node.span)
            }
            Keyword::If => evaluate_if(operands, env, node.span),
            Keyword::Not => evaluate_not(operands, env, node.span),
            Keyword::Car => evaluate_car(operands, env, node.span),
            Keyword::Cdr => evaluate_cdr(operands, env, node.span),
            Keyword::Cons => evaluate_cons(operands, env, node.span),
            Keyword::IsNull => evaluate_is_null(operands, env, node.span),
            Keyword::Define => evaluate_define(operands, env, node.span),
            // quoted data and lambdas are first-class values
            Keyword::Quote => {
                if elements.len() == 2 {
                    Ok(node.clone())
                } else {
                    Err(EvalError::InvalidValue(node.span))
                }
            }
            Keyword::Lambda => Ok(node.clone()),
        },
        Sexpr::Symbol(name) => apply_named(name, head.span, operands, env, node.span),
        Sexpr::List(_) => {
            // ((lambda …) args…), or an expression that computes a lambda:
            // (((lambda (x) x) (lambda (y) y)) 1)
            let lambda = if head.head_keyword() == Some(Keyword::Lambda) {
                head.clone()
            } else {
                evaluate(head, env)?
            };
            apply_lambda(&lambda, operands, env, node.span)
        }
        _ => Err(EvalError::InvalidValue(node.span)),
    }
}

fn expect_number(node: &Node) -> EvalResult<f64> {
    match node.kind {
        Sexpr::Number(n) => Ok(n),
        _ => Err(EvalError::TypeMismatch {
            expected: "number",
            found: node.kind.type_name(),
            span: node.span,
        }),
    }
}

/// Left-to-right fold seeded with the first operand, so `(- a b c)` is
/// `a - b - c`. A single operand folds to itself: `(- 5)` is `5`.
fn evaluate_arithmetic(
    op: Keyword,
    operands: &[Node],
    env: &mut Environment,
    span: Span,
) -> EvalResult {
    let Some((first, rest)) = operands.split_first() else {
        return Err(EvalError::ArityMismatch {
            expected: 1,
            found: 0,
            span,
        });
    };
    let mut acc = expect_number(&evaluate(first, env)?)?;
    for operand in rest {
        let value = expect_number(&evaluate(operand, env)?)?;
        acc = match op {
            Keyword::Plus => acc + value,
            Keyword::Minus => acc - value,
            Keyword::Multiply => acc * value,
            Keyword::Divide => acc / value,
            _ => return Err(EvalError::UnknownBinaryOp(span)),
        };
    }
    Ok(Node::new_number(acc, span))
}

fn evaluate_comparison(
    op: Keyword,
    operands: &[Node],
    env: &mut Environment,
    span: Span,
) -> EvalResult {
    let [left, right] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 2,
            found: operands.len(),
            span,
        });
    };
    let left = expect_number(&evaluate(left, env)?)?;
    let right = expect_number(&evaluate(right, env)?)?;
    let result = match op {
        Keyword::Less => left < right,
        Keyword::Greater => left > right,
        // exact double comparison; lossless for integers only
        Keyword::Equal => left == right,
        _ => return Err(EvalError::UnknownBinaryOp(span)),
    };
    Ok(Node::new_bool(result, span))
}

fn evaluate_if(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [condition, consequent, alternate] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 3,
            found: operands.len(),
            span,
        });
    };
    let condition = evaluate(condition, env)?;
    // only an exact true takes the consequent; the untaken branch is never
    // evaluated
    if condition.kind == Sexpr::Boolean(true) {
        evaluate(consequent, env)
    } else {
        evaluate(alternate, env)
    }
}

fn evaluate_not(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [operand] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 1,
            found: operands.len(),
            span,
        });
    };
    let value = evaluate(operand, env)?;
    match value.kind {
        Sexpr::Boolean(b) => Ok(Node::new_bool(!b, span)),
        _ => Err(EvalError::TypeMismatch {
            expected: "boolean",
            found: value.kind.type_name(),
            span: value.span,
        }),
    }
}

/// Resolves a `car`/`cdr`/`cons` operand down to a `(quote …)` form: a
/// symbol names quoted data in the environment, a quote form is used as-is,
/// and a nested deconstruction is evaluated first. Anything else cannot be
/// deconstructed.
fn resolve_quoted(operand: &Node, env: &mut Environment) -> EvalResult {
    match &operand.kind {
        Sexpr::Symbol(name) => {
            let value = evaluate_symbol(name, operand.span, env)?;
            if value.head_keyword() == Some(Keyword::Quote) {
                Ok(value)
            } else {
                Err(EvalError::IllegalOperation(operand.span))
            }
        }
        Sexpr::List(_) => match operand.head_keyword() {
            Some(Keyword::Quote) => Ok(operand.clone()),
            Some(Keyword::Car | Keyword::Cdr | Keyword::Cons) => {
                let value = evaluate(operand, env)?;
                if value.head_keyword() == Some(Keyword::Quote) {
                    Ok(value)
                } else {
                    Err(EvalError::IllegalOperation(operand.span))
                }
            }
            _ => Err(EvalError::IllegalOperation(operand.span)),
        },
        _ => Err(EvalError::IllegalOperation(operand.span)),
    }
}

/// The list elements inside a `(quote (…))` form.
fn expect_quoted_list(quoted: &Node, span: Span) -> EvalResult<&[Node]> {
    let payload = quoted
        .quote_payload()
        .ok_or(EvalError::IllegalOperation(span))?;
    match &payload.kind {
        Sexpr::List(elements) => Ok(elements),
        _ => Err(EvalError::TypeMismatch {
            expected: "list",
            found: payload.kind.type_name(),
            span: payload.span,
        }),
    }
}

fn evaluate_car(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [operand] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 1,
            found: operands.len(),
            span,
        });
    };
    let quoted = resolve_quoted(operand, env)?;
    let elements = expect_quoted_list(&quoted, operand.span)?;
    let Some(first) = elements.first() else {
        return Err(EvalError::IllegalOperation(operand.span));
    };
    match &first.kind {
        // list elements stay quoted data: (car (quote ((1) 2))) => (quote (1))
        Sexpr::List(_) => Ok(Node::new_quoted(first.clone(), span)),
        _ => Ok(first.clone()),
    }
}

fn evaluate_cdr(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [operand] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 1,
            found: operands.len(),
            span,
        });
    };
    let quoted = resolve_quoted(operand, env)?;
    let elements = expect_quoted_list(&quoted, operand.span)?;
    if elements.is_empty() {
        return Err(EvalError::IllegalOperation(operand.span));
    }
    // the rest is re-wrapped so it round-trips through the serializer;
    // (cdr (quote (1))) is (quote ()), never a bare nil
    let rest = Node::new_list(elements[1..].to_vec(), span);
    Ok(Node::new_quoted(rest, span))
}

fn evaluate_cons(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [head, tail] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 2,
            found: operands.len(),
            span,
        });
    };
    let quoted_tail = resolve_quoted(tail, env)?;
    let tail_elements = expect_quoted_list(&quoted_tail, tail.span)?;
    // quoted data contributes its payload as the new element, everything
    // else contributes its value
    let value = evaluate(head, env)?;
    let element = match value.quote_payload() {
        Some(payload) => payload.clone(),
        None => value,
    };
    let mut elements = Vec::with_capacity(tail_elements.len() + 1);
    elements.push(element);
    elements.extend(tail_elements.iter().cloned());
    Ok(Node::new_quoted(Node::new_list(elements, span), span))
}

fn evaluate_is_null(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [operand] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 1,
            found: operands.len(),
            span,
        });
    };
    let value = match &operand.kind {
        Sexpr::Symbol(name) => evaluate_symbol(name, operand.span, env)?,
        // (null? (quote …)) and (null? (cdr …)) both reduce to a quote form
        Sexpr::List(_) => evaluate(operand, env)?,
        _ => {
            return Err(EvalError::TypeMismatch {
                expected: "quoted list",
                found: operand.kind.type_name(),
                span: operand.span,
            });
        }
    };
    let elements = expect_quoted_list(&value, operand.span)?;
    Ok(Node::new_bool(elements.is_empty(), span))
}

fn evaluate_define(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let [name, value] = operands else {
        return Err(EvalError::ArityMismatch {
            expected: 2,
            found: operands.len(),
            span,
        });
    };
    let Sexpr::Symbol(symbol) = &name.kind else {
        return Err(EvalError::TypeMismatch {
            expected: "symbol",
            found: name.kind.type_name(),
            span: name.span,
        });
    };
    // the expression is bound unevaluated; a later define of the same name
    // shadows this one because lookup scans backwards
    env.define(symbol.clone(), value.clone());
    Ok(Node::new_nil(span))
}

/// Application with a symbol in head position: `(callee arg…)`.
fn apply_named(
    name: &str,
    name_span: Span,
    args: &[Node],
    env: &mut Environment,
    span: Span,
) -> EvalResult {
    let Some(value) = env.resolve(name) else {
        return Err(EvalError::VariableNotFound(name.to_string(), name_span));
    };
    let value = value.clone();
    match &value.kind {
        // a number-valued callee yields the number, arguments and all
        Sexpr::Number(_) => Ok(value),
        Sexpr::List(_) if value.head_keyword() == Some(Keyword::Lambda) => {
            apply_lambda(&value, args, env, span)
        }
        _ => Err(EvalError::IllegalOperation(span)),
    }
}

/// A compound argument is a non-empty list that is neither quoted data nor
/// a lambda literal; only those are evaluated before binding.
fn is_compound(node: &Node) -> bool {
    match &node.kind {
        Sexpr::List(elements) => {
            !elements.is_empty()
                && !matches!(
                    node.head_keyword(),
                    Some(Keyword::Lambda | Keyword::Quote)
                )
        }
        _ => false,
    }
}

fn apply_lambda(lambda: &Node, args: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    let Sexpr::List(parts) = &lambda.kind else {
        return Err(EvalError::IllegalOperation(lambda.span));
    };
    let [head, params, body] = &parts[..] else {
        return Err(EvalError::IllegalOperation(lambda.span));
    };
    if head.kind != Sexpr::Keyword(Keyword::Lambda) {
        return Err(EvalError::IllegalOperation(lambda.span));
    }
    let Sexpr::List(params) = &params.kind else {
        return Err(EvalError::TypeMismatch {
            expected: "parameter list",
            found: params.kind.type_name(),
            span: params.span,
        });
    };
    if params.len() != args.len() {
        return Err(EvalError::ArityMismatch {
            expected: params.len(),
            found: args.len(),
            span,
        });
    }

    // Strict evaluation: compound arguments are reduced against the
    // caller's environment before the frame is pushed, so neither sibling
    // parameters nor the callee's own bindings are visible to them.
    // Recursion depends on each call depth owning its argument values.
    let mut frame = Vec::with_capacity(params.len());
    for (param, arg) in params.iter().zip(args) {
        let Sexpr::Symbol(name) = &param.kind else {
            return Err(EvalError::TypeMismatch {
                expected: "symbol",
                found: param.kind.type_name(),
                span: param.span,
            });
        };
        let value = if is_compound(arg) {
            evaluate(arg, env)?
        } else {
            // numbers, symbols (alias chains), quoted data, and lambda
            // literals bind unevaluated
            arg.clone()
        };
        frame.push(Binding::new(name.clone(), value));
    }

    let count = env.push_frame(frame);
    let result = evaluate(body, env);
    // pop even when the body failed, or unwinding would leak the frame
    env.pop_frame(count);
    result
}
