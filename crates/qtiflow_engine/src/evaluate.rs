//! Expression evaluation.
//!
//! Most operators return NULL when an operand is NULL. The exceptions are
//! `isNull`, `containerSize` (0 for NULL), `and`/`or` (a decisive operand
//! wins over NULL), and `multiple`/`ordered` (NULL operands are dropped).

use rand::Rng;

use qtiflow_declaration::VariableKind;
use qtiflow_foundation::{
    Cardinality, Container, Error, ErrorKind, Identifier, Number, Result, SingleValue, Value,
    VariableRef,
};
use qtiflow_language::{BinaryOp, Expression, NaryOp, UnaryOp};

use crate::context::ProcessingContext;

/// Evaluates `expression` in `ctx`.
///
/// # Errors
/// Returns a non-fatal error for undeclared variables, operands of the
/// wrong signature, and invalid attributes.
pub fn evaluate<C: ProcessingContext>(expression: &Expression, ctx: &mut C) -> Result<Value> {
    match expression {
        Expression::BaseValue(v) => Ok(Value::Single(v.clone())),
        Expression::Null => Ok(Value::Null),
        Expression::Variable(reference) => ctx.value(reference),
        Expression::Default(reference) => Ok(ctx.scope().resolve(reference)?.initial_value()),
        Expression::Correct(identifier) => {
            let declaration = response_declaration(ctx, identifier)?;
            Ok(declaration.correct_response.clone().unwrap_or_default())
        }
        Expression::MapResponse(identifier) => {
            let mapping = response_declaration(ctx, identifier)?
                .mapping
                .clone()
                .ok_or_else(|| Error::new(ErrorKind::MissingMapping(identifier.clone())))?;
            let response = ctx.value(&VariableRef::local(identifier.clone()))?;
            Ok(Value::float(mapping.map(&response)))
        }
        Expression::RandomInteger { min, max, step } => random_integer(ctx, *min, *max, *step),
        Expression::RandomFloat { min, max } => {
            if min > max || !min.is_finite() || !max.is_finite() {
                return Err(Error::invalid_operand("randomFloat", format!("{min}..={max}")));
            }
            Ok(Value::float(ctx.rng().gen_range(*min..=*max)))
        }
        Expression::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            unary(*op, &value)
        }
        Expression::Nary { op, operands } => nary(*op, operands, ctx),
        Expression::Binary { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            binary(*op, &left, &right)
        }
        Expression::Index { operand, n } => {
            let value = evaluate(operand, ctx)?;
            index(&value, *n)
        }
        Expression::FieldValue { record, field } => {
            let value = evaluate(record, ctx)?;
            field_value(&value, field)
        }
    }
}

fn response_declaration<'c, C: ProcessingContext>(
    ctx: &'c C,
    identifier: &Identifier,
) -> Result<&'c qtiflow_declaration::VariableDeclaration> {
    let declaration = ctx
        .scope()
        .resolve_local(identifier)
        .ok_or_else(|| Error::undeclared(&VariableRef::local(identifier.clone())))?;
    if declaration.kind != VariableKind::Response {
        return Err(Error::new(ErrorKind::WrongVariableKind {
            identifier: identifier.clone(),
            expected: VariableKind::Response.name(),
        }));
    }
    Ok(declaration)
}

fn random_integer<C: ProcessingContext>(ctx: &mut C, min: i64, max: i64, step: i64) -> Result<Value> {
    let invalid = || Error::invalid_operand("randomInteger", format!("{min}..={max} step {step}"));
    if min > max || step < 1 {
        return Err(invalid());
    }
    let steps = max.checked_sub(min).ok_or_else(invalid)? / step;
    let k = ctx.rng().gen_range(0..=steps);
    let n = k
        .checked_mul(step)
        .and_then(|offset| min.checked_add(offset))
        .ok_or_else(invalid)?;
    Ok(Value::integer(n))
}

// =============================================================================
// Operand Helpers
// =============================================================================

fn describe(value: &Value) -> String {
    value
        .signature()
        .map_or_else(|| "NULL".to_string(), |s| s.to_string())
}

fn number(operator: &'static str, value: &Value) -> Result<Number> {
    value
        .as_number()
        .ok_or_else(|| Error::invalid_operand(operator, describe(value)))
}

fn boolean(operator: &'static str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::invalid_operand(operator, describe(value)))
}

fn container<'v>(operator: &'static str, value: &'v Value) -> Result<&'v Container> {
    value
        .as_container()
        .ok_or_else(|| Error::invalid_operand(operator, describe(value)))
}

fn overflow(operator: &'static str) -> Error {
    Error::invalid_operand(operator, "integer overflow")
}

// =============================================================================
// Operators
// =============================================================================

fn unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match op {
        UnaryOp::IsNull => Ok(Value::boolean(value.is_null())),
        UnaryOp::Not => {
            if value.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::boolean(!boolean(op.name(), value)?))
        }
        UnaryOp::ContainerSize => {
            if value.is_null() {
                return Ok(Value::integer(0));
            }
            let len = container(op.name(), value)?.len();
            Ok(Value::integer(i64::try_from(len).map_err(|_| overflow(op.name()))?))
        }
    }
}

fn nary<C: ProcessingContext>(op: NaryOp, operands: &[Expression], ctx: &mut C) -> Result<Value> {
    match op {
        NaryOp::And | NaryOp::Or => {
            // The first decisive operand ends evaluation.
            let decisive = op == NaryOp::Or;
            let mut saw_null = false;
            for operand in operands {
                let value = evaluate(operand, ctx)?;
                if value.is_null() {
                    saw_null = true;
                } else if boolean(op.name(), &value)? == decisive {
                    return Ok(Value::boolean(decisive));
                }
            }
            Ok(if saw_null {
                Value::Null
            } else {
                Value::boolean(!decisive)
            })
        }
        NaryOp::Sum | NaryOp::Product => {
            let mut numbers = Vec::with_capacity(operands.len());
            for operand in operands {
                let value = evaluate(operand, ctx)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                numbers.push(number(op.name(), &value)?);
            }
            arithmetic(op, &numbers)
        }
        NaryOp::Multiple | NaryOp::Ordered => {
            let cardinality = if op == NaryOp::Multiple {
                Cardinality::Multiple
            } else {
                Cardinality::Ordered
            };
            let mut singles = Vec::new();
            for operand in operands {
                let value = evaluate(operand, ctx)?;
                match value.cardinality() {
                    None => {}
                    Some(Cardinality::Single) => singles.extend(value.to_singles()),
                    Some(c) if c == cardinality => singles.extend(value.to_singles()),
                    Some(_) => return Err(Error::invalid_operand(op.name(), describe(&value))),
                }
            }
            Value::from_singles(cardinality, singles)
        }
    }
}

fn arithmetic(op: NaryOp, numbers: &[Number]) -> Result<Value> {
    let integers: Option<Vec<i64>> = numbers
        .iter()
        .map(|n| match n {
            Number::Integer(i) => Some(*i),
            Number::Float(_) => None,
        })
        .collect();
    match (op, integers) {
        (NaryOp::Sum, Some(ints)) => ints
            .iter()
            .try_fold(0i64, |acc, n| acc.checked_add(*n))
            .map(Value::integer)
            .ok_or_else(|| overflow(op.name())),
        (NaryOp::Product, Some(ints)) => ints
            .iter()
            .try_fold(1i64, |acc, n| acc.checked_mul(*n))
            .map(Value::integer)
            .ok_or_else(|| overflow(op.name())),
        (NaryOp::Sum, None) => Ok(Value::float(numbers.iter().map(|n| n.as_f64()).sum())),
        (NaryOp::Product, None) => Ok(Value::float(numbers.iter().map(|n| n.as_f64()).product())),
        _ => Err(Error::new(ErrorKind::Internal(format!(
            "{} is not arithmetic",
            op.name()
        )))),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let name = op.name();
    match op {
        BinaryOp::Subtract => match (number(name, left)?, number(name, right)?) {
            (Number::Integer(a), Number::Integer(b)) => a
                .checked_sub(b)
                .map(Value::integer)
                .ok_or_else(|| overflow(name)),
            (a, b) => Ok(Value::float(a.as_f64() - b.as_f64())),
        },
        BinaryOp::Divide => {
            let quotient = number(name, left)?.as_f64() / number(name, right)?.as_f64();
            Ok(if quotient.is_finite() {
                Value::float(quotient)
            } else {
                Value::Null
            })
        }
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Equal => {
            let a = number(name, left)?.as_f64();
            let b = number(name, right)?.as_f64();
            #[allow(clippy::float_cmp)]
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Lte => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::Gte => a >= b,
                _ => a == b,
            };
            Ok(Value::boolean(result))
        }
        BinaryOp::DurationLt | BinaryOp::DurationGte => {
            let a = number(name, left)?.as_f64();
            let b = number(name, right)?.as_f64();
            Ok(Value::boolean(if op == BinaryOp::DurationLt {
                a < b
            } else {
                a >= b
            }))
        }
        BinaryOp::Match => {
            if left.signature() != right.signature() {
                return Err(Error::invalid_operand(
                    name,
                    format!("{} and {}", describe(left), describe(right)),
                ));
            }
            Ok(Value::boolean(left == right))
        }
        BinaryOp::Member => {
            let needle = left
                .as_single()
                .ok_or_else(|| Error::invalid_operand(name, describe(left)))?;
            let haystack = container(name, right)?;
            if haystack.base_type() != needle.base_type() {
                return Err(Error::invalid_operand(name, describe(left)));
            }
            Ok(Value::boolean(haystack.contains(needle)))
        }
        BinaryOp::Contains => {
            if left.signature() != right.signature() {
                return Err(Error::invalid_operand(
                    name,
                    format!("{} and {}", describe(left), describe(right)),
                ));
            }
            let outer = container(name, left)?;
            let inner = container(name, right)?;
            let found = if matches!(left, Value::Ordered(_)) {
                contains_sequence(outer, inner)
            } else {
                contains_bag(outer, inner)
            };
            Ok(Value::boolean(found))
        }
    }
}

/// True when every element of `inner` can be matched to a distinct
/// element of `outer`.
fn contains_bag(outer: &Container, inner: &Container) -> bool {
    let mut available: Vec<&SingleValue> = outer.iter().collect();
    inner.iter().all(|needle| {
        available
            .iter()
            .position(|v| *v == needle)
            .map(|i| available.swap_remove(i))
            .is_some()
    })
}

/// True when `inner` occurs in `outer` as a contiguous run.
fn contains_sequence(outer: &Container, inner: &Container) -> bool {
    let outer: Vec<&SingleValue> = outer.iter().collect();
    let inner: Vec<&SingleValue> = inner.iter().collect();
    outer.windows(inner.len()).any(|window| window == inner.as_slice())
}

fn index(value: &Value, n: i64) -> Result<Value> {
    if n < 1 {
        return Err(Error::invalid_operand("index", format!("position {n}")));
    }
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Value::Ordered(sequence) = value else {
        return Err(Error::invalid_operand("index", describe(value)));
    };
    let position = usize::try_from(n - 1).map_err(|_| overflow("index"))?;
    Ok(sequence
        .get(position)
        .cloned()
        .map_or(Value::Null, Value::Single))
}

fn field_value(value: &Value, field: &Identifier) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let record = value
        .as_record()
        .ok_or_else(|| Error::invalid_operand("fieldValue", describe(value)))?;
    Ok(record.get(field).cloned().map_or(Value::Null, Value::Single))
}
