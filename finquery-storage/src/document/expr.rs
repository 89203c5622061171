//! Aggregation expressions and projections.

use finquery_core::QueryError;
use serde_json::{Map, Number, Value};

use super::filter::{lookup, malformed, unsupported};

/// Evaluate an aggregation expression against a document.
///
/// `"$path"` reads a field (null when missing), `{ "$op": args }` applies an
/// arithmetic operator, objects and arrays evaluate element-wise, and every
/// other value is a literal.
pub fn eval(expr: &Value, doc: &Value) -> Result<Value, QueryError> {
    match expr {
        Value::String(s) if s.starts_with('$') => {
            Ok(lookup(doc, &s[1..]).cloned().unwrap_or(Value::Null))
        }
        Value::Object(map) if map.len() == 1 && map.keys().all(|k| k.starts_with('$')) => {
            let (op, args) = map.iter().next().ok_or_else(|| malformed("empty expression"))?;
            operator(op, args, doc)
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), eval(v, doc)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| eval(item, doc))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        literal => Ok(literal.clone()),
    }
}

fn operator(op: &str, args: &Value, doc: &Value) -> Result<Value, QueryError> {
    let args = match args {
        Value::Array(items) => items
            .iter()
            .map(|a| eval(a, doc))
            .collect::<Result<Vec<_>, _>>()?,
        single => vec![eval(single, doc)?],
    };

    // Arithmetic on a missing or null operand yields null.
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let nums = args
        .iter()
        .map(|a| {
            a.as_f64()
                .ok_or_else(|| malformed(format!("{} expects numeric operands", op)))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let result = match (op, nums.as_slice()) {
        ("$add", _) => nums.iter().sum(),
        ("$multiply", _) => nums.iter().product(),
        ("$subtract", [a, b]) => a - b,
        ("$divide", [_, b]) if *b == 0.0 => return Err(malformed("$divide by zero")),
        ("$divide", [a, b]) => a / b,
        ("$subtract" | "$divide", _) => {
            return Err(malformed(format!("{} expects exactly two operands", op)))
        }
        (other, _) => return Err(unsupported("expression operator", other)),
    };
    Ok(number(result))
}

/// Wrap an f64, keeping integral values integral so `4300.0` renders as
/// `4300`.
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

enum Mode {
    Include,
    Exclude,
}

/// Apply a projection. With `computed` set (the `$project` stage), values
/// other than 0/1/true/false are evaluated as expressions and included.
pub fn project(doc: &Value, spec: &Map<String, Value>, computed: bool) -> Result<Value, QueryError> {
    if spec.is_empty() {
        return Ok(doc.clone());
    }

    let mut mode: Option<Mode> = None;
    let mut exclude_id = false;
    for (field, v) in spec {
        let include = match v {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            _ if computed => true,
            _ => return Err(malformed(format!("invalid projection value for {}", field))),
        };
        if field == "_id" && !include {
            exclude_id = true;
            continue;
        }
        mode = match (mode, include) {
            (None | Some(Mode::Include), true) => Some(Mode::Include),
            (None | Some(Mode::Exclude), false) => Some(Mode::Exclude),
            _ => return Err(malformed("projection cannot mix inclusion and exclusion")),
        };
    }

    match mode {
        Some(Mode::Include) => {
            let mut out = Value::Object(Map::new());
            if !exclude_id {
                if let Some(id) = doc.get("_id") {
                    set_path(&mut out, "_id", id.clone());
                }
            }
            for (field, v) in spec {
                match v {
                    Value::Bool(true) => copy_path(doc, &mut out, field),
                    Value::Number(n) if n.as_f64().is_some_and(|n| n != 0.0) => {
                        copy_path(doc, &mut out, field)
                    }
                    Value::Bool(false) | Value::Number(_) => {}
                    expr => set_path(&mut out, field, eval(expr, doc)?),
                }
            }
            Ok(out)
        }
        // Only `_id: 0`, or pure exclusion.
        None | Some(Mode::Exclude) => {
            let mut out = doc.clone();
            for (field, _) in spec {
                remove_path(&mut out, field);
            }
            Ok(out)
        }
    }
}

fn copy_path(from: &Value, to: &mut Value, path: &str) {
    if let Some(v) = lookup(from, path) {
        set_path(to, path, v.clone());
    }
}

/// Set a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Remove a dotted path if present.
pub fn remove_path(doc: &mut Value, path: &str) {
    match path.rsplit_once('.') {
        Some((parent, leaf)) => {
            let parent = parent
                .split('.')
                .try_fold(&mut *doc, |value, segment| value.get_mut(segment));
            if let Some(Value::Object(map)) = parent {
                map.remove(leaf);
            }
        }
        None => {
            if let Value::Object(map) = doc {
                map.remove(path);
            }
        }
    }
}
