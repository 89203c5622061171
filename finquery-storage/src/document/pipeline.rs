//! Aggregation pipeline evaluation.
//!
//! Stages: `$match $group $sort $limit $skip $project $addFields $set
//! $count $unwind`, with `$set` as an alias of `$addFields`. Any other
//! stage, including cross-collection stages such as `$lookup` and
//! `$unionWith`, is rejected.

use std::collections::HashMap;

use finquery_core::{QueryError, Record};
use serde_json::{Map, Value};

use super::expr::{eval, number, project, remove_path, set_path};
use super::filter::{lookup, malformed, matches, sort_order, unsupported};

/// Run `pipeline` over `docs`, in order.
pub fn run(mut docs: Vec<Record>, pipeline: &[Value]) -> Result<Vec<Record>, QueryError> {
    for stage in pipeline {
        let (name, spec) = match stage.as_object() {
            Some(map) if map.len() == 1 => map
                .iter()
                .next()
                .ok_or_else(|| malformed("empty pipeline stage"))?,
            _ => return Err(malformed("each pipeline stage must have exactly one operator")),
        };

        docs = match name.as_str() {
            "$match" => match_stage(docs, object(name, spec)?)?,
            "$group" => group(docs, object(name, spec)?)?,
            "$sort" => sort(docs, object(name, spec)?)?,
            "$limit" => docs.into_iter().take(count_arg(name, spec)?).collect(),
            "$skip" => docs.into_iter().skip(count_arg(name, spec)?).collect(),
            "$project" => {
                let spec = object(name, spec)?;
                docs.iter()
                    .map(|doc| project(doc, spec, true))
                    .collect::<Result<_, _>>()?
            }
            "$addFields" | "$set" => add_fields(docs, object(name, spec)?)?,
            "$count" => count(docs, spec)?,
            "$unwind" => unwind(docs, spec)?,
            other => return Err(unsupported("pipeline stage", other)),
        };
    }
    Ok(docs)
}

fn object<'a>(stage: &str, spec: &'a Value) -> Result<&'a Map<String, Value>, QueryError> {
    spec.as_object()
        .ok_or_else(|| malformed(format!("{} expects an object", stage)))
}

fn count_arg(stage: &str, spec: &Value) -> Result<usize, QueryError> {
    spec.as_u64()
        .or_else(|| spec.as_f64().filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64))
        .map(|n| n as usize)
        .ok_or_else(|| malformed(format!("{} expects a non-negative integer", stage)))
}

fn match_stage(docs: Vec<Record>, filter: &Map<String, Value>) -> Result<Vec<Record>, QueryError> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        if matches(&doc, filter)? {
            out.push(doc);
        }
    }
    Ok(out)
}

fn sort(mut docs: Vec<Record>, spec: &Map<String, Value>) -> Result<Vec<Record>, QueryError> {
    let keys = spec
        .iter()
        .map(|(field, dir)| match dir.as_i64() {
            Some(1) => Ok((field.as_str(), false)),
            Some(-1) => Ok((field.as_str(), true)),
            _ => Err(malformed(format!("$sort direction for {} must be 1 or -1", field))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    docs.sort_by(|a, b| {
        keys.iter()
            .map(|(field, descending)| {
                let ord = sort_order(lookup(a, field), lookup(b, field));
                if *descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(docs)
}

fn add_fields(docs: Vec<Record>, spec: &Map<String, Value>) -> Result<Vec<Record>, QueryError> {
    docs.into_iter()
        .map(|doc| {
            let mut out = doc.clone();
            for (field, expr) in spec {
                set_path(&mut out, field, eval(expr, &doc)?);
            }
            Ok(out)
        })
        .collect()
}

fn count(docs: Vec<Record>, spec: &Value) -> Result<Vec<Record>, QueryError> {
    let field = spec
        .as_str()
        .filter(|f| !f.is_empty() && !f.starts_with('$'))
        .ok_or_else(|| malformed("$count expects a field name"))?;
    if docs.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Map::new();
    out.insert(field.to_string(), Value::from(docs.len() as u64));
    Ok(vec![Value::Object(out)])
}

fn unwind(docs: Vec<Record>, spec: &Value) -> Result<Vec<Record>, QueryError> {
    let (path, preserve) = match spec {
        Value::String(path) => (path.as_str(), false),
        Value::Object(opts) => (
            opts.get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("$unwind expects a path"))?,
            opts.get("preserveNullAndEmptyArrays")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        ),
        _ => return Err(malformed("$unwind expects a path")),
    };
    let field = path
        .strip_prefix('$')
        .ok_or_else(|| malformed("$unwind path must start with $"))?;

    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match lookup(&doc, field).cloned() {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut copy = doc.clone();
                    set_path(&mut copy, field, item);
                    out.push(copy);
                }
            }
            Some(Value::Array(_)) if preserve => {
                let mut copy = doc;
                remove_path(&mut copy, field);
                out.push(copy);
            }
            None | Some(Value::Null) if preserve => out.push(doc),
            None | Some(Value::Null) | Some(Value::Array(_)) => {}
            Some(_) => out.push(doc),
        }
    }
    Ok(out)
}

/// Running state of one `$group` accumulator.
enum Acc {
    Sum(f64),
    Avg { total: f64, n: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    Count(u64),
    First(Option<Value>),
    Push(Vec<Value>),
}

impl Acc {
    fn new(op: &str) -> Result<Self, QueryError> {
        Ok(match op {
            "$sum" => Acc::Sum(0.0),
            "$avg" => Acc::Avg { total: 0.0, n: 0 },
            "$min" => Acc::Min(None),
            "$max" => Acc::Max(None),
            "$count" => Acc::Count(0),
            "$first" => Acc::First(None),
            "$push" => Acc::Push(Vec::new()),
            other => return Err(unsupported("accumulator", other)),
        })
    }

    fn add(&mut self, value: Value) {
        if value.is_null() && matches!(self, Acc::Min(_) | Acc::Max(_)) {
            return;
        }
        match self {
            Acc::Sum(total) => *total += value.as_f64().unwrap_or(0.0),
            Acc::Avg { total, n } => {
                if let Some(v) = value.as_f64() {
                    *total += v;
                    *n += 1;
                }
            }
            Acc::Min(current) => {
                if current
                    .as_ref()
                    .map_or(true, |c| sort_order(Some(&value), Some(c)).is_lt())
                {
                    *current = Some(value);
                }
            }
            Acc::Max(current) => {
                if current
                    .as_ref()
                    .map_or(true, |c| sort_order(Some(&value), Some(c)).is_gt())
                {
                    *current = Some(value);
                }
            }
            Acc::Count(n) => *n += 1,
            Acc::First(first) => {
                if first.is_none() {
                    *first = Some(value);
                }
            }
            Acc::Push(items) => items.push(value),
        }
    }

    fn finish(self) -> Value {
        match self {
            Acc::Sum(total) => number(total),
            Acc::Avg { n: 0, .. } => Value::Null,
            Acc::Avg { total, n } => number(total / n as f64),
            Acc::Min(v) | Acc::Max(v) | Acc::First(v) => v.unwrap_or(Value::Null),
            Acc::Count(n) => Value::from(n),
            Acc::Push(items) => Value::Array(items),
        }
    }
}

struct Group {
    id: Value,
    accs: Vec<(String, Acc)>,
}

fn group(docs: Vec<Record>, spec: &Map<String, Value>) -> Result<Vec<Record>, QueryError> {
    let id_expr = spec
        .get("_id")
        .ok_or_else(|| malformed("$group requires an _id"))?;

    let mut fields = Vec::new();
    for (name, acc) in spec.iter().filter(|(name, _)| name.as_str() != "_id") {
        let (op, arg) = match acc.as_object() {
            Some(map) if map.len() == 1 => map
                .iter()
                .next()
                .ok_or_else(|| malformed("empty accumulator"))?,
            _ => return Err(malformed(format!("$group field {} needs one accumulator", name))),
        };
        Acc::new(op)?;
        fields.push((name.clone(), op.as_str(), arg));
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for doc in &docs {
        let id = eval(id_expr, doc)?;
        let slot = id.to_string();
        let at = match index.get(&slot) {
            Some(at) => *at,
            None => {
                let accs = fields
                    .iter()
                    .map(|(name, op, _)| Acc::new(op).map(|acc| (name.clone(), acc)))
                    .collect::<Result<_, _>>()?;
                groups.push(Group { id, accs });
                index.insert(slot, groups.len() - 1);
                groups.len() - 1
            }
        };

        for ((_, acc), (_, _, arg)) in groups[at].accs.iter_mut().zip(&fields) {
            let value = match acc {
                Acc::Count(_) => Value::Null,
                _ => eval(arg, doc)?,
            };
            acc.add(value);
        }
    }

    Ok(groups
        .into_iter()
        .map(|g| {
            let mut out = Map::new();
            out.insert("_id".to_string(), g.id);
            for (name, acc) in g.accs {
                out.insert(name, acc.finish());
            }
            Value::Object(out)
        })
        .collect())
}
