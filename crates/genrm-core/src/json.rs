// ── JSON document engine ──
//
// Pure functions over `serde_json::Value`: deep merge for composing request
// bodies, canonical rendering for order-insensitive comparison, dotted path
// extraction for output projection, and read-back reconciliation that
// reports only the keys the user declared.
//
// Nothing here mutates its inputs; every operation returns a new document.

use serde_json::{Map, Number, Value};

use crate::error::CoreError;

/// Top-level properties the remote manages itself. They are dropped from the
/// body when a resource is imported without a declared body.
pub const UNSUPPORTED_PROPERTIES: &[&str] = &[
    "id",
    "name",
    "type",
    "location",
    "tags",
    "identity",
    "etag",
    "systemData",
];

/// `Null` or an object with no keys.
pub fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// ── Merge ────────────────────────────────────────────────────────────

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge key by key, recursively. Anything else (scalars, arrays,
/// mismatched types) is replaced by the overlay value, including a nested
/// `null`. Only a top-level `null` overlay leaves `base` untouched.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    if overlay.is_null() {
        return base.clone();
    }
    merge_value(base, overlay)
}

fn merge_value(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match base_map.get(key) {
                    Some(base_value) => merge_value(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (_, other) => other.clone(),
    }
}

// ── Canonical form ───────────────────────────────────────────────────

/// Canonical compact rendering: object keys sorted, no whitespace, and
/// integral floats written as integers (`1.0` renders as `1`).
///
/// Two documents that differ only in key order or formatting normalize to
/// the same string.
pub fn normalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Parse `text` and return its canonical rendering.
pub fn normalize_str(text: &str) -> Result<String, CoreError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CoreError::InvalidJson {
        context: "document".into(),
        message: e.to_string(),
    })?;
    Ok(normalize(&value))
}

/// Diff suppression for JSON text: equal when both parse and normalize to
/// the same string. Unparseable input falls back to a plain text compare.
pub fn suppress_json_ordering_difference(old: &str, new: &str) -> bool {
    match (normalize_str(old), normalize_str(new)) {
        (Ok(a), Ok(b)) => a == b,
        _ => old == new,
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => out.push_str(&value.to_string()),
        Value::Number(n) => out.push_str(&canonical_number(n)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

fn canonical_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if is_integral(f) => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

#[allow(clippy::float_cmp)]
fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16
}

// ── Paths ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Split `properties.rules[0].name` into key and index segments.
/// Malformed paths yield `None`.
fn parse_path(path: &str) -> Option<Vec<Segment>> {
    if path.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(i) => (&part[..i], &part[i..]),
            None => (part, ""),
        };
        if key.is_empty() && rest.is_empty() {
            return None;
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_owned()));
        }
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            let index = inner[..close].parse::<usize>().ok()?;
            segments.push(Segment::Index(index));
            rest = &inner[close + 1..];
        }
    }
    Some(segments)
}

/// Walk a dotted path (`a.b[2].c`) into `doc`.
///
/// Returns `None` when any segment is missing, indexes past the end, meets
/// the wrong type, or the path itself is malformed. Never panics.
pub fn extract_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    segments
        .iter()
        .try_fold(doc, |current, segment| match segment {
            Segment::Key(key) => current.as_object()?.get(key),
            Segment::Index(index) => current.as_array()?.get(*index),
        })
}

/// Extract `path` and rebuild the path skeleton around the value, so
/// `properties.foo` yields `{"properties":{"foo":<value>}}`. Index segments
/// keep their position: `rules[1]` becomes `[null, <value>]`.
pub fn project_path(doc: &Value, path: &str) -> Option<Value> {
    let segments = parse_path(path)?;
    let found = extract_path(doc, path)?.clone();
    let mut projected = Value::Null;
    place(&mut projected, &segments, found);
    Some(projected)
}

/// Project every path in `paths` out of `doc` into one document, in list
/// order. Paths into the same array fill their own positions; a later path
/// wins only where it lands on what an earlier one wrote. Unresolved paths
/// are skipped; no matches give `{}`.
pub fn project_output(doc: &Value, paths: &[String]) -> Value {
    let mut output = Value::Object(Map::new());
    for path in paths {
        let Some(segments) = parse_path(path) else {
            continue;
        };
        if let Some(found) = extract_path(doc, path) {
            place(&mut output, &segments, found.clone());
        }
    }
    output
}

/// Write `value` at `segments` inside `target`, creating objects and
/// `null`-padded arrays on the way. Objects at the destination deep-merge;
/// anything else is overwritten.
fn place(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *target = merge_value(target, &value);
        return;
    };
    match segment {
        Segment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                place(map.entry(key.clone()).or_insert(Value::Null), rest, value);
            }
        }
        Segment::Index(index) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(items) = target {
                if items.len() <= *index {
                    items.resize(index + 1, Value::Null);
                }
                if let Some(slot) = items.get_mut(*index) {
                    place(slot, rest, value);
                }
            }
        }
    }
}

// ── Read-back reconciliation ─────────────────────────────────────────

/// The document to report after reading `remote`.
///
/// With a declared body, every declared key takes its current remote value
/// (recursively) and undeclared remote keys are ignored. With no declared
/// body (`null` or `{}`, as on import) the whole remote document is
/// reported minus `ignored_keys`.
pub fn reconcile_read(desired: &Value, remote: &Value, ignored_keys: &[&str]) -> Value {
    if is_empty_document(desired) {
        return strip_keys(remote, ignored_keys);
    }
    updated_json(desired, remote)
}

fn updated_json(desired: &Value, remote: &Value) -> Value {
    match (desired, remote) {
        (Value::Object(desired_map), Value::Object(remote_map)) => Value::Object(
            desired_map
                .iter()
                .map(|(key, desired_value)| {
                    let value = remote_map.get(key).map_or_else(
                        || desired_value.clone(),
                        |remote_value| updated_json(desired_value, remote_value),
                    );
                    (key.clone(), value)
                })
                .collect(),
        ),
        (Value::Array(desired_items), Value::Array(remote_items))
            if desired_items.len() == remote_items.len() =>
        {
            Value::Array(
                desired_items
                    .iter()
                    .zip(remote_items)
                    .map(|(d, r)| updated_json(d, r))
                    .collect(),
            )
        }
        (_, remote_value) => remote_value.clone(),
    }
}

/// Remove top-level `keys` from an object. Non-objects are returned as-is.
pub fn strip_keys(doc: &Value, keys: &[&str]) -> Value {
    match doc {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
