//! The coercion lattice: ToPrimitive / ToString / ToNumber / ToBoolean /
//! ToInt32 / ToUint32 / ToObject, plus strict equality, abstract equality,
//! and relational comparison.
//!
//! `ToPrimitive` on objects performs real `toString`/`valueOf` invocations
//! through the call protocol, so user-defined conversion methods observe
//! every coercion site.

use crate::{
    eval::call::call_function,
    exception::Exec,
    heap::HeapId,
    object::{JsObject, ObjKind},
    value::{number_to_string, Value},
    vm::Vm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    /// No hint: behaves as Number, except for Date objects which default to
    /// String.
    Default,
    Number,
    String,
}

/// Three-way relational outcome; NaN operands poison the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareResult {
    Undefined,
    Less,
    Equal,
    Greater,
}

impl Vm {
    pub(crate) fn to_primitive(&mut self, value: Value, hint: Hint) -> Exec<Value> {
        let Value::Object(id) = value else {
            return Ok(value);
        };
        let string_first = match hint {
            Hint::String => true,
            Hint::Number => false,
            Hint::Default => matches!(self.heap.object(id).kind, ObjKind::Date(_)),
        };
        let to_string = self.names.to_string;
        let value_of = self.names.value_of;
        let order = if string_first {
            [to_string, value_of]
        } else {
            [value_of, to_string]
        };
        for method_name in order {
            let Some(method) = self.heap.get_prop(id, method_name) else {
                continue;
            };
            let Value::Object(method_id) = method else {
                continue;
            };
            if !self.heap.object(method_id).is_function() {
                continue;
            }
            let result = call_function(self, method_id, value, &[])?;
            if result.is_primitive() {
                return Ok(result);
            }
        }
        Err(self.type_error("Cannot convert object to primitive"))
    }

    /// ToString as a Rust string; allocate with [`Vm::str_value`] when a
    /// heap handle is needed.
    pub(crate) fn to_display_string(&mut self, value: Value) -> Exec<String> {
        let prim = self.to_primitive(value, Hint::String)?;
        Ok(match prim {
            Value::Undefined => "undefined".to_owned(),
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(n),
            Value::Str(id) => self.heap.str(id).as_str().to_owned(),
            Value::Object(id) => {
                // ToPrimitive only yields objects when both conversion
                // methods were shadowed by non-callables; fall back to tags
                format!("[object {}]", self.heap.object(id).kind.tag())
            }
        })
    }

    pub(crate) fn to_number(&mut self, value: Value) -> Exec<f64> {
        let prim = self.to_primitive(value, Hint::Number)?;
        Ok(match prim {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => n,
            Value::Str(id) => string_to_number(self.heap.str(id).as_str()),
            Value::Object(_) => f64::NAN,
        })
    }

    pub(crate) fn to_boolean(&self, value: Value) -> bool {
        match value {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => b,
            Value::Number(n) => !(n == 0.0 || n.is_nan()),
            Value::Str(id) => !self.heap.str(id).is_empty(),
            Value::Object(_) => true,
        }
    }

    pub(crate) fn to_int32(&mut self, value: Value) -> Exec<i32> {
        Ok(self.to_uint32(value)? as i32)
    }

    pub(crate) fn to_uint32(&mut self, value: Value) -> Exec<u32> {
        let n = self.to_number(value)?;
        Ok(double_to_uint32(n))
    }

    /// Boxes primitives in their wrapper kinds; `undefined` and `null` have
    /// no object form.
    pub(crate) fn to_object(&mut self, value: Value) -> Exec<HeapId> {
        match value {
            Value::Object(id) => Ok(id),
            Value::Bool(b) => {
                let proto = self.protos.boolean;
                Ok(self
                    .heap
                    .alloc_object(JsObject::with_kind(Some(proto), ObjKind::Boolean(b))))
            }
            Value::Number(n) => {
                let proto = self.protos.number;
                Ok(self
                    .heap
                    .alloc_object(JsObject::with_kind(Some(proto), ObjKind::Number(n))))
            }
            Value::Str(id) => {
                let proto = self.protos.string;
                Ok(self
                    .heap
                    .alloc_object(JsObject::with_kind(Some(proto), ObjKind::String(id))))
            }
            Value::Undefined => Err(self.type_error("Cannot convert undefined to object")),
            Value::Null => Err(self.type_error("Cannot convert null to object")),
        }
    }

    pub(crate) fn typeof_str(&self, value: Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Object(id) => {
                if self.heap.object(id).is_function() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    pub(crate) fn strict_equals(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => self.heap.str_eq(x, y),
            (Value::Object(x), Value::Object(y)) => x == y,
            _ => false,
        }
    }

    /// `==` with the full coercion chain; symmetric by construction.
    pub(crate) fn abstract_equals(&mut self, a: Value, b: Value) -> Exec<bool> {
        match (a, b) {
            // same type: strict rules
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => Ok(true),
            (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::Str(_), Value::Str(_))
            | (Value::Object(_), Value::Object(_)) => Ok(self.strict_equals(a, b)),

            // number <-> string
            (Value::Number(x), Value::Str(id)) | (Value::Str(id), Value::Number(x)) => {
                Ok(x == string_to_number(self.heap.str(id).as_str()))
            }

            // booleans coerce to numbers on either side
            (Value::Bool(x), other) => {
                self.abstract_equals(Value::Number(if x { 1.0 } else { 0.0 }), other)
            }
            (other, Value::Bool(y)) => {
                self.abstract_equals(other, Value::Number(if y { 1.0 } else { 0.0 }))
            }

            // object <-> primitive via ToPrimitive(Default)
            (Value::Object(_), Value::Number(_) | Value::Str(_)) => {
                let prim = self.to_primitive(a, Hint::Default)?;
                if prim.is_primitive() {
                    self.abstract_equals(prim, b)
                } else {
                    Ok(false)
                }
            }
            (Value::Number(_) | Value::Str(_), Value::Object(_)) => {
                let prim = self.to_primitive(b, Hint::Default)?;
                if prim.is_primitive() {
                    self.abstract_equals(a, prim)
                } else {
                    Ok(false)
                }
            }

            _ => Ok(false),
        }
    }

    /// Relational comparison backbone: both operands through
    /// `ToPrimitive(Number)`, then lexicographic if both became strings,
    /// numeric otherwise.
    pub(crate) fn compare_values(&mut self, a: Value, b: Value) -> Exec<CompareResult> {
        let pa = self.to_primitive(a, Hint::Number)?;
        let pb = self.to_primitive(b, Hint::Number)?;
        if let (Value::Str(x), Value::Str(y)) = (pa, pb) {
            let sa = self.heap.str(x);
            let sb = self.heap.str(y);
            return Ok(match sa.as_str().cmp(sb.as_str()) {
                std::cmp::Ordering::Less => CompareResult::Less,
                std::cmp::Ordering::Equal => CompareResult::Equal,
                std::cmp::Ordering::Greater => CompareResult::Greater,
            });
        }
        let na = self.to_number(pa)?;
        let nb = self.to_number(pb)?;
        if na.is_nan() || nb.is_nan() {
            return Ok(CompareResult::Undefined);
        }
        Ok(if na < nb {
            CompareResult::Less
        } else if na > nb {
            CompareResult::Greater
        } else {
            CompareResult::Equal
        })
    }
}

/// ECMAScript ToUint32: NaN/±∞/±0 map to 0, everything else is truncated
/// and folded into the 32-bit range.
pub(crate) fn double_to_uint32(n: f64) -> u32 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return 0;
    }
    let mut m = n.trunc() % 4_294_967_296.0;
    if m < 0.0 {
        m += 4_294_967_296.0;
    }
    m as u32
}

/// String-to-number grammar: optional whitespace, optional sign, decimal or
/// `0x` hexadecimal, `Infinity` tokens; anything else is NaN. The empty
/// string is 0.
pub(crate) fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\u{a0}');
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return f64::NAN;
        }
        let mut value = 0.0f64;
        for b in hex.bytes() {
            let digit = match b {
                b'0'..=b'9' => f64::from(b - b'0'),
                b'a'..=b'f' => f64::from(b - b'a' + 10),
                _ => f64::from(b - b'A' + 10),
            };
            value = value * 16.0 + digit;
        }
        return value;
    }
    let (sign, body) = match trimmed.as_bytes()[0] {
        b'+' => (1.0, &trimmed[1..]),
        b'-' => (-1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(body) {
        return f64::NAN;
    }
    body.parse::<f64>().map_or(f64::NAN, |v| sign * v)
}

fn is_decimal_literal(body: &str) -> bool {
    let bytes = body.as_bytes();
    let mut i = 0;
    let mut digits = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        digits = true;
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            digits = true;
            i += 1;
        }
    }
    if !digits {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        if i >= bytes.len() || !bytes[i].is_ascii_digit() {
            return false;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_parsing() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  42  "), 42.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("-1.5e2"), -150.0);
        assert_eq!(string_to_number("Infinity"), f64::INFINITY);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12abc").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("NaN").is_nan());
    }

    #[test]
    fn uint32_folding() {
        assert_eq!(double_to_uint32(f64::NAN), 0);
        assert_eq!(double_to_uint32(f64::INFINITY), 0);
        assert_eq!(double_to_uint32(-1.0), 4_294_967_295);
        assert_eq!(double_to_uint32(4_294_967_296.0), 0);
        assert_eq!(double_to_uint32(3.7), 3);
        assert_eq!(double_to_uint32(-3.7), 4_294_967_293);
    }

    #[test]
    fn round_trip_canonical_number_strings() {
        for text in ["0", "1", "42.5", "NaN", "Infinity", "-Infinity", "1e+21"] {
            let n = string_to_number(text);
            let printed = if text == "NaN" {
                assert!(n.is_nan());
                "NaN".to_owned()
            } else {
                number_to_string(n)
            };
            assert_eq!(printed, text);
        }
    }
}
