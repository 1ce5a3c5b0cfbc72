//! # Constraint Translator
//!
//! A `validate` expression such as `required,oneof=1 2,max=10` is parsed once
//! into [`Constraints`]. Each [`Constraint`] has a runtime predicate
//! ([`Constraint::check`]) and a schema representation
//! ([`Constraint::apply`]) defined next to each other:
//!
//! | operator | runtime | schema |
//! |---|---|---|
//! | `required` | value differs from the type's zero value | `required` list |
//! | `oneof=a b` | value is one of the literals | `enum` |
//! | `min=N` / `max=N` | numbers by value, strings/arrays/maps by length | `minimum` / `minLength` / `minItems` (and max) |
//! | `len=N` | measure equals N | both bounds set to N |

use crate::error::ConfigError;
use crate::schema::{Schema, SchemaType};
use crate::tags::FieldContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What to do with validation operators outside the supported set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOperatorPolicy {
    /// Fail descriptor construction with [`ConfigError::UnsupportedOperator`].
    #[default]
    Reject,
    /// Keep the operator as [`Constraint::Unknown`]; it never fails a request
    /// and never shows up in a schema.
    Ignore,
}

impl UnknownOperatorPolicy {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ignore" => UnknownOperatorPolicy::Ignore,
            _ => UnknownOperatorPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    OneOf(Vec<String>),
    Min(f64),
    Max(f64),
    Len(u64),
    Unknown(String),
}

impl Constraint {
    pub fn operator(&self) -> &str {
        match self {
            Constraint::Required => "required",
            Constraint::OneOf(_) => "oneof",
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::Len(_) => "len",
            Constraint::Unknown(op) => op,
        }
    }

    /// Runtime predicate. `zero` is the serialized zero value of the field type.
    pub fn check(&self, value: &Value, zero: &Value) -> Result<(), String> {
        match self {
            Constraint::Required => {
                if value.is_null() || value == zero {
                    Err("is required".to_string())
                } else {
                    Ok(())
                }
            }
            Constraint::OneOf(items) => {
                let candidates: Vec<&Value> = match value {
                    Value::Array(elems) => elems.iter().collect(),
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                match candidates.into_iter().find(|v| !one_of(v, items)) {
                    Some(bad) => Err(format!(
                        "{} must be one of [{}]",
                        display(bad),
                        items.join(" ")
                    )),
                    None => Ok(()),
                }
            }
            Constraint::Min(bound) => match measure(value) {
                Some(m) if m < *bound => Err(format!("{} must be at least {bound}", describe(value))),
                _ => Ok(()),
            },
            Constraint::Max(bound) => match measure(value) {
                Some(m) if m > *bound => Err(format!("{} must be at most {bound}", describe(value))),
                _ => Ok(()),
            },
            Constraint::Len(n) => match measure(value) {
                Some(m) if m != *n as f64 => Err(format!("{} must be exactly {n}", describe(value))),
                _ => Ok(()),
            },
            Constraint::Unknown(_) => Ok(()),
        }
    }

    /// Schema representation of the same rule. `required` is recorded by the
    /// enclosing object or parameter, not on the node itself.
    pub fn apply(&self, schema: &mut Schema) {
        match self {
            Constraint::Required | Constraint::Unknown(_) => {}
            Constraint::OneOf(items) => {
                let target = match (schema.schema_type, schema.items.as_deref_mut()) {
                    (Some(SchemaType::Array), Some(items_schema)) => items_schema,
                    _ => schema,
                };
                target.enum_values = items.iter().map(|i| typed_literal(i, target.schema_type)).collect();
            }
            Constraint::Min(bound) => set_bound(schema, *bound, Bound::Lower),
            Constraint::Max(bound) => set_bound(schema, *bound, Bound::Upper),
            Constraint::Len(n) => {
                set_bound(schema, *n as f64, Bound::Lower);
                set_bound(schema, *n as f64, Bound::Upper);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn set_bound(schema: &mut Schema, bound: f64, which: Bound) {
    // Lengths are whole numbers: round toward the allowed range.
    let whole = match which {
        Bound::Lower => bound.ceil(),
        Bound::Upper => bound.floor(),
    };
    let count = if whole < 0.0 { 0 } else { whole as u64 };
    match (schema.schema_type, which) {
        (Some(SchemaType::String), Bound::Lower) => schema.min_length = Some(count),
        (Some(SchemaType::String), Bound::Upper) => schema.max_length = Some(count),
        (Some(SchemaType::Array), Bound::Lower) => schema.min_items = Some(count),
        (Some(SchemaType::Array), Bound::Upper) => schema.max_items = Some(count),
        (Some(SchemaType::Object), Bound::Lower) => schema.min_properties = Some(count),
        (Some(SchemaType::Object), Bound::Upper) => schema.max_properties = Some(count),
        (_, Bound::Lower) => schema.minimum = Some(bound),
        (_, Bound::Upper) => schema.maximum = Some(bound),
    }
}

/// Numbers measure by value; strings, arrays and objects by length.
fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(a) => Some(a.len() as f64),
        Value::Object(o) => Some(o.len() as f64),
        Value::Bool(_) | Value::Null => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "value",
        _ => "length",
    }
}

fn one_of(value: &Value, items: &[String]) -> bool {
    match value {
        Value::String(s) => items.iter().any(|i| i == s),
        Value::Number(n) => {
            let Some(v) = n.as_f64() else { return false };
            items
                .iter()
                .any(|i| i.parse::<f64>().map(|p| p == v).unwrap_or(false))
        }
        Value::Bool(b) => items.iter().any(|i| i.parse::<bool>() == Ok(*b)),
        _ => false,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => format!("`{s}`"),
        other => format!("`{other}`"),
    }
}

fn typed_literal(literal: &str, ty: Option<SchemaType>) -> Value {
    match ty {
        Some(SchemaType::Integer) => literal
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(literal.to_string())),
        Some(SchemaType::Number) => literal
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(literal.to_string())),
        Some(SchemaType::Boolean) => literal
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(literal.to_string())),
        _ => Value::String(literal.to_string()),
    }
}

/// Parsed `validate` expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints(Vec<Constraint>);

impl Constraints {
    pub fn parse(
        expr: &str,
        ctx: FieldContext<'_>,
        policy: UnknownOperatorPolicy,
    ) -> Result<Self, ConfigError> {
        let mut constraints = Vec::new();
        for item in expr.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (operator, operand) = match item.split_once('=') {
                Some((op, arg)) => (op.trim(), Some(arg)),
                None => (item, None),
            };
            let invalid = |reason: &str| ConfigError::InvalidOperand {
                model: ctx.model.to_string(),
                field: ctx.field.to_string(),
                operator: operator.to_string(),
                reason: reason.to_string(),
            };
            let constraint = match (operator, operand) {
                ("required", None) => Constraint::Required,
                ("oneof", Some(arg)) => {
                    let items: Vec<String> = arg.split_whitespace().map(str::to_string).collect();
                    if items.is_empty() {
                        return Err(invalid("oneof needs at least one literal"));
                    }
                    Constraint::OneOf(items)
                }
                ("min", Some(arg)) => Constraint::Min(
                    arg.trim()
                        .parse::<f64>()
                        .map_err(|e| invalid(&e.to_string()))?,
                ),
                ("max", Some(arg)) => Constraint::Max(
                    arg.trim()
                        .parse::<f64>()
                        .map_err(|e| invalid(&e.to_string()))?,
                ),
                ("len", Some(arg)) => Constraint::Len(
                    arg.trim()
                        .parse::<u64>()
                        .map_err(|e| invalid(&e.to_string()))?,
                ),
                ("required", Some(_)) => return Err(invalid("required takes no operand")),
                ("oneof" | "min" | "max" | "len", None) => {
                    return Err(invalid("missing operand"))
                }
                _ => match policy {
                    UnknownOperatorPolicy::Reject => {
                        return Err(ConfigError::UnsupportedOperator {
                            model: ctx.model.to_string(),
                            field: ctx.field.to_string(),
                            operator: item.to_string(),
                        })
                    }
                    UnknownOperatorPolicy::Ignore => {
                        tracing::warn!(
                            model = ctx.model,
                            field = ctx.field,
                            operator = item,
                            "ignoring unsupported validation operator"
                        );
                        Constraint::Unknown(item.to_string())
                    }
                },
            };
            constraints.push(constraint);
        }
        Ok(Constraints(constraints))
    }

    pub fn is_required(&self) -> bool {
        self.0.iter().any(|c| *c == Constraint::Required)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.0.iter()
    }

    /// Evaluate every constraint and return every failure.
    ///
    /// Only `required` looks at fields that never received a value; the other
    /// operators apply to values that were actually supplied (or defaulted).
    pub fn violations(&self, value: &Value, zero: &Value, present: bool) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|c| present || matches!(c, Constraint::Required))
            .filter_map(|c| c.check(value, zero).err().map(|msg| (c.operator().to_string(), msg)))
            .collect()
    }

    pub fn apply(&self, schema: &mut Schema) {
        for c in &self.0 {
            c.apply(schema);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CTX: FieldContext<'static> = FieldContext {
        model: "M",
        field: "f",
    };

    fn parse(expr: &str) -> Constraints {
        Constraints::parse(expr, CTX, UnknownOperatorPolicy::Reject).unwrap()
    }

    #[test]
    fn test_parse_all_operators() {
        let c = parse("required,oneof=1 2,min=1.5,max=10,len=3");
        assert_eq!(
            c.iter().cloned().collect::<Vec<_>>(),
            vec![
                Constraint::Required,
                Constraint::OneOf(vec!["1".into(), "2".into()]),
                Constraint::Min(1.5),
                Constraint::Max(10.0),
                Constraint::Len(3),
            ]
        );
        assert!(c.is_required());
    }

    #[test]
    fn test_invalid_operands() {
        for expr in ["min=abc", "len=-1", "oneof=", "max", "required=yes"] {
            let err = Constraints::parse(expr, CTX, UnknownOperatorPolicy::Ignore).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidOperand { .. }), "{expr}");
        }
    }

    #[test]
    fn test_required_against_zero() {
        let c = Constraint::Required;
        assert!(c.check(&json!(""), &json!("")).is_err());
        assert!(c.check(&json!(0), &json!(0)).is_err());
        assert!(c.check(&json!(null), &json!(null)).is_err());
        assert!(c.check(&json!("x"), &json!("")).is_ok());
        assert!(c.check(&json!(false), &json!(false)).is_err());
    }

    #[test]
    fn test_oneof_runtime() {
        let c = Constraint::OneOf(vec!["1".into(), "2".into()]);
        assert!(c.check(&json!("1"), &json!("")).is_ok());
        assert!(c.check(&json!("3"), &json!("")).is_err());
        assert!(c.check(&json!(2), &json!(0)).is_ok());
        assert!(c.check(&json!(2.0), &json!(0.0)).is_ok());
        assert!(c.check(&json!(["1", "2"]), &json!([])).is_ok());
        assert!(c.check(&json!(["1", "9"]), &json!([])).is_err());
    }

    #[test]
    fn test_min_max_len_measures() {
        assert!(Constraint::Min(3.0).check(&json!(2), &json!(0)).is_err());
        assert!(Constraint::Min(3.0).check(&json!("abcd"), &json!("")).is_ok());
        assert!(Constraint::Max(2.0).check(&json!([1, 2, 3]), &json!([])).is_err());
        assert!(Constraint::Len(2).check(&json!("ab"), &json!("")).is_ok());
        assert!(Constraint::Len(2).check(&json!("abc"), &json!("")).is_err());
        assert!(Constraint::Max(1.0).check(&json!(true), &json!(false)).is_ok());
    }

    #[test]
    fn test_absent_values_only_checked_for_required() {
        let c = parse("oneof=1 2");
        assert!(c.violations(&json!(""), &json!(""), false).is_empty());
        assert_eq!(c.violations(&json!(""), &json!(""), true).len(), 1);
        let r = parse("required,oneof=1 2");
        assert_eq!(r.violations(&json!(""), &json!(""), false).len(), 1);
    }

    #[test]
    fn test_schema_mirrors_runtime() {
        let mut s = Schema::string();
        parse("oneof=1 2,min=1,max=5").apply(&mut s);
        assert_eq!(s.enum_values, vec![json!("1"), json!("2")]);
        assert_eq!(s.min_length, Some(1));
        assert_eq!(s.max_length, Some(5));
        assert_eq!(s.minimum, None);

        let mut n = Schema::integer();
        parse("oneof=1 2,min=1,max=5").apply(&mut n);
        assert_eq!(n.enum_values, vec![json!(1), json!(2)]);
        assert_eq!(n.minimum, Some(1.0));
        assert_eq!(n.maximum, Some(5.0));

        let mut f = Schema::string();
        parse("min=1.5,max=3.5").apply(&mut f);
        assert_eq!(f.min_length, Some(2));
        assert_eq!(f.max_length, Some(3));

        let mut r = Schema::number();
        parse("min=1.5").apply(&mut r);
        assert_eq!(r.minimum, Some(1.5));

        let mut a = Schema::array(Schema::string());
        parse("len=2,oneof=a b").apply(&mut a);
        assert_eq!(a.min_items, Some(2));
        assert_eq!(a.max_items, Some(2));
        assert_eq!(a.items.as_ref().unwrap().enum_values, vec![json!("a"), json!("b")]);
    }
}
