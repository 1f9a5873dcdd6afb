//! Serialization to and from the Informal Trace Format (ITF): every value is
//! wrapped as `{"#type": T, "#value": v}`, with sets and non-record
//! functions sorted by fingerprint for deterministic output.

use serde_json::{json, Map, Value as Json};

use crate::error::Error;
use crate::state::State;
use crate::value::Value;

/// Renders a single [`Value`] as its ITF JSON representation.
pub fn value_to_itf(v: &Value) -> Json {
    match v {
        Value::Int(n) => wrap("int", json!(n)),
        Value::Bool(b) => wrap("bool", json!(b)),
        Value::Str(s) => wrap("string", json!(s)),
        Value::Tuple(elems) => wrap("tup", Json::Array(elems.iter().map(value_to_itf).collect())),
        Value::Set(elems) => {
            let mut sorted: Vec<&Value> = elems.iter().collect();
            sorted.sort_by_key(|v| v.fingerprint());
            wrap("set", Json::Array(sorted.into_iter().map(value_to_itf).collect()))
        }
        Value::FcnRcd {
            domain,
            range,
            is_record: true,
        } => {
            let mut fields: Vec<(&str, &Value)> = domain
                .iter()
                .zip(range.iter())
                .map(|(d, r)| match d {
                    Value::Str(k) => (k.as_str(), r),
                    _ => unreachable!("record domain is always string-keyed"),
                })
                .collect();
            fields.sort_by_key(|(k, _)| *k);
            let mut obj = Map::with_capacity(fields.len());
            for (k, v) in fields {
                obj.insert(k.to_string(), value_to_itf(v));
            }
            wrap("record", Json::Object(obj))
        }
        Value::FcnRcd {
            domain,
            range,
            is_record: false,
        } => {
            let mut pairs: Vec<(&Value, &Value)> = domain.iter().zip(range.iter()).collect();
            pairs.sort_by_key(|(d, _)| d.fingerprint());
            let entries = pairs
                .into_iter()
                .map(|(d, r)| Json::Array(vec![value_to_itf(d), value_to_itf(r)]))
                .collect();
            wrap("map", Json::Array(entries))
        }
    }
}

fn wrap(ty: &str, value: Json) -> Json {
    json!({ "#type": ty, "#value": value })
}

/// Renders a [`State`]'s unprimed assignments as an ITF state object, with
/// variable names sorted.
pub fn state_to_itf(state: &State) -> Json {
    let mut vars: Vec<(&str, &Value)> = state.assignments().collect();
    vars.sort_by_key(|(name, _)| *name);
    let mut obj = Map::with_capacity(vars.len());
    for (name, v) in vars {
        obj.insert(name.to_string(), value_to_itf(v));
    }
    Json::Object(obj)
}

/// Renders a sequence of states as an ITF `states` array.
pub fn states_to_itf(states: &[State]) -> Json {
    json!({ "states": states.iter().map(state_to_itf).collect::<Vec<_>>() })
}

/// Parses a single ITF-wrapped JSON value back into a [`Value`].
pub fn value_from_itf(json: &Json) -> Result<Value, Error> {
    let obj = json.as_object().ok_or_else(|| Error::ItfDecode {
        message: "expected a `{\"#type\": ..., \"#value\": ...}` object".to_string(),
    })?;
    let ty = obj.get("#type").and_then(Json::as_str).ok_or_else(|| Error::ItfDecode {
        message: "missing `#type`".to_string(),
    })?;
    let value = obj.get("#value").ok_or_else(|| Error::ItfDecode {
        message: "missing `#value`".to_string(),
    })?;

    match ty {
        "int" => value.as_i64().map(Value::Int).ok_or_else(|| Error::ItfDecode {
            message: "`#value` is not an integer".to_string(),
        }),
        "bool" => value.as_bool().map(Value::Bool).ok_or_else(|| Error::ItfDecode {
            message: "`#value` is not a boolean".to_string(),
        }),
        "string" => value
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| Error::ItfDecode {
                message: "`#value` is not a string".to_string(),
            }),
        "set" => {
            let elems = value.as_array().ok_or_else(|| Error::ItfDecode {
                message: "`set` value is not an array".to_string(),
            })?;
            let values = elems.iter().map(value_from_itf).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::set(values))
        }
        "tup" => {
            let elems = value.as_array().ok_or_else(|| Error::ItfDecode {
                message: "`tup` value is not an array".to_string(),
            })?;
            let values = elems.iter().map(value_from_itf).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::tuple(values))
        }
        "map" => {
            let pairs = value.as_array().ok_or_else(|| Error::ItfDecode {
                message: "`map` value is not an array".to_string(),
            })?;
            let mut domain = imbl::Vector::new();
            let mut range = imbl::Vector::new();
            for pair in pairs {
                let pair = pair.as_array().filter(|p| p.len() == 2).ok_or_else(|| Error::ItfDecode {
                    message: "`map` entry is not a 2-element array".to_string(),
                })?;
                domain.push_back(value_from_itf(&pair[0])?);
                range.push_back(value_from_itf(&pair[1])?);
            }
            Ok(Value::function(domain, range))
        }
        "record" => {
            let obj = value.as_object().ok_or_else(|| Error::ItfDecode {
                message: "`record` value is not an object".to_string(),
            })?;
            let fields = obj
                .iter()
                .map(|(k, v)| Ok((k.clone(), value_from_itf(v)?)))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Value::record(fields))
        }
        other => Err(Error::ItfDecode {
            message: format!("unknown `#type` `{other}`"),
        }),
    }
}

/// Parses an ITF state object (plain `{name: itf-value, ...}`, not
/// `#type`-wrapped) back into a [`State`]. The declared variables are taken
/// to be exactly the object's keys, matching the invariant that a valid ITF
/// state always has every declared variable assigned.
pub fn state_from_itf(json: &Json) -> Result<State, Error> {
    let obj = json.as_object().ok_or_else(|| Error::ItfDecode {
        message: "expected a state object".to_string(),
    })?;
    let mut state = State::new(obj.keys().cloned());
    for (name, v) in obj {
        state = state.with_var(name, value_from_itf(v)?);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn int_round_trips() {
        let v = Value::Int(42);
        let j = value_to_itf(&v);
        assert_eq!(j, json!({"#type": "int", "#value": 42}));
        assert_eq!(value_from_itf(&j).unwrap(), v);
    }

    #[test]
    fn record_round_trips_through_itf() {
        let v = Value::record([("b".to_string(), Value::Int(2)), ("a".to_string(), Value::Int(1))]);
        let j = value_to_itf(&v);
        assert_eq!(
            j,
            json!({
                "#type": "record",
                "#value": {"a": {"#type": "int", "#value": 1}, "b": {"#type": "int", "#value": 2}},
            })
        );
        assert_eq!(value_from_itf(&j).unwrap(), v);
    }

    #[test]
    fn set_is_sorted_by_fingerprint() {
        let v = Value::set([Value::Int(3), Value::Int(1), Value::Int(2)]);
        let j = value_to_itf(&v);
        let wrapped = j.as_object().unwrap();
        assert_eq!(wrapped["#type"], "set");
        let round_tripped = value_from_itf(&j).unwrap();
        assert_eq!(round_tripped, v);
    }

    #[test]
    fn state_round_trips_through_itf() {
        let state = State::new(["x".to_string(), "y".to_string()])
            .with_var("x", Value::Int(1))
            .with_var("y", Value::Bool(true));
        let j = state_to_itf(&state);
        let back = state_from_itf(&j).unwrap();
        assert_eq!(back.get("x"), Some(&Value::Int(1)));
        assert_eq!(back.get("y"), Some(&Value::Bool(true)));
    }

    #[test]
    fn malformed_itf_is_rejected() {
        let j = json!({"nope": 1});
        assert!(value_from_itf(&j).is_err());
    }
}
