#![deny(missing_docs)]

//! # Parameter Coercion
//!
//! Decodes raw parameter text into typed JSON values according to the
//! parameter's `style` and `explode`, before schema validation.
//!
//! Structural problems (missing `;name=` prefix, odd key/value lists, invalid
//! percent-encoding) are [`ParameterEncodingError`]s. A token that does not
//! parse as the declared scalar type is kept as a string so the schema
//! validator reports the type mismatch with both types named.

use crate::document::{
    AdditionalProperties, Components, ParamLocation, ParamStyle, ParameterSpec, SchemaNode,
    SchemaType,
};
use crate::error::ParameterEncodingError;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Number, Value};

/// Raw parameter input as captured from the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Every occurrence of the parameter, in order (usually one).
    Values(Vec<String>),
    /// Key/value pairs for exploded `form` objects and `deepObject`
    /// (keys already stripped of the `name[...]` wrapper).
    Pairs(Vec<(String, String)>),
}

impl RawValue {
    /// A single raw occurrence.
    pub fn single(value: impl Into<String>) -> Self {
        Self::Values(vec![value.into()])
    }
}

/// Shape of the value a schema describes, after following references.
#[derive(Debug, Clone, Copy)]
enum Shape<'s> {
    Primitive(&'s SchemaNode),
    Array(Option<&'s SchemaNode>),
    Object(&'s SchemaNode),
}

/// Converts raw parameter text to typed values.
#[derive(Debug, Clone, Copy)]
pub struct ParameterCoercer<'d> {
    components: &'d Components,
}

impl<'d> ParameterCoercer<'d> {
    /// Creates a coercer resolving `$ref`s through `components`.
    pub fn new(components: &'d Components) -> Self {
        Self { components }
    }

    /// Decodes `raw` per `spec.style`/`spec.explode` and types it per `spec.schema`.
    pub fn coerce(
        &self,
        spec: &ParameterSpec,
        raw: &RawValue,
    ) -> Result<Value, ParameterEncodingError> {
        let shape = self.shape(&spec.schema);
        let err = |reason: String| ParameterEncodingError::new(&spec.name, reason);
        let decode_tokens = spec.location != ParamLocation::Header;

        let values = match raw {
            RawValue::Pairs(pairs) => {
                return match shape {
                    Shape::Object(schema) => {
                        Ok(self.object_from_pairs(pairs.iter().cloned(), schema))
                    }
                    _ => Err(err("key/value pairs can only encode an object".into())),
                };
            }
            RawValue::Values(values) => values,
        };

        if let Shape::Array(items) = shape {
            let exploded_multi = spec.explode
                && matches!(
                    spec.style,
                    ParamStyle::Form | ParamStyle::SpaceDelimited | ParamStyle::PipeDelimited
                );
            if exploded_multi {
                return values
                    .iter()
                    .map(|v| {
                        decode(v, decode_tokens)
                            .map_err(&err)
                            .map(|token| self.scalar(&token, items))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array);
            }
        }

        let raw = match values.as_slice() {
            [single] => single.as_str(),
            [] => return Err(err("no value supplied".into())),
            many if spec.style == ParamStyle::Simple => {
                // Repeated headers fold into one comma-separated value.
                return self.decode_simple(
                    &many.join(","),
                    shape,
                    spec.explode,
                    decode_tokens,
                    &err,
                );
            }
            many => {
                return Err(err(format!(
                    "expected a single occurrence, got {}",
                    many.len()
                )))
            }
        };

        match spec.style {
            ParamStyle::Simple => self.decode_simple(raw, shape, spec.explode, decode_tokens, &err),
            ParamStyle::Label => {
                let body = raw
                    .strip_prefix('.')
                    .ok_or_else(|| err(format!("label value '{}' must start with '.'", raw)))?;
                let separator = if spec.explode { '.' } else { ',' };
                self.decode_delimited(body, shape, separator, spec.explode, &err)
            }
            ParamStyle::Matrix => self.decode_matrix(&spec.name, raw, shape, spec.explode, &err),
            ParamStyle::Form => self.decode_delimited(raw, shape, ',', false, &err),
            ParamStyle::SpaceDelimited => {
                self.split_array(&raw.replace("%20", " "), shape, ' ', &err)
            }
            ParamStyle::PipeDelimited => self.decode_delimited(raw, shape, '|', false, &err),
            ParamStyle::DeepObject => Err(err(
                "deepObject parameters must be supplied as name[key]=value pairs".into(),
            )),
        }
    }

    /// Types `application/x-www-form-urlencoded` fields against an object schema.
    ///
    /// Repeated keys become arrays when the property is an array.
    pub fn coerce_form_fields(&self, fields: &[(String, String)], schema: &SchemaNode) -> Value {
        let schema = self.components.resolve(schema).unwrap_or(schema);
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in fields {
            match grouped.iter_mut().find(|(k, _)| k == key) {
                Some((_, values)) => values.push(value.clone()),
                None => grouped.push((key.clone(), vec![value.clone()])),
            }
        }

        let mut map = Map::new();
        for (key, values) in grouped {
            let property = schema.properties.get(&key).map(|p| self.shape(p));
            let value = match property {
                Some(Shape::Array(items)) => {
                    Value::Array(values.iter().map(|v| self.scalar(v, items)).collect())
                }
                Some(Shape::Primitive(s)) | Some(Shape::Object(s)) => {
                    self.scalar(values.last().map(String::as_str).unwrap_or_default(), Some(s))
                }
                None => Value::String(values.last().cloned().unwrap_or_default()),
            };
            map.insert(key, value);
        }
        Value::Object(map)
    }

    fn decode_simple(
        &self,
        raw: &str,
        shape: Shape<'_>,
        explode: bool,
        decode_tokens: bool,
        err: &dyn Fn(String) -> ParameterEncodingError,
    ) -> Result<Value, ParameterEncodingError> {
        match shape {
            Shape::Primitive(schema) => {
                let token = decode(raw, decode_tokens).map_err(err)?;
                Ok(self.scalar(&token, Some(schema)))
            }
            Shape::Array(items) => {
                if raw.is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                raw.split(',')
                    .map(|t| {
                        decode(t, decode_tokens)
                            .map_err(err)
                            .map(|token| self.scalar(&token, items))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Shape::Object(schema) => {
                let pairs = if explode {
                    split_assignments(raw, ',', err)?
                } else {
                    split_alternating(raw, ',', err)?
                };
                let pairs = decode_pairs(pairs, decode_tokens).map_err(err)?;
                Ok(self.object_from_pairs(pairs.into_iter(), schema))
            }
        }
    }

    /// Shared by `label`, `form` (non-exploded), `pipeDelimited` and `matrix`.
    fn decode_delimited(
        &self,
        body: &str,
        shape: Shape<'_>,
        separator: char,
        exploded_object: bool,
        err: &dyn Fn(String) -> ParameterEncodingError,
    ) -> Result<Value, ParameterEncodingError> {
        match shape {
            Shape::Primitive(schema) => {
                let token = decode(body, true).map_err(err)?;
                Ok(self.scalar(&token, Some(schema)))
            }
            Shape::Array(_) => self.split_array(body, shape, separator, err),
            Shape::Object(schema) => {
                let pairs = if exploded_object {
                    split_assignments(body, separator, err)?
                } else {
                    split_alternating(body, separator, err)?
                };
                let pairs = decode_pairs(pairs, true).map_err(err)?;
                Ok(self.object_from_pairs(pairs.into_iter(), schema))
            }
        }
    }

    fn decode_matrix(
        &self,
        name: &str,
        raw: &str,
        shape: Shape<'_>,
        explode: bool,
        err: &dyn Fn(String) -> ParameterEncodingError,
    ) -> Result<Value, ParameterEncodingError> {
        let body = raw
            .strip_prefix(';')
            .ok_or_else(|| err(format!("matrix value '{}' must start with ';'", raw)))?;
        let tokens: Vec<&str> = body.split(';').collect();

        match (shape, explode) {
            (Shape::Object(schema), true) => {
                let pairs = tokens
                    .iter()
                    .map(|t| split_assignment(t, err))
                    .collect::<Result<Vec<_>, _>>()?;
                let pairs = decode_pairs(pairs, true).map_err(err)?;
                Ok(self.object_from_pairs(pairs.into_iter(), schema))
            }
            (Shape::Array(items), true) => tokens
                .iter()
                .map(|t| {
                    matrix_value(name, t, err)
                        .and_then(|value| decode(value, true).map_err(err))
                        .map(|token| self.scalar(&token, items))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => {
                let [single] = tokens.as_slice() else {
                    return Err(err(format!(
                        "expected one ';{}=' entry, got {}",
                        name,
                        tokens.len()
                    )));
                };
                let value = matrix_value(name, single, err)?;
                self.decode_delimited(value, shape, ',', false, err)
            }
        }
    }

    fn split_array(
        &self,
        body: &str,
        shape: Shape<'_>,
        separator: char,
        err: &dyn Fn(String) -> ParameterEncodingError,
    ) -> Result<Value, ParameterEncodingError> {
        let items = match shape {
            Shape::Array(items) => items,
            Shape::Primitive(schema) | Shape::Object(schema) => {
                return Ok(self.scalar(&decode(body, true).map_err(err)?, Some(schema)))
            }
        };
        if body.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        body.split(separator)
            .map(|t| {
                decode(t, true)
                    .map_err(err)
                    .map(|token| self.scalar(&token, items))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn object_from_pairs(
        &self,
        pairs: impl Iterator<Item = (String, String)>,
        schema: &SchemaNode,
    ) -> Value {
        let mut map = Map::new();
        for (key, raw) in pairs {
            let property = schema
                .properties
                .get(&key)
                .or(match &schema.additional_properties {
                    AdditionalProperties::Schema(s) => Some(&**s),
                    _ => None,
                });
            let value = self.scalar(&raw, property);
            map.insert(key, value);
        }
        Value::Object(map)
    }

    /// Whether `spec` carries an object (exploded `form` objects arrive as bare keys).
    pub(crate) fn expects_object(&self, spec: &ParameterSpec) -> bool {
        matches!(self.shape(&spec.schema), Shape::Object(_))
    }

    fn shape<'s>(&self, schema: &'s SchemaNode) -> Shape<'s>
    where
        'd: 's,
    {
        let schema = self.components.resolve(schema).unwrap_or(schema);
        match schema.schema_type {
            Some(SchemaType::Array) => Shape::Array(schema.items.as_deref()),
            Some(SchemaType::Object) => Shape::Object(schema),
            _ if !schema.properties.is_empty() => Shape::Object(schema),
            _ => Shape::Primitive(schema),
        }
    }

    /// Types one decoded token; falls back to the raw string.
    fn scalar(&self, token: &str, schema: Option<&SchemaNode>) -> Value {
        let Some(schema) = schema.map(|s| self.components.resolve(s).unwrap_or(s)) else {
            return Value::String(token.to_string());
        };
        if let Some(ty) = schema.schema_type {
            return parse_as(token, ty).unwrap_or_else(|| Value::String(token.to_string()));
        }
        schema
            .one_of
            .iter()
            .chain(&schema.any_of)
            .chain(&schema.all_of)
            .filter_map(|sub| self.components.resolve(sub))
            .filter_map(|sub| sub.schema_type)
            .find_map(|ty| parse_as(token, ty))
            .unwrap_or_else(|| Value::String(token.to_string()))
    }
}

fn parse_as(token: &str, ty: SchemaType) -> Option<Value> {
    match ty {
        SchemaType::String => Some(Value::String(token.to_string())),
        SchemaType::Integer => token
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| token.parse::<u64>().ok().map(Value::from)),
        SchemaType::Number => token
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| token.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)),
        SchemaType::Boolean => match token {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        SchemaType::Null => (token.is_empty() || token == "null").then_some(Value::Null),
        SchemaType::Array | SchemaType::Object => None,
    }
}

fn decode(token: &str, enabled: bool) -> Result<String, String> {
    if !enabled {
        return Ok(token.to_string());
    }
    percent_decode_str(token)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| format!("'{}' is not valid percent-encoded UTF-8", token))
}

fn decode_pairs(pairs: Vec<(&str, &str)>, enabled: bool) -> Result<Vec<(String, String)>, String> {
    pairs
        .into_iter()
        .map(|(k, v)| Ok((decode(k, enabled)?, decode(v, enabled)?)))
        .collect()
}

fn matrix_value<'r>(
    name: &str,
    token: &'r str,
    err: &dyn Fn(String) -> ParameterEncodingError,
) -> Result<&'r str, ParameterEncodingError> {
    if token == name {
        return Ok("");
    }
    token
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| err(format!("matrix entry '{}' must be '{}=<value>'", token, name)))
}

/// `R=100,G=200` style.
fn split_assignments<'r>(
    body: &'r str,
    separator: char,
    err: &dyn Fn(String) -> ParameterEncodingError,
) -> Result<Vec<(&'r str, &'r str)>, ParameterEncodingError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    body.split(separator).map(|t| split_assignment(t, err)).collect()
}

fn split_assignment<'r>(
    token: &'r str,
    err: &dyn Fn(String) -> ParameterEncodingError,
) -> Result<(&'r str, &'r str), ParameterEncodingError> {
    match token.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(err(format!("'{}' is not a key=value entry", token))),
    }
}

/// `R,100,G,200` style.
fn split_alternating<'r>(
    body: &'r str,
    separator: char,
    err: &dyn Fn(String) -> ParameterEncodingError,
) -> Result<Vec<(&'r str, &'r str)>, ParameterEncodingError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let tokens: Vec<&str> = body.split(separator).collect();
    if tokens.len() % 2 != 0 {
        return Err(err(format!(
            "object value '{}' has an odd number of key/value tokens",
            body
        )));
    }
    Ok(tokens.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}
