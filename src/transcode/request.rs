//! Request payload construction.
//!
//! # Responsibilities
//! - GET: coerce query parameters by field type into a JSON object
//! - Other verbs: take the body as JSON
//! - Deserialize the JSON into a fresh input message, ignoring unknown fields
//!
//! # Design Decisions
//! - Unparseable integer parameters become 0, not an error
//! - Missing non-integer parameters are left at their schema default
//! - No partial message is ever returned

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{Method, Request};
use prost_reflect::{DeserializeOptions, DynamicMessage, MessageDescriptor};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::registry::{MethodDescriptor, ScalarType};

fn options() -> DeserializeOptions {
    DeserializeOptions::new().deny_unknown_fields(false)
}

fn decode_error(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Transcode(e.to_string())
}

/// First value of every query parameter.
fn query_pairs(query: Option<&str>) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            pairs.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
    }
    pairs
}

fn coerce(scalar: ScalarType, raw: Option<&String>) -> Option<Value> {
    match scalar {
        ScalarType::Int32 => Some(Value::from(
            raw.and_then(|v| v.parse::<i32>().ok()).unwrap_or(0),
        )),
        ScalarType::Int64 => Some(Value::from(
            raw.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0),
        )),
        ScalarType::Bool => raw.map(|v| match v.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(v.clone()),
        }),
        _ => raw.map(|v| Value::String(v.clone())),
    }
}

/// Build the type-coerced JSON object for a GET request.
pub fn query_to_json(method: &MethodDescriptor, query: Option<&str>) -> Value {
    let pairs = query_pairs(query);
    let mut params = Map::new();

    for field in method.input_fields() {
        let raw = pairs.get(&field.name).or_else(|| pairs.get(&field.json_name));
        if let Some(value) = coerce(field.scalar, raw) {
            params.insert(field.name, value);
        }
    }

    Value::Object(params)
}

fn from_value(input: &MessageDescriptor, value: Value) -> Result<DynamicMessage, GatewayError> {
    DynamicMessage::deserialize_with_options(input.clone(), value, &options()).map_err(decode_error)
}

/// Build the input message from a query string.
pub fn from_query(method: &MethodDescriptor, query: Option<&str>) -> Result<DynamicMessage, GatewayError> {
    from_value(method.input(), query_to_json(method, query))
}

/// Build the input message from a JSON body.
pub fn from_body(method: &MethodDescriptor, body: &[u8]) -> Result<DynamicMessage, GatewayError> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let message = DynamicMessage::deserialize_with_options(
        method.input().clone(),
        &mut deserializer,
        &options(),
    )
    .map_err(decode_error)?;
    deserializer.end().map_err(decode_error)?;
    Ok(message)
}

/// Build the call payload for `method` from an inbound request.
///
/// `verb` is the route's configured verb; it selects between the query and
/// body branches.
pub async fn build_request(
    method: &MethodDescriptor,
    verb: &Method,
    request: Request<Body>,
    max_body_size: usize,
) -> Result<DynamicMessage, GatewayError> {
    if *verb == Method::GET {
        return from_query(method, request.uri().query());
    }

    let body = axum::body::to_bytes(request.into_body(), max_body_size)
        .await
        .map_err(|e| GatewayError::Transcode(format!("read request body: {e}")))?;
    from_body(method, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support;
    use crate::registry::SchemaRegistry;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn method(name: &str) -> (TempDir, Arc<MethodDescriptor>) {
        let (dir, registry): (TempDir, SchemaRegistry) = test_support::order_registry();
        let service = registry.lookup("order").unwrap();
        let method = service.sub_services["OrderService"].methods[name].clone();
        (dir, method)
    }

    fn field_i64(message: &DynamicMessage, name: &str) -> Option<i64> {
        message.get_field_by_name(name).and_then(|v| v.as_i64())
    }

    #[test]
    fn test_query_integer_field() {
        let (_dir, method) = method("GetOrder");
        let message = from_query(&method, Some("id=5")).unwrap();
        assert_eq!(message.get_field_by_name("id").unwrap().as_i32(), Some(5));
    }

    #[test]
    fn test_non_numeric_integer_is_zero() {
        let (_dir, method) = method("GetOrder");
        let message = from_query(&method, Some("id=five")).unwrap();
        assert_eq!(message.get_field_by_name("id").unwrap().as_i32(), Some(0));

        let message = from_query(&method, None).unwrap();
        assert_eq!(message.get_field_by_name("id").unwrap().as_i32(), Some(0));
    }

    #[test]
    fn test_query_coercion_by_type() {
        let (_dir, method) = method("CreateOrder");
        let json = query_to_json(
            &method,
            Some("item=lamp&quantity=12&express=true&priority=3&extra=1&item=ignored"),
        );
        assert_eq!(
            json,
            serde_json::json!({
                "item": "lamp",
                "quantity": 12,
                "express": true,
                "priority": "3",
            })
        );

        let message = from_query(&method, Some("item=lamp&quantity=x")).unwrap();
        assert_eq!(field_i64(&message, "quantity"), Some(0));
        assert_eq!(
            message.get_field_by_name("item").unwrap().as_str(),
            Some("lamp")
        );
    }

    #[test]
    fn test_body_tolerates_unknown_fields() {
        let (_dir, method) = method("CreateOrder");
        let message = from_body(&method, br#"{"item":"desk","quantity":"7","color":"red"}"#).unwrap();
        assert_eq!(field_i64(&message, "quantity"), Some(7));
    }

    #[test]
    fn test_malformed_body() {
        let (_dir, method) = method("CreateOrder");
        assert!(matches!(
            from_body(&method, b"{not json"),
            Err(GatewayError::Transcode(_))
        ));
        assert!(matches!(
            from_body(&method, b""),
            Err(GatewayError::Transcode(_))
        ));
        assert!(matches!(
            from_body(&method, br#"{"quantity": "many"}"#),
            Err(GatewayError::Transcode(_))
        ));
    }

    #[tokio::test]
    async fn test_build_request_uses_route_verb() {
        let (_dir, method) = method("CreateOrder");
        let request = Request::builder()
            .method("POST")
            .uri("/order/create?item=ignored")
            .body(Body::from(r#"{"item":"chair"}"#))
            .unwrap();

        let message = build_request(&method, &Method::POST, request, 1024).await.unwrap();
        assert_eq!(
            message.get_field_by_name("item").unwrap().as_str(),
            Some("chair")
        );
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let (_dir, method) = method("CreateOrder");
        let request = Request::builder()
            .method("POST")
            .uri("/order/create")
            .body(Body::from(r#"{"item":"a very long item name"}"#))
            .unwrap();

        assert!(matches!(
            build_request(&method, &Method::POST, request, 4).await,
            Err(GatewayError::Transcode(_))
        ));
    }
}
