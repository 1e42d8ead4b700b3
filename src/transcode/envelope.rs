//! Response envelopes.
//!
//! # Responsibilities
//! - Define a `{code, message, data}` wrapper schema per method output type
//! - Instantiate and populate envelopes after invocation
//! - Serialize envelopes as JSON
//!
//! # Design Decisions
//! - Wrapper schemas are defined once at schema load time in a synthetic file
//!   added to the service's descriptor pool; dispatch only instantiates them
//! - Invocation failure is a payload, not a transport error

use std::collections::BTreeSet;

use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, SerializeOptions, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

use crate::error::GatewayError;
use crate::registry::MethodDescriptor;

/// Status code carried by an envelope whose invocation failed.
pub const INVOCATION_FAILED: i32 = 1;

const PACKAGE: &str = "gateway.envelope";
const CODE: &str = "code";
const MESSAGE: &str = "message";
const DATA: &str = "data";

/// Fully-qualified envelope message name for an output type.
pub fn envelope_name(output: &MessageDescriptor) -> String {
    format!("{PACKAGE}.{}", local_name(output))
}

/// Flattens the output's full name into one identifier: `.` becomes `_` and
/// `_` becomes `_1`. Identifier segments never start with a digit, so distinct
/// full names never flatten to the same envelope.
fn local_name(output: &MessageDescriptor) -> String {
    let mut name = String::from("Envelope_");
    for c in output.full_name().chars() {
        match c {
            '.' => name.push('_'),
            '_' => name.push_str("_1"),
            c => name.push(c),
        }
    }
    name
}

fn field(name: &str, number: i32, kind: Type, type_name: Option<String>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        json_name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        type_name,
        ..Default::default()
    }
}

/// Build the synthetic file declaring one envelope per output type.
pub fn envelope_file(service: &str, outputs: &[MessageDescriptor]) -> FileDescriptorProto {
    let dependency: BTreeSet<String> = outputs
        .iter()
        .map(|output| output.parent_file().name().to_string())
        .collect();

    let message_type = outputs
        .iter()
        .map(|output| DescriptorProto {
            name: Some(local_name(output)),
            field: vec![
                field(CODE, 1, Type::Int32, None),
                field(MESSAGE, 2, Type::String, None),
                field(
                    DATA,
                    3,
                    Type::Message,
                    Some(format!(".{}", output.full_name())),
                ),
            ],
            ..Default::default()
        })
        .collect();

    FileDescriptorProto {
        name: Some(format!("gateway/envelope/{service}.proto")),
        package: Some(PACKAGE.to_string()),
        dependency: dependency.into_iter().collect(),
        message_type,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Add envelope schemas for `outputs` to `pool`.
pub fn define_envelopes(
    pool: &mut DescriptorPool,
    service: &str,
    outputs: &[MessageDescriptor],
) -> Result<(), String> {
    if outputs.is_empty() {
        return Ok(());
    }
    pool.add_file_descriptor_proto(envelope_file(service, outputs))
        .map_err(|e| e.to_string())
}

/// A fresh envelope plus the empty output slot invocation writes into.
pub fn build_envelope(method: &MethodDescriptor) -> (DynamicMessage, DynamicMessage) {
    (method.new_envelope(), method.new_output())
}

/// Store a successful invocation's output.
pub fn set_data(envelope: &mut DynamicMessage, output: DynamicMessage) -> Result<(), GatewayError> {
    envelope
        .try_set_field_by_name(DATA, Value::Message(output))
        .map_err(|e| GatewayError::Transcode(format!("populate envelope: {e}")))
}

/// Record an invocation failure; `data` stays unset.
pub fn set_failure(envelope: &mut DynamicMessage, text: &str) -> Result<(), GatewayError> {
    envelope
        .try_set_field_by_name(CODE, Value::I32(INVOCATION_FAILED))
        .and_then(|_| envelope.try_set_field_by_name(MESSAGE, Value::String(text.to_string())))
        .map_err(|e| GatewayError::Transcode(format!("populate envelope: {e}")))
}

/// Serialize an envelope as JSON with proto field names and default values.
pub fn to_json(envelope: &DynamicMessage) -> Result<String, GatewayError> {
    let options = SerializeOptions::new()
        .skip_default_fields(false)
        .use_proto_field_name(true);
    let mut json = envelope
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|e| GatewayError::Transcode(format!("encode response: {e}")))?;

    if !envelope.has_field_by_name(DATA) {
        if let Some(object) = json.as_object_mut() {
            object.remove(DATA);
        }
    }

    serde_json::to_string(&json).map_err(|e| GatewayError::Transcode(format!("encode response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support;

    #[test]
    fn test_envelope_wraps_output_type() {
        let (_dir, registry) = test_support::order_registry();
        let service = registry.lookup("order").unwrap();
        let method = &service.sub_services["OrderService"].methods["GetOrder"];

        let envelope = method.envelope();
        assert_eq!(envelope.full_name(), "gateway.envelope.Envelope_order_OrderReply");
        let data = envelope.get_field_by_name("data").unwrap();
        assert_eq!(data.kind().as_message(), Some(method.output()));
    }

    #[test]
    fn test_success_envelope_json() {
        let (_dir, registry) = test_support::order_registry();
        let service = registry.lookup("order").unwrap();
        let method = &service.sub_services["OrderService"].methods["GetOrder"];

        let (mut envelope, mut output) = build_envelope(method);
        output.set_field_by_name("id", Value::I32(5));
        output.set_field_by_name("item", Value::String("widget".into()));
        set_data(&mut envelope, output).unwrap();

        let json: serde_json::Value = serde_json::from_str(&to_json(&envelope).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": 0,
                "message": "",
                "data": { "id": 5, "item": "widget" }
            })
        );
    }

    #[test]
    fn test_failure_envelope_omits_data() {
        let (_dir, registry) = test_support::order_registry();
        let service = registry.lookup("order").unwrap();
        let method = &service.sub_services["OrderService"].methods["GetOrder"];

        let (mut envelope, _output) = build_envelope(method);
        set_failure(&mut envelope, "rpc error: code = Internal desc = boom").unwrap();

        let json: serde_json::Value = serde_json::from_str(&to_json(&envelope).unwrap()).unwrap();
        assert_eq!(json["code"], INVOCATION_FAILED);
        assert_eq!(json["message"], "rpc error: code = Internal desc = boom");
        assert!(json.get("data").is_none());
    }
}
