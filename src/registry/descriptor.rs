//! Runtime schema descriptors.
//!
//! # Responsibilities
//! - Describe services, sub-services, methods and fields discovered at runtime
//! - Hand out fresh message instances for a method's input, output and envelope
//!
//! # Design Decisions
//! - Immutable once built; shared through `Arc`
//! - Message schemas come from a single descriptor pool per service so that
//!   nested types (the envelope's `data` field) resolve to the same descriptor

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use prost_reflect::{DynamicMessage, Kind, MessageDescriptor};

use crate::routing::RouteTable;

/// Coercion class of a field, driving query-string transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int32,
    Int64,
    String,
    Bool,
    Message,
    Other,
}

impl ScalarType {
    /// True for the kinds parsed as integers from query parameters.
    pub fn is_integer(self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::Int64)
    }
}

impl From<&Kind> for ScalarType {
    fn from(kind: &Kind) -> Self {
        match kind {
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => ScalarType::Int32,
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => ScalarType::Int64,
            Kind::String => ScalarType::String,
            Kind::Bool => ScalarType::Bool,
            Kind::Message(_) => ScalarType::Message,
            _ => ScalarType::Other,
        }
    }
}

/// A single field of a message schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub json_name: String,
    pub scalar: ScalarType,
}

impl From<prost_reflect::FieldDescriptor> for FieldDescriptor {
    fn from(field: prost_reflect::FieldDescriptor) -> Self {
        // Repeated and map fields never take a single query value.
        let scalar = if field.is_list() || field.is_map() {
            ScalarType::Other
        } else {
            ScalarType::from(&field.kind())
        };
        Self {
            name: field.name().to_string(),
            json_name: field.json_name().to_string(),
            scalar,
        }
    }
}

fn fields_of(message: &MessageDescriptor) -> Vec<FieldDescriptor> {
    message.fields().map(FieldDescriptor::from).collect()
}

/// A unary method with its request, response and envelope schemas.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub sub_service: String,
    input: MessageDescriptor,
    output: MessageDescriptor,
    envelope: MessageDescriptor,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        sub_service: impl Into<String>,
        input: MessageDescriptor,
        output: MessageDescriptor,
        envelope: MessageDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            sub_service: sub_service.into(),
            input,
            output,
            envelope,
        }
    }

    pub fn input(&self) -> &MessageDescriptor {
        &self.input
    }

    pub fn output(&self) -> &MessageDescriptor {
        &self.output
    }

    pub fn envelope(&self) -> &MessageDescriptor {
        &self.envelope
    }

    pub fn input_fields(&self) -> Vec<FieldDescriptor> {
        fields_of(&self.input)
    }

    pub fn output_fields(&self) -> Vec<FieldDescriptor> {
        fields_of(&self.output)
    }

    pub fn new_input(&self) -> DynamicMessage {
        DynamicMessage::new(self.input.clone())
    }

    pub fn new_output(&self) -> DynamicMessage {
        DynamicMessage::new(self.output.clone())
    }

    pub fn new_envelope(&self) -> DynamicMessage {
        DynamicMessage::new(self.envelope.clone())
    }
}

/// One protobuf `service` block of a logical service.
#[derive(Debug, Clone, Default)]
pub struct SubServiceDescriptor {
    pub name: String,
    pub methods: HashMap<String, Arc<MethodDescriptor>>,
}

/// Everything the gateway knows about one logical service.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub import_path: PathBuf,
    pub sub_services: HashMap<String, SubServiceDescriptor>,
    pub routes: RouteTable,
}

impl ServiceDescriptor {
    pub fn sub_service(&self, name: &str) -> Option<&SubServiceDescriptor> {
        self.sub_services.get(name)
    }
}
