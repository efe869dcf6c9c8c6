pub mod client;
pub mod server;

use crate::{
    dispatcher::{CallOutputs, Frame},
    registry::{FunctionDescriptor, ParameterDescriptor},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputDefinition {
    pub name: String,
    /// Coarse type: `string`, `number`, `boolean` or `json`.
    #[serde(rename = "type")]
    pub simple_type: String,
    pub wire_type: String,
    pub options: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub simple_type: String,
    pub wire_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub display_name: String,
    pub category: String,
    pub input: Vec<InputDefinition>,
    pub output: Vec<OutputDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFunctionsResponse {
    pub functions: BTreeMap<String, FunctionDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionInput {
    pub name: String,
    /// Informational; the server decodes with the registered type.
    pub wire_type: String,
    pub value: String,
}

impl FunctionInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wire_type: String::new(),
            value: value.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionInputs {
    pub name: String,
    pub inputs: Vec<FunctionInput>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionOutput {
    pub name: String,
    pub wire_type: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionOutputs {
    pub name: String,
    pub outputs: Vec<FunctionOutput>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamOutput {
    pub message_counter: i32,
    pub is_last: bool,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) enum Request {
    Ping,
    ListFunctions,
    RunFunction(FunctionInputs),
    StreamFunction(FunctionInputs),
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) enum Response {
    Pong,
    Functions(ListFunctionsResponse),
    Outputs(FunctionOutputs),
    Frame(StreamOutput),
    Error(String),
}

impl From<&ParameterDescriptor> for InputDefinition {
    fn from(parameter: &ParameterDescriptor) -> Self {
        Self {
            name: parameter.name.clone(),
            simple_type: parameter.wire_type.simple_type().to_owned(),
            wire_type: parameter.wire_type.to_string(),
            options: parameter.options.clone(),
        }
    }
}

impl From<&ParameterDescriptor> for OutputDefinition {
    fn from(parameter: &ParameterDescriptor) -> Self {
        Self {
            name: parameter.name.clone(),
            simple_type: parameter.wire_type.simple_type().to_owned(),
            wire_type: parameter.wire_type.to_string(),
        }
    }
}

impl From<&FunctionDescriptor> for FunctionDefinition {
    fn from(descriptor: &FunctionDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            display_name: descriptor.display_name.clone(),
            category: descriptor.category.clone(),
            input: descriptor.inputs.iter().map(Into::into).collect(),
            output: descriptor.outputs.iter().map(Into::into).collect(),
        }
    }
}

impl<'a> FromIterator<&'a FunctionDescriptor> for ListFunctionsResponse {
    fn from_iter<I: IntoIterator<Item = &'a FunctionDescriptor>>(descriptors: I) -> Self {
        let functions = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), FunctionDefinition::from(d)))
            .collect();
        Self { functions }
    }
}

impl From<CallOutputs> for FunctionOutputs {
    fn from(call: CallOutputs) -> Self {
        Self {
            name: call.name,
            outputs: call
                .outputs
                .into_iter()
                .map(|o| FunctionOutput {
                    name: o.name,
                    wire_type: o.wire_type.to_string(),
                    value: o.value,
                })
                .collect(),
        }
    }
}

impl From<Frame> for StreamOutput {
    fn from(frame: Frame) -> Self {
        Self {
            message_counter: frame.counter,
            is_last: frame.is_last,
            value: frame.value,
        }
    }
}
