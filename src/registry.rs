use crate::{
    calling::{CallableRpcFunction, DynamicRpcFunction, FnRpcFunction, RpcFunction},
    error::{DispatchError, FunctionResult},
    signature::{Arguments, Outputs},
    types::{Choice, WireType},
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
};
use thiserror::Error;

/// The public contract of one registered function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub display_name: String,
    pub category: String,
    pub inputs: Vec<ParameterDescriptor>,
    pub outputs: Vec<ParameterDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub wire_type: WireType,
    /// Legal values, when the input is an option set.
    pub options: Vec<String>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            wire_type,
            options: Vec::new(),
        }
    }
}

impl FunctionDescriptor {
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: FunctionDescriptor {
                name: name.into(),
                description: String::new(),
                display_name: String::new(),
                category: String::new(),
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
        }
    }

    pub fn input(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Position of the (single) stream output.
    pub fn stream_output(&self) -> Option<usize> {
        self.outputs.iter().position(|p| p.wire_type.is_stream())
    }
}

#[must_use]
pub struct DescriptorBuilder {
    descriptor: FunctionDescriptor,
}

impl DescriptorBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.descriptor.display_name = display_name.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.descriptor.category = category.into();
        self
    }

    pub fn input(mut self, name: impl Into<String>, wire_type: WireType) -> Self {
        self.descriptor
            .inputs
            .push(ParameterDescriptor::new(name, wire_type));
        self
    }

    /// A string input restricted to `options`.
    pub fn input_options<I>(mut self, name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut parameter = ParameterDescriptor::new(name, WireType::String);
        parameter.options = options.into_iter().map(Into::into).collect();
        self.descriptor.inputs.push(parameter);
        self
    }

    /// A string input whose options are those of `C`.
    pub fn input_choice<C: Choice>(self, name: impl Into<String>) -> Self {
        self.input_options(name, C::options().iter().copied())
    }

    pub fn output(mut self, name: impl Into<String>, wire_type: WireType) -> Self {
        self.descriptor
            .outputs
            .push(ParameterDescriptor::new(name, wire_type));
        self
    }

    pub fn build(self) -> FunctionDescriptor {
        self.descriptor
    }
}

impl From<DescriptorBuilder> for FunctionDescriptor {
    fn from(builder: DescriptorBuilder) -> Self {
        builder.build()
    }
}

/// Maps an incoming option to the canonical option the callable expects,
/// or `None` when it is not supported.
pub type OptionConverter = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("function {0} is registered twice")]
    DuplicateName(String),

    #[error("function {function}: {side} declares {declared} parameters, callable takes {native}")]
    ArityMismatch {
        function: String,
        side: &'static str,
        declared: usize,
        native: usize,
    },

    #[error("function {function}: {parameter} declared as {declared}, callable uses {native}")]
    SchemaMismatch {
        function: String,
        parameter: String,
        declared: WireType,
        native: WireType,
    },

    #[error("function {0} declares more than one stream output")]
    MultipleStreamOutputs(String),

    #[error("function {function}: input {parameter} cannot be a stream")]
    StreamInput { function: String, parameter: String },

    #[error("option converter for {function}.{parameter} has no matching option input")]
    OrphanConverter { function: String, parameter: String },
}

pub(crate) struct RegisteredFunction {
    pub(crate) descriptor: FunctionDescriptor,
    pub(crate) function: Arc<dyn DynamicRpcFunction>,
    /// Parallel to `descriptor.inputs`.
    pub(crate) converters: Vec<Option<OptionConverter>>,
    pub(crate) stream_output: Option<usize>,
}

/// Collects functions at startup. [`build`](Self::build) freezes them into a
/// [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    functions: BTreeMap<String, RegisteredFunction>,
    converters: HashMap<(String, String), OptionConverter>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<RFn>(
        &mut self,
        descriptor: impl Into<FunctionDescriptor>,
        rpc_function: RFn,
    ) -> Result<&mut Self, RegistrationError>
    where
        RFn: RpcFunction,
    {
        let descriptor = descriptor.into();
        let function = CallableRpcFunction::new(rpc_function);
        check_signature(&descriptor, &function)?;

        if self.functions.contains_key(&descriptor.name) {
            return Err(RegistrationError::DuplicateName(descriptor.name));
        }
        let converters = descriptor
            .inputs
            .iter()
            .map(|p| (!p.options.is_empty()).then(|| membership(&p.options)))
            .collect();
        let entry = RegisteredFunction {
            stream_output: descriptor.stream_output(),
            converters,
            function: Arc::new(function),
            descriptor,
        };
        log::debug!("registered function {}", entry.descriptor.name);
        self.functions.insert(entry.descriptor.name.clone(), entry);
        Ok(self)
    }

    /// Registers an async closure taking a tuple of arguments and returning a
    /// tuple of results.
    pub fn register_fn<F, Fut, A, R>(
        &mut self,
        descriptor: impl Into<FunctionDescriptor>,
        function: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FunctionResult<R>> + Send + 'static,
        A: Arguments,
        R: Outputs,
    {
        self.register(descriptor, FnRpcFunction::new(function))
    }

    /// Replaces the default option check for one input of one function.
    pub fn option_converter<C>(
        &mut self,
        function: impl Into<String>,
        parameter: impl Into<String>,
        converter: C,
    ) -> &mut Self
    where
        C: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.converters
            .insert((function.into(), parameter.into()), Arc::new(converter));
        self
    }

    pub fn build(mut self) -> Result<Registry, RegistrationError> {
        for ((function, parameter), converter) in self.converters.drain() {
            let slot = self.functions.get_mut(&function).and_then(|entry| {
                let position = entry
                    .descriptor
                    .inputs
                    .iter()
                    .position(|p| p.name == parameter && !p.options.is_empty())?;
                entry.converters.get_mut(position)
            });
            match slot {
                Some(slot) => *slot = Some(converter),
                None => return Err(RegistrationError::OrphanConverter { function, parameter }),
            }
        }
        log::info!("registry ready with {} functions", self.functions.len());
        Ok(Registry {
            functions: self.functions,
        })
    }
}

fn membership(options: &[String]) -> OptionConverter {
    let options = options.to_vec();
    Arc::new(move |value| options.iter().find(|o| *o == value).cloned())
}

fn check_signature(
    descriptor: &FunctionDescriptor,
    function: &dyn DynamicRpcFunction,
) -> Result<(), RegistrationError> {
    let name = &descriptor.name;
    let sides = [
        ("inputs", &descriptor.inputs, function.domain()),
        ("outputs", &descriptor.outputs, function.range()),
    ];
    for (side, declared, native) in sides {
        if declared.len() != native.len() {
            return Err(RegistrationError::ArityMismatch {
                function: name.clone(),
                side,
                declared: declared.len(),
                native: native.len(),
            });
        }
        for (parameter, native) in declared.iter().zip(native) {
            if parameter.wire_type != native {
                return Err(RegistrationError::SchemaMismatch {
                    function: name.clone(),
                    parameter: parameter.name.clone(),
                    declared: parameter.wire_type.clone(),
                    native,
                });
            }
        }
    }

    if let Some(parameter) = descriptor.inputs.iter().find(|p| p.wire_type.is_stream()) {
        return Err(RegistrationError::StreamInput {
            function: name.clone(),
            parameter: parameter.name.clone(),
        });
    }
    let streams = descriptor
        .outputs
        .iter()
        .filter(|p| p.wire_type.is_stream())
        .count();
    if streams > 1 {
        return Err(RegistrationError::MultipleStreamOutputs(name.clone()));
    }
    Ok(())
}

/// Immutable name → function table, shared by every call.
pub struct Registry {
    functions: BTreeMap<String, RegisteredFunction>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<&RegisteredFunction, DispatchError> {
        self.functions
            .get(name)
            .ok_or_else(|| DispatchError::FunctionNotFound(name.to_owned()))
    }

    pub fn descriptor(&self, name: &str) -> Result<&FunctionDescriptor, DispatchError> {
        self.lookup(name).map(|entry| &entry.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Every descriptor, ordered by name.
    pub fn list(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values().map(|entry| &entry.descriptor)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
