pub mod calling;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
mod macros;
pub mod marshal;
pub mod net;
pub mod registry;
pub mod signature;
pub mod stream;
pub mod types;

pub use calling::{FnRpcFunction, RpcFunction};
pub use dispatcher::{CallOutputs, Dispatcher, Frame, Frames, OutputValue};
pub use error::{CallResult, DispatchError, FunctionError, FunctionResult};
pub use futures::future::BoxFuture;
pub use marshal::MarshalError;
pub use net::{client::Client, client::ClientError, server::Server, FunctionInput};
pub use registry::{
    DescriptorBuilder, FunctionDescriptor, ParameterDescriptor, RegistrationError, Registry,
    RegistryBuilder,
};
pub use stream::{StreamClosed, StreamSender, ValueStream};
pub use types::{
    Choice, Decode, DomainType, Encode, IntoOutput, Output, TypeMismatch, Typed, Value, WireType,
};
