use crate::{
    error::{FunctionError, FunctionResult},
    signature::{ArgumentError, Arguments, Outputs},
    types::{Output, Value, WireType},
};
use futures::{future::BoxFuture, FutureExt};
use std::{any::Any, future::Future, marker::PhantomData, panic::AssertUnwindSafe};
use thiserror::Error;

/// A function that can be placed in a [`Registry`](crate::Registry).
///
/// `Domain` and `Range` are tuples whose elements line up with the declared
/// inputs and outputs. Plain async closures can be registered through
/// [`FnRpcFunction`] instead.
pub trait RpcFunction: Send + Sync + 'static {
    type Domain: Arguments;
    type Range: Outputs;

    fn call(&self, args: Self::Domain) -> BoxFuture<'_, FunctionResult<Self::Range>>;
}

/// Adapts an async closure `Fn(Args) -> Future<Output = FunctionResult<Outputs>>`.
pub struct FnRpcFunction<F, A, R> {
    function: F,
    _signature: PhantomData<fn(A) -> R>,
}

impl<F, A, R> FnRpcFunction<F, A, R> {
    pub fn new(function: F) -> Self {
        Self {
            function,
            _signature: PhantomData,
        }
    }
}

impl<F, Fut, A, R> RpcFunction for FnRpcFunction<F, A, R>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FunctionResult<R>> + Send + 'static,
    A: Arguments,
    R: Outputs,
{
    type Domain = A;
    type Range = R;

    fn call(&self, args: A) -> BoxFuture<'_, FunctionResult<R>> {
        Box::pin((self.function)(args))
    }
}

#[derive(Debug, Error)]
pub(crate) enum CallError {
    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error(transparent)]
    Execution(#[from] FunctionError),
}

pub(crate) struct CallableRpcFunction<RFn> {
    rpc_function: RFn,
}

impl<RFn> CallableRpcFunction<RFn>
where
    RFn: RpcFunction,
{
    pub(crate) fn new(rpc_function: RFn) -> Self {
        Self { rpc_function }
    }

    async fn call(&self, args: Vec<Value>) -> Result<Vec<Output>, CallError> {
        let decoded_args = RFn::Domain::decode_arguments(args)?;
        let retval = AssertUnwindSafe(self.rpc_function.call(decoded_args))
            .catch_unwind()
            .await
            .map_err(|panic| FunctionError::new(panic_message(panic.as_ref())))??;
        Ok(retval.into_outputs())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let message = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause");
    format!("panicked: {message}")
}

/// A type-erased version of the main trait, RpcFunction
pub(crate) trait DynamicRpcFunction: Send + Sync {
    fn domain(&self) -> Vec<WireType>;
    fn range(&self) -> Vec<WireType>;
    fn call(&self, args: Vec<Value>) -> BoxFuture<'_, Result<Vec<Output>, CallError>>;
}

impl<RFn> DynamicRpcFunction for CallableRpcFunction<RFn>
where
    RFn: RpcFunction,
{
    fn domain(&self) -> Vec<WireType> {
        RFn::Domain::wire_types()
    }

    fn range(&self) -> Vec<WireType> {
        RFn::Range::wire_types()
    }

    fn call(&self, args: Vec<Value>) -> BoxFuture<'_, Result<Vec<Output>, CallError>> {
        Box::pin(self.call(args))
    }
}
