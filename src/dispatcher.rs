use crate::{
    calling::CallError,
    error::{CallResult, DispatchError},
    marshal,
    registry::{FunctionDescriptor, RegisteredFunction, Registry},
    signature::ArgumentError,
    stream::ValueStream,
    types::{Output, Value, WireType},
};
use futures::{Stream, StreamExt};
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

/// Calls registered functions by name with wire-encoded arguments.
///
/// Cheap to clone; every clone shares the same [`Registry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

/// One encoded result of a unary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputValue {
    pub name: String,
    pub wire_type: WireType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutputs {
    pub name: String,
    pub outputs: Vec<OutputValue>,
}

impl CallOutputs {
    pub fn values(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.value.as_str()).collect()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.registry.list()
    }

    pub async fn call<S: AsRef<str>>(&self, name: &str, args: &[S]) -> CallResult<CallOutputs> {
        let entry = self.registry.lookup(name)?;
        let results = invoke(entry, args).await?;

        let outputs = entry
            .descriptor
            .outputs
            .iter()
            .zip(results)
            .map(|(parameter, result)| -> CallResult<OutputValue> {
                let value = match result {
                    Output::Value(value) => marshal::encode(&value, &parameter.wire_type),
                    // Streams are only delivered through `call_streaming`.
                    Output::Stream(_) => Ok(String::new()),
                }
                .map_err(|source| DispatchError::Output {
                    parameter: parameter.name.clone(),
                    source,
                })?;
                Ok(OutputValue {
                    name: parameter.name.clone(),
                    wire_type: parameter.wire_type.clone(),
                    value,
                })
            })
            .collect::<CallResult<Vec<_>>>()?;

        log::debug!("call {} returned {} outputs", name, outputs.len());
        Ok(CallOutputs {
            name: name.to_owned(),
            outputs,
        })
    }

    pub async fn call_streaming<S: AsRef<str>>(
        &self,
        name: &str,
        args: &[S],
    ) -> CallResult<Frames> {
        let entry = self.registry.lookup(name)?;
        let position = entry.stream_output.ok_or(DispatchError::NoStreamingOutput)?;
        let results = invoke(entry, args).await?;

        match results.into_iter().nth(position) {
            Some(Output::Stream(values)) => {
                log::debug!("call {} streaming", name);
                Ok(Frames::new(values))
            }
            _ => Err(DispatchError::NoStreamingOutput),
        }
    }
}

async fn invoke<S: AsRef<str>>(
    entry: &RegisteredFunction,
    args: &[S],
) -> CallResult<Vec<Output>> {
    let inputs = &entry.descriptor.inputs;
    if inputs.len() != args.len() {
        return Err(DispatchError::ArityMismatch {
            expected: inputs.len(),
            got: args.len(),
        });
    }

    let mut values = Vec::with_capacity(args.len());
    for ((parameter, converter), arg) in inputs.iter().zip(&entry.converters).zip(args) {
        let value = marshal::decode(arg.as_ref(), &parameter.wire_type).map_err(|source| {
            DispatchError::Input {
                parameter: parameter.name.clone(),
                source,
            }
        })?;
        let value = match (converter, value) {
            (Some(convert), Value::String(option)) => match convert(&option) {
                Some(canonical) => Value::String(canonical),
                None => {
                    return Err(DispatchError::UnsupportedOption {
                        function: entry.descriptor.name.clone(),
                        parameter: parameter.name.clone(),
                        value: option,
                    })
                }
            },
            (_, value) => value,
        };
        values.push(value);
    }

    entry.function.call(values).await.map_err(|err| match err {
        CallError::Execution(err) => {
            log::warn!("function {} failed: {}", entry.descriptor.name, err);
            DispatchError::FunctionExecution(err)
        }
        CallError::Arguments(ArgumentError::Type { position, source }) => DispatchError::Input {
            parameter: inputs
                .get(position)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            source: source.into(),
        },
        CallError::Arguments(ArgumentError::Arity { expected, got }) => {
            DispatchError::ArityMismatch { expected, got }
        }
    })
}

/// One message of a streaming call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub counter: i32,
    pub is_last: bool,
    pub value: String,
}

/// Drains a [`ValueStream`] into numbered frames, ending with an empty frame
/// marked `is_last`.
#[derive(Debug)]
pub struct Frames {
    values: ValueStream,
    counter: i32,
    done: bool,
}

impl Frames {
    fn new(values: ValueStream) -> Self {
        Self {
            values,
            counter: 0,
            done: false,
        }
    }
}

impl Stream for Frames {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        if self.done {
            return Poll::Ready(None);
        }
        if self.counter == i32::MAX {
            // No counter left for another value: end here and release the producer.
            log::warn!("stream truncated after {} frames", i32::MAX);
            self.done = true;
            self.values = ValueStream::empty();
            return Poll::Ready(Some(Frame {
                counter: i32::MAX,
                is_last: true,
                value: String::new(),
            }));
        }
        let next = match self.values.poll_next_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(next) => next,
        };
        let counter = self.counter;
        let frame = match next {
            Some(value) => {
                self.counter += 1;
                Frame {
                    counter,
                    is_last: false,
                    value,
                }
            }
            None => {
                self.done = true;
                Frame {
                    counter,
                    is_last: true,
                    value: String::new(),
                }
            }
        };
        Poll::Ready(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_end_when_the_counter_is_exhausted() {
        let frames = Frames {
            values: ValueStream::iter(["a", "b", "c"]),
            counter: i32::MAX - 1,
            done: false,
        };
        let frames: Vec<Frame> = frames.collect().await;
        assert_eq!(
            frames,
            [
                Frame {
                    counter: i32::MAX - 1,
                    is_last: false,
                    value: "a".into(),
                },
                Frame {
                    counter: i32::MAX,
                    is_last: true,
                    value: String::new(),
                },
            ]
        );
    }
}
