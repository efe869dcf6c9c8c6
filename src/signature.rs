//! Positional conversion between a callable's native tuples and the
//! registry's ordered values.

use crate::types::{Decode, IntoOutput, Output, TypeMismatch, Typed, Value, WireType};
use std::{iter::Enumerate, vec::IntoIter};
use thiserror::Error;

/// A callable's native parameter list, as a tuple.
pub trait Arguments: Sized + Send + 'static {
    fn wire_types() -> Vec<WireType>;
    fn decode_arguments(values: Vec<Value>) -> Result<Self, ArgumentError>;
}

/// A callable's native result list, as a tuple.
pub trait Outputs: Send + 'static {
    fn wire_types() -> Vec<WireType>;
    fn into_outputs(self) -> Vec<Output>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("argument {position}: {source}")]
    Type {
        position: usize,
        #[source]
        source: TypeMismatch,
    },
}

fn next_argument<T: Decode>(
    values: &mut Enumerate<IntoIter<Value>>,
    expected: usize,
) -> Result<T, ArgumentError> {
    let (position, value) = values.next().ok_or(ArgumentError::Arity {
        expected,
        got: 0,
    })?;
    T::decode(value).map_err(|source| ArgumentError::Type { position, source })
}

macro_rules! impl_tuple {
    ($len:expr; $($name:ident),*) => {
        impl<$($name),*> Arguments for ($($name,)*)
        where
            $($name: Typed + Decode + Send + 'static,)*
        {
            fn wire_types() -> Vec<WireType> {
                vec![$(<$name as Typed>::wire_type()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn decode_arguments(values: Vec<Value>) -> Result<Self, ArgumentError> {
                if values.len() != $len {
                    return Err(ArgumentError::Arity {
                        expected: $len,
                        got: values.len(),
                    });
                }
                let mut values = values.into_iter().enumerate();
                Ok(($(next_argument::<$name>(&mut values, $len)?,)*))
            }
        }

        impl<$($name),*> Outputs for ($($name,)*)
        where
            $($name: IntoOutput + Send + 'static,)*
        {
            fn wire_types() -> Vec<WireType> {
                vec![$(<$name as IntoOutput>::output_type()),*]
            }

            #[allow(non_snake_case)]
            fn into_outputs(self) -> Vec<Output> {
                let ($($name,)*) = self;
                vec![$($name.into_output()),*]
            }
        }
    };
}

impl_tuple!(0;);
impl_tuple!(1; A);
impl_tuple!(2; A, B);
impl_tuple!(3; A, B, C);
impl_tuple!(4; A, B, C, D);
impl_tuple!(5; A, B, C, D, E);
impl_tuple!(6; A, B, C, D, E, F);
impl_tuple!(7; A, B, C, D, E, F, G);
impl_tuple!(8; A, B, C, D, E, F, G, H);
impl_tuple!(9; A, B, C, D, E, F, G, H, I);
impl_tuple!(10; A, B, C, D, E, F, G, H, I, J);
impl_tuple!(11; A, B, C, D, E, F, G, H, I, J, K);
impl_tuple!(12; A, B, C, D, E, F, G, H, I, J, K, L);
