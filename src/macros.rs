/// Declares an option enum usable as a callable argument.
///
/// ```
/// fngate::choices! {
///     pub enum Role {
///         User => "user",
///         Assistant => "assistant",
///     }
/// }
/// ```
#[macro_export]
macro_rules! choices {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $option:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::Choice for $name {
            fn options() -> &'static [&'static str] {
                &[$($option),+]
            }

            fn from_option(option: &str) -> Option<Self> {
                match option {
                    $($option => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_option(&self) -> &'static str {
                match self {
                    $(Self::$variant => $option),+
                }
            }
        }

        impl $crate::Typed for $name {
            fn wire_type() -> $crate::WireType {
                $crate::WireType::String
            }
        }

        impl $crate::Encode for $name {
            fn encode(self) -> $crate::Value {
                $crate::Value::String($crate::Choice::as_option(&self).to_owned())
            }
        }

        impl $crate::Decode for $name {
            fn decode(value: $crate::Value) -> Result<Self, $crate::TypeMismatch> {
                let choice = match &value {
                    $crate::Value::String(option) => <Self as $crate::Choice>::from_option(option),
                    _ => None,
                };
                choice.ok_or_else(|| $crate::TypeMismatch::new(&value, $crate::WireType::String))
            }
        }

        impl $crate::IntoOutput for $name {
            fn output_type() -> $crate::WireType {
                $crate::WireType::String
            }

            fn into_output(self) -> $crate::Output {
                $crate::Output::Value($crate::Encode::encode(self))
            }
        }
    };
}

/// Implements [`RpcFunction`](crate::RpcFunction) from an async method body.
#[macro_export]
macro_rules! call {
    (
        async fn call(& $self:ident, $domain_ident:ident : $domain_ty:ty) -> $range_ty:ty {
            $($body:tt)*
        }
    ) => {
        type Domain = $domain_ty;
        type Range = $range_ty;

        fn call<'call>(
            &'call $self,
            $domain_ident: $domain_ty,
        ) -> $crate::BoxFuture<'call, $crate::FunctionResult<Self::Range>> {
            let body = async move {
                $($body)*
            };
            Box::pin(body)
        }
    };
}
