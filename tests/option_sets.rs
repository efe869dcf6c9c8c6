use fngate::{
    call, choices, Choice, DispatchError, Dispatcher, FunctionDescriptor, FunctionError, Registry,
    RegistrationError, RpcFunction,
};
use std::sync::Arc;

choices! {
    pub enum Answer {
        A => "a",
        B => "b",
        C => "c",
        D => "d",
    }
}

choices! {
    pub enum Verdict {
        Right => "right",
        Wrong => "wrong",
    }
}

pub struct MultipleChoice {
    answer: Answer,
}

impl RpcFunction for MultipleChoice {
    call! {
        async fn call(&self, guess: (Answer,)) -> (Verdict,) {
            let (guess,) = guess;
            if guess == self.answer {
                Ok((Verdict::Right,))
            } else {
                Ok((Verdict::Wrong,))
            }
        }
    }
}

fn descriptor() -> FunctionDescriptor {
    FunctionDescriptor::builder("MultipleChoice")
        .input_choice::<Answer>("guess")
        .output("verdict", fngate::WireType::String)
        .build()
}

fn dispatcher(answer: Answer) -> Dispatcher {
    let mut builder = Registry::builder();
    builder
        .register(descriptor(), MultipleChoice { answer })
        .unwrap();
    Dispatcher::new(Arc::new(builder.build().unwrap()))
}

#[tokio::test]
async fn options_are_advertised_and_enforced() {
    let answer = Answer::from_option(["a", "b", "c", "d"][rand::random::<usize>() % 4]).unwrap();
    let dispatcher = dispatcher(answer);

    let guess = dispatcher.registry().descriptor("MultipleChoice").unwrap();
    assert_eq!(guess.inputs[0].options, Answer::options());

    let mut rights = 0;
    for option in Answer::options() {
        let outputs = dispatcher.call("MultipleChoice", &[*option]).await.unwrap();
        let verdict = outputs.values()[0];
        assert_eq!(verdict == "right", *option == answer.as_option());
        rights += usize::from(verdict == "right");
    }
    assert_eq!(rights, 1);

    let err = dispatcher.call("MultipleChoice", &["z"]).await.unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnsupportedOption {
            function: "MultipleChoice".into(),
            parameter: "guess".into(),
            value: "z".into(),
        }
    );
}

#[tokio::test]
async fn custom_converter_canonicalizes_input() {
    let mut builder = Registry::builder();
    builder
        .register(descriptor(), MultipleChoice { answer: Answer::B })
        .unwrap()
        .option_converter("MultipleChoice", "guess", |value| {
            let lower = value.to_ascii_lowercase();
            Answer::from_option(&lower).map(|a| a.as_option().to_owned())
        });
    let dispatcher = Dispatcher::new(Arc::new(builder.build().unwrap()));

    let outputs = dispatcher.call("MultipleChoice", &["B"]).await.unwrap();
    assert_eq!(outputs.values(), ["right"]);
    assert!(matches!(
        dispatcher.call("MultipleChoice", &["Q"]).await,
        Err(DispatchError::UnsupportedOption { .. })
    ));
}

#[test]
fn converter_needs_an_option_input() {
    let mut builder = Registry::builder();
    builder
        .register_fn(
            FunctionDescriptor::builder("Echo")
                .input("text", fngate::WireType::String)
                .output("text", fngate::WireType::String),
            |(text,): (String,)| async move { Ok::<_, FunctionError>((text,)) },
        )
        .unwrap()
        .option_converter("Echo", "text", |value| Some(value.to_owned()));
    assert!(matches!(
        builder.build(),
        Err(RegistrationError::OrphanConverter { .. })
    ));
}
