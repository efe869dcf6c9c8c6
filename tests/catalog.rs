use fngate::{catalog, DispatchError, Dispatcher, Frame, Registry};
use futures::StreamExt;
use std::sync::Arc;

fn dispatcher() -> Dispatcher {
    let mut builder = Registry::builder();
    catalog::register(&mut builder, 4).unwrap();
    Dispatcher::new(Arc::new(builder.build().unwrap()))
}

async fn call(name: &str, args: &[&str]) -> Vec<String> {
    let outputs = dispatcher().call(name, args).await.unwrap();
    outputs.values().into_iter().map(String::from).collect()
}

fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn message_history() {
    let history = call("AppendMessageHistory", &["hi", "user", ""]).await;
    assert_eq!(
        json(&history[0]),
        serde_json::json!([{"role": "user", "content": "hi"}])
    );

    let history = call("AppendMessageHistory", &["hello", "assistant", history[0].as_str()]).await;
    assert_eq!(
        json(&history[0]),
        serde_json::json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"},
        ])
    );

    let unchanged = call("AppendMessageHistory", &["", "system", history[0].as_str()]).await;
    assert_eq!(unchanged, history);

    let err = dispatcher()
        .call("AppendMessageHistory", &["hi", "robot", ""])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnsupportedOption {
            function: "AppendMessageHistory".into(),
            parameter: "role".into(),
            value: "robot".into(),
        }
    );

    let shortened = call("ShortenMessageHistory", &[history[0].as_str(), "1"]).await;
    assert_eq!(
        json(&shortened[0]),
        serde_json::json!([{"role": "assistant", "content": "hello"}])
    );
    let kept = call("ShortenMessageHistory", &[history[0].as_str(), "5"]).await;
    assert_eq!(kept, history);
    assert!(matches!(
        dispatcher()
            .call("ShortenMessageHistory", &[history[0].as_str(), "-1"])
            .await,
        Err(DispatchError::FunctionExecution(_))
    ));
}

#[tokio::test]
async fn final_query() {
    assert_eq!(
        call("BuildFinalQueryForGeneralLLMRequest", &["What is Rust?", ""]).await,
        ["What is Rust?"]
    );
    let examples = r#"[{"text":"Rust is a language."},{"text":"It has a borrow checker."}]"#;
    let expected = concat!(
        "Based on the following examples:\n\n",
        "--- INFO START ---\n",
        "Rust is a language.\n",
        "It has a borrow checker.\n",
        "--- INFO END ---\n\n",
        "What is Rust?\n",
    );
    assert_eq!(
        call("BuildFinalQueryForGeneralLLMRequest", &["What is Rust?", examples]).await,
        [expected]
    );
}

#[tokio::test]
async fn string_helpers() {
    assert_eq!(call("AssignStringToString", &["same"]).await, ["same"]);
    assert_eq!(
        call(
            "InterpolateString",
            &["Hello [[__var.name__]], bye [[__var.name__]] [[__var.other__]]", "name", "Ada"]
        )
        .await,
        ["Hello Ada, bye Ada [[__var.other__]]"]
    );
    assert_eq!(
        call("ExtractJSONStringField", &[r#"{"a":{"b":"deep","n":3}}"#, "a.b"]).await,
        ["deep"]
    );
    assert_eq!(
        call("ExtractJSONStringField", &[r#"{"a":{"b":"deep","n":3}}"#, "a.n"]).await,
        ["3"]
    );
    assert!(matches!(
        dispatcher()
            .call("ExtractJSONStringField", &[r#"{"a":1}"#, "a.b"])
            .await,
        Err(DispatchError::FunctionExecution(_))
    ));
}

#[tokio::test]
async fn db_filters() {
    let keywords = call("CreateKeywordsDbFilter", &[r#"["alpha","beta"]"#, "true"]).await;
    assert_eq!(
        json(&keywords[0]),
        serde_json::json!({"need_all": true, "filter_data": ["alpha", "beta"]})
    );

    let empty = call("CreateKeywordsDbFilter", &["[]", "true"]).await;
    assert_eq!(
        json(&empty[0]),
        serde_json::json!({"need_all": false, "filter_data": []})
    );

    let metadata = call("CreateMetadataDbFilter", &["lang", "string", r#"["en"]"#, "0"]).await;
    let metadata = format!("[{}]", metadata[0]);

    let filters = call(
        "CreateDbFilter",
        &[r#"["g1"]"#, "", "", "", "", keywords[0].as_str(), metadata.as_str()],
    )
    .await;
    let filters = json(&filters[0]);
    assert_eq!(filters["guid_filter"], serde_json::json!(["g1"]));
    assert_eq!(filters["document_id_filter"], serde_json::json!([]));
    assert_eq!(filters["tags_filter"]["filter_data"], serde_json::json!([]));
    assert_eq!(
        filters["keywords_filter"]["filter_data"],
        serde_json::json!(["alpha", "beta"])
    );
    assert_eq!(filters["metadata_filter"][0]["field_name"], "lang");
    assert_eq!(filters["metadata_filter"][0]["need_all"], false);
}

#[tokio::test]
async fn stream_text_chunks_words() {
    let frames: Vec<Frame> = dispatcher()
        .call_streaming("StreamText", &["one two three four five", "2"])
        .await
        .unwrap()
        .collect()
        .await;
    let values: Vec<(i32, bool, &str)> = frames
        .iter()
        .map(|f| (f.counter, f.is_last, f.value.as_str()))
        .collect();
    assert_eq!(
        values,
        [
            (0, false, "one two"),
            (1, false, "three four"),
            (2, false, "five"),
            (3, true, ""),
        ]
    );

    assert!(matches!(
        dispatcher().call_streaming("StreamText", &["text", "0"]).await,
        Err(DispatchError::FunctionExecution(_))
    ));
}
