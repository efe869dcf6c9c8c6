//! Built-in functions that need no external service.

use crate::{
    domain::{DbArrayFilter, DbFilters, DbJsonFilter, DbResponse, HistoricMessage},
    error::{FunctionError, FunctionResult},
    registry::{FunctionDescriptor, RegistrationError, RegistryBuilder},
    stream::ValueStream,
    types::{Choice, DomainType, WireType},
};

crate::choices! {
    /// Author of a conversation turn.
    pub enum Role {
        User => "user",
        Assistant => "assistant",
        System => "system",
    }
}

fn history_type() -> WireType {
    WireType::list(WireType::Struct(DomainType::HistoricMessage))
}

fn strings() -> WireType {
    WireType::list(WireType::String)
}

pub fn register(
    builder: &mut RegistryBuilder,
    stream_buffer: usize,
) -> Result<(), RegistrationError> {
    builder
        .register_fn(
            FunctionDescriptor::builder("AppendMessageHistory")
                .display_name("Append Message History")
                .category("llm_handler")
                .description("Appends a new message to the conversation history.")
                .input("newMessage", WireType::String)
                .input_choice::<Role>("role")
                .input("history", history_type())
                .output("updatedHistory", history_type()),
            append_message_history,
        )?
        .register_fn(
            FunctionDescriptor::builder("ShortenMessageHistory")
                .display_name("Shorten History")
                .category("llm_handler")
                .description("Keeps only the most recent messages of the history.")
                .input("history", history_type())
                .input("maxLength", WireType::Int)
                .output("updatedHistory", history_type()),
            shorten_message_history,
        )?
        .register_fn(
            FunctionDescriptor::builder("BuildFinalQueryForGeneralLLMRequest")
                .display_name("Final Query (General LLM Request)")
                .category("llm_handler")
                .description("Prefixes a request with the knowledge-db examples to base it on.")
                .input("request", WireType::String)
                .input(
                    "knowledgedbResponse",
                    WireType::list(WireType::Struct(DomainType::DbResponse)),
                )
                .output("finalQuery", WireType::String),
            build_final_query,
        )?
        .register_fn(
            FunctionDescriptor::builder("AssignStringToString")
                .display_name("Assign String to String")
                .category("generic")
                .input("inputString", WireType::String)
                .output("outputString", WireType::String),
            |(input,): (String,)| async move { Ok((input,)) },
        )?
        .register_fn(
            FunctionDescriptor::builder("InterpolateString")
                .display_name("Interpolate String")
                .category("generic")
                .description("Replaces every [[__var.key__]] placeholder with a value.")
                .input("input", WireType::String)
                .input("key", WireType::String)
                .input("value", WireType::String)
                .output("output", WireType::String),
            interpolate_string,
        )?
        .register_fn(
            FunctionDescriptor::builder("ExtractJSONStringField")
                .display_name("Extract JSON String Field")
                .category("generic")
                .description("Extracts a field from a JSON document by dot-separated key path.")
                .input("jsonStr", WireType::String)
                .input("keyPath", WireType::String)
                .output("value", WireType::String),
            extract_json_string_field,
        )?
        .register_fn(
            FunctionDescriptor::builder("CreateKeywordsDbFilter")
                .display_name("Create Keywords Filter")
                .category("knowledge_db")
                .input("keywords", strings())
                .input("needAll", WireType::Bool)
                .output("databaseFilter", WireType::Struct(DomainType::DbArrayFilter)),
            create_keywords_db_filter,
        )?
        .register_fn(
            FunctionDescriptor::builder("CreateMetadataDbFilter")
                .display_name("Create Metadata Filter")
                .category("knowledge_db")
                .input("fieldName", WireType::String)
                .input("fieldType", WireType::String)
                .input("filterData", strings())
                .input("needAll", WireType::Bool)
                .output("databaseFilter", WireType::Struct(DomainType::DbJsonFilter)),
            create_metadata_db_filter,
        )?
        .register_fn(
            FunctionDescriptor::builder("CreateDbFilter")
                .display_name("Create Filter")
                .category("knowledge_db")
                .input("guid", strings())
                .input("documentId", strings())
                .input("documentName", strings())
                .input("level", strings())
                .input("tags", WireType::Struct(DomainType::DbArrayFilter))
                .input("keywords", WireType::Struct(DomainType::DbArrayFilter))
                .input(
                    "metadata",
                    WireType::list(WireType::Struct(DomainType::DbJsonFilter)),
                )
                .output("databaseFilter", WireType::Struct(DomainType::DbFilters)),
            create_db_filter,
        )?
        .register_fn(
            FunctionDescriptor::builder("StreamText")
                .display_name("Stream Text")
                .category("generic")
                .description("Streams the words of a text in groups of chunkSize.")
                .input("text", WireType::String)
                .input("chunkSize", WireType::Int)
                .output("stream", WireType::Stream),
            move |(text, chunk_size): (String, i64)| {
                stream_text(text, chunk_size, stream_buffer)
            },
        )?;
    Ok(())
}

async fn append_message_history(
    (new_message, role, mut history): (String, Role, Vec<HistoricMessage>),
) -> FunctionResult<(Vec<HistoricMessage>,)> {
    if !new_message.is_empty() {
        history.push(HistoricMessage::new(role.as_option(), new_message));
    }
    Ok((history,))
}

async fn shorten_message_history(
    (mut history, max_length): (Vec<HistoricMessage>, i64),
) -> FunctionResult<(Vec<HistoricMessage>,)> {
    let max_length = usize::try_from(max_length)
        .map_err(|_| FunctionError::new(format!("invalid maxLength {max_length}")))?;
    if history.len() > max_length {
        history.drain(..history.len() - max_length);
    }
    Ok((history,))
}

async fn build_final_query(
    (request, examples): (String, Vec<DbResponse>),
) -> FunctionResult<(String,)> {
    if examples.is_empty() {
        return Ok((request,));
    }
    let mut query = String::from("Based on the following examples:\n\n--- INFO START ---\n");
    for example in &examples {
        query.push_str(&example.text);
        query.push('\n');
    }
    query.push_str("--- INFO END ---\n\n");
    query.push_str(&request);
    query.push('\n');
    Ok((query,))
}

async fn interpolate_string(
    (input, key, value): (String, String, String),
) -> FunctionResult<(String,)> {
    let placeholder = format!("[[__var.{key}__]]");
    Ok((input.replace(&placeholder, &value),))
}

async fn extract_json_string_field(
    (json, key_path): (String, String),
) -> FunctionResult<(String,)> {
    let document: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| FunctionError::new(format!("invalid JSON: {e}")))?;
    let mut current = &document;
    for key in key_path.split('.') {
        current = current
            .as_object()
            .ok_or_else(|| FunctionError::new(format!("expected an object at key '{key}'")))?
            .get(key)
            .ok_or_else(|| FunctionError::new(format!("key '{key}' not found")))?;
    }
    let value = match current {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok((value,))
}

/// An empty keyword list yields the empty filter, whatever `needAll` says.
async fn create_keywords_db_filter(
    (filter_data, need_all): (Vec<String>, bool),
) -> FunctionResult<(DbArrayFilter,)> {
    if filter_data.is_empty() {
        return Ok((DbArrayFilter::default(),));
    }
    Ok((DbArrayFilter {
        need_all,
        filter_data,
    },))
}

async fn create_metadata_db_filter(
    (field_name, field_type, filter_data, need_all): (String, String, Vec<String>, bool),
) -> FunctionResult<(DbJsonFilter,)> {
    Ok((DbJsonFilter {
        field_name,
        field_type,
        filter_data,
        need_all,
    },))
}

#[allow(clippy::type_complexity)]
async fn create_db_filter(
    (guid, document_id, document_name, level, tags, keywords, metadata): (
        Vec<String>,
        Vec<String>,
        Vec<String>,
        Vec<String>,
        DbArrayFilter,
        DbArrayFilter,
        Vec<DbJsonFilter>,
    ),
) -> FunctionResult<(DbFilters,)> {
    let mut filters = DbFilters {
        guid_filter: guid,
        document_id_filter: document_id,
        document_name_filter: document_name,
        level_filter: level,
        metadata_filter: metadata,
        ..Default::default()
    };
    if !tags.filter_data.is_empty() {
        filters.tags_filter = tags;
    }
    if !keywords.filter_data.is_empty() {
        filters.keywords_filter = keywords;
    }
    Ok((filters,))
}

async fn stream_text(
    text: String,
    chunk_size: i64,
    buffer: usize,
) -> FunctionResult<(ValueStream,)> {
    let chunk_size = usize::try_from(chunk_size)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| FunctionError::new(format!("invalid chunkSize {chunk_size}")))?;
    let (sender, stream) = ValueStream::channel(buffer);
    tokio::spawn(async move {
        let words: Vec<&str> = text.split_whitespace().collect();
        for chunk in words.chunks(chunk_size) {
            if sender.send(chunk.join(" ")).await.is_err() {
                log::debug!("StreamText consumer went away");
                return;
            }
        }
    });
    Ok((stream,))
}
