//! Tests for the OpenAI adapter over a scripted transport.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{Event, RecordingObserver, ScriptedOpenAi};
use parley::prelude::*;
use parley::provider::openai::OpenAiProvider;

fn provider(transport: &ScriptedOpenAi) -> OpenAiProvider {
    OpenAiProvider::with_transport("gpt-4o", transport.clone())
}

fn chunk(delta: serde_json::Value) -> serde_json::Value {
    json!({"id": "chatcmpl-1", "model": "gpt-4o-2024-08-06", "choices": [{"index": 0, "delta": delta}]})
}

fn tool_call_chunk(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> serde_json::Value {
    let mut function = json!({"arguments": args});
    if let Some(name) = name {
        function["name"] = json!(name);
    }
    let mut call = json!({"index": index, "type": "function", "function": function});
    if let Some(id) = id {
        call["id"] = json!(id);
    }
    chunk(json!({"tool_calls": [call]}))
}

fn finish_chunk(reason: &str) -> serde_json::Value {
    json!({"id": "chatcmpl-1", "choices": [{"index": 0, "delta": {}, "finish_reason": reason}]})
}

fn usage_chunk(prompt: u32, completion: u32) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [],
        "usage": {"prompt_tokens": prompt, "completion_tokens": completion, "total_tokens": prompt + completion}
    })
}

#[tokio::test]
async fn complete_maps_text_tool_calls_and_metadata() {
    let transport = ScriptedOpenAi::completion(json!({
        "id": "chatcmpl-42",
        "model": "gpt-4o-2024-08-06",
        "system_fingerprint": "fp_abc",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Let me check.",
                "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "lookup", "arguments": "{\"q\":1}"}},
                    {"id": "call_2", "type": "function", "function": {"name": "", "arguments": "{}"}},
                    {"id": "call_3", "type": "function", "function": {"name": "convert", "arguments": "{}"}}
                ]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
    }));

    let response = provider(&transport)
        .complete(&CancellationToken::new(), &[Message::user("hi")], &ChatOptions::default())
        .await
        .unwrap();

    assert_eq!(response.message.role(), Role::Assistant);
    assert_eq!(response.text(), "Let me check.");

    let calls: Vec<(usize, &str, &str)> = response
        .tool_calls()
        .iter()
        .map(|c| (c.index(), c.id(), c.name()))
        .collect();
    assert_eq!(calls, vec![(0, "call_1", "lookup"), (2, "call_3", "convert")]);
    assert_eq!(response.tool_calls()[0].arguments(), "{\"q\":1}");

    assert_eq!(response.usage.input_tokens, 12);
    assert_eq!(response.usage.output_tokens, 8);
    assert_eq!(response.usage.total_tokens, 20);
    assert_eq!(
        response.meta,
        ResponseMeta {
            provider: "openai".into(),
            model: "gpt-4o-2024-08-06".into(),
            request_id: Some("chatcmpl-42".into()),
            system_fingerprint: Some("fp_abc".into()),
            stop_reason: Some("tool_calls".into()),
            finish_reason: Some(FinishReason::ToolCalls),
        }
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].stream);
    assert_eq!(requests[0].stream_options, None);
}

#[tokio::test]
async fn complete_maps_reasoning_and_refusal() {
    let transport = ScriptedOpenAi::completion(json!({
        "id": "chatcmpl-7",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": null, "refusal": "I can't help with that.", "reasoning_content": "policy"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 3, "completion_tokens": 4}
    }));

    let response = provider(&transport)
        .complete(&CancellationToken::new(), &[Message::user("hi")], &ChatOptions::default())
        .await
        .unwrap();

    assert_eq!(response.text(), "");
    assert_eq!(response.message.refusal(), Some("I can't help with that."));
    assert_eq!(response.message.reasoning(), Some("policy"));
    assert_eq!(response.usage.total_tokens, 7);
    assert_eq!(response.meta.model, "gpt-4o");
}

#[tokio::test]
async fn complete_without_choices_is_an_empty_response() {
    let transport = ScriptedOpenAi::completion(json!({"id": "chatcmpl-0", "choices": []}));

    let err = provider(&transport)
        .complete(&CancellationToken::new(), &[Message::user("hi")], &ChatOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ParleyError::EmptyResponse { ref provider } if provider == "openai"));
}

#[tokio::test]
async fn transport_errors_pass_through() {
    let transport = ScriptedOpenAi::failing(ParleyError::api(500, "boom"));

    let err = provider(&transport)
        .complete(&CancellationToken::new(), &[Message::user("hi")], &ChatOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ParleyError::Api { status: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn complete_honours_prior_cancellation() {
    let transport = ScriptedOpenAi::completion(json!({"id": "x", "choices": []}));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = provider(&transport)
        .complete(&cancel, &[Message::user("hi")], &ChatOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn stream_forwards_deltas_and_assembles_the_response() {
    let transport = ScriptedOpenAi::chunks(vec![
        chunk(json!({"role": "assistant", "content": ""})),
        chunk(json!({"content": "Hel"})),
        chunk(json!({"content": "lo"})),
        tool_call_chunk(0, Some("call_1"), Some("lookup"), ""),
        tool_call_chunk(0, None, None, "{\"q\":"),
        tool_call_chunk(0, None, None, "1}"),
        finish_chunk("tool_calls"),
        usage_chunk(9, 6),
    ]);
    let mut observer = RecordingObserver::new();

    let response = provider(&transport)
        .complete_stream(
            &CancellationToken::new(),
            &[Message::user("hi")],
            &ChatOptions::default(),
            &mut observer,
        )
        .await
        .unwrap();

    let call = |fragment: &str, arguments: &str| Event::ToolCall {
        index: 0,
        id: "call_1".into(),
        name: "lookup".into(),
        fragment: fragment.into(),
        arguments: arguments.into(),
    };
    assert_eq!(
        observer.events,
        vec![
            Event::Content("Hel".into()),
            Event::Content("lo".into()),
            call("", ""),
            call("{\"q\":", "{\"q\":"),
            call("1}", "{\"q\":1}"),
            Event::Stop,
        ]
    );

    assert_eq!(response.text(), "Hello");
    assert_eq!(response.tool_calls().len(), 1);
    assert_eq!(
        response.tool_calls()[0].parse_arguments().unwrap(),
        json!({"q": 1})
    );
    assert_eq!(response.usage.total_tokens, 15);
    assert_eq!(response.meta.request_id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(response.meta.model, "gpt-4o-2024-08-06");
    assert_eq!(response.meta.finish_reason, Some(FinishReason::ToolCalls));

    let request = &transport.requests()[0];
    assert!(request.stream);
    assert_eq!(request.stream_options.as_ref().map(|o| o.include_usage), Some(true));
}

#[tokio::test]
async fn stream_declaration_with_arguments_is_declared_then_appended() {
    let transport = ScriptedOpenAi::chunks(vec![
        tool_call_chunk(1, Some("call_b"), Some("second"), "{}"),
        tool_call_chunk(0, Some("call_a"), Some("first"), "{\"x\":"),
        tool_call_chunk(0, None, None, "true}"),
        finish_chunk("tool_calls"),
    ]);
    let mut observer = RecordingObserver::new();

    let response = provider(&transport)
        .complete_stream(
            &CancellationToken::new(),
            &[Message::user("hi")],
            &ChatOptions::default(),
            &mut observer,
        )
        .await
        .unwrap();

    let calls: Vec<(usize, &str, &str)> = response
        .tool_calls()
        .iter()
        .map(|c| (c.index(), c.name(), c.arguments()))
        .collect();
    assert_eq!(calls, vec![(0, "first", "{\"x\":true}"), (1, "second", "{}")]);

    // Each call is announced with an empty fragment before its first arguments.
    assert_eq!(
        observer.events[0],
        Event::ToolCall {
            index: 1,
            id: "call_b".into(),
            name: "second".into(),
            fragment: String::new(),
            arguments: String::new(),
        }
    );
    assert_eq!(observer.events.len(), 6);
}

#[tokio::test]
async fn stream_without_frames_yields_an_empty_assistant_message() {
    let transport = ScriptedOpenAi::chunks(vec![]);
    let mut observer = RecordingObserver::new();

    let response = provider(&transport)
        .complete_stream(
            &CancellationToken::new(),
            &[Message::user("hi")],
            &ChatOptions::default(),
            &mut observer,
        )
        .await
        .unwrap();

    assert_eq!(response.message.role(), Role::Assistant);
    assert_eq!(response.text(), "");
    assert!(response.tool_calls().is_empty());
    assert_eq!(observer.events, vec![Event::Stop]);
}

#[tokio::test]
async fn observer_error_aborts_the_stream() {
    let transport = ScriptedOpenAi::chunks(vec![
        chunk(json!({"content": "a"})),
        chunk(json!({"content": "b"})),
        chunk(json!({"content": "c"})),
    ]);
    let mut observer = RecordingObserver::failing_on_content(2);

    let err = provider(&transport)
        .complete_stream(
            &CancellationToken::new(),
            &[Message::user("hi")],
            &ChatOptions::default(),
            &mut observer,
        )
        .await
        .unwrap_err();

    match err {
        ParleyError::Observer(inner) => assert_eq!(inner.to_string(), "observer gave up"),
        other => panic!("expected observer error, got {other:?}"),
    }
    assert_eq!(observer.contents(), vec!["a"]);
    assert_eq!(observer.stops(), 0);
}

#[tokio::test]
async fn stream_cancelled_before_start() {
    let transport = ScriptedOpenAi::chunks(vec![chunk(json!({"content": "a"}))]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut observer = RecordingObserver::new();

    let err = provider(&transport)
        .complete_stream(&cancel, &[Message::user("hi")], &ChatOptions::default(), &mut observer)
        .await
        .unwrap_err();

    assert!(matches!(err, ParleyError::Cancelled));
    assert!(observer.events.is_empty());
}

#[tokio::test]
async fn stream_cancelled_mid_flight_stops_callbacks() {
    let transport = ScriptedOpenAi::hanging_chunks(vec![
        chunk(json!({"content": "a"})),
        chunk(json!({"content": "b"})),
    ]);
    let cancel = CancellationToken::new();
    let mut observer = RecordingObserver::cancelling_on_content(1, cancel.clone());

    let err = provider(&transport)
        .complete_stream(&cancel, &[Message::user("hi")], &ChatOptions::default(), &mut observer)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(observer.events, vec![Event::Content("a".into())]);
}

#[tokio::test]
async fn stream_cancelled_from_another_task() {
    let transport = ScriptedOpenAi::hanging_chunks(vec![chunk(json!({"content": "a"}))]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let mut observer = RecordingObserver::new();

    let err = provider(&transport)
        .complete_stream(&cancel, &[Message::user("hi")], &ChatOptions::default(), &mut observer)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(observer.contents(), vec!["a"]);
    assert_eq!(observer.stops(), 0);
}

#[tokio::test]
async fn tool_result_round_trip_request_shape() {
    let transport = ScriptedOpenAi::completion(json!({
        "id": "chatcmpl-9",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "done"}, "finish_reason": "stop"}]
    }));
    let call = ToolCall::function(0, "call_1", "lookup", "{\"q\":1}");
    let history = vec![
        Message::user("look it up"),
        Message::assistant("").with_tool_calls(vec![call.clone()]),
        Message::tool_result(&call, "42"),
    ];
    let options = ChatOptions::builder()
        .tools(vec![ToolDefinition::function(
            "lookup",
            "Look something up",
            ParameterBuilder::object().string("q", "query", true).build(),
        )])
        .build();

    provider(&transport)
        .complete(&CancellationToken::new(), &history, &options)
        .await
        .unwrap();

    let body = serde_json::to_value(&transport.requests()[0]).unwrap();
    assert_eq!(body["messages"][1]["content"], serde_json::Value::Null);
    assert_eq!(body["messages"][1]["tool_calls"][0]["id"], "call_1");
    assert_eq!(body["messages"][2]["role"], "tool");
    assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    assert_eq!(body["messages"][2]["content"], "42");
    assert_eq!(body["tools"][0]["function"]["name"], "lookup");
    assert_eq!(body["tools"][0]["function"]["parameters"]["required"], json!(["q"]));
}
