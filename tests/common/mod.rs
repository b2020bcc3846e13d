//! Shared test helpers: scripted transports and a recording observer.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;

use parley::error::{ParleyError, Result};
use parley::prelude::*;
use parley::provider::anthropic::{
    AnthropicTransport, MessageRequest, MessageResponse, StreamEvent,
};
use parley::provider::openai::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, OpenAiTransport,
};
use parley::stream::FrameStream;

/// Build a native wire value from JSON.
pub fn native<T: DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).expect("valid native fixture")
}

/// What a scripted stream does once its frames run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    End,
    /// Never yield again, like a socket left open.
    Hang,
}

fn frame_stream<T: Send + 'static>(frames: Vec<Result<T>>, tail: Tail) -> FrameStream<T> {
    let frames = stream::iter(frames);
    match tail {
        Tail::End => frames.boxed(),
        Tail::Hang => frames.chain(stream::pending()).boxed(),
    }
}

/// OpenAI transport that answers with canned values and records every request.
#[derive(Clone)]
pub struct ScriptedOpenAi {
    completion: Arc<Mutex<Option<Result<ChatCompletion>>>>,
    chunks: Arc<Mutex<Vec<ChatCompletionChunk>>>,
    tail: Tail,
    requests: Arc<Mutex<Vec<ChatCompletionRequest>>>,
}

impl ScriptedOpenAi {
    pub fn completion(completion: serde_json::Value) -> Self {
        Self::new(Some(Ok(native(completion))), Vec::new(), Tail::End)
    }

    pub fn failing(err: ParleyError) -> Self {
        Self::new(Some(Err(err)), Vec::new(), Tail::End)
    }

    pub fn chunks(chunks: Vec<serde_json::Value>) -> Self {
        Self::new(None, chunks.into_iter().map(native).collect(), Tail::End)
    }

    pub fn hanging_chunks(chunks: Vec<serde_json::Value>) -> Self {
        Self::new(None, chunks.into_iter().map(native).collect(), Tail::Hang)
    }

    fn new(
        completion: Option<Result<ChatCompletion>>,
        chunks: Vec<ChatCompletionChunk>,
        tail: Tail,
    ) -> Self {
        Self {
            completion: Arc::new(Mutex::new(completion)),
            chunks: Arc::new(Mutex::new(chunks)),
            tail,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OpenAiTransport for ScriptedOpenAi {
    async fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        self.requests.lock().unwrap().push(request.clone());
        self.completion
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ParleyError::Stream("no scripted completion".into())))
    }

    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FrameStream<ChatCompletionChunk>> {
        self.requests.lock().unwrap().push(request.clone());
        let chunks: Vec<Result<ChatCompletionChunk>> =
            self.chunks.lock().unwrap().drain(..).map(Ok).collect();
        Ok(frame_stream(chunks, self.tail))
    }
}

/// Anthropic transport that answers with canned values and records every request.
#[derive(Clone)]
pub struct ScriptedAnthropic {
    response: Arc<Mutex<Option<Result<MessageResponse>>>>,
    events: Arc<Mutex<Vec<Result<StreamEvent>>>>,
    tail: Tail,
    requests: Arc<Mutex<Vec<MessageRequest>>>,
}

impl ScriptedAnthropic {
    pub fn response(response: serde_json::Value) -> Self {
        Self::new(Some(Ok(native(response))), Vec::new(), Tail::End)
    }

    pub fn events(events: Vec<serde_json::Value>) -> Self {
        Self::new(None, events.into_iter().map(|e| Ok(native(e))).collect(), Tail::End)
    }

    pub fn hanging_events(events: Vec<serde_json::Value>) -> Self {
        Self::new(None, events.into_iter().map(|e| Ok(native(e))).collect(), Tail::Hang)
    }

    /// Frames followed by a transport failure.
    pub fn events_then_error(events: Vec<serde_json::Value>, err: ParleyError) -> Self {
        let mut frames: Vec<Result<StreamEvent>> = events.into_iter().map(|e| Ok(native(e))).collect();
        frames.push(Err(err));
        Self::new(None, frames, Tail::End)
    }

    fn new(
        response: Option<Result<MessageResponse>>,
        events: Vec<Result<StreamEvent>>,
        tail: Tail,
    ) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            events: Arc::new(Mutex::new(events)),
            tail,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnthropicTransport for ScriptedAnthropic {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ParleyError::Stream("no scripted response".into())))
    }

    async fn create_message_stream(&self, request: &MessageRequest) -> Result<FrameStream<StreamEvent>> {
        self.requests.lock().unwrap().push(request.clone());
        let events: Vec<Result<StreamEvent>> = self.events.lock().unwrap().drain(..).collect();
        Ok(frame_stream(events, self.tail))
    }
}

/// One observer callback, as recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Content(String),
    Reasoning(String),
    Refusal(String),
    ToolCall {
        index: usize,
        id: String,
        name: String,
        fragment: String,
        arguments: String,
    },
    Stop,
}

/// Observer that records every callback and can be told to fail or cancel.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Vec<Event>,
    fail_on_content: Option<usize>,
    cancel_on_content: Option<(usize, CancellationToken)>,
    contents_seen: usize,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an observer error from the `n`th content delta (1-based).
    pub fn failing_on_content(n: usize) -> Self {
        Self {
            fail_on_content: Some(n),
            ..Self::default()
        }
    }

    /// Cancel `token` from inside the `n`th content delta (1-based).
    pub fn cancelling_on_content(n: usize, token: CancellationToken) -> Self {
        Self {
            cancel_on_content: Some((n, token)),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Content(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Stop).count()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_content(&mut self, delta: &str) -> Result<()> {
        self.contents_seen += 1;
        if self.fail_on_content == Some(self.contents_seen) {
            return Err(ParleyError::observer("observer gave up"));
        }
        self.events.push(Event::Content(delta.to_string()));
        if let Some((n, token)) = &self.cancel_on_content {
            if *n == self.contents_seen {
                token.cancel();
            }
        }
        Ok(())
    }

    fn on_reasoning(&mut self, delta: &str) -> Result<()> {
        self.events.push(Event::Reasoning(delta.to_string()));
        Ok(())
    }

    fn on_refusal(&mut self, delta: &str) -> Result<()> {
        self.events.push(Event::Refusal(delta.to_string()));
        Ok(())
    }

    fn on_tool_call(&mut self, _cancel: &CancellationToken, call: &ToolCall, fragment: &str) -> Result<()> {
        self.events.push(Event::ToolCall {
            index: call.index(),
            id: call.id().to_string(),
            name: call.name().to_string(),
            fragment: fragment.to_string(),
            arguments: call.arguments().to_string(),
        });
        Ok(())
    }

    fn on_stop(&mut self) -> Result<()> {
        self.events.push(Event::Stop);
        Ok(())
    }
}
