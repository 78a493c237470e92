use futures::StreamExt;
use log::debug;

use crate::core::StreamError;
use crate::eventsource::FrameStreamExt;
use crate::protocol::{ChatMessage, ThreadEvent};
use crate::stream::accumulator::{DeltaAccumulator, DeltaSink};
use crate::stream::{ByteStream, RunTransport};
use crate::tools::{dispatch, ToolCall, ToolRegistry};

/// Drives one logical run stream to a final message.
///
/// The controller owns the in-progress message for the duration of the
/// request; ownership transfers to the caller only on completion. Dropping
/// the returned future at any await point abandons the request: the
/// underlying transport body is released and the sink is never called again.
pub struct StreamController<'a> {
    transport: &'a dyn RunTransport,
    registry: &'a ToolRegistry,
}

impl<'a> StreamController<'a> {
    pub fn new(transport: &'a dyn RunTransport, registry: &'a ToolRegistry) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Consumes the stream until the message completes.
    ///
    /// A requires_action event suspends reading, dispatches the tool batch,
    /// and re-points this loop at the continuation stream the submission
    /// opens. The loop form rather than recursion keeps chain depth off the
    /// native stack, so an arbitrarily long tool chain cannot exhaust it.
    ///
    /// The transport ending without a completed event fails the request;
    /// accumulated content is dropped rather than surfaced as truncated.
    pub async fn run_stream(
        &self,
        stream: ByteStream,
        sink: &mut dyn DeltaSink,
    ) -> Result<ChatMessage, StreamError> {
        let mut accumulator = DeltaAccumulator::new();
        let mut frames = stream.frames();

        loop {
            match frames.next().await {
                Some(Ok(frame)) => match ThreadEvent::decode(&frame)? {
                    ThreadEvent::MessageDelta(event) => {
                        accumulator.apply(&event.delta.content, sink);
                    }
                    ThreadEvent::MessageCompleted(event) => {
                        debug!("[Stream] message {id} completed", id = event.id);
                        return Ok(accumulator.finalize(event));
                    }
                    ThreadEvent::RequiresAction(event) => {
                        let calls: Vec<ToolCall> =
                            event.tool_calls().iter().map(ToolCall::from).collect();
                        if calls.is_empty() {
                            continue;
                        }

                        debug!(
                            "[Stream] run {id} requires {n} tool calls",
                            id = event.id,
                            n = calls.len()
                        );
                        let outputs = dispatch(self.registry, &calls).await;
                        let continuation = self
                            .transport
                            .submit_tool_outputs(&event.thread_id, &event.id, &outputs)
                            .await?;
                        frames = continuation.frames();
                    }
                    ThreadEvent::Unknown => continue,
                },
                Some(Err(err)) => return Err(err),
                None => return Err(StreamError::IncompleteStream),
            }
        }
    }
}
