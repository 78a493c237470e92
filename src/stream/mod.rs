pub mod accumulator;
pub mod controller;

use crate::core::StreamError;
use crate::tools::ToolOutput;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

pub use accumulator::{DeltaAccumulator, DeltaSink};
pub use controller::StreamController;

/// Raw chunked response body as delivered by the transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Transport seam the stream controller reopens continuation streams through.
///
/// The controller never builds requests itself; submitting a settled tool
/// batch and getting the next byte stream back is the whole contract.
#[async_trait]
pub trait RunTransport: Send + Sync {
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<ByteStream, StreamError>;
}
