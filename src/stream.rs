use futures::{
    stream::{self, BoxStream},
    Stream, StreamExt,
};
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use thiserror::Error;
use tokio::sync::mpsc;

/// Incremental string values produced by a streaming callable.
///
/// The consumer owns the stream. Dropping it is how a producer learns that
/// nobody is listening anymore (see [`StreamSender`]).
pub struct ValueStream(BoxStream<'static, String>);

impl ValueStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = String> + Send + 'static,
    {
        Self(stream.boxed())
    }

    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    pub fn iter<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String> + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(values.into_iter().map(Into::into)))
    }

    /// Bounded channel: the producer keeps the sender, the callable returns
    /// the stream.
    pub fn channel(buffer: usize) -> (StreamSender, ValueStream) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let values = stream::unfold(rx, |mut rx| async move {
            let value = rx.recv().await;
            value.map(|value| (value, rx))
        });
        (StreamSender(tx), Self::new(values))
    }
}

impl Stream for ValueStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.0.poll_next_unpin(cx)
    }
}

impl fmt::Debug for ValueStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ValueStream")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream consumer has gone away")]
pub struct StreamClosed;

/// Producer side of [`ValueStream::channel`]. Dropping every sender closes
/// the stream.
#[derive(Debug, Clone)]
pub struct StreamSender(mpsc::Sender<String>);

impl StreamSender {
    pub async fn send(&self, value: impl Into<String>) -> Result<(), StreamClosed> {
        self.0.send(value.into()).await.map_err(|_| StreamClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Resolves once the consuming side has been dropped.
    pub async fn closed(&self) {
        self.0.closed().await
    }
}
