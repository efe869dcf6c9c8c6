use crate::{
    dispatcher::Dispatcher,
    error::DispatchError,
    net::{FunctionInputs, ListFunctionsResponse, Request, Response},
    registry::Registry,
};
use async_bincode::{tokio::AsyncBincodeStream, AsyncDestination};
use futures::{SinkExt, StreamExt};
use std::{io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::BufStream,
    net::{TcpListener, TcpStream},
    task, time,
};

type Connection = AsyncBincodeStream<BufStream<TcpStream>, Request, Response, AsyncDestination>;

pub struct Server {
    dispatcher: Dispatcher,
    call_timeout: Option<Duration>,
}

impl Server {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
            call_timeout: None,
        }
    }

    /// Deadline for unary calls. Streaming calls are never cut short.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    fn list_functions(&self) -> ListFunctionsResponse {
        self.dispatcher.list().collect()
    }

    async fn run_function(&self, request: FunctionInputs) -> Response {
        let FunctionInputs { name, inputs } = request;
        let args: Vec<String> = inputs.into_iter().map(|input| input.value).collect();
        let call = self.dispatcher.call(&name, &args);

        let result = match self.call_timeout {
            Some(deadline) => match time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_) => {
                    log::warn!("function {} timed out after {:?}", name, deadline);
                    return Response::Error(format!("function {name}: timed out"));
                }
            },
            None => call.await,
        };
        match result {
            Ok(outputs) => Response::Outputs(outputs.into()),
            Err(err) => Response::Error(error_message(&name, &err)),
        }
    }

    async fn stream_function(&self, request: FunctionInputs, sock: &mut Connection) {
        let FunctionInputs { name, inputs } = request;
        let args: Vec<String> = inputs.into_iter().map(|input| input.value).collect();
        let mut frames = match self.dispatcher.call_streaming(&name, &args).await {
            Ok(frames) => frames,
            Err(err) => {
                _ = sock.send(Response::Error(error_message(&name, &err))).await;
                return;
            }
        };

        while let Some(frame) = frames.next().await {
            let is_last = frame.is_last;
            if let Err(err) = sock.send(Response::Frame(frame.into())).await {
                // Dropping `frames` tells the producer to stop.
                log::warn!("stream {} aborted: {}", name, err);
                return;
            }
            if is_last {
                log::debug!("stream {} finished", name);
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, sock: TcpStream) {
        let mut sock: Connection = AsyncBincodeStream::from(BufStream::new(sock)).for_async();
        let request = match sock.next().await {
            Some(Ok(request)) => request,
            Some(Err(err)) => {
                log::warn!("malformed request: {}", err);
                return;
            }
            None => return,
        };

        let response = match request {
            Request::Ping => Response::Pong,
            Request::ListFunctions => Response::Functions(self.list_functions()),
            Request::RunFunction(request) => self.run_function(request).await,
            Request::StreamFunction(request) => {
                return self.stream_function(request, &mut sock).await;
            }
        };
        if let Err(err) = sock.send(response).await {
            log::warn!("failed to send response: {}", err);
        }
    }

    /// Accepts connections forever, one task per call. Accept failures
    /// (e.g. running out of file descriptors) are retried with backoff.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let root_arc = Arc::new(self);
        log::info!(
            "serving {} functions on {}",
            root_arc.dispatcher.registry().len(),
            listener.local_addr()?
        );
        let mut failures = 0u32;
        loop {
            let (sock, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    log::error!("accept failed: {}, retrying in {:?}", err, delay);
                    time::sleep(delay).await;
                    continue;
                }
            };
            failures = 0;
            log::debug!("connection from {}", addr);
            task::spawn(root_arc.clone().handle_connection(sock));
        }
    }

    pub async fn serve_tcp(self, addr: SocketAddr) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }
}

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Doubles from 10ms per consecutive failure, capped at one second.
fn accept_backoff(failures: u32) -> Duration {
    let factor = 2u32.saturating_pow(failures.saturating_sub(1));
    ACCEPT_BACKOFF_MIN.saturating_mul(factor).min(ACCEPT_BACKOFF_MAX)
}

fn error_message(name: &str, err: &DispatchError) -> String {
    log::warn!("function {} failed: {}", name, err);
    format!("function {name}: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_backoff_grows_and_saturates() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), Duration::from_secs(1));
        assert_eq!(accept_backoff(u32::MAX), Duration::from_secs(1));
    }
}
