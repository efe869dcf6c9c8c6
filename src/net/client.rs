use super::{
    FunctionInput, FunctionInputs, FunctionOutputs, ListFunctionsResponse, Request, Response,
    StreamOutput,
};
use async_bincode::{tokio::AsyncBincodeStream, AsyncDestination};
use futures::{
    stream::{self, BoxStream},
    SinkExt, StreamExt,
};
use std::{io, net::SocketAddr};
use thiserror::Error;
use tokio::{io::BufStream, net::TcpStream};

type Connection = AsyncBincodeStream<BufStream<TcpStream>, Response, Request, AsyncDestination>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection: {0}")]
    Io(#[from] io::Error),

    #[error("codec: {0}")]
    Codec(String),

    #[error("no response from server")]
    NoResponse,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The server rejected the call; carries its message.
    #[error("{0}")]
    Remote(String),
}

pub struct Client(pub SocketAddr);

impl Client {
    async fn connect(&self) -> Result<Connection, ClientError> {
        let sock = TcpStream::connect(self.0).await?;
        let sock = BufStream::new(sock);
        let sock = AsyncBincodeStream::from(sock).for_async();
        Ok(sock)
    }

    async fn send(&self, req: Request) -> Result<Connection, ClientError> {
        let mut sock = self.connect().await?;
        sock.send(req)
            .await
            .map_err(|e| ClientError::Codec(e.to_string()))?;
        Ok(sock)
    }

    async fn send_recv(&self, req: Request) -> Result<Response, ClientError> {
        let mut sock = self.send(req).await?;
        receive(&mut sock).await
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send_recv(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_functions(&self) -> Result<ListFunctionsResponse, ClientError> {
        match self.send_recv(Request::ListFunctions).await? {
            Response::Functions(functions) => Ok(functions),
            other => Err(unexpected(other)),
        }
    }

    pub async fn run_function(
        &self,
        name: &str,
        inputs: Vec<FunctionInput>,
    ) -> Result<FunctionOutputs, ClientError> {
        let req = Request::RunFunction(FunctionInputs {
            name: name.to_owned(),
            inputs,
        });
        match self.send_recv(req).await? {
            Response::Outputs(outputs) => Ok(outputs),
            other => Err(unexpected(other)),
        }
    }

    /// Positional convenience over [`run_function`](Self::run_function).
    pub async fn call(&self, name: &str, args: &[&str]) -> Result<Vec<String>, ClientError> {
        let outputs = self.run_function(name, positional(args)).await?;
        Ok(outputs.outputs.into_iter().map(|o| o.value).collect())
    }

    /// Frames in arrival order. The stream ends after the frame marked
    /// `is_last`, or after the first error.
    pub async fn stream_function(
        &self,
        name: &str,
        inputs: Vec<FunctionInput>,
    ) -> Result<BoxStream<'static, Result<StreamOutput, ClientError>>, ClientError> {
        let req = Request::StreamFunction(FunctionInputs {
            name: name.to_owned(),
            inputs,
        });
        let sock = self.send(req).await?;
        let frames = stream::unfold(Some(sock), |sock| async move {
            let mut sock = match sock {
                Some(sock) => sock,
                None => return None,
            };
            match receive(&mut sock).await {
                Ok(Response::Frame(frame)) if frame.is_last => Some((Ok(frame), None)),
                Ok(Response::Frame(frame)) => Some((Ok(frame), Some(sock))),
                Ok(other) => Some((Err(unexpected(other)), None)),
                Err(err) => Some((Err(err), None)),
            }
        });
        Ok(frames.boxed())
    }

    pub async fn stream(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<Vec<StreamOutput>, ClientError> {
        let frames = self.stream_function(name, positional(args)).await?;
        frames.collect::<Vec<_>>().await.into_iter().collect()
    }
}

async fn receive(sock: &mut Connection) -> Result<Response, ClientError> {
    sock.next()
        .await
        .ok_or(ClientError::NoResponse)?
        .map_err(|e| ClientError::Codec(e.to_string()))
}

fn positional(args: &[&str]) -> Vec<FunctionInput> {
    args.iter()
        .enumerate()
        .map(|(i, value)| FunctionInput::new(format!("arg{i}"), *value))
        .collect()
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error(message) => ClientError::Remote(message),
        other => ClientError::UnexpectedResponse(format!("{other:?}")),
    }
}
