//! Connection tasks.
//!
//! One task serves one connection: read the request, run the handler, encode
//! the response, write it and close. The pipeline is an async fn; the engine
//! stores it as a boxed future and polls it only when its socket is ready.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::parser::{Error as ParserError, HttpRequest, Progress, RequestReader};
use crate::server::encode::Encoder;
use crate::server::error::Error;
use crate::server::handler::{dispatch, Handler, Os};
use crate::server::poll::TaskId;
use crate::server::response::HttpResponse;

/// Where a connection task is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Dispatching,
    Encoding,
    Writing,
    Closing,
}

/// The socket readiness a task can be suspended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

impl Stage {
    /// The readiness a task suspended in this stage is waiting for.
    ///
    /// Dispatching and encoding never suspend.
    pub fn awaits(&self) -> Option<Interest> {
        match self {
            Stage::Reading => Some(Interest::Read),
            Stage::Writing | Stage::Closing => Some(Interest::Write),
            Stage::Dispatching | Stage::Encoding => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Everything a connection task needs besides its socket. Shared by all tasks.
pub(crate) struct TaskContext {
    pub handler: Arc<dyn Handler>,
    pub os: Os,
    pub encoder: Encoder,
    pub read_buffer_size: usize,
    pub max_request_size: usize,
}

type Pipeline = Pin<Box<dyn Future<Output = Result<(), Error>>>>;

/// A suspended connection pipeline owned by the engine.
pub(crate) struct ConnectionTask {
    id: TaskId,
    peer: SocketAddr,
    stage: Rc<Cell<Stage>>,
    waker: Waker,
    pipeline: Pipeline,
}

impl ConnectionTask {
    /// Create the task serving `stream`. Nothing runs until the first [`resume`](Self::resume).
    pub(crate) fn spawn<S>(
        id: TaskId,
        stream: S,
        peer: SocketAddr,
        context: Rc<TaskContext>,
        waker: Waker,
        deadline: Option<Duration>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + 'static,
    {
        let stage = Rc::new(Cell::new(Stage::Reading));
        let pipeline_stage = stage.clone();
        let pipeline = async move { serve_connection(stream, &context, &pipeline_stage).await };

        let pipeline: Pipeline = match deadline {
            Some(limit) => Box::pin(async move {
                match tokio::time::timeout(limit, pipeline).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(limit)),
                }
            }),
            None => Box::pin(pipeline),
        };

        Self {
            id,
            peer,
            stage,
            waker,
            pipeline,
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) fn stage(&self) -> Stage {
        self.stage.get()
    }

    /// Run the pipeline until it suspends on I/O or finishes.
    pub(crate) fn resume(&mut self) -> Poll<Result<(), Error>> {
        let mut cx = Context::from_waker(&self.waker);
        self.pipeline.as_mut().poll(&mut cx)
    }
}

/// Serve one request on `stream` and close it.
///
/// Parse and handler failures are answered with a response; only I/O
/// failures (and a deadline, when set) end the task with an error, in which
/// case nothing more is written.
pub(crate) async fn serve_connection<S>(mut stream: S, context: &TaskContext, stage: &Cell<Stage>) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stage.set(Stage::Reading);
    let parsed = read_request(&mut stream, context.read_buffer_size, context.max_request_size).await?;

    stage.set(Stage::Dispatching);
    let response = match parsed {
        Ok(request) => dispatch(context.handler.as_ref(), request, &context.os),
        Err(e) => {
            debug!("Rejecting malformed request: {e}");
            HttpResponse::bad_request()
        }
    };

    stage.set(Stage::Encoding);
    let frames = context.encoder.encode(response);

    stage.set(Stage::Writing);
    for frame in frames {
        stream.write_all(&frame).await?;
    }
    stream.flush().await?;

    stage.set(Stage::Closing);
    if let Err(e) = stream.shutdown().await {
        debug!("Failed to close connection: {e}");
    }

    Ok(())
}

/// Read chunks until the parser has a complete request or gives up.
///
/// The outer result carries I/O failures, the inner one parse failures.
async fn read_request<S>(
    stream: &mut S,
    read_buffer_size: usize,
    max_request_size: usize,
) -> io::Result<Result<HttpRequest, ParserError>>
where
    S: AsyncRead + Unpin,
{
    let mut reader = RequestReader::new(max_request_size);
    let mut buf = vec![0; read_buffer_size.max(1)];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(reader.finish());
        }

        match reader.feed(&buf[..n]) {
            Ok(Progress::NeedMore) => continue,
            Ok(Progress::Complete(request)) => return Ok(Ok(request)),
            Err(e) => return Ok(Err(e)),
        }
    }
}
