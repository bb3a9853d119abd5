//! Administrative API session
//!
//! One authenticated connection to a router. Calls are strictly
//! request/reply; callers must not interleave two calls on one session,
//! which the router registry enforces with a per-router lock.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::RouterConfig;
use crate::error::ApiError;
use crate::routeros::protocol::{parse_reply, read_sentence, Record, Reply, Request};
use crate::routeros::tls;

/// The operations a subscriber workflow needs from a router session
#[async_trait]
pub trait AdminSession: Send {
    /// Issue one command and collect every `!re` record of the reply
    async fn run(&mut self, request: &Request) -> Result<Vec<Record>, ApiError>;

    async fn close(&mut self) -> Result<(), ApiError>;
}

/// Byte stream a session can run over (plain TCP or TLS)
pub trait ApiStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ApiStream for T {}

/// RouterOS API session over an arbitrary byte stream
pub struct ApiSession<S = Box<dyn ApiStream>> {
    stream: S,
    /// Set once a call fails after its request went out
    broken: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> ApiSession<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            broken: false,
        }
    }

    /// Plain-text login (RouterOS 6.43 and later)
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = Request::new("/login")
            .attr("name", username)
            .attr("password", password);

        match self.exchange(&request).await {
            Ok((_, done)) => {
                if done.contains_key("ret") {
                    return Err(ApiError::LoginRejected(
                        "router requested legacy challenge login".to_string(),
                    ));
                }
                Ok(())
            }
            Err(ApiError::Trap { message }) => Err(ApiError::LoginRejected(message)),
            Err(e) => Err(e),
        }
    }

    /// Send a request and read until `!done`
    ///
    /// A `!trap` is remembered and reported once the closing `!done` arrives,
    /// so the stream stays aligned for the next call. Any other failure leaves
    /// the rest of the reply unread, so the session refuses further calls.
    async fn exchange(&mut self, request: &Request) -> Result<(Vec<Record>, Record), ApiError> {
        if self.broken {
            return Err(ApiError::SessionBroken);
        }

        let result = self.transact(request).await;
        if let Err(e) = &result {
            if !matches!(e, ApiError::Trap { .. }) {
                tracing::error!(
                    "[RouterOS] '{}' failed mid-reply, session disabled: {}",
                    request.command(),
                    e
                );
                self.broken = true;
            }
        }
        result
    }

    async fn transact(&mut self, request: &Request) -> Result<(Vec<Record>, Record), ApiError> {
        self.stream.write_all(&request.encode()).await?;
        self.stream.flush().await?;

        let mut records = Vec::new();
        let mut trap: Option<String> = None;

        loop {
            let words = read_sentence(&mut self.stream).await?;
            match parse_reply(words)? {
                Reply::Re(record) => records.push(record),
                Reply::Trap(record) => {
                    if trap.is_none() {
                        trap = Some(
                            record
                                .get("message")
                                .cloned()
                                .unwrap_or_else(|| "unknown error".to_string()),
                        );
                    }
                }
                Reply::Empty => {}
                Reply::Fatal(reason) => return Err(ApiError::Fatal(reason)),
                Reply::Done(done) => {
                    return match trap {
                        Some(message) => Err(ApiError::Trap { message }),
                        None => Ok((records, done)),
                    };
                }
            }
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> AdminSession for ApiSession<S> {
    async fn run(&mut self, request: &Request) -> Result<Vec<Record>, ApiError> {
        tracing::trace!("[RouterOS] {} {:?}", request.command(), request.words());
        let (records, _) = self.exchange(request).await?;
        Ok(records)
    }

    async fn close(&mut self) -> Result<(), ApiError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Dial, optionally wrap in TLS, and log in
///
/// Bounded by the configured connect timeout. Calls made on the returned
/// session have no timeout of their own.
pub async fn connect(target: &RouterConfig) -> Result<ApiSession, ApiError> {
    let dial = async {
        let tcp = TcpStream::connect((target.host.as_str(), target.port())).await?;
        let stream: Box<dyn ApiStream> = if target.tls {
            Box::new(tls::wrap(tcp, &target.host).await?)
        } else {
            Box::new(tcp)
        };

        let mut session = ApiSession::new(stream);
        session.login(&target.username, &target.password).await?;
        Ok::<_, ApiError>(session)
    };

    tokio::time::timeout(target.connect_timeout(), dial)
        .await
        .map_err(|_| ApiError::ConnectTimeout)?
}
