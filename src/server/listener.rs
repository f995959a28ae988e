//! Listening sockets.

use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::task::{Context, Poll};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};

use crate::server::error::Error;

/// Transport protocol of a listening socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Transport {
    #[default]
    Tcp,
}

/// One address to listen on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenAddr {
    pub port: u16,
    #[serde(default = "loopback")]
    pub ip: IpAddr,
    #[serde(default)]
    pub transport: Transport,
}

fn loopback() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

impl ListenAddr {
    /// Listen on `port` on the loopback interface over TCP.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ip: loopback(),
            transport: Transport::Tcp,
        }
    }

    /// Listen on `port` on every IPv4 interface.
    pub fn anyone(port: u16) -> Self {
        Self::new(port).with_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = ip;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// A bound socket plus the connections it accepted but nobody took yet.
struct Listener {
    inner: TcpListener,
    backlog: VecDeque<io::Result<(TcpStream, SocketAddr)>>,
}

impl Listener {
    /// Accept up to `batch` connections without blocking.
    ///
    /// tokio only exposes readiness of a listening socket through
    /// `poll_accept`, so observing readiness and accepting are one step; the
    /// accepted connections wait in the backlog for [`ListenerSet::accept`].
    fn poll_ready(&mut self, cx: &mut Context<'_>, batch: usize) -> bool {
        while self.backlog.len() < batch {
            match self.inner.poll_accept(cx) {
                Poll::Ready(Ok(accepted)) => self.backlog.push_back(Ok(accepted)),
                Poll::Ready(Err(e)) => {
                    self.backlog.push_back(Err(e));
                    break;
                }
                Poll::Pending => break,
            }
        }
        !self.backlog.is_empty()
    }
}

/// Every socket the server listens on, opened as a unit.
pub struct ListenerSet {
    listeners: Vec<Listener>,
}

impl ListenerSet {
    /// Bind every address in order.
    ///
    /// The first failure aborts the whole set; sockets bound before it are
    /// closed when the partial set is dropped.
    pub async fn open(addrs: &[ListenAddr]) -> Result<Self, Error> {
        let mut listeners = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let socket_addr = addr.socket_addr();
            let inner = match addr.transport {
                Transport::Tcp => TcpListener::bind(socket_addr)
                    .await
                    .map_err(|source| Error::Bind { addr: socket_addr, source })?,
            };
            info!("Listening on http://{}", inner.local_addr().unwrap_or(socket_addr));
            listeners.push(Listener {
                inner,
                backlog: VecDeque::new(),
            });
        }
        Ok(Self { listeners })
    }

    /// A set with no sockets.
    pub fn empty() -> Self {
        Self { listeners: Vec::new() }
    }

    /// The addresses actually bound, in opening order.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|listener| listener.inner.local_addr().ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Indices of the listeners with connections waiting to be accepted.
    pub(crate) fn poll_ready(&mut self, cx: &mut Context<'_>, batch: usize) -> Vec<usize> {
        self.listeners
            .iter_mut()
            .enumerate()
            .filter_map(|(index, listener)| listener.poll_ready(cx, batch).then_some(index))
            .collect()
    }

    /// Take the connections accepted on listener `index`.
    pub(crate) fn accept(&mut self, index: usize) -> Vec<io::Result<(TcpStream, SocketAddr)>> {
        self.listeners
            .get_mut(index)
            .map(|listener| listener.backlog.drain(..).collect())
            .unwrap_or_default()
    }
}
