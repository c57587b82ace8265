// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A live, authenticated connection to a selected host (§4.2), or the
//! synthetic local pseudo-host used when local fallback engages.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A connection opened by the Selector and handed to every later phase.
#[derive(Clone)]
pub enum Connection {
    /// Commands run via the local shell; sync/lock phases are skipped.
    Local,
    Remote(Arc<RemoteSession>),
}

pub struct RemoteSession {
    pub host: String,
    pub alias: String,
    pub dir: String,
    pub session: Mutex<ssh2::Session>,
}

impl Connection {
    pub fn remote(host: impl Into<String>, alias: impl Into<String>, dir: impl Into<String>, session: ssh2::Session) -> Self {
        Connection::Remote(Arc::new(RemoteSession {
            host: host.into(),
            alias: alias.into(),
            dir: dir.into(),
            session: Mutex::new(session),
        }))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Connection::Local)
    }

    /// Label used in log fields and diagnostics.
    pub fn host_label(&self) -> &str {
        match self {
            Connection::Local => "local",
            Connection::Remote(r) => &r.host,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Connection::Local => None,
            Connection::Remote(r) => Some(&r.alias),
        }
    }

    pub fn remote_dir(&self) -> Option<&str> {
        match self {
            Connection::Local => None,
            Connection::Remote(r) => Some(&r.dir),
        }
    }

    /// Open a fresh ssh2 session to `alias`, authenticated via the local
    /// agent, with read/write timeouts set to `timeout`.
    pub fn dial(host: &str, alias: &str, dir: &str, timeout: Duration) -> Result<Self, ssh2::Error> {
        let addr = if alias.contains(':') { alias.to_string() } else { format!("{alias}:22") };
        let socket_addr: std::net::SocketAddr = addr
            .parse()
            .or_else(|_| {
                std::net::ToSocketAddrs::to_socket_addrs(&addr)
                    .ok()
                    .and_then(|mut it| it.next())
                    .ok_or_else(|| ssh2::Error::from_errno(ssh2::ErrorCode::Session(-1)))
            })?;
        let tcp = std::net::TcpStream::connect_timeout(&socket_addr, timeout)
            .map_err(|_| ssh2::Error::from_errno(ssh2::ErrorCode::Session(-1)))?;
        let _ = tcp.set_read_timeout(Some(timeout));
        let _ = tcp.set_write_timeout(Some(timeout));

        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        let user = std::env::var("USER").unwrap_or_else(|_| "root".to_string());
        session.userauth_agent(&user)?;

        Ok(Connection::remote(host, alias, dir, session))
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
