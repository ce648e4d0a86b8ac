// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! The GELF transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, as well
//! as the UDP implementation.
//!
//! # Examples
//!
//! To send GELF messages over UDP to a Graylog input listening on port 12201 (the default) on
//! localhost:
//!
//! ```rust
//! use gelf_tracing::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! On a non-standard port on another host:
//!
//! ```rust
//! use gelf_tracing::transport::UdpTransport;
//! let transpo = UdpTransport::new("some-host.domain.io:5514");
//! assert!(transpo.is_err()); // no such host, after all
//! ```

use crate::{
    chunk::Datagrams,
    diagnostics::Diagnostics,
    error::{new_backtrace, Error, Result},
};


use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// The customary port for Graylog's GELF UDP input
pub const DEFAULT_PORT: u16 = 12201;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
///
/// Implementations are shared between every thread that logs, so `send` takes `&self`.
pub trait Transport {
    /// Send one datagram on this transport mechanism; returns the number of bytes sent.
    fn send(&self, buf: &[u8]) -> Result<usize>;
}

/// Sending GELF messages via UDP datagrams.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

fn transport_err(err: std::io::Error) -> Error {
    Error::Transport {
        source: err,
        back: new_backtrace(),
    }
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        let addr: SocketAddr = addr
            .to_socket_addrs()
            .map_err(transport_err)?
            .next()
            .ok_or_else(|| {
                transport_err(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "address resolved to nothing",
                ))
            })?;
        // Bind to any available port on an interface of the same family...
        let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).map_err(transport_err)?;
        // and connect to the Graylog input at `addr`:
        socket.connect(addr).map_err(transport_err)?;
        Ok(UdpTransport { socket })
    }
    /// Construct a [`Transport`] implementation via UDP at localhost:12201
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new(("localhost", DEFAULT_PORT))
    }
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.socket.peer_addr().map_err(transport_err)
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).map_err(transport_err)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        (**self).send(buf)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        (**self).send(buf)
    }
}

/// Send every datagram of one message, fire-and-forget.
///
/// A datagram that fails is recorded in `diagnostics` & skipped; its siblings are still sent.
/// Returns the number of datagrams that went out.
pub fn send_datagrams<T: Transport + ?Sized>(
    transport: &T,
    datagrams: &Datagrams,
    diagnostics: &Diagnostics,
) -> usize {
    datagrams
        .encode()
        .iter()
        .filter(|datagram| match transport.send(datagram) {
            Ok(_) => true,
            Err(err) => {
                diagnostics.record(&err);
                false
            }
        })
        .count()
}
