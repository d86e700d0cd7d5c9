//! Supervisor: binds both workers, runs them side by side, stops them together.
//!
//! Both sockets are bound before either worker starts, so a taken port fails
//! the whole relay at startup. Once running, the HTTP worker and the consumer
//! are separate tasks with nothing shared between them but the shutdown
//! token. If one of them exits with an error the token is cancelled and the
//! other one winds down too.

use std::future::Future;
use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::consumer::Consumer;
use crate::datagram::{DatagramReceiver, DatagramSender};
use crate::error::Error;
use crate::server::Server;
use crate::site::Site;
use crate::store::DocumentStore;

pub struct Relay<S> {
    server: Server,
    site: Site,
    consumer: Consumer<S>,
    socket_addr: SocketAddr,
}

impl<S: DocumentStore> Relay<S> {
    /// Binds the datagram listener, the forwarding socket and the HTTP
    /// listener, in that order.
    ///
    /// The router sends to the address the consumer actually bound, so a
    /// configured datagram port of 0 works.
    pub async fn bind(config: &RelayConfig, store: S) -> Result<Self, Error> {
        let receiver = DatagramReceiver::bind(config.socket_addr(), config.buffer_size).await?;
        let socket_addr = receiver.local_addr()?;
        let sender = DatagramSender::bind(socket_addr).await?;
        let server = Server::bind(config.http_addr()).await?;

        Ok(Self {
            server,
            site: Site::new(config.base_dir.clone(), sender),
            consumer: Consumer::new(receiver, store),
            socket_addr,
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.socket_addr
    }

    /// Runs both workers until `shutdown` is cancelled or one of them fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Error> {
        let Self { server, site, consumer, .. } = self;

        let http = tokio::spawn(supervised(
            "http",
            shutdown.clone(),
            server.serve_with_shutdown(site.into_router(), shutdown.clone().cancelled_owned()),
        ));
        let datagram = tokio::spawn(supervised("datagram", shutdown.clone(), consumer.run(shutdown.clone())));

        let (http, datagram) = tokio::join!(http, datagram);
        http??;
        datagram??;

        info!("relay stopped");
        Ok(())
    }
}

async fn supervised(
    worker: &'static str,
    shutdown: CancellationToken,
    fut: impl Future<Output = Result<(), Error>>,
) -> Result<(), Error> {
    let res = fut.await;
    if let Err(e) = &res {
        error!(worker, error = %e, "worker failed, stopping the relay");
        shutdown.cancel();
    }
    res
}
