use crate::{ApiService, Cluster};
use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, info_span, instrument, Instrument};

/// Serves the API over plain HTTP/1 until the runtime begins shutting down.
///
/// In-flight connections are closed gracefully and hold the drain handle until
/// they complete.
#[instrument(skip_all, fields(port = %addr.port()))]
pub(crate) async fn serve<C: Cluster>(
    addr: SocketAddr,
    api: ApiService<C>,
    drain: drain::Watch,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API server listening");

    tokio::select! {
        res = accept(listener, api, drain.clone()) => res,
        handle = drain.signaled() => {
            info!("HTTP API server shutting down");
            drop(handle);
            Ok(())
        }
    }
}

async fn accept<C: Cluster>(
    listener: TcpListener,
    api: ApiService<C>,
    drain: drain::Watch,
) -> Result<()> {
    loop {
        let (io, client) = listener.accept().await?;
        debug!(%client, "Accepted connection");

        let svc = TowerToHyperService::new(api.clone());
        let drain = drain.clone();
        tokio::spawn(
            async move {
                let conn = http1::Builder::new().serve_connection(TokioIo::new(io), svc);
                tokio::pin!(conn);
                tokio::select! {
                    res = conn.as_mut() => {
                        if let Err(error) = res {
                            debug!(%error, "Connection closed with an error");
                        }
                    }
                    handle = drain.signaled() => {
                        conn.as_mut().graceful_shutdown();
                        if let Err(error) = handle.release_after(conn).await {
                            debug!(%error, "Connection closed with an error");
                        }
                    }
                }
            }
            .instrument(info_span!("conn", %client)),
        );
    }
}
