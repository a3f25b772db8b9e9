use crate::{server, ApiService, HttpMetrics, KubeCluster, ManagedBy, Provisioner};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use rand::{rngs::StdRng, SeedableRng};
use std::net::SocketAddr;
use tracing::{info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "cilium-policy-api",
    about = "Provisions namespaces, service accounts and Cilium Network Policies"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "cilium_policy_api=info,warn",
        env = "CILIUM_POLICY_API_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    #[clap(long, default_value = "0.0.0.0:8080", env = "CILIUM_POLICY_API_HTTP_ADDR")]
    http_addr: SocketAddr,

    /// Value of the `created-by` label set on every created resource.
    #[clap(long, default_value = "ppcs-nsm", env = "CILIUM_POLICY_API_CREATED_BY")]
    created_by: String,

    /// Value of the `managed-by` label set on every created resource.
    #[clap(
        long,
        default_value = "cilium-policy-api",
        env = "CILIUM_POLICY_API_MANAGED_BY"
    )]
    managed_by: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            http_addr,
            created_by,
            managed_by,
        } = self;

        let mut prom = <Registry>::default();
        let metrics = HttpMetrics::register(prom.sub_registry_with_prefix("cilium_policy_api"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let provisioner = Provisioner::new(
            KubeCluster::new(runtime.client()),
            ManagedBy {
                created_by,
                managed_by,
            },
            Box::new(StdRng::from_entropy()),
        );
        let api = ApiService::new(provisioner, metrics);

        // Serve the API until the runtime is signaled to shut down.
        tokio::spawn(
            server::serve(http_addr, api, runtime.shutdown_handle())
                .instrument(info_span!("http")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
