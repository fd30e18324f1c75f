//! Assembly of the orchestrator from a [`Config`].

use crate::{config::Config, Orchestrator};
use ::config::{NetworkConfig, RollupFamily};
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use async_trait::async_trait;
use backend::{BackendClient, BackendError, ExplorerClient};
use client::{RemoteSigner, SignerFn};
use rollup::{
    arbitrum::{self, ArbitrumRpcStatus, ArbitrumSubmitter},
    opstack::{self, OpStackRpcStatus, OpStackSubmitter},
    sources::{BackendProof, BackendStatus, ExplorerProof},
    FlowRegistry, HeuristicStatus, ProbeChain, ProofChain, ProofSource, Providers, RpcL2Blocks,
    StatusSource, Submitter,
};
use std::{collections::HashMap, sync::Arc};
use store::{FileStore, HttpRemoteStore, RemoteStore, SyncService};
use tracing::{info, warn};
use withdrawal::{FlowError, ProofBlob, StepId, WithdrawalRecord};

/// Signing identity for L1 submissions.
#[derive(Clone)]
pub struct Signing {
    pub from: Address,
    pub signer: SignerFn,
}

/// Submitter used when no signer is configured: probing and syncing still
/// work, every submission is refused.
struct Unsigned;

#[async_trait]
impl Submitter for Unsigned {
    async fn submit(
        &self,
        _record: &WithdrawalRecord,
        _step: StepId,
        _proof: &ProofBlob,
    ) -> Result<TxHash, FlowError> {
        Err(FlowError::Submission("no signer configured".to_string()))
    }

    async fn confirm(&self, _step: StepId, _tx_hash: TxHash) -> Result<TxHash, FlowError> {
        Err(FlowError::Submission("no signer configured".to_string()))
    }
}

/// Connect the L1 provider and one provider per configured rollup.
pub fn connect(config: &Config) -> eyre::Result<Providers<impl Provider + Clone + 'static>> {
    let l1 = client::create_provider(&config.l1_rpc_url)?;
    let mut l2 = HashMap::new();
    for chain in &config.chains {
        l2.insert(chain.chain_id, client::create_provider(&chain.rpc_url)?);
    }

    Ok(Providers { l1, l2 })
}

/// Pick the signer: the remote signer-proxy if configured, else a local key.
pub fn signing<P>(
    config: &Config,
    private_key: Option<&str>,
    l1: P,
    l1_chain_id: u64,
) -> eyre::Result<Option<Signing>>
where
    P: Provider + Clone + 'static,
{
    if let Some(url) = &config.signer.remote_url {
        info!(%url, address = %config.owner, "Using remote signer");
        let remote = RemoteSigner::new(
            url.clone(),
            config.owner,
            l1_chain_id,
            config.timeouts.confirm(),
        )?;
        return Ok(Some(Signing {
            from: config.owner,
            signer: client::remote_signer_fn(remote, l1),
        }));
    }

    let Some(private_key) = private_key else {
        warn!("No signer configured, L1 steps are disabled");
        return Ok(None);
    };

    let (from, signer) = client::local_signer_fn(private_key, l1_chain_id, l1)?;
    if from != config.owner {
        warn!(signer = %from, owner = %config.owner, "Signer is not the configured owner");
    }
    Ok(Some(Signing { from, signer }))
}

/// Build the per-family flows: backend, then L1 reads, then the heuristic for
/// status; backend, then explorer for proofs.
pub fn flows<P>(
    config: &Config,
    network: Arc<NetworkConfig>,
    providers: Providers<P>,
    signing: Option<Signing>,
) -> eyre::Result<FlowRegistry>
where
    P: Provider + Clone + 'static,
{
    let timeout = config.timeouts.source();
    let backend =
        BackendClient::new(config.backend_url.clone())?.with_health_timeout(config.timeouts.health());

    let explorers = config
        .chains
        .iter()
        .filter_map(|chain| Some((chain.chain_id, chain.explorer_url.clone()?)))
        .map(|(chain_id, url)| Ok((chain_id, ExplorerClient::new(url)?)))
        .collect::<Result<HashMap<_, _>, BackendError>>()?;

    let backend_status: Arc<dyn StatusSource> = Arc::new(BackendStatus::new(backend.clone()));
    let heuristic: Arc<dyn StatusSource> =
        Arc::new(HeuristicStatus::new(RpcL2Blocks::new(providers.l2.clone())));
    let proof_sources: Vec<Arc<dyn ProofSource>> = vec![
        Arc::new(BackendProof::new(backend)),
        Arc::new(ExplorerProof::new(explorers)),
    ];
    let proofs = ProofChain::new(proof_sources, timeout);

    let op_status = ProbeChain::new(
        vec![
            Arc::clone(&backend_status),
            Arc::new(OpStackRpcStatus::new(providers.clone(), Arc::clone(&network))),
            Arc::clone(&heuristic),
        ],
        timeout,
    );
    let arb_status = ProbeChain::new(
        vec![
            backend_status,
            Arc::new(ArbitrumRpcStatus::new(providers.clone(), network)),
            heuristic,
        ],
        timeout,
    );

    let (op_submitter, arb_submitter): (Arc<dyn Submitter>, Arc<dyn Submitter>) = match signing {
        Some(Signing { from, signer }) => (
            Arc::new(OpStackSubmitter::new(
                providers.l1.clone(),
                signer.clone(),
                from,
                config.timeouts.confirm(),
            )),
            Arc::new(ArbitrumSubmitter::new(
                providers.l1,
                signer,
                from,
                config.timeouts.confirm(),
            )),
        ),
        None => (Arc::new(Unsigned), Arc::new(Unsigned)),
    };

    Ok(FlowRegistry::new()
        .with(Arc::new(opstack::flow(op_status, proofs.clone(), op_submitter)))
        .with(Arc::new(arbitrum::flow(arb_status, proofs, arb_submitter))))
}

/// Build a ready-to-use orchestrator from `config`.
pub async fn build(config: &Config, private_key: Option<&str>) -> eyre::Result<Arc<Orchestrator>> {
    let network = Arc::new(config.network_config());
    for chain in &config.chains {
        match network.rollup(chain.chain_id) {
            Some(rollup) => info!(
                chain_id = chain.chain_id,
                name = %rollup.name,
                family = rollup.family.as_str(),
                "Configured rollup"
            ),
            None => warn!(chain_id = chain.chain_id, "Chain is not in the registry, ignoring"),
        }
    }

    let providers = connect(config)?;
    let signing = signing(
        config,
        private_key,
        providers.l1.clone(),
        network.l1_chain_id,
    )?;
    let flows = flows(config, Arc::clone(&network), providers, signing)?;
    info!(families = ?flows.families().iter().map(RollupFamily::as_str).collect::<Vec<_>>(), "Registered flows");

    let local = FileStore::open(&config.store_path).await?;
    let remote = config
        .remote_store_url
        .as_ref()
        .map(|url| HttpRemoteStore::new(url.clone()))
        .transpose()?
        .map(|remote| Arc::new(remote) as Arc<dyn RemoteStore>);
    if remote.is_none() {
        info!("No remote store configured, running local-only");
    }

    let sync = SyncService::new(Arc::new(local), remote);
    Ok(Arc::new(Orchestrator::new(sync, flows, network, config.owner)))
}
