// SPDX-License-Identifier: MIT

//! `hearthd`: process entry point. Wires the global singletons (§9 "Global
//! state" — listener cache, backend, store) once at startup, starts every
//! event source, the processor pool, the schedule ticker, the worker
//! orchestrator's three periodic tasks, and the HTTP router, then tears
//! everything down cooperatively on a single top-level cancellation.

mod agent;
mod app;
mod config;
mod http;
mod processor_pool;
mod sources;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hearth_backends::{KubernetesBackend, KubernetesBackendConfig, LocalBackendConfig, LocalContainerBackend, WorkerBackend};
use hearth_core::SystemClock;
use hearth_engine::{ActionDispatcher, AutomationRegistry, ConfirmationMediator, EngineConfig, NullPromptSink, WorkerOrchestrator};
use hearth_sandbox::ToolRegistry;
use hearth_store::Store;
use tokio_util::sync::CancellationToken;

use crate::agent::HttpWakeAgent;
use crate::app::AppState;
use crate::config::{BackendKind, DaemonConfig};
use crate::sources::home::HomeAssistantConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let daemon_config = Arc::new(DaemonConfig::default());
    let engine_config = EngineConfig::default();
    std::fs::create_dir_all(&daemon_config.state_dir)?;

    let store = Arc::new(Store::open(&daemon_config.state_dir, Arc::new(SystemClock))?);
    let registry = Arc::new(AutomationRegistry::new(store.clone(), hearth_core::ListenerCache::default()));

    let mediator = Arc::new(ConfirmationMediator::new(Arc::new(NullPromptSink), engine_config.confirmation_timeout()));

    let wake_agent = Arc::new(HttpWakeAgent::from_env());
    let dispatcher = Arc::new(ActionDispatcher::new(wake_agent, ToolRegistry::new(), mediator.clone()));

    let backend: Arc<dyn WorkerBackend> = match daemon_config.backend {
        BackendKind::Local => Arc::new(LocalContainerBackend::new(LocalBackendConfig::default())),
        BackendKind::Kubernetes => {
            let client = kube::Client::try_default().await?;
            Arc::new(KubernetesBackend::new(client, KubernetesBackendConfig::default()))
        }
    };
    let orchestrator = Arc::new(WorkerOrchestrator::new(
        store.clone(),
        backend,
        engine_config.clone(),
        daemon_config.callback_base_url.clone(),
    ));

    let (event_tx, event_rx) = processor_pool::fanin_channel(daemon_config.fanin_queue_size);

    let processor = Arc::new(hearth_engine::EventProcessor::new(
        store.clone(),
        registry.listener_cache().clone(),
        dispatcher.clone(),
        ToolRegistry::new(),
        engine_config.event_sample_interval(),
    ));
    let processor_handles = processor_pool::spawn(engine_config.processor_worker_count, event_rx, processor);

    let (home_handle, home_cancel) = match HomeAssistantConfig::from_env() {
        Some(cfg) => {
            let (handle, cancel) = sources::home::spawn(cfg, event_tx.clone());
            (Some(handle), Some(cancel))
        }
        None => (None, None),
    };
    let (schedule_handle, schedule_cancel) = sources::schedule::spawn(store.clone(), dispatcher.clone());

    let shutdown = CancellationToken::new();
    let reconciler_handle = spawn_periodic(
        shutdown.clone(),
        Duration::from_secs(engine_config.reconcile_interval_seconds),
        {
            let orchestrator = orchestrator.clone();
            move || {
                let orchestrator = orchestrator.clone();
                async move {
                    let count = orchestrator.reconcile().await;
                    if count > 0 {
                        tracing::info!(count, "worker task reconciliation pass");
                    }
                }
            }
        },
    );
    let stale_marker_handle = spawn_periodic(shutdown.clone(), Duration::from_secs(60), {
        let orchestrator = orchestrator.clone();
        move || {
            let orchestrator = orchestrator.clone();
            async move {
                let count = orchestrator.mark_stale().await;
                if count > 0 {
                    tracing::info!(count, "worker tasks marked stale");
                }
            }
        }
    });
    let cleanup_handle = spawn_periodic(shutdown.clone(), Duration::from_secs(3600), {
        let orchestrator = orchestrator.clone();
        move || {
            let orchestrator = orchestrator.clone();
            async move {
                match orchestrator.cleanup() {
                    Ok(count) if count > 0 => tracing::info!(count, "retention sweep deleted worker tasks"),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "retention sweep failed"),
                }
            }
        }
    });
    let cache_refresh_handle = spawn_periodic(
        shutdown.clone(),
        Duration::from_secs(engine_config.listener_cache_refresh_seconds),
        {
            let registry = registry.clone();
            move || {
                let registry = registry.clone();
                async move { registry.refresh_listener_cache() }
            }
        },
    );
    let recent_events_purge_handle = spawn_periodic(shutdown.clone(), Duration::from_secs(3600), {
        let store = store.clone();
        let retention = engine_config.recent_event_retention();
        move || {
            let store = store.clone();
            async move {
                match store.purge_recent_events_older_than(Utc::now() - retention) {
                    Ok(count) if count > 0 => tracing::info!(count, "purged stale recent-event rows"),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "recent-event purge failed"),
                }
            }
        }
    });

    let state = AppState {
        store: store.clone(),
        registry,
        dispatcher,
        orchestrator,
        mediator,
        engine_config,
        daemon_config: daemon_config.clone(),
        event_tx,
    };
    let router = http::router(state);
    let listener = tokio::net::TcpListener::bind(&daemon_config.bind_addr).await?;
    tracing::info!(addr = %daemon_config.bind_addr, "hearthd listening");

    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown.clone().cancelled_owned());

    tokio::select! {
        result = serve => result.map_err(anyhow::Error::from)?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    shutdown.cancel();
    if let Some(cancel) = &home_cancel {
        cancel.cancel();
    }
    schedule_cancel.cancel();
    for handle in [
        reconciler_handle,
        stale_marker_handle,
        cleanup_handle,
        cache_refresh_handle,
        recent_events_purge_handle,
    ] {
        let _ = handle.await;
    }
    if let Some(handle) = home_handle {
        let _ = handle.await;
    }
    let _ = schedule_handle.await;
    for handle in processor_handles {
        handle.abort();
    }
    store.checkpoint()?;
    Ok(())
}

/// Spawn a task that runs `work` on every tick of `interval` until
/// `shutdown` is cancelled (§5 "Worker Orchestrator: three periodic tasks
/// (reconciler, stale-marker, cleanup)" plus the listener cache's own
/// periodic refresh knob).
fn spawn_periodic<F, Fut>(shutdown: CancellationToken, interval: Duration, work: F) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => work().await,
                _ = shutdown.cancelled() => return,
            }
        }
    })
}
