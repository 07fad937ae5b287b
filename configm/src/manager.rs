use crate::config::Settings;
use crate::errors::Error;
use crate::filter::SourceFilter;
use crate::notification::Notifier;
use crate::reconciler;
use crate::store::KubeStore;

use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap as KubeConfigMap;
use k8s_openapi::api::core::v1::Secret as KubeSecret;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::ResourceExt;
use kube::runtime::WatchStreamExt;
use kube::runtime::controller::Action as KubeAction;
use kube::runtime::controller::Controller as KubeController;
use kube::runtime::controller::Error as KubeControllerError;
use kube::runtime::reflector as kube_reflector;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher as kube_watcher;
use kube::runtime::watcher::Config as KubeWatcherConfig;
use log;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/* How often reconcile ran since the process started, for the logs */
static RECONCILE_CALLS: AtomicU64 = AtomicU64::new(0);

/*
 * ConfigManager implementation
 */
#[derive(Clone)]
pub struct ConfigManager {
    settings: Settings,
    store: KubeStore,

    source_api: KubeApi<KubeConfigMap>,
    secret_api: KubeApi<KubeSecret>,
}

#[derive(Clone)]
struct ConfigManagerCtx {
    manager: ConfigManager,
}

async fn reconcile(pinniped_info: Arc<KubeConfigMap>, ctx: Arc<ConfigManagerCtx>) -> Result<KubeAction, Error> {
    let calls = RECONCILE_CALLS.fetch_add(1, Ordering::Relaxed) + 1;
    let settings = &ctx.manager.settings;
    let source = settings.source();
    log::debug!("Reconcile() call count: {}, {} at revision {:?}",
		calls, source, pinniped_info.resource_version());

    let report = reconciler::reconcile_source(&ctx.manager.store, &source, &settings.target_selector()).await?;
    log::info!("Reconciled {}: {} addon secret(s), {} updated", source, report.targets, report.updated);

    Ok(ctx.manager.requeue())
}

fn error_policy(_pinniped_info: Arc<KubeConfigMap>, error: &Error, ctx: Arc<ConfigManagerCtx>) -> KubeAction {
    if error.is_retriable() {
	log::warn!("Reconcile failed, retrying: {}", error);
    } else {
	log::error!("Reconcile failed, needs fixing before it can succeed: {}", error);
    }
    KubeAction::requeue(ctx.manager.settings.error_requeue())
}

impl ConfigManager {

    /*
     * The controller reconciles pinniped-info whenever:
     *
     *  - a ConfigMap notification of its namespace passes the source filter
     *  - any addon secret matching the target selector changes
     *  - the resync interval elapses after a successful pass
     */
    pub fn controller(&self) -> impl Future<Output = ()> {
	let ctx = Arc::new(ConfigManagerCtx{
	    manager: self.clone(),
	});
	let source = self.settings.source();
	let filter = SourceFilter::new(source.clone());
	let mut notifier = Notifier::default();

	let (reader, writer) = kube_reflector::store();
	let trigger = kube_watcher(self.source_api.clone(), KubeWatcherConfig::default())
	    .default_backoff()
	    .reflect(writer)
	    .map(move |event| {
		let accepted: Vec<Result<KubeConfigMap, kube_watcher::Error>> = match event {
		    Ok(event) => notifier.observe(event)
			.into_iter()
			.filter(|notification| filter.accepts(notification))
			.map(|notification| {
			    log::debug!("Received a {} notification for {}", notification.kind(), notification.object().name_any());
			    Ok(notification.into_object())
			})
			.collect(),
		    Err(err) => vec![Err(err)],
		};
		futures::stream::iter(accepted)
	    })
	    .flatten();

	let source_ref: ObjectRef<KubeConfigMap> = ObjectRef::new(&source.name).within(&source.namespace);
	let targets = KubeWatcherConfig::default().labels(&self.settings.target_selector());

	KubeController::for_stream(trigger, reader)
	    .watches(self.secret_api.clone(), targets, move |secret: KubeSecret| {
		log::debug!("Addon secret {} changed", secret.name_any());
		Some(source_ref.clone())
	    })
	    .run(reconcile, error_policy, ctx)
	    .for_each(|reconcile| async move {
		match reconcile {
		    Ok((obj, _)) => log::debug!("Reconcile of {} finished", obj),
		    Err(KubeControllerError::ObjectNotFound(obj)) => {
			log::debug!("{} is gone, nothing to propagate", obj);
		    },
		    Err(err) => log::error!("Failed to reconcile with error {:?}", err),
		}
	    })
    }

    pub fn requeue(&self) -> KubeAction {
	match self.settings.resync() {
	    Some(interval) => KubeAction::requeue(interval),
	    None => KubeAction::await_change(),
	}
    }

    pub fn new(kube_client: KubeClient, settings: Settings) -> Self {
	Self{
	    source_api: KubeApi::namespaced(kube_client.clone(), &settings.source_namespace),
	    secret_api: KubeApi::all(kube_client.clone()),
	    store: KubeStore::new(kube_client),
	    settings: settings,
	}
    }
}
