use crate::errors::Error;
use crate::errors::Result;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap as KubeConfigMap;
use k8s_openapi::api::core::v1::Secret as KubeSecret;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::ResourceExt;
use kube::api::ListParams as KubeListParams;
use kube::api::PostParams as KubePostParams;
use pinniped_config_api::NamespacedName;

#[cfg(test)]
use mockall::automock;

/*
 * The three cluster operations the reconciler needs. Kept behind a trait so
 * the reconcile logic can run against a mock in tests.
 */
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Store: Send + Sync {

    /* Returns None when the source doesn't exist */
    async fn get_source(&self, source: &NamespacedName) -> Result<Option<KubeConfigMap>>;

    /* Every addon secret matching `selector`, in no particular order */
    async fn list_targets(&self, selector: &str) -> Result<Vec<KubeSecret>>;

    /*
     * Replaces the stored secret. The write carries the resource version the
     * secret was read at, so a concurrent writer surfaces as Error::Conflict.
     */
    async fn update_target(&self, target: &KubeSecret) -> Result<()>;
}

#[derive(Clone)]
pub struct KubeStore {
    kube_client: KubeClient,
}

impl KubeStore {

    pub fn new(kube_client: KubeClient) -> Self {
	Self{ kube_client }
    }
}

#[async_trait]
impl Store for KubeStore {

    async fn get_source(&self, source: &NamespacedName) -> Result<Option<KubeConfigMap>> {
	let configmaps: KubeApi<KubeConfigMap> = KubeApi::namespaced(self.kube_client.clone(), &source.namespace);

	configmaps.get_opt(&source.name).await.map_err(Error::from_store)
    }

    async fn list_targets(&self, selector: &str) -> Result<Vec<KubeSecret>> {
	let secrets: KubeApi<KubeSecret> = KubeApi::all(self.kube_client.clone());
	let params = KubeListParams::default().labels(selector);

	let list = secrets.list(&params).await.map_err(Error::from_store)?;
	Ok(list.items)
    }

    async fn update_target(&self, target: &KubeSecret) -> Result<()> {
	let name = target.name_any();
	let namespace = match target.namespace() {
	    Some(namespace) => namespace,
	    None => return Err(Error::malformed(&name, "secret has no namespace")),
	};
	let secrets: KubeApi<KubeSecret> = KubeApi::namespaced(self.kube_client.clone(), &namespace);

	secrets.replace(&name, &KubePostParams::default(), target)
	    .await
	    .map_err(Error::from_store)?;
	Ok(())
    }
}
