/*
 * Level triggered propagation of pinniped-info into the pinniped addon
 * secrets. Every pass reads the source once and recomputes each target from
 * it, no state is carried between passes.
 */

use crate::errors::Error;
use crate::errors::Result;
use crate::store::Store;
use crate::values;

use k8s_openapi::api::core::v1::Secret as KubeSecret;
use kube::ResourceExt;
use log;
use pinniped_config_api::NamespacedName;
use pinniped_config_api::PinnipedInfo;
use pinniped_config_api::addon_secret;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {

    /* addon secrets matched by the selector */
    pub targets: usize,

    /* addon secrets written back */
    pub updated: usize,
}

fn target_id(target: &KubeSecret) -> String {
    match NamespacedName::from_resource(target) {
	Some(id) => id.to_string(),
	None => target.name_any(),
    }
}

/*
 * Returns the secret to write back, or None when its values.yaml already
 * points at the supervisor described by `info`.
 */
fn plan_target(target: &KubeSecret, info: &PinnipedInfo) -> Result<Option<KubeSecret>> {
    let id = target_id(target);
    let current = match addon_secret::values_document(target) {
	Some(current) => current,
	None => {
	    let reason = format!("no `{}` in secret data", addon_secret::VALUES_KEY);
	    return Err(Error::malformed(&id, reason));
	}
    };

    let patched = values::patch(current, info).map_err(|err| Error::malformed(&id, err))?;
    if !patched.changed {
	log::debug!("Addon secret {} (cluster {:?}) is up to date", id, addon_secret::cluster_name(target));
	return Ok(None);
    }

    log::debug!("Addon secret {}: old values {:?}, new values {:?}",
		id, String::from_utf8_lossy(current), String::from_utf8_lossy(&patched.document));

    let mut updated = target.clone();
    addon_secret::set_values_document(&mut updated, patched.document);
    Ok(Some(updated))
}

/*
 * One reconcile pass:
 *
 *  1. read pinniped-info and extract the supervisor details
 *  2. list the addon secrets matching `selector`
 *  3. patch every secret in memory
 *  4. write back the secrets that changed
 *
 * Any malformed secret aborts the pass before the first write, whatever
 * order the secrets were listed in. A failing write aborts the remaining
 * writes; the next pass picks them up.
 */
pub async fn reconcile_source<S>(store: &S, source: &NamespacedName, selector: &str) -> Result<ReconcileReport>
where
    S: Store + ?Sized,
{
    let configmap = match store.get_source(source).await? {
	Some(configmap) => configmap,
	None => {
	    log::info!("{} does not exist (anymore), leaving addon secrets untouched", source);
	    return Ok(ReconcileReport::default());
	}
    };

    let info = PinnipedInfo::from_configmap(&configmap)?;
    log::info!("Supervisor address: {:?}, supervisor CA bundle: {} chars",
	       info.issuer, info.issuer_ca_bundle_data.len());

    let targets = store.list_targets(selector).await?;

    let mut pending: Vec<KubeSecret> = vec![];
    for target in &targets {
	if let Some(updated) = plan_target(target, &info)? {
	    pending.push(updated);
	}
    }

    for updated in &pending {
	if let Err(err) = store.update_target(updated).await {
	    log::error!("Unable to update addon secret {}, got error: {}", target_id(updated), err);
	    return Err(err);
	}
	log::info!("Updated addon secret {} with supervisor {}", target_id(updated), info.issuer);
    }

    Ok(ReconcileReport{
	targets: targets.len(),
	updated: pending.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockStore;
    use crate::values::DATA_VALUES_HEADER;

    use k8s_openapi::api::core::v1::ConfigMap as KubeConfigMap;
    use kube::error::ErrorResponse;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::sync::Mutex;

    const SELECTOR: &str = "tkg.tanzu.vmware.com/addon-name=pinniped";

    fn source() -> NamespacedName {
	NamespacedName::default()
    }

    fn pinniped_info(data: serde_json::Value) -> KubeConfigMap {
	serde_json::from_value(json!({
	    "metadata": { "namespace": "kube-public", "name": "pinniped-info" },
	    "data": data,
	})).unwrap()
    }

    fn complete_pinniped_info() -> KubeConfigMap {
	pinniped_info(json!({
	    "issuer": "https://issuer.example.com",
	    "issuer_ca_bundle_data": "BASE64DATA",
	}))
    }

    fn pinniped_secret(namespace: &str, cluster: &str, values: Option<&str>) -> KubeSecret {
	let mut secret: KubeSecret = serde_json::from_value(json!({
	    "metadata": {
		"namespace": namespace,
		"name": format!("{}-pinniped-addon", cluster),
		"resourceVersion": "42",
		"labels": {
		    "tkg.tanzu.vmware.com/addon-name": "pinniped",
		    "tkg.tanzu.vmware.com/cluster-name": cluster,
		},
	    },
	    "type": "tkg.tanzu.vmware.com/addon",
	})).unwrap();
	if let Some(values) = values {
	    addon_secret::set_values_document(&mut secret, values.as_bytes().to_vec());
	}
	secret
    }

    fn unpatched() -> String {
	format!("{}pinniped: {{}}\n", DATA_VALUES_HEADER)
    }

    fn patched() -> String {
	format!("{}pinniped:\n  supervisor_svc_endpoint: https://issuer.example.com\n  supervisor_ca_bundle_data: BASE64DATA\n",
		DATA_VALUES_HEADER)
    }

    fn values_of(secret: &KubeSecret) -> String {
	String::from_utf8(addon_secret::values_document(secret).unwrap().to_vec()).unwrap()
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
	kube::Error::Api(ErrorResponse{
	    status: "Failure".to_string(),
	    message: format!("request failed: {}", reason),
	    reason: reason.to_string(),
	    code,
	})
    }

    fn store_with(configmap: Option<KubeConfigMap>, targets: Vec<KubeSecret>) -> MockStore {
	let mut store = MockStore::new();
	store.expect_get_source()
	    .withf(|source: &NamespacedName| *source == NamespacedName::default())
	    .returning(move |_| Ok(configmap.clone()));
	store.expect_list_targets()
	    .withf(|selector: &str| selector == SELECTOR)
	    .returning(move |_| Ok(targets.clone()));
	store
    }

    /* Records every secret written through the mock */
    fn capture_updates(store: &mut MockStore) -> Arc<Mutex<Vec<KubeSecret>>> {
	let written = Arc::new(Mutex::new(vec![]));
	let sink = written.clone();
	store.expect_update_target()
	    .returning(move |secret| {
		sink.lock().unwrap().push(secret.clone());
		Ok(())
	    });
	written
    }

    #[tokio::test]
    async fn patches_a_single_target() {
	let target = pinniped_secret("default", "workload", Some(&unpatched()));
	let mut store = store_with(Some(complete_pinniped_info()), vec![target]);
	store.expect_update_target()
	    .times(1)
	    .withf(|secret: &KubeSecret| values_of(secret) == patched())
	    .returning(|_| Ok(()));

	let report = reconcile_source(&store, &source(), SELECTOR).await.unwrap();
	assert_eq!(report, ReconcileReport{ targets: 1, updated: 1 });
    }

    #[tokio::test]
    async fn write_keeps_identity_and_version() {
	let target = pinniped_secret("default", "workload", Some(&unpatched()));
	let mut store = store_with(Some(complete_pinniped_info()), vec![target]);
	let written = capture_updates(&mut store);

	reconcile_source(&store, &source(), SELECTOR).await.unwrap();

	let written = written.lock().unwrap();
	assert_eq!(written.len(), 1);
	assert_eq!(written[0].metadata.namespace.as_deref(), Some("default"));
	assert_eq!(written[0].metadata.name.as_deref(), Some("workload-pinniped-addon"));
	assert_eq!(written[0].metadata.resource_version.as_deref(), Some("42"));
	assert_eq!(addon_secret::cluster_name(&written[0]), Some("workload"));
    }

    #[tokio::test]
    async fn no_targets_is_fine() {
	let mut store = store_with(Some(complete_pinniped_info()), vec![]);
	store.expect_update_target().times(0);

	let report = reconcile_source(&store, &source(), SELECTOR).await.unwrap();
	assert_eq!(report, ReconcileReport{ targets: 0, updated: 0 });
    }

    #[tokio::test]
    async fn up_to_date_target_is_not_written() {
	let target = pinniped_secret("default", "workload", Some(&patched()));
	let mut store = store_with(Some(complete_pinniped_info()), vec![target]);
	store.expect_update_target().times(0);

	let report = reconcile_source(&store, &source(), SELECTOR).await.unwrap();
	assert_eq!(report, ReconcileReport{ targets: 1, updated: 0 });
    }

    #[tokio::test]
    async fn only_stale_targets_are_written() {
	let targets = vec![
	    pinniped_secret("ns-a", "alpha", Some(&unpatched())),
	    pinniped_secret("ns-b", "beta", Some(&patched())),
	    pinniped_secret("ns-c", "gamma", Some(&format!("{}pinniped:\n  cert_duration: 2160h\n", DATA_VALUES_HEADER))),
	];
	let mut store = store_with(Some(complete_pinniped_info()), targets);
	let written = capture_updates(&mut store);

	let report = reconcile_source(&store, &source(), SELECTOR).await.unwrap();
	assert_eq!(report, ReconcileReport{ targets: 3, updated: 2 });

	let written = written.lock().unwrap();
	let clusters: BTreeSet<&str> = written.iter()
	    .filter_map(addon_secret::cluster_name)
	    .collect();
	assert_eq!(clusters, BTreeSet::from(["alpha", "gamma"]));

	let by_cluster: BTreeMap<&str, String> = written.iter()
	    .map(|secret| (addon_secret::cluster_name(secret).unwrap(), values_of(secret)))
	    .collect();
	assert_eq!(by_cluster["alpha"], patched());
	assert!(by_cluster["gamma"].contains("  cert_duration: 2160h\n"));
	assert!(by_cluster["gamma"].contains("  supervisor_svc_endpoint: https://issuer.example.com\n"));
    }

    #[tokio::test]
    async fn malformed_target_aborts_before_any_write() {
	let targets = vec![
	    pinniped_secret("ns-a", "alpha", Some(&unpatched())),
	    pinniped_secret("ns-b", "beta", Some(&format!("{}identity_management_type: none\n", DATA_VALUES_HEADER))),
	    pinniped_secret("ns-c", "gamma", Some(&unpatched())),
	];
	let mut store = store_with(Some(complete_pinniped_info()), targets);
	store.expect_update_target().times(0);

	let err = reconcile_source(&store, &source(), SELECTOR).await.unwrap_err();
	match err {
	    Error::MalformedTarget{ target, .. } => assert_eq!(target, "ns-b/beta-pinniped-addon"),
	    other => panic!("unexpected error: {:?}", other),
	}
    }

    #[tokio::test]
    async fn target_without_values_is_malformed() {
	let target = pinniped_secret("default", "workload", None);
	let mut store = store_with(Some(complete_pinniped_info()), vec![target]);
	store.expect_update_target().times(0);

	let err = reconcile_source(&store, &source(), SELECTOR).await.unwrap_err();
	assert!(matches!(err, Error::MalformedTarget{ .. }));
	assert!(err.to_string().contains("values.yaml"));
    }

    #[tokio::test]
    async fn missing_issuer_fails_before_listing() {
	let mut store = MockStore::new();
	store.expect_get_source()
	    .returning(|_| Ok(Some(pinniped_info(json!({ "issuer_ca_bundle_data": "BASE64DATA" })))));
	store.expect_list_targets().times(0);
	store.expect_update_target().times(0);

	let err = reconcile_source(&store, &source(), SELECTOR).await.unwrap_err();
	match err {
	    Error::MissingField(missing) => assert_eq!(missing.key, "issuer"),
	    other => panic!("unexpected error: {:?}", other),
	}
    }

    #[tokio::test]
    async fn missing_ca_bundle_fails() {
	let mut store = MockStore::new();
	store.expect_get_source()
	    .returning(|_| Ok(Some(pinniped_info(json!({ "issuer": "https://issuer.example.com" })))));
	store.expect_list_targets().times(0);

	let err = reconcile_source(&store, &source(), SELECTOR).await.unwrap_err();
	assert!(matches!(err, Error::MissingField(missing) if missing.key == "issuer_ca_bundle_data"));
    }

    #[tokio::test]
    async fn deleted_source_is_a_noop() {
	let mut store = MockStore::new();
	store.expect_get_source().returning(|_| Ok(None));
	store.expect_list_targets().times(0);
	store.expect_update_target().times(0);

	let report = reconcile_source(&store, &source(), SELECTOR).await.unwrap();
	assert_eq!(report, ReconcileReport::default());
    }

    #[tokio::test]
    async fn list_failure_is_surfaced() {
	let mut store = MockStore::new();
	store.expect_get_source().returning(|_| Ok(Some(complete_pinniped_info())));
	store.expect_list_targets()
	    .returning(|_| Err(Error::from_store(api_error(503, "ServiceUnavailable"))));
	store.expect_update_target().times(0);

	let err = reconcile_source(&store, &source(), SELECTOR).await.unwrap_err();
	assert!(matches!(err, Error::StoreUnavailable(_)));
	assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn conflict_stops_the_pass() {
	let targets = vec![
	    pinniped_secret("ns-a", "alpha", Some(&unpatched())),
	    pinniped_secret("ns-b", "beta", Some(&unpatched())),
	];
	let mut store = store_with(Some(complete_pinniped_info()), targets);
	store.expect_update_target()
	    .times(1)
	    .returning(|_| Err(Error::from_store(api_error(409, "Conflict"))));

	let err = reconcile_source(&store, &source(), SELECTOR).await.unwrap_err();
	assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn second_pass_writes_nothing() {
	let mut first = store_with(Some(complete_pinniped_info()),
				   vec![pinniped_secret("default", "workload", Some(&unpatched()))]);
	let written = capture_updates(&mut first);
	reconcile_source(&first, &source(), SELECTOR).await.unwrap();

	let after_first = written.lock().unwrap().clone();
	let mut second = store_with(Some(complete_pinniped_info()), after_first);
	second.expect_update_target().times(0);

	let report = reconcile_source(&second, &source(), SELECTOR).await.unwrap();
	assert_eq!(report, ReconcileReport{ targets: 1, updated: 0 });
    }
}
