use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;

/*
 * Labels the cluster provisioning process puts on every per-cluster addon
 * Secret. Only the addon name takes part in the selection.
 */
pub const ADDON_NAME_LABEL: &str = "tkg.tanzu.vmware.com/addon-name";
pub const CLUSTER_NAME_LABEL: &str = "tkg.tanzu.vmware.com/cluster-name";
pub const PINNIPED_ADDON_NAME: &str = "pinniped";

/* The Secret data key holding the ytt data values document */
pub const VALUES_KEY: &str = "values.yaml";

/* Label selector matching every addon Secret of `addon_name` */
pub fn selector(addon_name: &str) -> String {
    format!("{}={}", ADDON_NAME_LABEL, addon_name)
}

pub fn values_document(secret: &Secret) -> Option<&[u8]> {
    secret.data.as_ref()?
	.get(VALUES_KEY)
	.map(|bytes| bytes.0.as_slice())
}

pub fn set_values_document(secret: &mut Secret, document: Vec<u8>) {
    secret.data
	.get_or_insert_with(Default::default)
	.insert(VALUES_KEY.to_string(), ByteString(document));
}

/* The workload cluster this Secret configures, used for logging only */
pub fn cluster_name(secret: &Secret) -> Option<&str> {
    secret.metadata.labels.as_ref()?
	.get(CLUSTER_NAME_LABEL)
	.map(String::as_str)
}
