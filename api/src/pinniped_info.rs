use k8s_openapi::api::core::v1::ConfigMap;
use thiserror::Error;

/* ConfigMap data keys written by the supervisor installer */
pub const ISSUER_KEY: &str = "issuer";
pub const ISSUER_CA_BUNDLE_KEY: &str = "issuer_ca_bundle_data";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pinniped-info is missing required field `{key}`")]
pub struct MissingField {
    pub key: &'static str,
}

/*
 * The supervisor connection details carried by the pinniped-info ConfigMap.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnipedInfo {

    /* The supervisor issuer URL, e.g.: https://issuer.example.com */
    pub issuer: String,

    /* Base64 encoded CA bundle the issuer serves with */
    pub issuer_ca_bundle_data: String,
}

impl PinnipedInfo {

    pub fn new(issuer: &str, issuer_ca_bundle_data: &str) -> Self {
	Self{
	    issuer: issuer.to_string(),
	    issuer_ca_bundle_data: issuer_ca_bundle_data.to_string(),
	}
    }

    /*
     * Reads issuer and issuer_ca_bundle_data out of the ConfigMap data. Both
     * are required; the first absent key is reported.
     */
    pub fn from_configmap(configmap: &ConfigMap) -> Result<Self, MissingField> {
	let data = configmap.data.as_ref();
	let lookup = |key: &'static str| -> Result<String, MissingField> {
	    data.and_then(|data| data.get(key))
		.cloned()
		.ok_or(MissingField{ key })
	};

	Ok(Self{
	    issuer: lookup(ISSUER_KEY)?,
	    issuer_ca_bundle_data: lookup(ISSUER_CA_BUNDLE_KEY)?,
	})
    }
}
