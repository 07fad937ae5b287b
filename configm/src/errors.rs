use pinniped_config_api::MissingField;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {

    /* pinniped-info lacks issuer or issuer_ca_bundle_data */
    #[error("{0}")]
    MissingField(#[from] MissingField),

    /* an addon secret whose values.yaml can't be patched */
    #[error("addon secret {target} is malformed: {reason}")]
    MalformedTarget {
	target: String,
	reason: String,
    },

    /* encapsulate a kube-rust error, other than a write conflict */
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] kube::Error),

    #[error("conflict writing addon secret: {0}")]
    Conflict(#[source] kube::Error),
}

impl Error {

    pub fn malformed(target: impl ToString, reason: impl ToString) -> Self {
	Error::MalformedTarget{
	    target: target.to_string(),
	    reason: reason.to_string(),
	}
    }

    /*
     * Sorts a kube client error into a conflict (409, somebody else wrote the
     * object since we read it) or a generic store failure.
     */
    pub fn from_store(err: kube::Error) -> Self {
	match &err {
	    kube::Error::Api(response) if response.code == 409 => Error::Conflict(err),
	    _ => Error::StoreUnavailable(err),
	}
    }

    /* Whether re-running the reconcile may succeed without operator action */
    pub fn is_retriable(&self) -> bool {
	matches!(self, Error::StoreUnavailable(_) | Error::Conflict(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
