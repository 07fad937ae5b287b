use clap::Parser;
use pinniped_config_api as api;
use pinniped_config_api::NamespacedName;
use std::time::Duration;

/*
 * Command line flags, each one falling back to an environment variable and
 * then to the well-known pinniped identifiers.
 */
#[derive(Parser, Debug, Clone)]
#[command(name = "pinniped-configm", version)]
#[command(about = "Propagates the pinniped supervisor details into the pinniped addon secrets")]
pub struct Settings {

    /// Namespace of the ConfigMap publishing the supervisor details
    #[arg(long, env = "PINNIPED_INFO_NAMESPACE", default_value = api::PINNIPED_INFO_NAMESPACE)]
    pub source_namespace: String,

    /// Name of the ConfigMap publishing the supervisor details
    #[arg(long, env = "PINNIPED_INFO_NAME", default_value = api::PINNIPED_INFO_NAME)]
    pub source_name: String,

    /// Value of the addon-name label carried by the secrets to patch
    #[arg(long, env = "PINNIPED_ADDON_NAME", default_value = api::PINNIPED_ADDON_NAME)]
    pub addon_name: String,

    /// Seconds before a successful reconcile runs again, 0 waits for the next change
    #[arg(long, env = "PINNIPED_RESYNC_INTERVAL", default_value_t = 300)]
    pub resync_interval: u64,

    /// Seconds before a failed reconcile is retried
    #[arg(long, env = "PINNIPED_ERROR_REQUEUE", default_value_t = 60)]
    pub error_requeue: u64,
}

impl Settings {

    pub fn source(&self) -> NamespacedName {
	NamespacedName::new(&self.source_namespace, &self.source_name)
    }

    pub fn target_selector(&self) -> String {
	api::addon_secret::selector(&self.addon_name)
    }

    pub fn resync(&self) -> Option<Duration> {
	match self.resync_interval {
	    0 => None,
	    secs => Some(Duration::from_secs(secs)),
	}
    }

    pub fn error_requeue(&self) -> Duration {
	Duration::from_secs(self.error_requeue)
    }
}
