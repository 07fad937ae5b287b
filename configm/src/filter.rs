use crate::notification::Notification;

use kube::Resource;
use pinniped_config_api::NamespacedName;

/*
 * Lets through notifications about the pinniped-info object only, the watch
 * it sits on sees every ConfigMap of the namespace.
 */
#[derive(Debug, Clone)]
pub struct SourceFilter {
    source: NamespacedName,
}

impl SourceFilter {

    pub fn new(source: NamespacedName) -> Self {
	Self{ source }
    }

    pub fn accepts<K: Resource>(&self, notification: &Notification<K>) -> bool {
	match notification {
	    Notification::Create(obj)
	    | Notification::Delete(obj)
	    | Notification::Generic(obj) => self.source.refers_to(obj),
	    Notification::Update{ old, new } => self.source.refers_to(old) || self.source.refers_to(new),
	}
    }
}
