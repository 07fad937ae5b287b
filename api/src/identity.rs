use kube::Resource;
use std::fmt;

/* Where the pinniped supervisor installer publishes its connection details */
pub const PINNIPED_INFO_NAMESPACE: &str = "kube-public";
pub const PINNIPED_INFO_NAME: &str = "pinniped-info";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {

    pub fn new(namespace: &str, name: &str) -> Self {
	Self{
	    namespace: namespace.to_string(),
	    name: name.to_string(),
	}
    }

    /*
     * Returns the identity of a kubernetes object, or None when the object
     * hasn't been named yet. Cluster scoped objects get an empty namespace.
     */
    pub fn from_resource<K: Resource>(obj: &K) -> Option<Self> {
	let name = obj.meta().name.clone()?;
	let namespace = obj.meta().namespace.clone().unwrap_or_default();

	Some(Self{ namespace, name })
    }

    pub fn references(&self, namespace: Option<&str>, name: Option<&str>) -> bool {
	let is_name_ref = match name { Some(n) => n == self.name, None => false };
	let is_namespace_ref = namespace.unwrap_or_default() == self.namespace;

	is_name_ref && is_namespace_ref
    }

    /* Whether `obj` is the object identified by this namespace/name pair */
    pub fn refers_to<K: Resource>(&self, obj: &K) -> bool {
	let meta = obj.meta();
	self.references(meta.namespace.as_deref(), meta.name.as_deref())
    }
}

impl Default for NamespacedName {
    fn default() -> Self {
	Self::new(PINNIPED_INFO_NAMESPACE, PINNIPED_INFO_NAME)
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	write!(f, "{}/{}", self.namespace, self.name)
    }
}
