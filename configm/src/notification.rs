use kube::Resource;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Event as WatchEvent;
use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;

/*
 * A change to one object, as seen by the event filter. Updates carry both
 * revisions so a filter can match on either one.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<K> {
    Create(K),
    Update { old: K, new: K },
    Delete(K),

    /* the object was (re)listed without a known change, e.g. on watch start */
    Generic(K),
}

impl<K> Notification<K> {

    pub fn kind(&self) -> &'static str {
	match self {
	    Notification::Create(_) => "create",
	    Notification::Update{ .. } => "update",
	    Notification::Delete(_) => "delete",
	    Notification::Generic(_) => "generic",
	}
    }

    pub fn object(&self) -> &K {
	match self {
	    Notification::Create(obj)
	    | Notification::Delete(obj)
	    | Notification::Generic(obj) => obj,
	    Notification::Update{ new, .. } => new,
	}
    }

    /* The latest known revision of the object */
    pub fn into_object(self) -> K {
	match self {
	    Notification::Create(obj)
	    | Notification::Delete(obj)
	    | Notification::Generic(obj) => obj,
	    Notification::Update{ new, .. } => new,
	}
    }
}

/*
 * Turns the kube watcher's Apply/Delete/Init* events into notifications.
 * The watcher doesn't say whether an Apply is a create or an update, nor
 * hand out the previous revision, so the last revision of every object is
 * remembered here.
 */
pub struct Notifier<K>
where
    K: Resource,
    K::DynamicType: Eq + Hash,
{
    seen: HashMap<ObjectRef<K>, K>,

    /* objects listed since the last Init, None when not relisting */
    relisted: Option<HashSet<ObjectRef<K>>>,
}

impl<K> Default for Notifier<K>
where
    K: Resource,
    K::DynamicType: Eq + Hash,
{
    fn default() -> Self {
	Self{
	    seen: HashMap::new(),
	    relisted: None,
	}
    }
}

impl<K> Notifier<K>
where
    K: Resource + Clone,
    K::DynamicType: Default + Eq + Hash + Clone,
{
    pub fn observe(&mut self, event: WatchEvent<K>) -> Vec<Notification<K>> {
	match event {
	    WatchEvent::Apply(obj) => {
		let key = ObjectRef::from_obj(&obj);
		match self.seen.insert(key, obj.clone()) {
		    Some(old) => vec![Notification::Update{ old, new: obj }],
		    None => vec![Notification::Create(obj)],
		}
	    },
	    WatchEvent::Delete(obj) => {
		self.seen.remove(&ObjectRef::from_obj(&obj));
		vec![Notification::Delete(obj)]
	    },
	    WatchEvent::Init => {
		self.relisted = Some(HashSet::new());
		vec![]
	    },
	    WatchEvent::InitApply(obj) => {
		let key = ObjectRef::from_obj(&obj);
		if let Some(relisted) = self.relisted.as_mut() {
		    relisted.insert(key.clone());
		}
		self.seen.insert(key, obj.clone());
		vec![Notification::Generic(obj)]
	    },
	    WatchEvent::InitDone => {
		/* anything not relisted was deleted while the watch was down */
		let relisted = self.relisted.take().unwrap_or_default();
		let gone: Vec<ObjectRef<K>> = self.seen.keys()
		    .filter(|key| !relisted.contains(*key))
		    .cloned()
		    .collect();

		gone.into_iter()
		    .filter_map(|key| self.seen.remove(&key))
		    .map(Notification::Delete)
		    .collect()
	    },
	}
    }
}
