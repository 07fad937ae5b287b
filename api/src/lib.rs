/*
 * pinniped-config/api - defines the identities and typed views over the
 * kubernetes objects shared by the pinniped config controller
 */

pub mod identity;
pub use identity::NamespacedName;
pub use identity::PINNIPED_INFO_NAME;
pub use identity::PINNIPED_INFO_NAMESPACE;

pub mod pinniped_info;
pub use pinniped_info::MissingField;
pub use pinniped_info::PinnipedInfo;

pub mod addon_secret;
pub use addon_secret::ADDON_NAME_LABEL;
pub use addon_secret::CLUSTER_NAME_LABEL;
pub use addon_secret::PINNIPED_ADDON_NAME;
pub use addon_secret::VALUES_KEY;
