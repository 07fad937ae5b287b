/*
 * ytt data values carried by the pinniped addon secrets.
 *
 * The document is parsed into a generic yaml tree, but only the `pinniped`
 * section is reachable for writing through PinnipedSection. Everything else
 * in the tree round-trips untouched, except for comments which the yaml
 * serializer drops.
 */

use pinniped_config_api::PinnipedInfo;
use serde_yaml::Mapping;
use serde_yaml::Value;
use thiserror::Error;

/* Re-emitted in front of every patched document, ytt needs it to treat the document as data values */
pub const DATA_VALUES_HEADER: &str = "#@data/values\n#@overlay/match-child-defaults missing_ok=True\n---\n";

const PINNIPED_SECTION: &str = "pinniped";
const SUPERVISOR_ENDPOINT_KEY: &str = "supervisor_svc_endpoint";
const SUPERVISOR_CA_BUNDLE_KEY: &str = "supervisor_ca_bundle_data";

#[derive(Error, Debug)]
pub enum ValuesError {

    #[error("unable to parse values document: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("unable to serialize values document: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("values document has no `pinniped` section")]
    MissingSection,

    #[error("`pinniped` section is {0}, expected a map")]
    SectionNotMap(&'static str),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
	Value::Null => "null",
	Value::Bool(_) => "a boolean",
	Value::Number(_) => "a number",
	Value::String(_) => "a string",
	Value::Sequence(_) => "a list",
	Value::Mapping(_) => "a map",
	Value::Tagged(_) => "a tagged value",
    }
}

#[derive(Debug)]
pub struct ValuesDocument {
    tree: Value,
}

/* Write access to `pinniped`, limited to the two supervisor fields */
pub struct PinnipedSection<'a> {
    section: &'a mut Mapping,
}

impl PinnipedSection<'_> {

    pub fn set_supervisor_endpoint(&mut self, endpoint: &str) {
	self.section.insert(Value::from(SUPERVISOR_ENDPOINT_KEY), Value::from(endpoint));
    }

    pub fn set_supervisor_ca_bundle(&mut self, ca_bundle_data: &str) {
	self.section.insert(Value::from(SUPERVISOR_CA_BUNDLE_KEY), Value::from(ca_bundle_data));
    }
}

impl ValuesDocument {

    /*
     * The directive header is made of yaml comments and a document start
     * marker, so the parser discards it along with any other comment.
     */
    pub fn parse(document: &[u8]) -> Result<Self, ValuesError> {
	let tree = serde_yaml::from_slice(document).map_err(ValuesError::Parse)?;

	Ok(Self{ tree })
    }

    pub fn pinniped_section(&mut self) -> Result<PinnipedSection<'_>, ValuesError> {
	match self.tree.get_mut(PINNIPED_SECTION) {
	    Some(Value::Mapping(section)) => Ok(PinnipedSection{ section }),
	    Some(other) => Err(ValuesError::SectionNotMap(kind_of(other))),
	    None => Err(ValuesError::MissingSection),
	}
    }

    /*
     * Header followed by the tree, newline terminated. Map keys keep the
     * order they were parsed (or inserted) in, so rendering an unchanged
     * tree twice gives the same bytes.
     */
    pub fn render(&self) -> Result<String, ValuesError> {
	let body = serde_yaml::to_string(&self.tree).map_err(ValuesError::Serialize)?;

	let mut document = String::with_capacity(DATA_VALUES_HEADER.len() + body.len() + 1);
	document.push_str(DATA_VALUES_HEADER);
	document.push_str(&body);
	if !document.ends_with('\n') {
	    document.push('\n');
	}
	Ok(document)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub document: Vec<u8>,

    /* false when `document` is byte-for-byte the input, nothing to write */
    pub changed: bool,
}

/*
 * Points the pinniped section of `current` at the supervisor described by
 * `info`. The two supervisor fields are overwritten, the rest of the
 * document is kept.
 */
pub fn patch(current: &[u8], info: &PinnipedInfo) -> Result<Patched, ValuesError> {
    let mut values = ValuesDocument::parse(current)?;

    let mut pinniped = values.pinniped_section()?;
    pinniped.set_supervisor_endpoint(&info.issuer);
    pinniped.set_supervisor_ca_bundle(&info.issuer_ca_bundle_data);

    let document = values.render()?.into_bytes();
    let changed = document.as_slice() != current;

    Ok(Patched{ document, changed })
}
