//! Vocabulary shared by upstream adapters and the builders.
//!
//! Classes, predicates and attribute keys are plain strings so the ontology
//! stays open-ended; the constants below are the ones the builders act on.

/// Default namespace for predicates synthesized by the engine.
pub const NAMESPACE: &str = "knit";

/// Node classes.
pub mod class {
    pub const TOPIC: &str = "knit:Topic";
    pub const DOCUMENT: &str = "knit:Document";
    pub const CHUNK: &str = "knit:Chunk";

    /// Class assumed for input nodes that name none.
    pub const UNKNOWN: &str = "knit:Unknown";

    pub const FILE: &str = "knit:File";
    pub const CLASS: &str = "knit:Class";
    pub const FUNCTION: &str = "knit:Function";
    pub const METHOD: &str = "knit:Method";

    pub const VIDEO: &str = "knit:Video";
    pub const VIDEO_SEGMENT: &str = "knit:VideoSegment";

    /// Classes that represent source-code artifacts.
    pub fn is_code(class: &str) -> bool {
        matches!(class, FILE | CLASS | FUNCTION | METHOD)
    }
}

/// Relationship types.
pub mod predicate {
    pub const HAS_PARENT: &str = "knit:hasParent";
    pub const HAS_CHILD: &str = "knit:hasChild";
    pub const NEXT: &str = "knit:next";
    pub const PREVIOUS: &str = "knit:previous";
    pub const CONTAINS: &str = "knit:contains";
    pub const BELONGS_TO: &str = "knit:belongsTo";
    pub const IMPORTS: &str = "knit:imports";
}

/// Attribute keys.
pub mod attr {
    pub const TEXT: &str = "schema:text";
    pub const SOURCE: &str = "knit:source";
    pub const FILE_PATH: &str = "knit:filePath";
    pub const START_TIME: &str = "knit:startTime";

    pub const CLASS_NAME: &str = "meta:class_name";
    pub const FUNCTION_NAME: &str = "meta:function_name";
    pub const IMPORTS: &str = "meta:imports";
    pub const PARENT_NODE: &str = "meta:parent_node";

    pub const VECTOR: &str = "vector";
    pub const EMBEDDING: &str = "embedding";
}

/// Split `ns:local` into its namespace and local name.
///
/// The split happens at the last `:`; unqualified names have no namespace.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind(':') {
        Some(idx) => (Some(&name[..idx]), &name[idx + 1..]),
        None => (None, name),
    }
}

/// Qualify `local` with the namespace of `like`, or [`NAMESPACE`] if `like`
/// carries none.
pub fn qualify_like(like: &str, local: &str) -> String {
    let ns = split_qualified(like).0.filter(|ns| !ns.is_empty()).unwrap_or(NAMESPACE);
    format!("{}:{}", ns, local)
}
