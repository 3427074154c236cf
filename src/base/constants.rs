//! Domain constants: file extensions, well-known names, scope and type aliases.

/// File extension of flow definition documents.
pub const FLOW_FILE_EXTENSION: &str = "xml";

/// Marker element naming the start state in the first schema generation.
pub const START_STATE_TAG: &str = "start-state";
/// Attribute on the start-state marker holding the state id.
pub const START_STATE_IDREF: &str = "idref";
/// Attribute on `flow` holding the start state id in the second schema generation.
pub const START_STATE_ATTRIBUTE: &str = "start-state";

pub const ID: &str = "id";
pub const TO: &str = "to";
pub const ON: &str = "on";
pub const ON_EXCEPTION: &str = "on-exception";
pub const BEAN: &str = "bean";
pub const METHOD: &str = "method";
pub const EXPRESSION: &str = "expression";
pub const SCOPE: &str = "scope";
pub const NAME: &str = "name";
pub const VALUE: &str = "value";
pub const TYPE: &str = "type";
pub const CLASS: &str = "class";
pub const TEST: &str = "test";
pub const FLOW: &str = "flow";
pub const RESOURCE: &str = "resource";

/// Scopes accepted by `scope` attributes unless configured otherwise.
pub const SCOPE_TYPES: &[&str] = &["request", "flash", "flow", "conversation"];

/// Delimiters of an expression that defers resolution to runtime.
pub const EXPRESSION_PREFIX: &str = "${";
pub const EXPRESSION_SUFFIX: &str = "}";

/// Short type names usable in place of a fully qualified class name.
pub const TYPE_ALIASES: &[(&str, &str)] = &[
    ("string", "java.lang.String"),
    ("short", "java.lang.Short"),
    ("integer", "java.lang.Integer"),
    ("int", "java.lang.Integer"),
    ("byte", "java.lang.Byte"),
    ("long", "java.lang.Long"),
    ("float", "java.lang.Float"),
    ("double", "java.lang.Double"),
    ("bigInteger", "java.math.BigInteger"),
    ("bigDecimal", "java.math.BigDecimal"),
    ("boolean", "java.lang.Boolean"),
    ("class", "java.lang.Class"),
    ("labeledEnum", "org.springframework.core.enums.LabeledEnum"),
];

/// Resolve a type alias to its class name.
pub fn resolve_alias(name: &str) -> Option<&'static str> {
    TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, class)| *class)
}

/// Namespace fragments identifying the flow schema generation.
pub mod schema {
    pub const V1_LOCATION: &str = "spring-webflow-1.0.xsd";
    pub const V2_LOCATION: &str = "spring-webflow-2.0.xsd";
    pub const SCHEMA_LOCATION_ATTRIBUTE: &str = "xsi:schemaLocation";
}
