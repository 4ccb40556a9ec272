use std::collections::BTreeMap;

use crate::error::ManifestError;
use crate::value::Value;

/// Marker key of a function member: `{"func": null}`
pub const FUNCTION_KEY: &str = "func";

/// Marker key of a constant member: `{"const": <value>}`
pub const CONSTANT_KEY: &str = "const";

/// One member of an introspection manifest
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Function,
    Constant(Value),
    Namespace(BTreeMap<String, Descriptor>),
}

impl Descriptor {
    /// Validate a whole manifest returned for the object `root`
    ///
    /// The manifest itself is always a namespace: a map from member name to
    /// member descriptor. Error paths are dotted and start at `root`.
    pub fn parse_manifest(
        root: &str,
        manifest: &Value,
    ) -> Result<BTreeMap<String, Descriptor>, ManifestError> {
        match manifest {
            Value::Map(members) => parse_members(root, members),
            other => Err(ManifestError::NotAMap {
                path: root.to_string(),
                found: other.kind(),
            }),
        }
    }

    /// Validate a single member found at `path`
    ///
    /// A map holding only `func` is a function, a map holding only `const`
    /// is a constant. A marker key next to anything else is rejected rather
    /// than guessed at; every other map is a namespace.
    pub fn parse(path: &str, value: &Value) -> Result<Descriptor, ManifestError> {
        let map = value.as_map().ok_or_else(|| ManifestError::NotAMap {
            path: path.to_string(),
            found: value.kind(),
        })?;

        let has_func = map.contains_key(FUNCTION_KEY);
        let has_const = map.contains_key(CONSTANT_KEY);

        match (has_func, has_const, map.len()) {
            (true, false, 1) => Ok(Descriptor::Function),
            (false, true, 1) => Ok(Descriptor::Constant(
                map.get(CONSTANT_KEY).cloned().unwrap_or_default(),
            )),
            (false, false, _) => parse_members(path, map).map(Descriptor::Namespace),
            _ => Err(ManifestError::Ambiguous {
                path: path.to_string(),
            }),
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Descriptor::Function)
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Descriptor::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn members(&self) -> Option<&BTreeMap<String, Descriptor>> {
        match self {
            Descriptor::Namespace(members) => Some(members),
            _ => None,
        }
    }

    /// Render back into the wire shape
    pub fn to_value(&self) -> Value {
        match self {
            Descriptor::Function => marker(FUNCTION_KEY, Value::Null),
            Descriptor::Constant(value) => marker(CONSTANT_KEY, value.clone()),
            Descriptor::Namespace(members) => Self::manifest_to_value(members),
        }
    }

    pub fn manifest_to_value(members: &BTreeMap<String, Descriptor>) -> Value {
        Value::Map(
            members
                .iter()
                .map(|(name, member)| (name.clone(), member.to_value()))
                .collect(),
        )
    }
}

fn parse_members(
    path: &str,
    members: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Descriptor>, ManifestError> {
    members
        .iter()
        .map(|(name, value)| {
            let child = format!("{}.{}", path, name);
            Descriptor::parse(&child, value).map(|d| (name.clone(), d))
        })
        .collect()
}

fn marker(key: &str, value: Value) -> Value {
    let mut map = BTreeMap::new();
    map.insert(key.to_string(), value);
    Value::Map(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn recognizes_all_three_shapes() {
        let parsed = Descriptor::parse_manifest(
            "sim",
            &manifest(
                r#"{
                    "ping": {"func": null},
                    "version": {"const": "1.2.0"},
                    "scene": {"load": {"func": null}, "flags": {"const": 3}}
                }"#,
            ),
        )
        .unwrap();

        assert_eq!(parsed["ping"], Descriptor::Function);
        assert_eq!(parsed["version"], Descriptor::Constant(Value::from("1.2.0")));

        let scene = parsed["scene"].members().unwrap();
        assert!(scene["load"].is_function());
        assert_eq!(scene["flags"].as_constant(), Some(&Value::Integer(3)));
    }

    #[test]
    fn function_marker_value_is_ignored() {
        let d = Descriptor::parse("a.f", &manifest(r#"{"func": {"arity": 2}}"#)).unwrap();
        assert_eq!(d, Descriptor::Function);
    }

    #[test]
    fn null_constant_is_kept() {
        let d = Descriptor::parse("a.c", &manifest(r#"{"const": null}"#)).unwrap();
        assert_eq!(d, Descriptor::Constant(Value::Null));
    }

    #[test]
    fn empty_map_is_an_empty_namespace() {
        let d = Descriptor::parse("a.empty", &manifest("{}")).unwrap();
        assert_eq!(d, Descriptor::Namespace(BTreeMap::new()));
    }

    #[test]
    fn marker_next_to_other_keys_is_ambiguous() {
        let err = Descriptor::parse_manifest(
            "sim",
            &manifest(r#"{"odd": {"func": null, "doc": "hi"}}"#),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ManifestError::Ambiguous {
                path: "sim.odd".into()
            }
        );

        let err = Descriptor::parse("x", &manifest(r#"{"func": null, "const": 1}"#)).unwrap_err();
        assert!(matches!(err, ManifestError::Ambiguous { .. }));
    }

    #[test]
    fn non_map_member_reports_its_path() {
        let err =
            Descriptor::parse_manifest("sim", &manifest(r#"{"deep": {"bad": 5}}"#)).unwrap_err();
        assert_eq!(
            err,
            ManifestError::NotAMap {
                path: "sim.deep.bad".into(),
                found: "integer",
            }
        );
    }

    #[test]
    fn root_must_be_a_map() {
        let err = Descriptor::parse_manifest("sim", &Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "member `sim` must be a map, found null");
    }

    #[test]
    fn root_member_named_like_a_marker_is_a_member() {
        // The root is never itself a function or constant
        let parsed =
            Descriptor::parse_manifest("obj", &manifest(r#"{"func": {"func": null}}"#)).unwrap();
        assert_eq!(parsed["func"], Descriptor::Function);
    }

    #[test]
    fn to_value_reproduces_the_wire_shape() {
        let source = manifest(r#"{"a": {"func": null}, "b": {"const": [1, 2]}, "c": {"d": {"func": null}}}"#);
        let parsed = Descriptor::parse_manifest("r", &source).unwrap();
        assert_eq!(Descriptor::manifest_to_value(&parsed), source);
    }
}
