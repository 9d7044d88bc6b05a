//! Benchmark document model
//!
//! Documents follow the kube-bench layout: `groups[].checks[]`, optionally
//! wrapped in a `controls` mapping. Shape variations (scalar ids, null lists,
//! `tests` given as a bare list) are resolved here so the rest of the
//! pipeline only ever sees one canonical structure.
//!
//! Each check is converted on its own. A check that cannot be read becomes
//! a [`CheckEntry::Invalid`] in place, so its siblings still run.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use thiserror::Error;

/// Errors raised while turning YAML text into a definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("YAML file is empty or invalid")]
    Empty,

    #[error("expected a mapping at the document root")]
    NotAMapping,

    #[error("{0}")]
    Malformed(#[from] serde_yaml::Error),
}

/// A parsed benchmark document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BenchmarkDefinition {
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub text: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "scalar_string")]
    pub node_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub groups: Vec<Group>,
}

impl BenchmarkDefinition {
    /// Parse a benchmark document, unwrapping a non-empty `controls` mapping if present
    pub fn from_yaml(yaml: &str) -> Result<Self, DefinitionError> {
        let root: Value = serde_yaml::from_str(yaml)?;

        if is_empty_value(&root) {
            return Err(DefinitionError::Empty);
        }
        let Value::Mapping(mapping) = &root else {
            return Err(DefinitionError::NotAMapping);
        };

        let body = match mapping.get("controls") {
            Some(controls @ Value::Mapping(inner)) if !inner.is_empty() => controls.clone(),
            _ => root.clone(),
        };

        Ok(serde_yaml::from_value(body)?)
    }

    /// Every check entry, readable or not, in declared order
    pub fn entries(&self) -> impl Iterator<Item = &CheckEntry> {
        self.groups.iter().flat_map(|g| g.checks.iter())
    }

    /// Readable checks in declared order
    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.entries().filter_map(CheckEntry::check)
    }

    pub fn check_count(&self) -> usize {
        self.groups.iter().map(|g| g.checks.len()).sum()
    }
}

/// A named collection of related checks
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Group {
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "check_entries")]
    pub checks: Vec<CheckEntry>,
}

/// A check as found in a group
#[derive(Debug, Clone, PartialEq)]
pub enum CheckEntry {
    Valid(Check),
    Invalid(InvalidCheck),
}

/// A check whose fields could not be read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvalidCheck {
    pub id: Option<String>,
    pub text: Option<String>,
    pub message: String,
}

impl CheckEntry {
    /// Convert one raw check, keeping its id and text when the rest is unreadable
    pub fn from_value(value: Value) -> Self {
        let field = |key: &str| value.get(key).and_then(scalar_text);
        let id = field("id");
        let text = field("text");

        match serde_yaml::from_value::<Check>(value) {
            Ok(check) => CheckEntry::Valid(check),
            Err(e) => CheckEntry::Invalid(InvalidCheck {
                id,
                text,
                message: e.to_string(),
            }),
        }
    }

    pub fn check(&self) -> Option<&Check> {
        match self {
            CheckEntry::Valid(check) => Some(check),
            CheckEntry::Invalid(_) => None,
        }
    }
}

/// Whether a check runs its audit command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Automated,
    Manual,
}

/// One benchmark rule
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Check {
    /// Display label; may be absent or duplicated across documents
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub audit: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "scalar_string")]
    pub check_type: Option<String>,
    #[serde(default, deserialize_with = "truthy_bool")]
    pub use_multiple_values: bool,
    #[serde(default, deserialize_with = "scalar_string")]
    pub remediation: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub tests: TestSpec,
}

impl Check {
    pub fn kind(&self) -> CheckKind {
        match self.check_type.as_deref() {
            Some("manual") => CheckKind::Manual,
            _ => CheckKind::Automated,
        }
    }

    /// Remediation text with surrounding whitespace removed
    pub fn remediation_text(&self) -> String {
        self.remediation
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }
}

/// Boolean combinator folding item verdicts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BinOp {
    #[default]
    And,
    Or,
    /// Anything else; combination yields WARN
    Other(String),
}

impl BinOp {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            None => BinOp::And,
            Some(v) if v.is_empty() || v == "and" => BinOp::And,
            Some(v) if v == "or" => BinOp::Or,
            Some(v) => BinOp::Other(v),
        }
    }
}

/// The conditions a check's output is evaluated against
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct TestSpec {
    pub bin_op: BinOp,
    pub test_items: Vec<TestItem>,
}

impl TestSpec {
    /// Every decisive item must pass
    pub fn all(test_items: Vec<TestItem>) -> Self {
        Self {
            bin_op: BinOp::And,
            test_items,
        }
    }

    /// At least one decisive item must pass
    pub fn any(test_items: Vec<TestItem>) -> Self {
        Self {
            bin_op: BinOp::Or,
            test_items,
        }
    }
}

/// Mapping form of `tests`
#[derive(Deserialize)]
struct StructuredTests {
    #[serde(default, deserialize_with = "scalar_string")]
    bin_op: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    test_items: Vec<TestItem>,
}

/// `tests` is either a bare list of items (implied `and`) or a mapping
impl TryFrom<Value> for TestSpec {
    type Error = serde_yaml::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(TestSpec::default()),
            Value::Sequence(_) => Ok(TestSpec::all(serde_yaml::from_value(value)?)),
            other => {
                let StructuredTests { bin_op, test_items } = serde_yaml::from_value(other)?;
                Ok(TestSpec {
                    bin_op: BinOp::parse(bin_op.as_deref()),
                    test_items,
                })
            }
        }
    }
}

/// One atomic condition
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TestItem {
    #[serde(default, deserialize_with = "scalar_string")]
    pub flag: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub env: Option<String>,
    /// `Some` whenever the key is present; a null reads as `false`
    #[serde(default, deserialize_with = "present_truthy")]
    pub set: Option<bool>,
    #[serde(default)]
    pub compare: Option<Compare>,
}

impl TestItem {
    pub fn flag(flag: impl Into<String>) -> Self {
        Self {
            flag: Some(flag.into()),
            ..Default::default()
        }
    }

    pub fn env(env: impl Into<String>) -> Self {
        Self {
            env: Some(env.into()),
            ..Default::default()
        }
    }

    pub fn with_set(mut self, set: bool) -> Self {
        self.set = Some(set);
        self
    }

    pub fn with_compare(mut self, op: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare = Some(Compare {
            op: Some(op.into()),
            value: Some(value.into()),
        });
        self
    }

    /// Non-empty values among `flag` and `env`, in that order
    pub fn match_targets(&self) -> Vec<&str> {
        [self.flag.as_deref(), self.env.as_deref()]
            .into_iter()
            .flatten()
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Comparison block of a test item
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Compare {
    #[serde(default, deserialize_with = "scalar_string")]
    pub op: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
}

/// Comparison operators understood by the evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Bitmask,
    Eq,
    Has,
    NotHave,
    Gte,
    ValidElements,
    Unknown(String),
}

impl Compare {
    /// The operator, or `None` when no op is given
    pub fn operator(&self) -> Option<CompareOp> {
        let op = self.op.as_deref()?.to_lowercase();
        let parsed = match op.as_str() {
            "" => return None,
            "bitmask" => CompareOp::Bitmask,
            "eq" => CompareOp::Eq,
            "has" => CompareOp::Has,
            "nothave" | "not_have" => CompareOp::NotHave,
            "gte" => CompareOp::Gte,
            "valid_elements" => CompareOp::ValidElements,
            _ => CompareOp::Unknown(op),
        };
        Some(parsed)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Treat an explicit null the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept any YAML scalar and keep its string form
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Loose truthiness: empty, zero, false and null are false
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

fn truthy_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(truthy(&Value::deserialize(deserializer)?))
}

fn present_truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(truthy(&Value::deserialize(deserializer)?)))
}

fn check_entries<'de, D>(deserializer: D) -> Result<Vec<CheckEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = nullable(deserializer)?;
    Ok(raw.into_iter().map(CheckEntry::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"
controls:
  version: "cis-1.11"
  id: 1
  text: "Control Plane Security Configuration"
  type: "master"
  groups:
    - id: 1.1
      text: "Control Plane Node Configuration Files"
      checks:
        - id: 1.1.1
          text: "Ensure that the API server pod specification file permissions are set to 600 or more restrictive (Automated)"
          audit: "stat -c permissions=%a /etc/kubernetes/manifests/kube-apiserver.yaml"
          tests:
            test_items:
              - flag: "permissions"
                compare:
                  op: bitmask
                  value: 600
          remediation: |
            chmod 600 /etc/kubernetes/manifests/kube-apiserver.yaml
        - id: 1.1.9
          text: "Ensure that the Container Network Interface file permissions are set to 600 or more restrictive (Manual)"
          audit: "ps -ef | grep kubelet | grep -v grep"
          type: manual
          use_multiple_values: true
          tests:
            - flag: "--cni-conf-dir"
              set: true
"#;

    #[test]
    fn test_parse_controls_wrapper() {
        let def = BenchmarkDefinition::from_yaml(MASTER).unwrap();
        assert_eq!(def.version.as_deref(), Some("cis-1.11"));
        assert_eq!(def.id.as_deref(), Some("1"));
        assert_eq!(def.groups.len(), 1);
        assert_eq!(def.groups[0].id.as_deref(), Some("1.1"));
        assert_eq!(def.check_count(), 2);

        let first = def.groups[0].checks[0].check().unwrap();
        assert_eq!(first.id.as_deref(), Some("1.1.1"));
        assert_eq!(first.kind(), CheckKind::Automated);
        assert_eq!(first.tests.bin_op, BinOp::And);
        let compare = first.tests.test_items[0].compare.as_ref().unwrap();
        assert_eq!(compare.operator(), Some(CompareOp::Bitmask));
        // numeric values are kept as their string form
        assert_eq!(compare.value.as_deref(), Some("600"));
        assert_eq!(
            first.remediation_text(),
            "chmod 600 /etc/kubernetes/manifests/kube-apiserver.yaml"
        );
    }

    #[test]
    fn test_bare_list_tests_imply_and() {
        let def = BenchmarkDefinition::from_yaml(MASTER).unwrap();
        let manual = def.groups[0].checks[1].check().unwrap();
        assert_eq!(manual.kind(), CheckKind::Manual);
        assert!(manual.use_multiple_values);
        assert_eq!(manual.tests.bin_op, BinOp::And);
        assert_eq!(manual.tests.test_items.len(), 1);
        assert_eq!(manual.tests.test_items[0].set, Some(true));
    }

    #[test]
    fn test_top_level_groups() {
        let yaml = r#"
version: "1.11"
groups:
  - id: "4.1"
    checks:
      - id: "4.1.1"
        audit: "cat /etc/kubernetes/kubelet.conf"
        tests:
          bin_op: OR
          test_items:
            - flag: "--anonymous-auth"
              compare: { op: eq, value: false }
            - env: "KUBELET_ANONYMOUS_AUTH"
"#;
        let def = BenchmarkDefinition::from_yaml(yaml).unwrap();
        let check = def.checks().next().unwrap();
        assert_eq!(check.tests.bin_op, BinOp::Or);
        assert_eq!(
            check.tests.test_items[0].compare.as_ref().unwrap().value.as_deref(),
            Some("false")
        );
        assert_eq!(check.tests.test_items[1].match_targets(), vec!["KUBELET_ANONYMOUS_AUTH"]);
    }

    #[test]
    fn test_empty_controls_falls_back_to_top_level() {
        let yaml = r#"
controls: {}
groups:
  - checks:
      - id: "x"
"#;
        let def = BenchmarkDefinition::from_yaml(yaml).unwrap();
        assert_eq!(def.check_count(), 1);
    }

    #[test]
    fn test_nulls_are_tolerated() {
        let yaml = r#"
groups:
  - id: "1"
    checks:
      - id: "1.1"
        tests:
        use_multiple_values:
  - id: "2"
    checks:
"#;
        let def = BenchmarkDefinition::from_yaml(yaml).unwrap();
        assert_eq!(def.check_count(), 1);
        let check = def.checks().next().unwrap();
        assert_eq!(check.tests, TestSpec::default());
        assert!(!check.use_multiple_values);
    }

    #[test]
    fn test_loose_flags_follow_truthiness() {
        let yaml = r#"
groups:
  - checks:
      - id: "1.2"
        use_multiple_values: "yes"
        tests:
          test_items:
            - flag: "--profiling"
              set: "true"
            - flag: "--insecure-port"
              set:
            - flag: "--secure-port"
              set: 0
            - flag: "--token-auth-file"
"#;
        let def = BenchmarkDefinition::from_yaml(yaml).unwrap();
        let check = def.checks().next().unwrap();
        assert!(check.use_multiple_values);

        let sets: Vec<Option<bool>> = check.tests.test_items.iter().map(|t| t.set).collect();
        assert_eq!(sets, vec![Some(true), Some(false), Some(false), None]);
    }

    #[test]
    fn test_unreadable_check_is_isolated() {
        let yaml = r#"
groups:
  - id: "1.1"
    checks:
      - id: "1.1.1"
        audit: "echo ok"
      - id: "1.1.2"
        text: "Broken tests block"
        tests: "not a test list"
      - id: "1.1.3"
        tests:
          test_items:
            - flag: "--x"
              compare: "eq"
      - id: "1.1.4"
"#;
        let def = BenchmarkDefinition::from_yaml(yaml).unwrap();
        assert_eq!(def.check_count(), 4);

        let ids: Vec<&str> = def.checks().filter_map(|c| c.id.as_deref()).collect();
        assert_eq!(ids, vec!["1.1.1", "1.1.4"]);

        let invalid: Vec<&InvalidCheck> = def
            .entries()
            .filter_map(|e| match e {
                CheckEntry::Invalid(invalid) => Some(invalid),
                CheckEntry::Valid(_) => None,
            })
            .collect();
        assert_eq!(invalid.len(), 2);
        assert_eq!(invalid[0].id.as_deref(), Some("1.1.2"));
        assert_eq!(invalid[0].text.as_deref(), Some("Broken tests block"));
        assert!(!invalid[0].message.is_empty());
        assert_eq!(invalid[1].id.as_deref(), Some("1.1.3"));
    }

    #[test]
    fn test_empty_and_invalid_documents() {
        assert!(matches!(
            BenchmarkDefinition::from_yaml(""),
            Err(DefinitionError::Empty)
        ));
        assert!(matches!(
            BenchmarkDefinition::from_yaml("{}"),
            Err(DefinitionError::Empty)
        ));
        assert!(matches!(
            BenchmarkDefinition::from_yaml("- a\n- b\n"),
            Err(DefinitionError::NotAMapping)
        ));
        assert!(matches!(
            BenchmarkDefinition::from_yaml("groups: [unclosed"),
            Err(DefinitionError::Malformed(_))
        ));
    }

    #[test]
    fn test_bin_op_parse() {
        assert_eq!(BinOp::parse(None), BinOp::And);
        assert_eq!(BinOp::parse(Some("")), BinOp::And);
        assert_eq!(BinOp::parse(Some("Or")), BinOp::Or);
        assert_eq!(BinOp::parse(Some("xor")), BinOp::Other("xor".into()));
    }

    #[test]
    fn test_compare_operator() {
        let op = |s: &str| Compare {
            op: Some(s.into()),
            value: None,
        }
        .operator();
        assert_eq!(op("not_have"), Some(CompareOp::NotHave));
        assert_eq!(op("NOTHAVE"), Some(CompareOp::NotHave));
        assert_eq!(op(""), None);
        assert_eq!(op("lte"), Some(CompareOp::Unknown("lte".into())));
    }

    #[test]
    fn test_match_targets_skip_empty() {
        let item = TestItem {
            flag: Some(String::new()),
            env: Some("ETCD_CERT_FILE".into()),
            ..Default::default()
        };
        assert_eq!(item.match_targets(), vec!["ETCD_CERT_FILE"]);
        assert!(TestItem::default().match_targets().is_empty());
    }
}
