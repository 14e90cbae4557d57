use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSpec {
    Step(String),
    Group(BranchGroup),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchGroup {
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub steps: Vec<StepSpec>,
}

impl StepSpec {
    pub fn step(name: impl Into<String>) -> Self {
        Self::Step(name.into())
    }

    pub fn group<N, I>(branches: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<StepSpec>)>,
    {
        Self::Group(BranchGroup {
            branches: branches
                .into_iter()
                .map(|(name, steps)| Branch {
                    name: name.into(),
                    steps,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSpec {
    pub steps: Vec<StepSpec>,
    pub auto_advance: bool,
    pub auto_reset: bool,
    pub auto_validate: bool,
    pub lockdown: bool,
    pub default_branch: bool,
    pub wizard_action: String,
    pub complete_url: String,
    pub cancel_url: String,
    pub data_owners: Vec<String>,
}

impl Default for WizardSpec {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            auto_advance: true,
            auto_reset: false,
            auto_validate: false,
            lockdown: false,
            default_branch: true,
            wizard_action: "wizard".to_string(),
            complete_url: "/".to_string(),
            cancel_url: "/".to_string(),
            data_owners: Vec::new(),
        }
    }
}

impl WizardSpec {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    pub fn all_step_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_step_names(&self.steps, &mut names);
        names
    }

    pub fn all_branch_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_branch_names(&self.steps, &mut names);
        names
    }
}

fn collect_step_names<'a>(steps: &'a [StepSpec], names: &mut Vec<&'a str>) {
    for step in steps {
        match step {
            StepSpec::Step(name) => names.push(name.as_str()),
            StepSpec::Group(group) => {
                for branch in &group.branches {
                    collect_step_names(&branch.steps, names);
                }
            }
        }
    }
}

fn collect_branch_names<'a>(steps: &'a [StepSpec], names: &mut Vec<&'a str>) {
    for step in steps {
        if let StepSpec::Group(group) = step {
            for branch in &group.branches {
                names.push(branch.name.as_str());
                collect_branch_names(&branch.steps, names);
            }
        }
    }
}

impl Serialize for StepSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Step(name) => serializer.serialize_str(name),
            Self::Group(group) => {
                let mut map = serializer.serialize_map(Some(group.branches.len()))?;
                for branch in &group.branches {
                    match branch.steps.as_slice() {
                        [Self::Step(only)] => map.serialize_entry(&branch.name, only)?,
                        steps => map.serialize_entry(&branch.name, steps)?,
                    }
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for StepSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StepSpecVisitor)
    }
}

struct StepSpecVisitor;

impl<'de> Visitor<'de> for StepSpecVisitor {
    type Value = StepSpec;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a step name or a table of branches")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<StepSpec, E> {
        Ok(StepSpec::Step(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<StepSpec, E> {
        Ok(StepSpec::Step(value))
    }

    // Entries are collected in input order; the first branch is the default.
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StepSpec, A::Error> {
        let mut branches = Vec::new();
        while let Some((name, body)) = access.next_entry::<String, BranchBody>()? {
            branches.push(Branch {
                name,
                steps: body.0,
            });
        }
        Ok(StepSpec::Group(BranchGroup { branches }))
    }
}

struct BranchBody(Vec<StepSpec>);

impl<'de> Deserialize<'de> for BranchBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BranchBodyVisitor)
    }
}

struct BranchBodyVisitor;

impl<'de> Visitor<'de> for BranchBodyVisitor {
    type Value = BranchBody;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a step name or a list of steps")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<BranchBody, E> {
        Ok(BranchBody(vec![StepSpec::Step(value.to_string())]))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<BranchBody, E> {
        Ok(BranchBody(vec![StepSpec::Step(value)]))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<BranchBody, A::Error> {
        let mut steps = Vec::new();
        while let Some(step) = access.next_element::<StepSpec>()? {
            steps.push(step);
        }
        Ok(BranchBody(steps))
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<BranchBody, A::Error> {
        StepSpecVisitor.visit_map(access).map(|group| BranchBody(vec![group]))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_nested_groups_in_declaration_order() {
        let raw = r#"["job", {"nodegree": "experience", "degree": ["college", "degree_type"]}, "confirm"]"#;
        let steps: Vec<StepSpec> = serde_json::from_str(raw).expect("steps");

        assert_eq!(
            steps,
            vec![
                StepSpec::step("job"),
                StepSpec::group([
                    ("nodegree", vec![StepSpec::step("experience")]),
                    (
                        "degree",
                        vec![StepSpec::step("college"), StepSpec::step("degree_type")]
                    ),
                ]),
                StepSpec::step("confirm"),
            ]
        );
    }

    #[test]
    fn rejects_numbers_as_steps() {
        let result = serde_json::from_value::<Vec<StepSpec>>(json!(["a", 3]));
        assert!(result.is_err());
    }

    #[test]
    fn serializes_single_step_branches_as_plain_names() {
        let steps = vec![StepSpec::group([
            ("x", vec![StepSpec::step("s1")]),
            ("y", vec![StepSpec::step("s2"), StepSpec::step("s3")]),
        ])];

        let value = serde_json::to_value(&steps).expect("serialize");
        assert_eq!(value, json!([{"x": "s1", "y": ["s2", "s3"]}]));
    }

    #[test]
    fn defaults_match_documented_flags() {
        let spec: WizardSpec = serde_json::from_value(json!({"steps": ["a"]})).expect("spec");
        assert!(spec.auto_advance);
        assert!(!spec.auto_reset);
        assert!(!spec.auto_validate);
        assert!(!spec.lockdown);
        assert!(spec.default_branch);
        assert_eq!(spec.wizard_action, "wizard");
        assert_eq!(spec.complete_url, "/");
        assert_eq!(spec.cancel_url, "/");
    }

    #[test]
    fn collects_names_across_every_branch() {
        let spec = WizardSpec::new(vec![
            StepSpec::step("start"),
            StepSpec::group([
                ("x", vec![StepSpec::step("s1")]),
                (
                    "y",
                    vec![StepSpec::group([("z", vec![StepSpec::step("s2")])])],
                ),
            ]),
            StepSpec::step("end"),
        ]);

        assert_eq!(spec.all_step_names(), vec!["start", "s1", "s2", "end"]);
        assert_eq!(spec.all_branch_names(), vec!["x", "y", "z"]);
    }
}
