mod assertions;
mod steps;

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::recorder::RecordError;

pub use assertions::{
    expect_container, expect_field_eq, expect_field_present, expect_ids_subset, expect_json,
    expect_status, AssertionError,
};
pub use steps::{run_scenario, ScenarioContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Smoke,
    All,
    HappyPath,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Smoke => "smoke",
            Tag::All => "all",
            Tag::HappyPath => "happy-path",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "smoke" | "smoke-test" => Ok(Tag::Smoke),
            "all" => Ok(Tag::All),
            "happy-path" => Ok(Tag::HappyPath),
            other => Err(format!(
                "unknown tag `{other}` (expected smoke, all or happy-path)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    GetData,
    ListObjects,
    ListObjectsByIds,
    CreateData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub id: &'static str,
    pub title: &'static str,
    pub tags: &'static [Tag],
    pub skip: Option<&'static str>,
}

impl Scenario {
    /// `Tag::All` in `tags` matches everything, as does an empty filter.
    pub fn matches(&self, tags: &[Tag]) -> bool {
        tags.is_empty()
            || tags.contains(&Tag::All)
            || tags.iter().any(|tag| self.tags.contains(tag))
    }
}

const SMOKE_TAGS: &[Tag] = &[Tag::Smoke, Tag::All, Tag::HappyPath];

static CATALOG: [Scenario; 4] = [
    Scenario {
        kind: ScenarioKind::GetData,
        id: "get_data",
        title: "Get Data",
        tags: SMOKE_TAGS,
        skip: None,
    },
    Scenario {
        kind: ScenarioKind::ListObjects,
        id: "list_objects",
        title: "List of all objects",
        tags: SMOKE_TAGS,
        skip: None,
    },
    Scenario {
        kind: ScenarioKind::ListObjectsByIds,
        id: "list_objects_by_ids",
        title: "List of objects by ids",
        tags: SMOKE_TAGS,
        skip: None,
    },
    Scenario {
        kind: ScenarioKind::CreateData,
        id: "create_data",
        title: "Create Data",
        tags: SMOKE_TAGS,
        skip: Some("the /data endpoint is not verified against the target API"),
    },
];

pub fn catalog() -> &'static [Scenario] {
    &CATALOG
}

pub fn select_scenarios(tags: &[Tag]) -> Vec<&'static Scenario> {
    CATALOG.iter().filter(|scenario| scenario.matches(tags)).collect()
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    #[error("recording exchange: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Broken(#[from] anyhow::Error),
}
