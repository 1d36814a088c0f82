//! Workspace ("page") models.
//!
//! A workspace is the unit a user registers URLs and documents against and
//! the unit the pipeline builds. Exactly one workspace may be the `main` one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Type tag of a workspace.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// The workspace answered by default in the chat view.
    Main,
    #[default]
    Normal,
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageType::Main => f.write_str("main"),
            PageType::Normal => f.write_str("normal"),
        }
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(PageType::Main),
            "normal" => Ok(PageType::Normal),
            other => Err(format!("unknown page type: {other} (expected main or normal)")),
        }
    }
}

/// A registered workspace.
///
/// # Example
///
/// ```yaml
/// - id: page_1718000000000
///   name: Product docs
///   domainName: example.com
///   systemName: Example Assistant
///   pageType: main
///   createdAt: 2024-06-10T06:13:20Z
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Opaque identifier derived from the creation timestamp.
    pub id: String,

    /// Display name.
    pub name: String,

    #[serde(default)]
    pub domain_name: String,

    #[serde(default)]
    pub system_name: String,

    #[serde(default)]
    pub page_type: PageType,

    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn is_main(&self) -> bool {
        self.page_type == PageType::Main
    }
}

/// Fields supplied when creating a workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkspace {
    pub name: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub system_name: String,
}
