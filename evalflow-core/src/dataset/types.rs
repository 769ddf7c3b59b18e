use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of ground truth a [`ReferenceItem`] carries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceItemType {
    Fact,
    RequiredElement,
    UnsafePattern,
    QueryResponse,
}

/// Payload of a reference item. Its shape follows the item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceContent {
    Fact { key: String, value: Value },
    QueryResponse { query: String, response: String },
    Text(String),
}

/// One fact, required phrase, unsafe pattern or exemplar pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ReferenceItemType,
    pub content: ReferenceContent,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceItem {
    fn new(item_type: ReferenceItemType, content: ReferenceContent, tags: &[String]) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            item_type,
            content,
            tags: tags.iter().cloned().collect(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn fact(key: impl Into<String>, value: impl Into<Value>, tags: &[String]) -> Self {
        Self::new(
            ReferenceItemType::Fact,
            ReferenceContent::Fact {
                key: key.into(),
                value: value.into(),
            },
            tags,
        )
    }

    pub fn required_element(element: impl Into<String>, tags: &[String]) -> Self {
        Self::new(
            ReferenceItemType::RequiredElement,
            ReferenceContent::Text(element.into()),
            tags,
        )
    }

    pub fn unsafe_pattern(pattern: impl Into<String>, tags: &[String]) -> Self {
        Self::new(
            ReferenceItemType::UnsafePattern,
            ReferenceContent::Text(pattern.into()),
            tags,
        )
    }

    pub fn query_response(
        query: impl Into<String>,
        response: impl Into<String>,
        tags: &[String],
    ) -> Self {
        Self::new(
            ReferenceItemType::QueryResponse,
            ReferenceContent::QueryResponse {
                query: query.into(),
                response: response.into(),
            },
            tags,
        )
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True when `filter` is empty or shares at least one tag with the item.
    pub fn matches_any_tag(&self, filter: &[String]) -> bool {
        filter.is_empty() || filter.iter().any(|tag| self.tags.contains(tag))
    }
}

/// Named, persisted collection of reference items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: IndexMap<String, ReferenceItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceDataset {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            items: IndexMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends an item and bumps `updated_at`. Returns the item id.
    pub fn add_item(&mut self, item: ReferenceItem) -> String {
        let id = item.id.clone();
        self.items.insert(id.clone(), item);
        self.updated_at = Utc::now();
        id
    }

    pub fn get_item(&self, id: &str) -> Option<&ReferenceItem> {
        self.items.get(id)
    }

    pub fn items_by_type(&self, item_type: ReferenceItemType) -> Vec<&ReferenceItem> {
        self.items
            .values()
            .filter(|item| item.item_type == item_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
