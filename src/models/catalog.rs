use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub benefit: String,
}

/// Everything the LLM fallback is told about the academy.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub knowledge: Vec<KnowledgeEntry>,
    pub plans: Vec<Plan>,
    pub promotions: Vec<Promotion>,
    pub partners: Vec<Partner>,
}
