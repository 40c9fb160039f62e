use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_INDUSTRY: &str = "professional";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl IndustryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

pub fn default_rules() -> Vec<IndustryRule> {
    vec![
        IndustryRule::new(
            "technology",
            &[
                "software", "engineer", "engineering", "developer", "tech", "data", "ai",
                "machine learning", "cloud", "devops", "saas", "cybersecurity",
            ],
        ),
        IndustryRule::new(
            "finance",
            &[
                "finance", "financial", "bank", "banking", "investment", "investor", "fintech",
                "accounting", "accountant", "trading", "venture capital",
            ],
        ),
        IndustryRule::new(
            "healthcare",
            &[
                "health", "healthcare", "medical", "hospital", "clinical", "pharma", "nurse",
                "physician", "biotech",
            ],
        ),
        IndustryRule::new(
            "education",
            &["education", "teacher", "professor", "university", "school", "research", "phd"],
        ),
        IndustryRule::new(
            "marketing",
            &["marketing", "brand", "advertising", "growth", "seo", "content", "social media"],
        ),
        IndustryRule::new(
            "sales",
            &["sales", "account executive", "business development", "revenue", "partnerships"],
        ),
        IndustryRule::new(
            "consulting",
            &["consulting", "consultant", "advisor", "advisory", "strategy"],
        ),
        IndustryRule::new(
            "design",
            &["design", "designer", "ux", "ui", "product design", "creative"],
        ),
    ]
}

/// First-match-wins keyword table. Rules are evaluated in declared order and
/// keywords match whole words case-insensitively, allowing a plural `s`/`es`
/// ending ("investors" matches "investor").
#[derive(Debug, Clone)]
pub struct IndustryClassifier {
    rules: Vec<(String, Regex)>,
}

impl IndustryClassifier {
    pub fn new(rules: &[IndustryRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .filter(|rule| !rule.keywords.is_empty())
            .map(|rule| {
                let alternatives = rule
                    .keywords
                    .iter()
                    .map(|k| regex::escape(&k.to_lowercase()))
                    .collect::<Vec<_>>()
                    .join("|");
                Regex::new(&format!(r"\b(?:{})(?:s|es)?\b", alternatives))
                    .map(|re| (rule.category.clone(), re))
                    .map_err(|e| {
                        Error::Config(format!("industry rule '{}': {}", rule.category, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules: compiled })
    }

    pub fn classify(&self, headline: &str, about: &str, company: &str) -> String {
        let text = format!("{} {} {}", headline, about, company).to_lowercase();
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(&text))
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| DEFAULT_INDUSTRY.to_string())
    }
}

impl Default for IndustryClassifier {
    fn default() -> Self {
        // Built from escaped literals, which always form a valid pattern.
        Self::new(&default_rules()).unwrap_or(Self { rules: Vec::new() })
    }
}
