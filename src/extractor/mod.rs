pub mod config;
pub mod industry;

pub use config::ExtractorConfig;
pub use industry::{IndustryClassifier, IndustryRule, DEFAULT_INDUSTRY};

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::types::{PageSnapshot, ProfileRecord};

pub const DEFAULT_NAME: &str = "there";

/// Reads a profile out of a page. Stateless: the output depends only on the
/// URL and DOM handed in.
#[derive(Debug, Clone)]
pub struct ProfileExtractor {
    profile_url: Regex,
    headings: Vec<Selector>,
    name: Vec<Selector>,
    headline: Vec<Selector>,
    company: Vec<Selector>,
    location: Vec<Selector>,
    about: Vec<Selector>,
    experience: Vec<Selector>,
    max_experience_items: usize,
    max_about_chars: usize,
    classifier: IndustryClassifier,
}

fn compile(field: &str, selectors: &[String]) -> Result<Vec<Selector>> {
    selectors
        .iter()
        .map(|s| {
            Selector::parse(s)
                .map_err(|e| Error::Config(format!("{} selector '{}': {:?}", field, s, e)))
        })
        .collect()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ProfileExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let profile_url = Regex::new(&config.profile_url_pattern)
            .map_err(|e| Error::Config(format!("profile_url_pattern: {}", e)))?;

        Ok(Self {
            profile_url,
            headings: compile("heading", &config.heading_selectors)?,
            name: compile("name", &config.name_selectors)?,
            headline: compile("headline", &config.headline_selectors)?,
            company: compile("company", &config.company_selectors)?,
            location: compile("location", &config.location_selectors)?,
            about: compile("about", &config.about_selectors)?,
            experience: compile("experience", &config.experience_selectors)?,
            max_experience_items: config.max_experience_items,
            max_about_chars: config.max_about_chars,
            classifier: IndustryClassifier::new(&config.industries)?,
        })
    }

    pub fn is_profile_url(&self, url: &str) -> bool {
        self.profile_url.is_match(url)
    }

    /// Extract from a page, refusing anything that is not a profile. Both the
    /// address and a recognized heading are required.
    pub fn extract_page(&self, page: &PageSnapshot) -> Result<ProfileRecord> {
        if !self.is_profile_url(&page.url) {
            log::debug!("{} does not look like a profile address", page.url);
            return Err(Error::NotAProfilePage);
        }

        let document = Html::parse_document(&page.html);
        let has_heading = self
            .headings
            .iter()
            .any(|sel| document.select(sel).next().is_some());
        if !has_heading {
            log::debug!("no recognized profile heading on {}", page.url);
            return Err(Error::NotAProfilePage);
        }

        Ok(self.extract(&document))
    }

    /// Field-by-field extraction. Never fails: a field with no matching
    /// locator gets its default.
    pub fn extract(&self, document: &Html) -> ProfileRecord {
        let name = first_text(document, &self.name).unwrap_or_else(|| DEFAULT_NAME.to_string());
        let headline = first_text(document, &self.headline).unwrap_or_default();
        let company = first_text(document, &self.company)
            .or_else(|| company_from_headline(&headline))
            .unwrap_or_default();
        let location = first_text(document, &self.location).unwrap_or_default();
        let about: String = first_text(document, &self.about)
            .map(|text| text.chars().take(self.max_about_chars).collect())
            .unwrap_or_default();
        let experience = self.experience_summary(document);
        let industry = self.classifier.classify(&headline, &about, &company);

        ProfileRecord {
            name,
            headline,
            company,
            location,
            about,
            experience,
            industry,
        }
    }

    fn experience_summary(&self, document: &Html) -> String {
        for selector in &self.experience {
            let items: Vec<String> = document
                .select(selector)
                .map(|el| normalize(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .take(self.max_experience_items)
                .collect();
            if !items.is_empty() {
                return items.join("; ");
            }
        }
        String::new()
    }
}

fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .map(|el| normalize(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    })
}

/// "Staff Engineer at Acme Corp | Speaker" -> "Acme Corp"
fn company_from_headline(headline: &str) -> Option<String> {
    let (_, rest) = headline.split_once(" at ")?;
    let company = rest
        .split(['|', ',', '·'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    (!company.is_empty()).then(|| company.to_string())
}
