use serde::{Deserialize, Serialize};
use std::path::Path;

use super::industry::{default_rules, IndustryRule};
use crate::error::{Error, Result};

/// Locators for the host site. These track the host's markup and are meant to
/// be replaced from a file when the site changes, not edited in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub profile_url_pattern: String,
    pub heading_selectors: Vec<String>,
    pub name_selectors: Vec<String>,
    pub headline_selectors: Vec<String>,
    pub company_selectors: Vec<String>,
    pub location_selectors: Vec<String>,
    pub about_selectors: Vec<String>,
    pub experience_selectors: Vec<String>,
    pub max_experience_items: usize,
    pub max_about_chars: usize,
    pub industries: Vec<IndustryRule>,
}

fn owned(selectors: &[&str]) -> Vec<String> {
    selectors.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            profile_url_pattern: r"^https?://([a-z0-9-]+\.)?linkedin\.com/in/[^/?#]+".to_string(),
            heading_selectors: owned(&[
                "h1.text-heading-xlarge",
                "h1.inline.t-24",
                ".pv-top-card h1",
                ".top-card-layout__title",
                "main section h1",
            ]),
            name_selectors: owned(&[
                "h1.text-heading-xlarge",
                "h1.inline.t-24",
                ".pv-top-card h1",
                ".top-card-layout__title",
                "main section h1",
            ]),
            headline_selectors: owned(&[
                "div.text-body-medium.break-words",
                ".pv-top-card .text-body-medium",
                ".top-card-layout__headline",
                "h2.mt1",
            ]),
            company_selectors: owned(&[
                "button[aria-label^='Current company'] span",
                ".pv-text-details__right-panel li:first-child span",
                ".top-card-link--company span",
                ".top-card-link__description",
            ]),
            location_selectors: owned(&[
                "span.text-body-small.inline.t-black--light.break-words",
                ".pv-top-card--list-bullet li:first-child",
                ".top-card__subline-item",
            ]),
            about_selectors: owned(&[
                "#about ~ div .inline-show-more-text span[aria-hidden='true']",
                ".pv-shared-text-with-see-more span[aria-hidden='true']",
                "section.pv-about-section p",
                ".core-section-container__content p",
            ]),
            experience_selectors: owned(&[
                "#experience ~ div ul li .t-bold span[aria-hidden='true']",
                ".experience-section li h3",
                ".experience__list li h3",
            ]),
            max_experience_items: 3,
            max_about_chars: 600,
            industries: default_rules(),
        }
    }
}

impl ExtractorConfig {
    /// Load selectors from a `.toml`, `.yaml` or `.yml` file. Missing keys
    /// keep their built-in defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            _ => Err(Error::Config(format!(
                "{}: expected a .toml or .yaml selector file",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_toml_overrides_keep_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "name_selectors = [\"h1.person\"]").unwrap();
        writeln!(file, "max_experience_items = 5").unwrap();

        let config = ExtractorConfig::from_path(file.path()).unwrap();
        assert_eq!(config.name_selectors, vec!["h1.person".to_string()]);
        assert_eq!(config.max_experience_items, 5);
        assert_eq!(config.headline_selectors, ExtractorConfig::default().headline_selectors);
    }

    #[test]
    fn test_yaml_industries() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "industries:").unwrap();
        writeln!(file, "  - category: culinary").unwrap();
        writeln!(file, "    keywords: [chef]").unwrap();

        let config = ExtractorConfig::from_path(file.path()).unwrap();
        assert_eq!(config.industries.len(), 1);
        assert_eq!(config.industries[0].category, "culinary");
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            ExtractorConfig::from_path(file.path()),
            Err(Error::Config(_))
        ));
    }
}
