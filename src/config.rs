use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Google Safe Browsing API key, sent as the `key` query parameter.
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A named list of URLs to scan as one batch. The list is passed through
/// as-is; ordering and duplicates are the config author's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub urls: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            categories: vec![
                Category {
                    name: "education".to_string(),
                    urls: vec![
                        "https://ui.ac.id".to_string(),
                        "https://itb.ac.id".to_string(),
                        "https://ugm.ac.id".to_string(),
                    ],
                },
                Category {
                    name: "ecommerce".to_string(),
                    urls: vec![
                        "https://tokopedia.com".to_string(),
                        "https://shopee.co.id".to_string(),
                        "https://bukalapak.com".to_string(),
                    ],
                },
                Category {
                    name: "dangerous".to_string(),
                    urls: vec![
                        "http://testsafebrowsing.appspot.com/s/malware.html".to_string(),
                        "http://testsafebrowsing.appspot.com/s/phishing.html".to_string(),
                        "http://testsafebrowsing.appspot.com/s/unwanted.html".to_string(),
                        "https://this-domain-does-not-exist.invalid".to_string(),
                    ],
                },
            ],
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_stock_categories() {
        let config = Config::default();
        assert!(config.api_key.is_empty());
        assert_eq!(
            config.category_names(),
            vec!["education", "ecommerce", "dangerous"]
        );
        for category in &config.categories {
            assert!(!category.urls.is_empty());
        }
    }

    #[test]
    fn test_category_lookup_is_case_insensitive() {
        let config = Config::default();
        assert!(config.category("education").is_some());
        assert!(config.category("Education").is_some());
        assert!(config.category("ECOMMERCE").is_some());
        assert!(config.category("unknown").is_none());
    }

    #[test]
    fn test_minimal_yaml_parses() {
        let config: Config = serde_yaml::from_str("api_key: \"abc123\"\n").unwrap();
        assert_eq!(config.api_key, "abc123");
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_file_round_trip() {
        let path =
            std::env::temp_dir().join(format!("url-audit-config-{}.yaml", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let config = Config::default();
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }
}
