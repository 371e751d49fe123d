use std::{env, fs::File, io::BufReader, path::Path};

use anyhow::{anyhow, Context};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use url::Url;

// `\d` would also accept non-ASCII digits
const DEFAULT_REFERENCE_PATTERN: &str = r"(RP|WR|API|TS|BB|BP|DS|DP|TRI|BK)-[0-9]{1,5}";
const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Token used to call the GitHub API
    pub github_token: String,
    /// The label managed by the gate
    pub label: String,
    /// ID of the team whose members count as lead devs
    #[serde(deserialize_with = "string_or_number")]
    pub leaddev_team_id: String,
    /// Checks that must have a successful run on the head commit, in evaluation order. Accepts
    /// either a list or a comma-separated string.
    #[serde(default, deserialize_with = "check_list")]
    pub required_checks: Vec<String>,
    /// The PR body must match this pattern at least once.
    #[serde(with = "serde_regex", default = "default_reference_pattern")]
    pub reference_pattern: Regex,
    #[serde(default = "default_api_url")]
    pub github_api_url: Url,
    /// Secret shared with GitHub to sign webhook deliveries. Only needed by the webhook server.
    #[serde(default)]
    pub github_secret: Option<String>,
}

pub fn default_reference_pattern() -> Regex {
    Regex::new(DEFAULT_REFERENCE_PATTERN).expect("default reference pattern is valid")
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}

/// Splits a comma-separated list of check names, ignoring blank entries.
pub fn parse_required_checks(checks: &str) -> Vec<String> {
    checks
        .split(',')
        .map(str::trim)
        .filter(|check| !check.is_empty())
        .map(str::to_owned)
        .collect()
}

fn check_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Checks {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Checks::deserialize(deserializer)? {
        Checks::List(list) => list
            .iter()
            .flat_map(|check| parse_required_checks(check))
            .collect(),
        Checks::Joined(joined) => parse_required_checks(&joined),
    })
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Name(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(id) => id.to_string(),
        Id::Name(name) => name,
    })
}

impl GateConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config_file =
            File::open(path).with_context(|| format!("couldn't open {}", path.display()))?;
        serde_yaml::from_reader(BufReader::new(config_file)).context("couldn't parse config file")
    }

    /// Reads the GitHub Actions inputs (`INPUT_<NAME>` variables) from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_inputs(|name| env::var(name).ok())
    }

    fn from_inputs(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let input = |name: &str| {
            lookup(&format!("INPUT_{}", name.to_uppercase())).filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            input(name).ok_or_else(|| anyhow!("input required and not supplied: {}", name))
        };

        let github_api_url = match lookup("GITHUB_API_URL").filter(|url| !url.is_empty()) {
            Some(url) => Url::parse(&url).context("GITHUB_API_URL must be a valid URL")?,
            None => default_api_url(),
        };

        let reference_pattern = match input("reference_pattern") {
            Some(pattern) => Regex::new(&pattern).context("reference_pattern must be a valid regex")?,
            None => default_reference_pattern(),
        };

        Ok(Self {
            github_token: required("github_token")?,
            label: required("label")?,
            leaddev_team_id: required("leaddev_team_id")?,
            required_checks: input("required_checks")
                .map(|checks| parse_required_checks(&checks))
                .unwrap_or_default(),
            reference_pattern,
            github_api_url,
            github_secret: input("github_secret"),
        })
    }
}
