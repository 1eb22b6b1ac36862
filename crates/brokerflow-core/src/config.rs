use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Cohort, ConfigError};

/// Environment variable consulted when no explicit config path is given.
pub const CONFIG_ENV_VAR: &str = "BROKERFLOW_CONFIG";

const DEFAULT_INSTITUTIONAL: [&str; 17] = [
    "AK", "CC", "BK", "GW", "AI", "KZ", "DX", "DD", "RX", "KK", "CG", "DR", "TP", "SQ", "NI",
    "CD", "OD",
];

const DEFAULT_BROKER_NAMES: [(&str, &str); 49] = [
    ("CC", "Mandiri Sekuritas"),
    ("XL", "Stockbit"),
    ("PD", "IPOT"),
    ("YP", "Mirae Asset"),
    ("NI", "BNI Sekuritas"),
    ("KI", "Kingsford"),
    ("SQ", "BCA Sekuritas"),
    ("DR", "RHB/Danareksa"),
    ("EP", "MNC Sekuritas"),
    ("BK", "JP Morgan"),
    ("GR", "Gundalah"),
    ("ZP", "Maybank Sekuritas"),
    ("YU", "Yuanta Sekuritas"),
    ("XC", "Ajaib Sekuritas"),
    ("AK", "UBS Sekuritas"),
    ("KK", "Phillip Sekuritas"),
    ("OD", "BRI Danareksa"),
    ("AZ", "Asia Trade"),
    ("DX", "Bahana Sekuritas"),
    ("TP", "OCBC Sekuritas"),
    ("AR", "Artha Sekuritas"),
    ("XA", "NH Korindo"),
    ("YB", "Yulie Sekuritas"),
    ("DH", "Sinarmas Sekuritas"),
    ("CP", "Ciptadana Sekuritas"),
    ("AT", "Phintraco Sekuritas"),
    ("YJ", "Lotus Andalan"),
    ("HD", "KGI Sekuritas"),
    ("RG", "RHB Sekuritas"),
    ("BQ", "Korea Investment"),
    ("HP", "Hanson Sekuritas"),
    ("IF", "Samuel Sekuritas"),
    ("MU", "Mandiri Investasi"),
    ("LS", "Lippo Sekuritas"),
    ("AG", "Agra Sekuritas"),
    ("TF", "Trust Sekuritas"),
    ("LG", "Trimegah Sekuritas"),
    ("MG", "MNC Sekuritas"),
    ("AI", "UOB Kay Hian"),
    ("MR", "Mandiri Manajemen"),
    ("CM", "CIMB Sekuritas"),
    ("VS", "Valbury Sekuritas"),
    ("YT", "Yulie Sekuritas"),
    ("PT", "Pioneer Investama"),
    ("NL", "NASD"),
    ("MZ", "MNC Sekuritas"),
    ("TN", "Trimegah Tbk"),
    ("TH", "Tech Sekuritas"),
    ("RX", "Macquarie Sekuritas"),
];

/// Read-only lookup tables shared by every instrument in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Broker codes that make up the whale cohort.
    pub institutional_brokers: BTreeSet<String>,
    /// Display names keyed by broker code.
    pub broker_names: BTreeMap<String, String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            institutional_brokers: DEFAULT_INSTITUTIONAL
                .iter()
                .map(|code| (*code).to_owned())
                .collect(),
            broker_names: DEFAULT_BROKER_NAMES
                .iter()
                .map(|(code, name)| ((*code).to_owned(), (*name).to_owned()))
                .collect(),
        }
    }
}

impl FlowConfig {
    /// Loads a JSON config file. Omitted fields keep the built-in tables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        parsed.normalized()
    }

    /// Loads from `explicit`, then from `BROKERFLOW_CONFIG`, else the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_config_path(explicit, env::var_os(CONFIG_ENV_VAR)) {
            Some(path) => {
                log::debug!("loading flow config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn cohort_of(&self, code: &str) -> Cohort {
        if self.institutional_brokers.contains(code) {
            Cohort::Whale
        } else {
            Cohort::Retail
        }
    }

    pub fn broker_name(&self, code: &str) -> String {
        self.broker_names
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("Broker {code}"))
    }

    fn normalized(self) -> Result<Self, ConfigError> {
        let institutional_brokers: BTreeSet<String> = self
            .institutional_brokers
            .into_iter()
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        if institutional_brokers.is_empty() {
            return Err(ConfigError::EmptyInstitutionalSet);
        }

        let broker_names = self
            .broker_names
            .into_iter()
            .map(|(code, name)| (code.trim().to_ascii_uppercase(), name))
            .collect();

        Ok(Self {
            institutional_brokers,
            broker_names,
        })
    }
}

fn resolve_config_path(explicit: Option<&Path>, from_env: Option<OsString>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    from_env
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}
