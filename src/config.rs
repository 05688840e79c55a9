use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// Supported classification backends.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Plsda,
    Gbm,
    Rf,
    Svm,
    Pam,
    Glmnet,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Plsda,
        Method::Gbm,
        Method::Rf,
        Method::Svm,
        Method::Pam,
        Method::Glmnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Plsda => "plsda",
            Method::Gbm => "gbm",
            Method::Rf => "rf",
            Method::Svm => "svm",
            Method::Pam => "pam",
            Method::Glmnet => "glmnet",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plsda" => Ok(Method::Plsda),
            "gbm" => Ok(Method::Gbm),
            "rf" => Ok(Method::Rf),
            "svm" => Ok(Method::Svm),
            "pam" => Ok(Method::Pam),
            "glmnet" => Ok(Method::Glmnet),
            _ => Err(TrainError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Constants used by the per-method pre-fit policies.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdapterConfig {
    /// Kernel cache size handed to the SVM backend (MB).
    pub svm_cache_size: f64,
    /// GBM infers a minimum leaf size when rows or features fall below this.
    pub gbm_small_data_limit: usize,
    /// Below this many rows the smaller inferred leaf size is used.
    pub gbm_tiny_data_limit: usize,
    pub gbm_tiny_min_leaf: usize,
    pub gbm_small_min_leaf: usize,
    /// Random forest tree counts are rounded to a multiple of this.
    pub rf_tree_step: usize,
    /// Classes with fewer rows are dropped before fitting a centroid model.
    pub pam_min_class_size: usize,
    pub plsda_min_components: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            svm_cache_size: 40.0,
            gbm_small_data_limit: 50,
            gbm_tiny_data_limit: 30,
            gbm_tiny_min_leaf: 2,
            gbm_small_min_leaf: 5,
            rf_tree_step: 50,
            pam_min_class_size: 2,
            plsda_min_components: 2,
        }
    }
}

impl AdapterConfig {
    /// Read a config from a JSON file. Absent fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AdapterConfig = serde_json::from_str(&config_json)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}
