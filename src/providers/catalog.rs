//! Per-provider model catalogs.

use serde::Serialize;

use crate::error::{HuginnError, Result};

/// The models a provider accepts, with one designated default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCatalog {
    pub default_model: String,
    pub models: Vec<String>,
}

impl ModelCatalog {
    /// A catalog containing `default_model` and any extra models.
    pub fn new<I, S>(default_model: impl Into<String>, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let default_model = default_model.into();
        let mut models = vec![default_model.clone()];
        for m in others {
            let m = m.into();
            if !models.contains(&m) {
                models.push(m);
            }
        }
        Self {
            default_model,
            models,
        }
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Resolve a requested model against this catalog.
    ///
    /// `None` picks the default; an unknown model is
    /// [`HuginnError::ModelNotAvailable`] for `provider`.
    pub fn resolve<'a>(&'a self, provider: &str, requested: Option<&'a str>) -> Result<&'a str> {
        match requested {
            None => Ok(&self.default_model),
            Some(m) if self.contains(m) => Ok(m),
            Some(m) => Err(HuginnError::ModelNotAvailable {
                provider: provider.to_string(),
                model: m.to_string(),
            }),
        }
    }
}
