//! Model catalog: the fixed list of known quantized variants and the subset
//! the server can currently serve.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::client::ControlClient;
use crate::error::LocalAIError;

/// Catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Name shown in the model picker.
    pub display_name: &'static str,
    /// GGUF filename in the model repository. Unique key.
    pub storage_identifier: &'static str,
    /// Size/quality tradeoff.
    pub description: &'static str,
}

const fn descriptor(
    display_name: &'static str,
    storage_identifier: &'static str,
    description: &'static str,
) -> ModelDescriptor {
    ModelDescriptor {
        display_name,
        storage_identifier,
        description,
    }
}

/// Known variants of the fine-tuned model, weakest first.
pub const MODEL_CATALOG: &[ModelDescriptor] = &[
    descriptor(
        "2-bit quntized Model",
        "sqlman-finetuned.Q2_K.gguf",
        "Smallest model, Lowest qulity model with 2-bit quantization",
    ),
    descriptor(
        "3-bit quntized Model - 01",
        "sqlman-finetuned.Q3_K_S.gguf",
        "very small size, very Low quality model with 3-bit quantization",
    ),
    descriptor(
        "3-bit quntized Model - 02",
        "sqlman-finetuned.Q3_K_M.gguf",
        "very small size, very Low quality model with 3-bit quantization",
    ),
    descriptor(
        "3-bit quntized Model - 03",
        "sqlman-finetuned.Q3_K_L.gguf",
        "Small size, Low quality model with 3-bit quantization",
    ),
    descriptor(
        "4-bit quntized Model - 01",
        "sqlman-finetuned.Q4_K_S.gguf",
        "Small size, Low quality model with 4-bit quantization",
    ),
    descriptor(
        "4-bit quntized Model - 02",
        "sqlman-finetuned.Q4_0.gguf",
        "Not Recommended",
    ),
    descriptor(
        "4-bit quntized Model - 03",
        "sqlman-finetuned.Q4_K_M.gguf",
        "Medium size, Medium quality model with 4-bit quantization",
    ),
    descriptor(
        "5-bit quntized Model - 02",
        "sqlman-finetuned.Q5_0.gguf",
        "Medium size, Medium quality model with 5-bit quantization - not recommended",
    ),
    descriptor(
        "5-bit quntized Model - 01",
        "sqlman-finetuned.Q5_K_S.gguf",
        "Normal size, Normal quality model with 5-bit quantization",
    ),
    descriptor(
        "5-bit quntized Model - 03",
        "sqlman-finetuned.Q5_K_M.gguf",
        "Normal size, Normal quality model with 5-bit quantization",
    ),
    descriptor(
        "6-bit quntized Model",
        "sqlman-finetuned.Q6_K.gguf",
        "Large size, High quality model with 6-bit quantization - GPU required",
    ),
    descriptor(
        "8-bit quntized Model",
        "sqlman-finetuned.Q8_0.gguf",
        "Very large size, Very high quality model with 8-bit quantization - GPU required",
    ),
];

/// Catalog entries the server reported as available, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailableModelSet {
    models: IndexMap<&'static str, ModelDescriptor>,
}

impl AvailableModelSet {
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, storage_identifier: &str) -> bool {
        self.models.contains_key(storage_identifier)
    }

    pub fn get(&self, storage_identifier: &str) -> Option<&ModelDescriptor> {
        self.models.get(storage_identifier)
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.models.keys().copied()
    }
}

/// Fixed table of model variants.
#[derive(Debug, Clone, Copy)]
pub struct ModelCatalog {
    entries: &'static [ModelDescriptor],
}

impl ModelCatalog {
    /// Catalog over a custom table.
    pub fn new(entries: &'static [ModelDescriptor]) -> Self {
        Self { entries }
    }

    /// The built-in SQLMan catalog.
    pub fn builtin() -> Self {
        Self::new(MODEL_CATALOG)
    }

    pub fn entries(&self) -> &'static [ModelDescriptor] {
        self.entries
    }

    pub fn get(&self, storage_identifier: &str) -> Option<&'static ModelDescriptor> {
        self.entries
            .iter()
            .find(|m| m.storage_identifier == storage_identifier)
    }

    /// Keep the catalog entries present in `server_models`.
    ///
    /// Server entries unknown to the catalog are ignored; catalog entries the
    /// server does not have are left out. Order follows the catalog.
    pub fn intersect<S: AsRef<str>>(&self, server_models: &[S]) -> AvailableModelSet {
        let models = self
            .entries
            .iter()
            .filter(|entry| {
                server_models
                    .iter()
                    .any(|m| m.as_ref() == entry.storage_identifier)
            })
            .map(|entry| (entry.storage_identifier, *entry))
            .collect();

        AvailableModelSet { models }
    }

    /// Ask the server which models it has and intersect with the catalog.
    pub async fn fetch_available(
        &self,
        client: &ControlClient,
    ) -> Result<AvailableModelSet, LocalAIError> {
        let server_models = client.list_models().await?;
        debug!("Server reports {} model file(s)", server_models.len());

        let available = self.intersect(server_models.as_slice());
        info!(
            "{} of {} catalog models available",
            available.len(),
            self.entries.len()
        );

        Ok(available)
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
