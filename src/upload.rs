//! Uploaded files and per-route upload rules.

use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;
use serde_json::{Value, json};

/// A file part received in a `multipart/form-data` body.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Extension including the leading dot (`".png"`), or `""` when absent.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Constraints for one upload field. Unset constraints are not checked.
#[derive(Clone, Debug, Default)]
pub struct FileRule {
    pub max_size: Option<usize>,
    pub mime_types: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
}

impl FileRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size(mut self, bytes: usize) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Accepted extensions, with the leading dot: `[".png", ".jpg"]`.
    pub fn extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(exts.into_iter().map(Into::into).collect());
        self
    }
}

/// Upload declaration of a route: either bare field names, or rules per field.
#[derive(Clone, Debug)]
pub enum FileRules {
    Fields(Vec<String>),
    Rules(BTreeMap<String, FileRule>),
}

impl FileRules {
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(names.into_iter().map(Into::into).collect())
    }

    pub fn rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, FileRule)>,
        S: Into<String>,
    {
        Self::Rules(rules.into_iter().map(|(name, rule)| (name.into(), rule)).collect())
    }

    /// Checks the first file of every ruled field; absent files pass.
    ///
    /// Returns one detail object per violated constraint.
    pub(crate) fn check(&self, files: &[UploadedFile]) -> Vec<Value> {
        let Self::Rules(rules) = self else { return Vec::new() };
        let mut details = Vec::new();

        for (field, rule) in rules {
            let Some(file) = files.iter().find(|f| &f.field == field) else { continue };

            if let Some(max) = rule.max_size {
                if file.size() > max {
                    details.push(json!({
                        "field": field,
                        "issue": "File too large",
                        "maxSize": max,
                        "received": file.size(),
                    }));
                }
            }
            if let Some(types) = &rule.mime_types {
                if !types.contains(&file.content_type) {
                    details.push(json!({
                        "field": field,
                        "issue": "Invalid mimetype",
                        "expected": types,
                        "received": file.content_type,
                    }));
                }
            }
            if let Some(exts) = &rule.extensions {
                let ext = file.extension();
                if !exts.contains(&ext) {
                    details.push(json!({
                        "field": field,
                        "issue": "Invalid extension",
                        "expected": exts,
                        "received": ext,
                    }));
                }
            }
        }
        details
    }
}
