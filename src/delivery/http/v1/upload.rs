use std::collections::HashMap;

use axum_extra::extract::Multipart;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::usecase::error::UsecaseError;

/// A file field a route accepts and how many files it may carry.
#[derive(Debug, Clone, Copy)]
pub struct FileField {
    pub name: &'static str,
    pub max_count: usize,
}

pub const TOUR_IMAGE_FIELDS: &[FileField] = &[
    FileField { name: "image_cover", max_count: 1 },
    FileField { name: "images", max_count: 3 },
];

pub const USER_PHOTO_FIELDS: &[FileField] = &[FileField { name: "photo", max_count: 1 }];

/// Text fields and image files of a `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: Map<String, Value>,
    files: HashMap<&'static str, Vec<Vec<u8>>>,
}

impl UploadForm {
    /// Deserializes the text fields. Values that read as JSON scalars
    /// (numbers, booleans) keep that type; the rest stay strings.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, UsecaseError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| UsecaseError::Validation(format!("Invalid form data: {e}")))
    }

    pub fn take_files(&mut self, name: &str) -> Vec<Vec<u8>> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.take_files(name).into_iter().next()
    }

    fn insert_text(&mut self, name: String, text: String) {
        let value = match serde_json::from_str::<Value>(&text) {
            Ok(scalar @ (Value::Number(_) | Value::Bool(_))) => scalar,
            _ => Value::String(text),
        };
        self.fields.insert(name, value);
    }
}

/// Reads every part. Files must be images sent under one of `accepted`.
#[tracing::instrument(skip(multipart, accepted))]
pub async fn read_upload_form(
    mut multipart: Multipart,
    accepted: &[FileField],
) -> Result<UploadForm, UsecaseError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UsecaseError::Validation(format!("Failed to read multipart: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        tracing::debug!(field_name = %field_name, "processing multipart field");

        if field.file_name().is_none() {
            let text = field
                .text()
                .await
                .map_err(|e| UsecaseError::Validation(format!("Failed to read field: {e}")))?;
            form.insert_text(field_name, text);
            continue;
        }

        let spec = accepted
            .iter()
            .find(|f| f.name == field_name)
            .ok_or_else(|| UsecaseError::Validation(format!("Unexpected file field: {field_name}")))?;

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.starts_with("image/"));
        if !is_image {
            return Err(UsecaseError::Validation(
                "Not an image! Please upload only images.".to_string(),
            ));
        }

        let files = form.files.entry(spec.name).or_default();
        if files.len() == spec.max_count {
            return Err(UsecaseError::Validation(format!(
                "Too many files for {}: at most {}",
                spec.name, spec.max_count
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| UsecaseError::Validation(format!("Failed to read file: {e}")))?;
        tracing::debug!(field_name = %field_name, size = bytes.len(), "read file");
        files.push(bytes.to_vec());
    }

    Ok(form)
}
