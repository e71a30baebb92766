// Moderation endpoints.
//
// POST /moderate/text   JSON {content, content_type?}
// POST /moderate/image  multipart: `file` or `image_url`
// POST /moderate/batch  multipart: `text_content`, `content_type`,
//                       `image_file`, `image_url`

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;

use crate::aggregate::AggregatedResult;
use crate::content::ContentTag;
use crate::error::ModerationError;
use crate::pipeline::{BatchRequest, BatchResult, ImageSource, TextRequest};
use crate::web::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub content: String,
    pub content_type: Option<String>,
}

pub async fn moderate_text(
    State(state): State<AppState>,
    Json(body): Json<TextBody>,
) -> Result<Json<AggregatedResult>, ApiError> {
    let tag = parse_tag(body.content_type.as_deref())?;
    let result = state.moderator.moderate_text(&body.content, tag).await?;
    Ok(Json(result))
}

pub async fn moderate_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AggregatedResult>, ApiError> {
    let form = read_form(multipart).await?;
    let source = ImageSource::from_fields(form.file("file"), form.text("image_url"))?
        .ok_or_else(|| ModerationError::validation("provide an image file or an image_url"))?;
    let result = state.moderator.moderate_image(source).await?;
    Ok(Json(result))
}

pub async fn moderate_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResult>, ApiError> {
    let form = read_form(multipart).await?;

    let text = match form.text("text_content").filter(|t| !t.trim().is_empty()) {
        Some(content) => Some(TextRequest {
            content,
            content_type: parse_tag(form.text("content_type").as_deref())?,
        }),
        None => None,
    };
    let image = ImageSource::from_fields(form.file("image_file"), form.text("image_url"))?;

    let request = BatchRequest::new(text, image)?;
    let result = state.moderator.moderate_batch(request).await?;
    Ok(Json(result))
}

fn parse_tag(value: Option<&str>) -> Result<ContentTag, ModerationError> {
    match value {
        Some(v) if !v.trim().is_empty() => v.parse(),
        _ => Ok(ContentTag::default()),
    }
}

/// Multipart fields collected by name. Empty uploads count as absent.
#[derive(Default)]
struct Form {
    fields: Vec<(String, Vec<u8>, bool)>,
}

impl Form {
    fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.fields
            .iter()
            .find(|(n, bytes, _)| n == name && !bytes.is_empty())
            .map(|(_, bytes, _)| bytes.clone())
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|(n, _, is_file)| n == name && !is_file)
            .and_then(|(_, bytes, _)| String::from_utf8(bytes.clone()).ok())
    }
}

async fn read_form(mut multipart: Multipart) -> Result<Form, ApiError> {
    let mut form = Form::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read field '{name}': {e}")))?;
        form.fields.push((name, bytes.to_vec(), is_file));
    }
    Ok(form)
}
