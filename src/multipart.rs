//! `multipart/form-data` body parsing.
//!
//! Buffered only: the transport collects the whole body before routing, so
//! the parser walks a complete byte slice. Text parts become body fields,
//! parts carrying a `filename` become [`UploadedFile`]s.

use std::collections::HashMap;

use bytes::Bytes;

use crate::upload::UploadedFile;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MultipartError {
    #[error("missing multipart boundary")]
    MissingBoundary,
    #[error("invalid multipart boundary")]
    InvalidBoundary,
    #[error("unexpected end of multipart body")]
    UnexpectedEof,
    #[error("invalid multipart body: {0}")]
    InvalidFormat(&'static str),
    #[error("invalid content-disposition: {0}")]
    InvalidContentDisposition(&'static str),
}

/// One decoded part.
#[derive(Debug)]
pub(crate) struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Decoded form: text fields in arrival order, files in arrival order.
#[derive(Debug, Default)]
pub(crate) struct Form {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
}

/// Extracts the boundary from a `Content-Type` value, or `None` when the
/// content type is not `multipart/form-data` at all.
pub(crate) fn boundary(content_type: &str) -> Option<Result<String, MultipartError>> {
    let mut params = content_type.split(';');
    let main = params.next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    for param in params {
        let Some((key, value)) = param.trim().split_once('=') else { continue };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let value = value.trim().trim_matches('"');
            if value.is_empty() || value.len() > MAX_BOUNDARY_LEN {
                return Some(Err(MultipartError::InvalidBoundary));
            }
            return Some(Ok(value.to_owned()));
        }
    }
    Some(Err(MultipartError::MissingBoundary))
}

pub(crate) fn parse_form(body: &Bytes, boundary: &str) -> Result<Form, MultipartError> {
    let mut form = Form::default();
    for part in parse(body, boundary)? {
        match part.filename {
            Some(filename) => form.files.push(UploadedFile {
                field: part.name,
                filename,
                content_type: part.content_type.unwrap_or_else(|| "application/octet-stream".to_owned()),
                data: part.data,
            }),
            None => form.fields.push((part.name, String::from_utf8_lossy(&part.data).into_owned())),
        }
    }
    Ok(form)
}

pub(crate) fn parse(body: &Bytes, boundary: &str) -> Result<Vec<Part>, MultipartError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut parts = Vec::new();
    let mut pos = find_delimiter(body, &delimiter, 0)?;

    loop {
        let after = pos + delimiter.len();
        match body.get(after..after + 2) {
            Some(b"--") => break,
            Some(b"\r\n") => {}
            Some(_) => return Err(MultipartError::InvalidFormat("expected CRLF after boundary")),
            None => return Err(MultipartError::UnexpectedEof),
        }

        let (headers, data_start) = part_headers(body, after + 2)?;
        let disposition = headers
            .get("content-disposition")
            .ok_or(MultipartError::InvalidContentDisposition("header missing"))?;
        let (name, filename) = content_disposition(disposition)?;

        let next = find_delimiter(body, &delimiter, data_start)?;
        // The CRLF before a delimiter belongs to the delimiter.
        let data_end = next.saturating_sub(2).max(data_start);

        parts.push(Part {
            name,
            filename,
            content_type: headers.get("content-type").cloned(),
            data: body.slice(data_start..data_end),
        });
        pos = next;
    }

    Ok(parts)
}

/// Finds the next delimiter that starts a line and is followed by CRLF or `--`.
fn find_delimiter(data: &[u8], delimiter: &[u8], start: usize) -> Result<usize, MultipartError> {
    if data.len() < delimiter.len() {
        return Err(MultipartError::UnexpectedEof);
    }
    for i in start..=data.len() - delimiter.len() {
        if !data[i..].starts_with(delimiter) {
            continue;
        }
        if i != 0 && (i < 2 || &data[i - 2..i] != b"\r\n") {
            continue;
        }
        match data.get(i + delimiter.len()..i + delimiter.len() + 2) {
            Some(b"\r\n" | b"--") => return Ok(i),
            Some(_) => continue,
            None => return Err(MultipartError::UnexpectedEof),
        }
    }
    Err(MultipartError::UnexpectedEof)
}

fn part_headers(data: &[u8], mut pos: usize) -> Result<(HashMap<String, String>, usize), MultipartError> {
    let mut headers = HashMap::new();
    loop {
        let end = data[pos..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|offset| pos + offset)
            .ok_or(MultipartError::UnexpectedEof)?;
        if end == pos {
            return Ok((headers, end + 2));
        }
        let line = std::str::from_utf8(&data[pos..end])
            .map_err(|_| MultipartError::InvalidFormat("non UTF-8 part header"))?;
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
        pos = end + 2;
    }
}

/// `form-data; name="avatar"; filename="me.png"`
fn content_disposition(value: &str) -> Result<(String, Option<String>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else { continue };
        let unquoted = raw.trim().trim_matches('"').to_owned();
        if key.trim().eq_ignore_ascii_case("name") {
            name = Some(unquoted);
        } else if key.trim().eq_ignore_ascii_case("filename") {
            if unquoted.contains(['/', '\\', '\0']) || unquoted.contains("..") {
                return Err(MultipartError::InvalidContentDisposition("path traversal in filename"));
            }
            filename = Some(unquoted);
        }
    }

    let name = name.ok_or(MultipartError::InvalidContentDisposition("missing name"))?;
    Ok((name, filename))
}
