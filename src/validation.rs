//! Inbound validation: body, query and params parsed against a route's
//! declared schemas before middlewares and handler run.
//!
//! Every declared part is checked even when an earlier one fails, so a single
//! `400` reports all of them:
//!
//! ```text
//! { "error": "Validation failed",
//!   "details": [ { "source": "body",  "issues": [ … ] },
//!                { "source": "query", "issues": [ … ] } ] }
//! ```

use http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

use crate::request::Request;
use crate::response::Response;
use crate::schema::{Issue, ParamsSchema, Schema, ValidationSchema};
use crate::upload::FileRules;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Body,
    Query,
    Params,
}

/// Issues collected for one request part.
#[derive(Debug, Serialize)]
pub struct SourceIssues {
    pub source: Source,
    pub issues: Vec<Issue>,
}

/// A handler result that failed its route's response schema.
///
/// Raised as an exception: the declared contract and the handler disagree,
/// which is a server defect, not something the client can fix.
#[derive(Debug, thiserror::Error)]
#[error("handler result does not match the declared response schema ({} issue(s))", .issues.len())]
pub struct ContractViolation {
    pub issues: Vec<Issue>,
}

/// Parses the declared parts of `req` in place.
///
/// Successful parts replace the request's value with the parsed one; failed
/// parts are left untouched and reported.
pub(crate) fn validate_request(schema: &ValidationSchema, req: &mut Request) -> Result<(), Vec<SourceIssues>> {
    let mut failures = Vec::new();

    if let Some(body) = &schema.body {
        parse_part(body.as_ref(), &mut req.body, Source::Body, &mut failures);
    }
    if let Some(query) = &schema.query {
        parse_part(query.as_ref(), &mut req.query, Source::Query, &mut failures);
    }
    match &schema.params {
        Some(ParamsSchema::Schema(params)) => {
            parse_part(params.as_ref(), &mut req.params, Source::Params, &mut failures);
        }
        Some(ParamsSchema::Keys(keys)) => {
            let issues: Vec<Issue> = keys
                .iter()
                .filter(|key| req.params.get(key.as_str()).is_none())
                .map(|key| Issue::custom("Missing param").at(vec![Value::String(key.clone())]))
                .collect();
            if !issues.is_empty() {
                failures.push(SourceIssues { source: Source::Params, issues });
            }
        }
        None => {}
    }

    if failures.is_empty() { Ok(()) } else { Err(failures) }
}

fn parse_part(schema: &dyn Schema, slot: &mut Value, source: Source, failures: &mut Vec<SourceIssues>) {
    match schema.validate(slot) {
        Ok(parsed) => *slot = parsed,
        Err(issues) => failures.push(SourceIssues { source, issues }),
    }
}

pub(crate) fn validation_failed(details: &[SourceIssues]) -> Response {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .json(&json!({ "error": "Validation failed", "details": details }))
}

/// Checks uploaded files against the route's rules.
pub(crate) fn validate_files(rules: &FileRules, req: &Request) -> Result<(), Response> {
    let details = rules.check(&req.files);
    if details.is_empty() {
        return Ok(());
    }
    Err(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .json(&json!({ "error": "Invalid file upload", "details": details })))
}

/// Checks a handler's result against the response schema.
pub(crate) fn validate_response(schema: &dyn Schema, value: &Value) -> Result<Value, ContractViolation> {
    schema.validate(value).map_err(|issues| ContractViolation { issues })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;

    use super::*;
    use crate::schema::{number, object, string};

    fn request(uri: &str, body: &'static str, params: &[(&str, &str)]) -> Request {
        let (parts, ()) = http::Request::builder().uri(uri).body(()).unwrap().into_parts();
        let params: HashMap<_, _> = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Request::from_parts(parts, params, Bytes::from_static(body.as_bytes())).unwrap()
    }

    #[test]
    fn collects_issues_from_every_source() {
        let schema = ValidationSchema::new()
            .body(object([("name", string()), ("age", number())]))
            .query(object([("page", number().coerce())]));
        let mut req = request("/members?page=x", "{}", &[]);

        let failures = validate_request(&schema, &mut req).unwrap_err();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].source, Source::Body);
        assert_eq!(failures[0].issues.len(), 2);
        assert_eq!(failures[1].source, Source::Query);
    }

    #[test]
    fn parsed_values_replace_the_raw_ones() {
        let schema = ValidationSchema::new()
            .query(object([("page", number().coerce())]))
            .params(object([("id", number().coerce())]));
        let mut req = request("/members/7?page=2&junk=1", "", &[("id", "7")]);

        validate_request(&schema, &mut req).unwrap();
        assert_eq!(req.query(), &json!({ "page": 2 }));
        assert_eq!(req.params(), &json!({ "id": 7 }));
    }

    #[test]
    fn param_keys_only_check_presence() {
        let schema = ValidationSchema::new().param_keys(["id", "slug"]);
        let mut req = request("/x", "", &[("id", "abc")]);

        let failures = validate_request(&schema, &mut req).unwrap_err();
        assert_eq!(
            serde_json::to_value(&failures).unwrap(),
            json!([{ "source": "params",
                     "issues": [{ "code": "custom", "path": ["slug"], "message": "Missing param" }] }])
        );
    }

    #[test]
    fn response_mismatch_is_a_contract_violation() {
        let schema = object([("id", number())]);
        let err = validate_response(&schema, &json!({ "id": "nope" })).unwrap_err();
        assert_eq!(err.issues.len(), 1);
    }
}
