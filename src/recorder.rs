//! Captures one HTTP exchange into the test report.
//!
//! Every exchange becomes two steps, `Request: {method} {url}` and
//! `Response: {status}`, each holding a single JSON-tagged attachment. The
//! caller records before it asserts, so a failing scenario still shows what
//! was sent and what came back.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    model::{Attachment, RequestDescriptor, ResponseSnapshot},
    report::{ReportError, Reporter},
};

pub const REQUEST_BODY_LABEL: &str = "Request Body";
pub const RESPONSE_BODY_LABEL: &str = "Response Body";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("HTTP method must not be empty")]
    EmptyMethod,
    #[error("{0:?} is not a valid HTTP method token")]
    InvalidMethod(String),
    #[error("request URL must not be empty")]
    EmptyUrl,
    #[error("response status {0} is not a valid HTTP status code")]
    InvalidStatus(u16),
    #[error(transparent)]
    Report(#[from] ReportError),
}

pub fn record(
    reporter: &mut dyn Reporter,
    method: &str,
    url: &str,
    request_body: Option<&Value>,
    response: &ResponseSnapshot,
) -> Result<(), RecordError> {
    let method = validate(method, url, response)?;
    let method = method.as_str();

    debug!(method, url, status = response.status, "recording exchange");

    attach_in_step(
        reporter,
        &format!("Request: {method} {url}"),
        Attachment::json(REQUEST_BODY_LABEL, render_request_body(request_body)),
    )?;
    attach_in_step(
        reporter,
        &format!("Response: {}", response.status),
        Attachment::json(RESPONSE_BODY_LABEL, response.body.clone()),
    )?;
    Ok(())
}

pub fn record_exchange(
    reporter: &mut dyn Reporter,
    request: &RequestDescriptor,
    response: &ResponseSnapshot,
) -> Result<(), RecordError> {
    record(
        reporter,
        &request.method,
        &request.url,
        request.body.as_ref(),
        response,
    )
}

/// Any token the transport could have sent is accepted, in any case; the
/// returned method is uppercased for the step name.
fn validate(method: &str, url: &str, response: &ResponseSnapshot) -> Result<Method, RecordError> {
    let method = method.trim();
    if method.is_empty() {
        return Err(RecordError::EmptyMethod);
    }
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RecordError::InvalidMethod(method.to_string()))?;
    if url.trim().is_empty() {
        return Err(RecordError::EmptyUrl);
    }
    if StatusCode::from_u16(response.status).is_err() {
        return Err(RecordError::InvalidStatus(response.status));
    }
    Ok(method)
}

fn render_request_body(body: Option<&Value>) -> String {
    match body {
        Some(value) => format!("{value:#}"),
        None => Value::Null.to_string(),
    }
}

// The step is closed even when the attachment could not be written.
fn attach_in_step(
    reporter: &mut dyn Reporter,
    step: &str,
    attachment: Attachment,
) -> Result<(), ReportError> {
    reporter.start_step(step)?;
    let attached = reporter.attach(attachment);
    reporter.stop_step()?;
    attached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::ContentType,
        report::{MemoryReporter, ReportEvent},
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn expected_events(
        method: &str,
        url: &str,
        request: &str,
        response: &ResponseSnapshot,
    ) -> Vec<ReportEvent> {
        let request_step = format!("Request: {method} {url}");
        let response_step = format!("Response: {}", response.status);
        vec![
            ReportEvent::StepStarted(request_step.clone()),
            ReportEvent::Attached {
                step: Some(request_step.clone()),
                attachment: Attachment::json(REQUEST_BODY_LABEL, request),
            },
            ReportEvent::StepStopped(request_step),
            ReportEvent::StepStarted(response_step.clone()),
            ReportEvent::Attached {
                step: Some(response_step.clone()),
                attachment: Attachment::json(RESPONSE_BODY_LABEL, response.body.clone()),
            },
            ReportEvent::StepStopped(response_step),
        ]
    }

    #[test]
    fn records_request_step_then_response_step() -> Result<(), RecordError> {
        let mut reporter = MemoryReporter::new();
        let body = json!({"name": "Sample Item", "value": 100});
        let response =
            ResponseSnapshot::new(201, r#"{"id":"ff80","name":"Sample Item","value":100}"#);

        record(
            &mut reporter,
            "POST",
            "https://api.restful-api.dev/data",
            Some(&body),
            &response,
        )?;

        assert_eq!(
            reporter.events(),
            expected_events(
                "POST",
                "https://api.restful-api.dev/data",
                &format!("{body:#}"),
                &response
            )
            .as_slice()
        );
        assert!(reporter
            .attachments()
            .all(|attachment| attachment.content_type == ContentType::Json));
        Ok(())
    }

    #[test]
    fn bodyless_request_attaches_null() -> Result<(), RecordError> {
        let mut reporter = MemoryReporter::new();
        let response = ResponseSnapshot::new(200, "[]");

        let url = "https://api.restful-api.dev/objects";
        record(&mut reporter, "GET", url, None, &response)?;

        let first = reporter.attachments().next().unwrap();
        assert_eq!(first.name, REQUEST_BODY_LABEL);
        assert_eq!(first.payload, "null");
        Ok(())
    }

    #[test]
    fn repeated_calls_are_not_deduplicated() -> Result<(), RecordError> {
        let mut reporter = MemoryReporter::new();
        let response = ResponseSnapshot::new(200, "[]");
        let url = "https://api.restful-api.dev/objects";

        record(&mut reporter, "GET", url, None, &response)?;
        record(&mut reporter, "GET", url, None, &response)?;

        let single = expected_events("GET", url, "null", &response);
        let doubled: Vec<_> = single.iter().chain(single.iter()).cloned().collect();
        assert_eq!(reporter.events(), doubled.as_slice());
        Ok(())
    }

    #[test]
    fn record_exchange_unpacks_descriptor() -> Result<(), RecordError> {
        let mut reporter = MemoryReporter::new();
        let request = RequestDescriptor::new("get", "https://example.com/objects?id=3")
            .header("Authorization", "Bearer ");
        let response = ResponseSnapshot::new(200, "[]");

        record_exchange(&mut reporter, &request, &response)?;

        assert_eq!(
            reporter.events()[0],
            ReportEvent::StepStarted("Request: GET https://example.com/objects?id=3".into())
        );
        Ok(())
    }

    #[test]
    fn invalid_inputs_fail_before_attaching() {
        let response = ResponseSnapshot::new(200, "{}");
        let cases = [
            ("", "https://example.com", &response),
            ("GE T", "https://example.com", &response),
            ("GET", "  ", &response),
        ];
        for (method, url, response) in cases {
            let mut reporter = MemoryReporter::new();
            assert!(record(&mut reporter, method, url, None, response).is_err());
            assert!(reporter.events().is_empty());
        }

        let mut reporter = MemoryReporter::new();
        let bogus = ResponseSnapshot::new(42, "");
        let err = record(&mut reporter, "GET", "https://example.com", None, &bogus)
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidStatus(42)));
        assert!(reporter.events().is_empty());
    }

    #[test]
    fn any_method_token_the_transport_sends_is_recorded() -> Result<(), RecordError> {
        let response = ResponseSnapshot::new(200, "[]");
        let url = "https://example.com/objects";
        let cases = [("get", "GET"), ("TRACE", "TRACE"), ("propfind", "PROPFIND")];
        for (method, shown) in cases {
            let mut reporter = MemoryReporter::new();
            record(&mut reporter, method, url, None, &response)?;
            let expected = expected_events(shown, url, "null", &response);
            assert_eq!(reporter.events(), expected.as_slice());
        }
        Ok(())
    }

    #[test]
    fn nonstandard_status_codes_are_recorded() -> Result<(), RecordError> {
        let mut reporter = MemoryReporter::new();
        let response = ResponseSnapshot::new(600, "odd");

        let url = "https://example.com/objects";
        record(&mut reporter, "GET", url, None, &response)?;

        assert_eq!(
            reporter.events()[3],
            ReportEvent::StepStarted("Response: 600".into())
        );
        assert_eq!(reporter.attachments().count(), 2);
        Ok(())
    }
}
