use serde_json::Value;

/// A request as the scenarios describe it, before the transport sends it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any earlier value under the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What came back for one request. Never mutated after capture.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub duration_ms: f64,
}

impl ResponseSnapshot {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            duration_ms: 0.0,
        }
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContentType::Json => ".json",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub content_type: ContentType,
    pub payload: String,
}

impl Attachment {
    pub fn json(name: &str, payload: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            content_type: ContentType::Json,
            payload: payload.into(),
        }
    }
}

/// One request paired with the response it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub request: RequestDescriptor,
    pub response: ResponseSnapshot,
}
