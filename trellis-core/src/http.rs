// HTTP request and response types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            query_params: HashMap::new(),
        }
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }

    /// Get a header by name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

/// HTTP response wrapper
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn created() -> Self {
        Self::new(201)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn bad_request() -> Self {
        Self::new(400)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.body = text.as_bytes().to_vec();
        self.headers.insert(
            "Content-Type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        );
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }
}

/// JSON response helper
#[derive(Debug)]
pub struct Json<T: Serialize>(pub T);

impl<T: Serialize> Json<T> {
    pub fn into_response(self) -> Result<HttpResponse, crate::Error> {
        HttpResponse::ok().with_json(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json() {
        let mut req = HttpRequest::new("POST", "/users");
        req.body = br#"{"name":"alice"}"#.to_vec();

        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["name"], "alice");
    }

    #[test]
    fn test_request_json_invalid() {
        let mut req = HttpRequest::new("POST", "/users");
        req.body = b"not json".to_vec();

        let result: Result<serde_json::Value, _> = req.json();
        assert!(matches!(result, Err(crate::Error::Deserialization(_))));
    }

    #[test]
    fn test_response_helpers() {
        assert_eq!(HttpResponse::ok().status, 200);
        assert_eq!(HttpResponse::created().status, 201);
        assert_eq!(HttpResponse::no_content().status, 204);
        assert_eq!(HttpResponse::not_found().status, 404);
    }

    #[test]
    fn test_response_with_json() {
        let response = HttpResponse::ok()
            .with_json(&serde_json::json!({"message": "hello"}))
            .unwrap();
        assert_eq!(
            response.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert!(!response.body.is_empty());
    }

    #[test]
    fn test_json_helper() {
        let response = Json(serde_json::json!({"ok": true})).into_response().unwrap();
        assert_eq!(response.status, 200);
    }
}
