//! Request, response and callback examples, declared or generated.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{is_method, Operation};
use crate::json_schema::is_truthy;
use crate::mime;
use crate::refs::is_ref;
use crate::samples::SampleOptions;

/// One example of a media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypeExample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

impl MediaTypeExample {
    fn bare(value: Value) -> Self {
        Self {
            summary: None,
            title: None,
            description: None,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodyExample {
    pub media_type: String,
    pub examples: Vec<MediaTypeExample>,
}

/// Examples of one response, keyed by media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseExample {
    pub status: String,
    pub media_types: IndexMap<String, Vec<MediaTypeExample>>,
    /// The response declares headers but no content.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub only_headers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackExample {
    pub identifier: String,
    pub expression: String,
    pub method: String,
    pub example: Vec<ResponseExample>,
}

fn string_of(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn named_examples(named: &Map<String, Value>) -> Vec<MediaTypeExample> {
    named
        .iter()
        .filter_map(|(key, example)| {
            let value = match example.get("value") {
                Some(value) if value.is_object() && is_ref(value) => return None,
                Some(value) => value.clone(),
                None => Value::Null,
            };
            Some(MediaTypeExample {
                summary: Some(string_of(example, "summary").unwrap_or_else(|| key.clone())),
                title: Some(key.clone()),
                description: string_of(example, "description"),
                value,
            })
        })
        .collect()
}

impl Operation {
    /// Examples for one Media Type Object: a lone `example`, else the named
    /// `examples`, else one generated from the schema (never for XML).
    fn media_type_examples(
        &self,
        media_type: &str,
        media: &Value,
        options: &SampleOptions,
    ) -> Vec<MediaTypeExample> {
        if let Some(example) = media.get("example").filter(|e| is_truthy(e)) {
            return vec![MediaTypeExample::bare(example.clone())];
        }

        if let Some(named) = media.get("examples").and_then(Value::as_object) {
            let examples = named_examples(named);
            if !examples.is_empty() {
                return examples;
            }
        }

        match media.get("schema") {
            Some(schema) if !mime::is_xml_like(media_type) => self
                .samples
                .sample(schema, options)
                .map(MediaTypeExample::bare)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Request body examples per media type; media types with none are left out.
    #[must_use]
    pub fn request_body_examples(&self) -> Vec<RequestBodyExample> {
        let Some(content) = self
            .request_body_object()
            .and_then(|body| body.get("content"))
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };
        let options = SampleOptions::request();
        content
            .iter()
            .filter_map(|(media_type, media)| {
                let examples = self.media_type_examples(media_type, media, &options);
                (!examples.is_empty()).then(|| RequestBodyExample {
                    media_type: media_type.clone(),
                    examples,
                })
            })
            .collect()
    }

    /// Examples for every response status, in declaration order.
    ///
    /// A response with headers and no content is reported under `*/*` with
    /// `only_headers` set; one with neither is left out.
    #[must_use]
    pub fn response_examples(&self) -> Vec<ResponseExample> {
        let Some(responses) = self.schema.get("responses").and_then(Value::as_object) else {
            return Vec::new();
        };
        let options = SampleOptions::response();
        responses
            .iter()
            .filter(|(_, response)| !is_ref(response))
            .filter_map(|(status, response)| {
                let mut media_types: IndexMap<String, Vec<MediaTypeExample>> = response
                    .get("content")
                    .and_then(Value::as_object)
                    .map(|content| {
                        content
                            .iter()
                            .map(|(media_type, media)| {
                                let examples =
                                    self.media_type_examples(media_type, media, &options);
                                (media_type.clone(), examples)
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                let mut only_headers = false;
                let has_headers = response
                    .get("headers")
                    .and_then(Value::as_object)
                    .is_some_and(|h| !h.is_empty());
                if media_types.is_empty() && has_headers {
                    media_types.insert("*/*".into(), Vec::new());
                    only_headers = true;
                }
                if media_types.is_empty() {
                    return None;
                }
                Some(ResponseExample {
                    status: status.clone(),
                    media_types,
                    only_headers,
                })
            })
            .collect()
    }

    /// Response examples of every callback operation that has any.
    #[must_use]
    pub fn callback_examples(&self) -> Vec<CallbackExample> {
        let Some(callbacks) = self.schema.get("callbacks").and_then(Value::as_object) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (identifier, expressions) in callbacks {
            for (expression, path_item) in expressions.as_object().into_iter().flatten() {
                let methods = path_item
                    .as_object()
                    .into_iter()
                    .flat_map(|map| map.keys())
                    .filter(|key| is_method(key));
                for method in methods {
                    let Some(callback) = self.callback(identifier, expression, method) else {
                        continue;
                    };
                    let example = callback.response_examples();
                    if !example.is_empty() {
                        out.push(CallbackExample {
                            identifier: identifier.clone(),
                            expression: expression.clone(),
                            method: method.clone(),
                            example,
                        });
                    }
                }
            }
        }
        out
    }
}
