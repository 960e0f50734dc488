//! Best-effort decoding of URL query parameters into an [`EventRequest`].
use std::collections::HashMap;
use std::str::FromStr;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::events::{EventRequest, EventType};

/// Decoded URL query parameters; every key keeps all of its values in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    /// Decodes a raw `application/x-www-form-urlencoded` query string.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.map(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
    }

    /// Returns the first value given for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::default();
        for (key, value) in iter {
            params.entry(key.into()).or_default().push(value.into());
        }
        Self(params)
    }
}

/// Builds an event request from defaults overridden by `params`.
///
/// Returns the request and whether historical events were asked for.
pub fn event_request_from_query(params: &QueryParams) -> (EventRequest, bool) {
    let mut request = EventRequest::default();
    let historical = apply_event_query(params, &mut request);
    (request, historical)
}

/// Overrides fields of `request` with the recognised parameters in `params`.
///
/// Recognised are the booleans `historical`, `subcontainers`, `oom_events`, `creation_events`
/// and `deletion_events`, the integer `max_events` and the RFC3339 timestamps `start_time` and
/// `end_time`. Only the first value of a key counts. A value that does not parse leaves the
/// field untouched. `historical` is not part of the request and is returned instead (default
/// `false`).
pub fn apply_event_query(params: &QueryParams, request: &mut EventRequest) -> bool {
    let historical = decode(params, "historical", parse_bool).unwrap_or(false);

    if let Some(v) = decode(params, "subcontainers", parse_bool) {
        request.include_subcontainers = v;
    }
    for (key, event_type) in [
        ("oom_events", EventType::Oom),
        ("creation_events", EventType::ContainerCreation),
        ("deletion_events", EventType::ContainerDeletion),
    ] {
        if let Some(v) = decode(params, key, parse_bool) {
            request.event_type.insert(event_type, v);
        }
    }
    if let Some(v) = decode(params, "max_events", |s| i64::from_str(s).ok()) {
        request.max_events_returned = v;
    }
    if let Some(v) = decode(params, "start_time", parse_timestamp) {
        request.start_time = Some(v);
    }
    if let Some(v) = decode(params, "end_time", parse_timestamp) {
        request.end_time = Some(v);
    }

    log::debug!(
        "decoded event request {:?} (historical={}) from query {:?}",
        request,
        historical,
        params
    );
    historical
}

fn decode<T>(params: &QueryParams, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    params.first(key).and_then(parse)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn decode_query(raw: &str) -> (EventRequest, bool) {
        event_request_from_query(&QueryParams::parse(Some(raw)))
    }

    #[test]
    fn test_empty_query_keeps_defaults() {
        let (request, historical) = event_request_from_query(&QueryParams::parse(None));
        assert_eq!(request, EventRequest::default());
        assert!(!historical);
    }

    #[test]
    fn test_max_events_and_oom() {
        let (request, historical) = decode_query("max_events=10&oom_events=true");
        assert_eq!(request.max_events_returned, 10);
        assert!(request.is_enabled(EventType::Oom));
        assert!(!historical);
        assert_eq!(
            request,
            EventRequest {
                max_events_returned: 10,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let (request, historical) = decode_query(
            "max_events=notanumber&oom_events=maybe&start_time=yesterday&historical=yes",
        );
        assert_eq!(request, EventRequest::default());
        assert!(!historical);
    }

    #[test]
    fn test_all_recognised_keys() {
        let (request, historical) = decode_query(
            "historical=true&subcontainers=1&oom_events=false&creation_events=F\
             &deletion_events=TRUE&max_events=-1\
             &start_time=2024-05-01T10:00:00Z&end_time=2024-05-01T12:00:00%2B02:00",
        );
        assert!(historical);
        assert!(request.include_subcontainers);
        assert!(!request.is_enabled(EventType::Oom));
        assert!(!request.is_enabled(EventType::ContainerCreation));
        assert!(request.is_enabled(EventType::ContainerDeletion));
        assert!(request.is_enabled(EventType::OomKill));
        assert_eq!(request.max_events_returned, -1);
        assert_eq!(request.start_time, Some(datetime!(2024-05-01 10:00 UTC)));
        assert_eq!(request.end_time, Some(datetime!(2024-05-01 10:00 UTC)));
    }

    #[test]
    fn test_only_first_value_counts() {
        let (request, _) = decode_query("max_events=3&max_events=7");
        assert_eq!(request.max_events_returned, 3);

        let (request, _) = decode_query("max_events=bad&max_events=7");
        assert_eq!(request.max_events_returned, 10);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (request, _) = decode_query("color=blue&oom_kill_events=false");
        assert_eq!(request, EventRequest::default());
    }

    #[test]
    fn test_apply_keeps_caller_defaults() {
        let mut request = EventRequest {
            container_name: "/docker".to_owned(),
            max_events_returned: 50,
            ..Default::default()
        };
        let params: QueryParams = [("max_events", "oops"), ("subcontainers", "true")]
            .into_iter()
            .collect();
        assert!(!apply_event_query(&params, &mut request));
        assert_eq!(request.container_name, "/docker");
        assert_eq!(request.max_events_returned, 50);
        assert!(request.include_subcontainers);
    }
}
