//! Resolution of `/api/<version>/<request type>/<args...>` paths.

use super::{Error, Result};

/// Path under which the API is mounted, without trailing slash.
pub const API_PREFIX: &str = "/api";
/// [`API_PREFIX`] with trailing slash.
pub const API_RESOURCE: &str = "/api/";

/// A fully specified API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub version: String,
    pub request_type: String,
    /// Positional arguments following the request type, passed through unmodified.
    pub args: Vec<String>,
}

/// What a request path asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPath {
    /// The bare API root: list the supported versions.
    Versions,
    /// A version without request type: list its request types.
    RequestTypes { version: String },
    Request(ParsedRequest),
}

/// Returns `true` for the two spellings of the bare API root.
pub fn is_api_root(path: &str) -> bool {
    path == API_PREFIX || path == API_RESOURCE
}

/// Splits a request path into its routing tokens.
///
/// The part after [`API_RESOURCE`] is split into at most three pieces: the version, the request
/// type and the argument suffix. The separator in front of the suffix is consumed by that split,
/// so an empty suffix yields no arguments, while every other segment of the suffix (including
/// empty ones) becomes one argument.
///
/// # Errors
///
/// - [`Error::IncompletePrefix`] if `path` does not start with [`API_PREFIX`].
/// - [`Error::MalformedRequest`] if the version token is missing.
pub fn parse_request_path(path: &str) -> Result<ApiPath> {
    if !path.starts_with(API_PREFIX) {
        return Err(Error::IncompletePrefix(path.to_owned()));
    }
    if is_api_root(path) {
        return Ok(ApiPath::Versions);
    }
    let rest = path
        .strip_prefix(API_RESOURCE)
        .ok_or_else(|| Error::MalformedRequest(path.to_owned()))?;

    let mut parts = rest.splitn(3, '/');
    let version = parts.next().unwrap_or_default();
    if version.is_empty() {
        return Err(Error::MalformedRequest(path.to_owned()));
    }
    let request_type = parts.next().unwrap_or_default();
    if request_type.is_empty() {
        return Ok(ApiPath::RequestTypes {
            version: version.to_owned(),
        });
    }
    let args = match parts.next() {
        None | Some("") => Vec::new(),
        Some(suffix) => suffix.split('/').map(str::to_owned).collect(),
    };

    Ok(ApiPath::Request(ParsedRequest {
        version: version.to_owned(),
        request_type: request_type.to_owned(),
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(path: &str) -> ParsedRequest {
        match parse_request_path(path).unwrap() {
            ApiPath::Request(request) => request,
            other => panic!("Expected ApiPath::Request, got {other:?}"),
        }
    }

    #[test]
    fn root_paths_list_versions() {
        assert_eq!(parse_request_path("/api").unwrap(), ApiPath::Versions);
        assert_eq!(parse_request_path("/api/").unwrap(), ApiPath::Versions);
        assert!(is_api_root("/api/"));
        assert!(!is_api_root("/api/v1.0"));
    }

    #[test]
    fn version_only_lists_request_types() {
        for path in ["/api/v1.0", "/api/v1.0/"] {
            assert_eq!(
                parse_request_path(path).unwrap(),
                ApiPath::RequestTypes {
                    version: "v1.0".to_owned()
                }
            );
        }
    }

    #[test]
    fn empty_request_type_lists_request_types() {
        assert_eq!(
            parse_request_path("/api/v1.0//containers").unwrap(),
            ApiPath::RequestTypes {
                version: "v1.0".to_owned()
            }
        );
    }

    #[test]
    fn full_request_with_args() {
        let request = parsed("/api/v1.0/containers/a/b/c");
        assert_eq!(request.version, "v1.0");
        assert_eq!(request.request_type, "containers");
        assert_eq!(request.args, ["a", "b", "c"]);
    }

    #[test]
    fn request_without_args_has_empty_args() {
        assert!(parsed("/api/v1.0/containers").args.is_empty());
    }

    #[test]
    fn trailing_slash_yields_no_args() {
        assert!(parsed("/api/v1.0/containers/").args.is_empty());
    }

    #[test]
    fn only_the_leading_separator_is_stripped() {
        assert_eq!(parsed("/api/v1.0/containers//a").args, ["", "a"]);
        assert_eq!(parsed("/api/v1.0/containers/a//b/").args, ["a", "", "b", ""]);
    }

    #[test]
    fn missing_prefix_is_incomplete() {
        let err = parse_request_path("/metrics").unwrap_err();
        assert!(matches!(err, Error::IncompletePrefix(ref p) if p == "/metrics"));
        assert_eq!(err.to_string(), r#"incomplete API request "/metrics""#);
    }

    #[test]
    fn missing_version_is_malformed() {
        let err = parse_request_path("/api//containers").unwrap_err();
        assert_eq!(err.to_string(), r#"malformed request "/api//containers""#);
    }

    #[test]
    fn prefix_without_separator_is_malformed() {
        let err = parse_request_path("/apiv1.0/containers").unwrap_err();
        assert!(matches!(err, Error::MalformedRequest(_)));
    }
}
