//! Route labels for metrics.

use actix_web::HttpRequest;

/// Matched route template such as `/admin/sessions/{id}`.
///
/// Session ids in paths would otherwise explode metric label cardinality.
/// Requests that matched no route share the `unmatched` label.
pub fn extract_route_pattern(req: &HttpRequest) -> String {
    req.match_pattern()
        .unwrap_or_else(|| "unmatched".to_string())
}
