//! Per-request authorization of served events.
//!
//! A filter decides, for each stored event, whether the caller of
//! `GET /events` may see it. Filters see the persisted authorization
//! attributes (`userId`, `tenantId`, `sessionId`) and the request headers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};
use herald_core::error::DomainError;
use herald_core::stored_event::StoredEvent;

/// The parts of an incoming request a filter may inspect.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
}

impl RequestContext {
    /// Wraps the request headers.
    #[must_use]
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The value of `name`, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Decides whether a request may see a stored event.
///
/// Returning `Err` excludes the event; the handler logs the error and keeps
/// going with the rest of the batch.
pub trait AuthorizationFilter: Send + Sync {
    /// Returns `Ok(true)` if `event` may be served to `request`.
    ///
    /// # Errors
    ///
    /// Any error means "not authorized".
    fn is_authorized(
        &self,
        event: &StoredEvent,
        request: &RequestContext,
    ) -> Result<bool, DomainError>;
}

impl<F> AuthorizationFilter for F
where
    F: Fn(&StoredEvent, &RequestContext) -> Result<bool, DomainError> + Send + Sync,
{
    fn is_authorized(
        &self,
        event: &StoredEvent,
        request: &RequestContext,
    ) -> Result<bool, DomainError> {
        self(event, request)
    }
}

type AttributeGetter = for<'a> fn(&'a StoredEvent) -> Option<&'a str>;

/// Serves an event only when one of its authorization attributes equals a
/// request header.
#[derive(Clone)]
pub struct HeaderAttributeFilter {
    header: HeaderName,
    attribute_name: &'static str,
    attribute: AttributeGetter,
}

impl fmt::Debug for HeaderAttributeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderAttributeFilter")
            .field("header", &self.header)
            .field("attribute", &self.attribute_name)
            .finish()
    }
}

impl HeaderAttributeFilter {
    /// `x-user-id` must equal the event's `userId`.
    #[must_use]
    pub fn user() -> Self {
        Self {
            header: HeaderName::from_static("x-user-id"),
            attribute_name: "userId",
            attribute: StoredEvent::user_id,
        }
    }

    /// `x-tenant-id` must equal the event's `tenantId`.
    #[must_use]
    pub fn tenant() -> Self {
        Self {
            header: HeaderName::from_static("x-tenant-id"),
            attribute_name: "tenantId",
            attribute: StoredEvent::tenant_id,
        }
    }

    /// `x-session-id` must equal the event's `sessionId`.
    #[must_use]
    pub fn session() -> Self {
        Self {
            header: HeaderName::from_static("x-session-id"),
            attribute_name: "sessionId",
            attribute: StoredEvent::session_id,
        }
    }
}

impl AuthorizationFilter for HeaderAttributeFilter {
    fn is_authorized(
        &self,
        event: &StoredEvent,
        request: &RequestContext,
    ) -> Result<bool, DomainError> {
        let expected = request.header(&self.header).ok_or_else(|| {
            DomainError::Validation(format!("missing {} header", self.header))
        })?;
        Ok((self.attribute)(event) == Some(expected))
    }
}

/// Requires every inner filter to authorize the event.
#[derive(Clone, Default)]
pub struct AllOf {
    filters: Vec<Arc<dyn AuthorizationFilter>>,
}

impl fmt::Debug for AllOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllOf")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl AllOf {
    /// Combines `filters`. An empty combination authorizes everything.
    #[must_use]
    pub fn new(filters: Vec<Arc<dyn AuthorizationFilter>>) -> Self {
        Self { filters }
    }
}

impl AuthorizationFilter for AllOf {
    fn is_authorized(
        &self,
        event: &StoredEvent,
        request: &RequestContext,
    ) -> Result<bool, DomainError> {
        for filter in &self.filters {
            if !filter.is_authorized(event, request)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Built-in schemes selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationScheme {
    /// Serve every event.
    None,
    /// Match `x-user-id` against `userId`.
    User,
    /// Match `x-tenant-id` against `tenantId`.
    Tenant,
    /// Match `x-session-id` against `sessionId`.
    Session,
}

impl AuthorizationScheme {
    /// The filter for this scheme, or `None` to serve everything.
    #[must_use]
    pub fn filter(self) -> Option<Arc<dyn AuthorizationFilter>> {
        match self {
            Self::None => None,
            Self::User => Some(Arc::new(HeaderAttributeFilter::user())),
            Self::Tenant => Some(Arc::new(HeaderAttributeFilter::tenant())),
            Self::Session => Some(Arc::new(HeaderAttributeFilter::session())),
        }
    }
}

impl FromStr for AuthorizationScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "user" => Ok(Self::User),
            "tenant" => Ok(Self::Tenant),
            "session" => Ok(Self::Session),
            other => Err(format!(
                "unknown authorization scheme {other:?} (expected none, user, tenant or session)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use herald_test_support::at;
    use uuid::Uuid;

    fn event_for(user_id: Option<&str>, tenant_id: Option<&str>) -> StoredEvent {
        StoredEvent::new(
            Uuid::new_v4(),
            at(10, 0, 0),
            Uuid::new_v4(),
            "orders.placed",
            serde_json::json!({}),
        )
        .with_user_id(user_id.map(str::to_owned))
        .with_tenant_id(tenant_id.map(str::to_owned))
    }

    fn request_with(headers: &[(&'static str, &'static str)]) -> RequestContext {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(value));
        }
        RequestContext::new(map)
    }

    #[test]
    fn test_user_filter_matches_header_against_attribute() {
        let filter = HeaderAttributeFilter::user();
        let request = request_with(&[("x-user-id", "alice")]);

        assert!(filter.is_authorized(&event_for(Some("alice"), None), &request).unwrap());
        assert!(!filter.is_authorized(&event_for(Some("bob"), None), &request).unwrap());
    }

    #[test]
    fn test_event_without_attribute_is_excluded() {
        let filter = HeaderAttributeFilter::tenant();
        let request = request_with(&[("x-tenant-id", "acme")]);

        assert!(!filter.is_authorized(&event_for(Some("alice"), None), &request).unwrap());
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let filter = HeaderAttributeFilter::session();

        let result = filter.is_authorized(&event_for(None, None), &RequestContext::default());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_all_of_requires_every_filter() {
        // Arrange
        let filter = AllOf::new(vec![
            Arc::new(HeaderAttributeFilter::user()),
            Arc::new(HeaderAttributeFilter::tenant()),
        ]);
        let request = request_with(&[("x-user-id", "alice"), ("x-tenant-id", "acme")]);

        // Act
        let both = filter.is_authorized(&event_for(Some("alice"), Some("acme")), &request);
        let wrong_tenant = filter.is_authorized(&event_for(Some("alice"), Some("other")), &request);

        // Assert
        assert!(both.unwrap());
        assert!(!wrong_tenant.unwrap());
    }

    #[test]
    fn test_closure_is_a_filter() {
        let filter = |event: &StoredEvent, _: &RequestContext| -> Result<bool, DomainError> {
            Ok(event.event_type().starts_with("orders."))
        };

        assert!(filter.is_authorized(&event_for(None, None), &RequestContext::default()).unwrap());
    }

    #[test]
    fn test_scheme_parses_case_insensitively() {
        assert_eq!("Tenant".parse::<AuthorizationScheme>(), Ok(AuthorizationScheme::Tenant));
        assert_eq!("".parse::<AuthorizationScheme>(), Ok(AuthorizationScheme::None));
        assert!("admin".parse::<AuthorizationScheme>().is_err());
        assert!(AuthorizationScheme::None.filter().is_none());
    }
}
