// Resource locator: an explicitly built table of registered kinds and the canonical
// endpoint paths derived from (kind, namespace, name, child kind).

use crate::error::LocatorError;
use crate::models::{ResourceIdentity, ResourceKind, validate_segment};

/// Prefix shared by every resource endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Child kinds served under every workload, in response order.
pub const WORKLOAD_CHILDREN: [ResourceKind; 3] =
    [ResourceKind::Event, ResourceKind::Pod, ResourceKind::Service];

/// A parent kind and the child kinds reachable below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRegistration {
    pub kind: ResourceKind,
    pub children: Vec<ResourceKind>,
}

impl KindRegistration {
    pub fn workload(kind: ResourceKind) -> Self {
        Self {
            kind,
            children: WORKLOAD_CHILDREN.to_vec(),
        }
    }
}

/// Resolved endpoint: the identity it addresses and, for child lists, the child kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
    pub identity: ResourceIdentity,
    pub child: Option<ResourceKind>,
}

impl EndpointDescriptor {
    /// Canonical path. Identical descriptors always render the same string.
    pub fn path(&self) -> String {
        let mut path = format!(
            "{}/{}/{}/{}",
            API_PREFIX,
            self.identity.kind.path_segment(),
            self.identity.namespace,
            self.identity.name
        );
        if let Some(child) = self.child {
            path.push('/');
            path.push_str(child.path_segment());
        }
        path
    }
}

#[derive(Debug, Clone)]
pub struct ResourceLocator {
    registrations: Vec<KindRegistration>,
}

impl Default for ResourceLocator {
    /// Workload kinds that own pods through a label selector.
    fn default() -> Self {
        Self::new([
            KindRegistration::workload(ResourceKind::ReplicationController),
            KindRegistration::workload(ResourceKind::ReplicaSet),
            KindRegistration::workload(ResourceKind::Deployment),
            KindRegistration::workload(ResourceKind::StatefulSet),
            KindRegistration::workload(ResourceKind::DaemonSet),
            KindRegistration::workload(ResourceKind::Job),
        ])
    }
}

impl ResourceLocator {
    pub fn new(registrations: impl IntoIterator<Item = KindRegistration>) -> Self {
        Self {
            registrations: registrations.into_iter().collect(),
        }
    }

    pub fn registrations(&self) -> &[KindRegistration] {
        &self.registrations
    }

    pub fn is_registered(&self, kind: ResourceKind) -> bool {
        self.registrations.iter().any(|r| r.kind == kind)
    }

    /// Child kinds registered under `kind`; empty for unregistered kinds.
    pub fn children(&self, kind: ResourceKind) -> &[ResourceKind] {
        self.registrations
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.children.as_slice())
            .unwrap_or_default()
    }

    /// Registered parent kind for a path segment.
    pub fn kind(&self, segment: &str) -> Result<ResourceKind, LocatorError> {
        ResourceKind::from_path_segment(segment)
            .filter(|kind| self.is_registered(*kind))
            .ok_or_else(|| LocatorError::UnknownKind(segment.to_string()))
    }

    /// Child kind registered below `parent` for a path segment.
    pub fn child_kind(
        &self,
        parent: ResourceKind,
        segment: &str,
    ) -> Result<ResourceKind, LocatorError> {
        ResourceKind::from_path_segment(segment)
            .filter(|child| self.children(parent).contains(child))
            .ok_or_else(|| LocatorError::UnknownChildKind {
                parent: parent.path_segment().to_string(),
                child: segment.to_string(),
            })
    }

    /// Validates every part of an endpoint against the table.
    pub fn describe(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        child: Option<&str>,
    ) -> Result<EndpointDescriptor, LocatorError> {
        let kind = self.kind(kind)?;
        let child = child
            .map(|segment| self.child_kind(kind, segment))
            .transpose()?;
        let identity = ResourceIdentity::new(kind, namespace, name)?;
        Ok(EndpointDescriptor { identity, child })
    }

    /// Canonical path for a detail (`child == None`) or child-list endpoint.
    pub fn locate(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        child: Option<&str>,
    ) -> Result<String, LocatorError> {
        Ok(self.describe(kind, namespace, name, child)?.path())
    }

    /// Inverse of [`ResourceLocator::locate`]: parses a canonical path back into its descriptor.
    pub fn resolve(&self, path: &str) -> Result<EndpointDescriptor, LocatorError> {
        let unmatched = || LocatorError::UnmatchedPath(path.to_string());
        let rest = path
            .strip_prefix(API_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(unmatched)?;
        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            [kind, namespace, name] => self.describe(kind, namespace, name, None),
            [kind, namespace, name, child] => self.describe(kind, namespace, name, Some(child)),
            [kind, ..] => {
                self.kind(kind)?;
                for segment in &segments[1..] {
                    validate_segment("path segment", segment)?;
                }
                Err(unmatched())
            }
            [] => Err(unmatched()),
        }
    }
}
