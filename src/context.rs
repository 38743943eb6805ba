use uuid::Uuid;

/// Identity attached to every core call.
///
/// The request layer resolves authentication and tenancy before the core is
/// invoked; services trust these ids and scope every query by `tenant_id`.
/// There is no ambient "current tenant" state anywhere in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

impl RequestContext {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self { tenant_id, user_id }
    }
}
