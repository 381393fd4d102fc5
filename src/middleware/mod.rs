pub mod response;
pub mod session;
pub mod tenant;

pub use response::{ApiResponse, ApiResult};
pub use session::{require_session, resolve_session, Principal};
pub use tenant::{load_tenant_context, require_tenant, TenantContext};
