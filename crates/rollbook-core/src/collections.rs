//! Names of the collections the application uses.
//!
//! The store accepts any collection name; these constants exist so callers
//! share spellings. The store itself never validates references between
//! collections — e.g. whether any student still points at a group must be
//! checked by the caller before deleting the group.

pub const GROUPS: &str = "groups";
pub const STUDENTS: &str = "students";
pub const SPECIAL_STATUSES: &str = "special_statuses";
pub const VISITS: &str = "visits";
pub const PERMISSIONS: &str = "permissions";
pub const VIOLATIONS: &str = "violations";
pub const TEACHERS: &str = "teachers";
pub const TEACHER_GROUPS: &str = "teacher_groups";
pub const CREDENTIALS: &str = "credentials";
pub const RENEWAL_CODES: &str = "renewal_codes";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const ACTIVATION_HISTORY: &str = "activation_history";
