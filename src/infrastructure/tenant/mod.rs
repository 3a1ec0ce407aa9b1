//! Tenant state data access

pub mod data_service;
pub mod models;

pub use data_service::{
    TYPE_DIRECTORY_ROLES, TYPE_LICENSES, TYPE_ORGANIZATION, TYPE_USERS, TenantDataService,
};
pub use models::{DirectoryRole, DirectoryUser, LicenseSku, OrganizationProfile, RoleMember};

#[cfg(test)]
pub(crate) mod test_support;
