//! Tenant-scoped CRUD over the company's technicians, branding and events.

mod cache;
mod demo;
pub mod service;

#[cfg(test)]
mod tests;

pub use service::TenantRepository;
