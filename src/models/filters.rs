use super::enums::RfpStatus;

/// Default page size for RFP listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Upper bound on a single page.
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct RfpFilter {
    pub status: Option<RfpStatus>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for RfpFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct VendorFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}
