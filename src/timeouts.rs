pub mod ms {
    /// Settle time before probing a freshly navigated page.
    pub const REATTACH_SETTLE: u64 = 500;
    /// Press-to-release hold for synthetic clicks; very short presses get
    /// dropped by the game renderer under load.
    pub const CLICK_HOLD: u64 = 120;
    /// Upper bound applied to inbound delay steps.
    pub const DELAY_CLAMP: u64 = 5000;
    pub const CONNECT_RETRY: u64 = 500;
    pub const PAGE_DISCOVERY_RETRY: u64 = 300;
}

pub mod secs {
    pub const REQUEST: u64 = 120;
    pub const SINK_REQUEST: u64 = 10;
    pub const ENRICHMENT_FETCH: u64 = 15;
}
