pub mod belief;
pub mod env;
pub mod kitchen;
pub mod model;
pub mod nn;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "kitchen-trust"
    }

    pub const fn codename() -> &'static str {
        "Shared Counter"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
