mod estimate;
mod location;
mod money;
mod quote;
mod reference;
mod shipping;
mod tariff;

pub use estimate::*;
pub use location::*;
pub use money::*;
pub use quote::*;
pub use reference::*;
pub use shipping::*;
pub use tariff::*;
