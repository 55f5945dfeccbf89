//! Order and tick payloads shared by the loader, the broadcaster and consumers

mod order;
mod price;
mod tick;

pub use order::StopLossOrder;
pub use price::PriceRange;
pub use tick::TickEvent;
