// 倉儲與領域資料來源接口的具體實現

pub mod memory;

pub use memory::{InMemoryOrderRepository, OrderFixture};
