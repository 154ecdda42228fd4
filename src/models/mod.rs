pub mod cart;
pub mod order;
pub mod outbox;
pub mod product;
pub mod shipping;
