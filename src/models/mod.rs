// Core models
pub mod cart;
pub mod order;
pub mod session;

pub use cart::{Cart, CartItem};
pub use order::{
    Address, IdentifierAssignment, IdentifierOrigin, IdentifierPair, LineItem, NewOrder, Order,
    OrderId, OrderNote, OrderStatus, GATEWAY_ID,
};
pub use session::SessionId;
