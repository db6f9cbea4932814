pub mod cart_item;
pub mod sale;

pub use cart_item::{CartItemStatus, Entity as CartItem};
pub use sale::{Entity as Sale, SaleStatus};
