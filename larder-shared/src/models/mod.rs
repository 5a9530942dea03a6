pub mod cart;
pub mod order;
pub mod pantry;
pub mod preferences;
pub mod product;
pub mod shopping;
