pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod points;
pub mod pricing;
pub mod stock;
