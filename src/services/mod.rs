pub mod carts;
pub mod coupons;
pub mod discounts;
pub mod order_status;
pub mod orders;
pub mod pricing;
pub mod stock_opname;
